use std::path::Path;

use anyhow::{Context, Result};

use bitcpu::Image;

pub fn load_image(path: &Path) -> Result<Image> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Image::from_bytes(&bytes).with_context(|| format!("{} is not a valid image", path.display()))
}

pub fn save_image(path: &Path, image: &Image) -> Result<()> {
    let file =
        std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    image
        .write_to(std::io::BufWriter::new(file))
        .with_context(|| format!("writing {}", path.display()))
}

/// Install the fmt subscriber used by every front end.
pub fn init_tracing(debug: bool) {
    let filter = if debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
