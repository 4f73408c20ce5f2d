pub mod model;
pub mod source;

pub use model::{init_tracing, load_image, save_image};
pub use source::{parse_line, parse_source, render_line};
