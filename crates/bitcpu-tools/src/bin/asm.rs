use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use bitcpu::{AsmConfig, AsmError, Assembler, MirrorStyle};
use bitcpu_tools::{init_tracing, parse_source, render_line, save_image};

#[derive(Parser, Debug)]
#[command(author, version, about = "bitcpu assembler")]
struct Opts {
    /// Input assembly file (one statement per line)
    #[arg(short, long)]
    input: PathBuf,
    /// Output image file
    #[arg(short, long)]
    output: PathBuf,
    /// Also write the binary text mirror to FILE
    #[arg(long = "debug", value_name = "FILE")]
    mirror: Option<PathBuf>,
    /// Separate fields with spaces in the text mirror
    #[arg(long)]
    pretty: bool,
    /// Fail on the first bad statement instead of skipping it
    #[arg(long)]
    strict: bool,
    /// Default log level to debug
    #[arg(short, long)]
    verbose: bool,
}

fn report(label: &str, err: &AsmError, text: &str) {
    eprintln!("{label} {err}");
    if let Some(quote) = err.line().and_then(|line| render_line(text, line)) {
        eprintln!("{quote}");
    }
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    init_tracing(opts.verbose);

    let text = std::fs::read_to_string(&opts.input)
        .with_context(|| format!("reading {}", opts.input.display()))?;
    let statements = parse_source(&text)?;

    let style = if opts.pretty {
        MirrorStyle::Pretty
    } else {
        MirrorStyle::Dense
    };
    let cfg = AsmConfig {
        mirror: opts.mirror.as_ref().map(|_| style),
        strict: opts.strict,
    };
    let out = match Assembler::new(cfg).assemble(&statements) {
        Ok(out) => out,
        Err(err) => {
            report("error", &err, &text);
            return Err(err).with_context(|| format!("assembling {}", opts.input.display()));
        }
    };

    for err in &out.skipped {
        report("warning: skipped", err, &text);
    }
    save_image(&opts.output, &out.image)?;
    if let (Some(path), Some(mirror)) = (&opts.mirror, &out.mirror) {
        std::fs::write(path, mirror).with_context(|| format!("writing {}", path.display()))?;
    }
    info!(
        statements = out.statements,
        skipped = out.skipped.len(),
        bits = out.image.bit_len(),
        "wrote {}",
        opts.output.display()
    );
    Ok(())
}
