use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};

use bitcpu::disasm::{disassemble, fmt_instruction};
use bitcpu_tools::{init_tracing, load_image};

#[derive(Parser, Debug)]
#[command(author, version, about = "bitcpu image disassembler", long_about = None)]
struct Cli {
    #[arg(value_name = "IMAGE")]
    input: PathBuf,
    /// Output format: text or json
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Show each instruction's bit width
    #[arg(long)]
    show_width: bool,
    /// Write output to file instead of stdout
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,
    #[arg(long)]
    debug: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let image = load_image(&cli.input)?;
    let lines = disassemble(&image);

    let buf = match cli.format {
        OutputFormat::Json => serde_json::to_string_pretty(&lines)? + "\n",
        OutputFormat::Text => {
            let mut buf = String::new();
            writeln!(buf, "; {} bits", image.bit_len())?;
            for line in &lines {
                match &line.result {
                    Ok(instr) if cli.show_width => writeln!(
                        buf,
                        "{:>4}: [{:>2}] {}",
                        line.offset,
                        line.width,
                        fmt_instruction(instr)
                    )?,
                    Ok(instr) => writeln!(buf, "{:>4}: {}", line.offset, fmt_instruction(instr))?,
                    Err(e) => writeln!(buf, "{:>4}: <error: {e}>", line.offset)?,
                }
            }
            buf
        }
    };

    match cli.out {
        Some(path) => std::fs::write(path, buf)?,
        None => print!("{buf}"),
    }
    Ok(())
}
