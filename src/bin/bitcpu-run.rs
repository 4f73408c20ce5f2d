use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bitcpu::{AddressSpace, Cpu, CpuConfig, Image, ScriptedConsole, StdConsole, StepRecord};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a bit-packed program image")]
struct Opts {
    #[arg(value_name = "IMAGE")]
    input: PathBuf,
    /// JSON file with a CpuConfig
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Program memory size in bits (overrides --config)
    #[arg(long)]
    program_bits: Option<u32>,
    /// Data memory size in cells (overrides --config)
    #[arg(long)]
    data_cells: Option<u32>,
    /// Preload a data cell before running. Repeatable.
    #[arg(long = "data", value_name = "ADDR=VALUE", value_parser = parse_poke)]
    pokes: Vec<(u32, i8)>,
    /// Values for IN, consumed in order instead of prompting on stdin
    #[arg(long = "input", value_name = "VALUE", value_delimiter = ',', allow_hyphen_values = true)]
    inputs: Vec<String>,
    /// Print every executed step as a JSON line
    #[arg(long)]
    trace: bool,
    /// Print the final CPU state as JSON
    #[arg(long)]
    dump_state: bool,
    /// Default log level to debug
    #[arg(long)]
    debug: bool,
}

fn parse_poke(s: &str) -> Result<(u32, i8)> {
    let (addr, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected ADDR=VALUE, got '{s}'"))?;
    let addr = addr.trim().parse::<u32>().context("bad address")?;
    let value = value.trim().parse::<i8>().context("bad value")?;
    Ok((addr, value))
}

fn load_config(opts: &Opts) -> Result<CpuConfig> {
    let mut cfg = match &opts.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => CpuConfig::default(),
    };
    if let Some(bits) = opts.program_bits {
        cfg.program_bits = bits;
    }
    if let Some(cells) = opts.data_cells {
        cfg.data_cells = cells;
    }
    Ok(cfg)
}

fn print_step(rec: &StepRecord) {
    match serde_json::to_string(rec) {
        Ok(line) => println!("{line}"),
        Err(e) => eprintln!("cannot serialize step at bit {}: {e}", rec.pc),
    }
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    let filter = if opts.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cfg = load_config(&opts)?;
    let bytes = std::fs::read(&opts.input)
        .with_context(|| format!("reading {}", opts.input.display()))?;
    let image = Image::from_bytes(&bytes).context("invalid program image")?;

    let mut cpu = Cpu::new(cfg);
    cpu.load_image(&image)?;
    for &(addr, value) in &opts.pokes {
        cpu.data_mut()
            .set(addr, value)
            .with_context(|| format!("--data {addr}={value}"))?;
    }

    let on_step = |rec: &StepRecord| {
        if opts.trace {
            print_step(rec);
        }
    };
    let result = if opts.inputs.is_empty() {
        cpu.run_with(&mut StdConsole, on_step)
    } else {
        let mut console = ScriptedConsole::new(opts.inputs.iter().cloned());
        let r = cpu.run_with(&mut console, on_step);
        for (reg, value) in &console.outputs {
            println!("Output from register {reg}: {value}");
        }
        r
    };

    if opts.dump_state {
        println!("{}", serde_json::to_string_pretty(&cpu.snapshot())?);
    }
    let executed = result.context("execution faulted")?;
    info!(executed, pc = cpu.pc(), "halted");
    Ok(())
}
