use bitcpu::{AddressSpace, Assembler, Cpu, CpuConfig, CpuState, ScriptedConsole};
use bitcpu_tools::{load_image, parse_source, save_image};
use pretty_assertions::assert_eq;

const DOUBLE: &str = "\
; read a value, double it, print it
start:  IN R0
        MOVEM R0, 0     ; stash
        ADD R1, R0, 0
        OUT R1
        HALT
";

#[test]
fn source_to_output() {
    let stmts = parse_source(DOUBLE).unwrap();
    assert_eq!(stmts.len(), 5);
    let out = Assembler::default().assemble(&stmts).unwrap();
    assert!(out.skipped.is_empty());

    let path = std::env::temp_dir().join(format!("bitcpu-pipeline-{}.bin", std::process::id()));
    save_image(&path, &out.image).unwrap();
    let image = load_image(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(image, out.image);

    let mut cpu = Cpu::new(CpuConfig::default());
    cpu.load_image(&image).unwrap();
    let mut console = ScriptedConsole::new(["21"]);
    cpu.run(&mut console).unwrap();
    assert_eq!(cpu.state(), CpuState::Halted);
    assert_eq!(cpu.data().get(0).unwrap(), 21);
    assert_eq!(console.outputs, vec![(1, 42)]);
}

#[test]
fn truncated_file_is_rejected() {
    let path = std::env::temp_dir().join(format!("bitcpu-short-{}.bin", std::process::id()));
    std::fs::write(&path, [0u8, 0, 0, 16, 0xFF]).unwrap();
    let err = load_image(&path).unwrap_err();
    std::fs::remove_file(&path).unwrap();
    assert!(format!("{err:#}").contains("header announces 16 bits"));
}
