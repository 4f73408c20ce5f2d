use bitcpu::{AsmConfig, AsmError, Assembler, BitError, CodecError, MirrorStyle, Statement};
use pretty_assertions::assert_eq;

fn copy_program() -> Vec<Statement> {
    vec![
        Statement::new(1, "MOVER", &["R0", "5"]),
        Statement::new(2, "MOVEM", &["R0", "6"]),
        Statement::new(3, "HALT", &[]),
    ]
}

#[test]
fn image_bytes_carry_length_header() {
    let out = Assembler::default().assemble(&copy_program()).unwrap();
    assert_eq!(out.statements, 3);
    assert!(out.skipped.is_empty());
    assert!(out.mirror.is_none());
    assert_eq!(out.image.to_bytes(), vec![0, 0, 0, 24, 0x01, 0x44, 0x64]);
}

#[test]
fn mirror_lists_one_line_per_instruction() {
    let dense = Assembler::new(AsmConfig {
        mirror: Some(MirrorStyle::Dense),
        strict: false,
    })
    .assemble(&copy_program())
    .unwrap();
    assert_eq!(
        dense.mirror.as_deref(),
        Some("0000000101\n0001000110\n0100\n")
    );

    let pretty = Assembler::new(AsmConfig {
        mirror: Some(MirrorStyle::Pretty),
        strict: false,
    })
    .assemble(&copy_program())
    .unwrap();
    assert_eq!(
        pretty.mirror.as_deref(),
        Some("0000 00 0101\n0001 00 0110\n0100\n")
    );
    assert_eq!(pretty.image, dense.image);
}

#[test]
fn missing_operand_skips_the_statement() {
    let stmts = vec![
        Statement::new(1, "ADD", &["R0", "R1"]),
        Statement::new(2, "HALT", &[]),
    ];
    let out = Assembler::default().assemble(&stmts).unwrap();
    assert_eq!(out.statements, 1);
    assert_eq!(out.image.bit_len(), 4);
    assert_eq!(out.image.body(), &[0x40]);
    assert_eq!(out.skipped.len(), 1);
    assert_eq!(out.skipped[0].line(), Some(1));
    assert!(matches!(
        &out.skipped[0],
        AsmError::Statement {
            source: CodecError::OperandCount { mnemonic: "ADD", expected: 3, got: 2 },
            ..
        }
    ));
}

#[test]
fn strict_mode_makes_skips_fatal() {
    let stmts = vec![
        Statement::new(1, "HALT", &[]),
        Statement::new(2, "ADD", &["R0", "R1"]),
    ];
    let asm = Assembler::new(AsmConfig {
        mirror: None,
        strict: true,
    });
    let err = asm.assemble(&stmts).unwrap_err();
    assert_eq!(err.line(), Some(2));
    assert_eq!(err.to_string(), "line 2: ADD takes 3 operand(s), got 2");
}

#[test]
fn unknown_mnemonic_aborts_the_run() {
    let stmts = vec![
        Statement::new(1, "MOVER", &["R0", "1"]),
        Statement::new(2, "JMP", &["3"]),
        Statement::new(3, "HALT", &[]),
    ];
    let err = Assembler::default().assemble(&stmts).unwrap_err();
    assert!(matches!(
        err,
        AsmError::Statement { line: 2, source: CodecError::UnknownMnemonic(ref m) } if m == "JMP"
    ));
    // Mnemonics are matched exactly.
    let err = Assembler::default()
        .assemble(&[Statement::new(7, "halt", &[])])
        .unwrap_err();
    assert_eq!(err.line(), Some(7));
}

#[test]
fn out_of_range_and_malformed_operands_are_skipped() {
    let stmts = vec![
        Statement::new(1, "MOVER", &["R4", "1"]),
        Statement::new(2, "MOVEM", &["R1", "16"]),
        Statement::new(3, "OUT", &["X1"]),
        Statement::new(4, "MOVER", &["R3", "15"]),
    ];
    let out = Assembler::default().assemble(&stmts).unwrap();
    assert_eq!(out.statements, 1);
    assert_eq!(out.image.bit_len(), 10);
    // 0000 11 1111
    assert_eq!(out.image.body(), &[0b0000_1111, 0b1100_0000]);

    let lines: Vec<Option<usize>> = out.skipped.iter().map(AsmError::line).collect();
    assert_eq!(lines, vec![Some(1), Some(2), Some(3)]);
    assert!(matches!(
        &out.skipped[0],
        AsmError::Statement {
            source: CodecError::Bits(BitError::Encoding { value: 4, width: 2 }),
            ..
        }
    ));
    assert!(matches!(
        &out.skipped[2],
        AsmError::Statement { source: CodecError::BadOperand(_), .. }
    ));
}

#[test]
fn empty_source_gives_an_empty_image() {
    let out = Assembler::default()
        .assemble(&Vec::<Statement>::new())
        .unwrap();
    assert_eq!(out.image.to_bytes(), vec![0, 0, 0, 0]);
}
