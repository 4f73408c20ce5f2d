use bitcpu::bits::{BitReader, BitWriter};
use bitcpu::instructions::{OperandKind, TABLE};
use bitcpu::{BitError, BitRead, CodecError, Instruction, InstructionCodec, Op, Operand};
use pretty_assertions::assert_eq;

fn widest(kind: OperandKind) -> Operand {
    match kind {
        OperandKind::Reg => Operand::Reg(3),
        OperandKind::Addr => Operand::Addr(15),
    }
}

#[test]
fn every_opcode_decodes_back_with_maximal_operands() {
    let codec = InstructionCodec::new();
    let program: Vec<Instruction> = TABLE
        .iter()
        .map(|d| Instruction::new(d.op, d.operands.iter().map(|&k| widest(k)).collect()).unwrap())
        .collect();

    let mut body = Vec::new();
    let mut w = BitWriter::new(&mut body);
    let mut expected_bits = 0u64;
    for instr in &program {
        expected_bits += u64::from(codec.encode(instr, &mut w).unwrap());
    }
    assert_eq!(w.finish().unwrap().bits, expected_bits);
    // 10 + 10 + 12 + 12 + 4 + 6 + 6
    assert_eq!(expected_bits, 60);

    let mut r = BitReader::new(body.as_slice());
    for instr in &program {
        let start = r.position();
        assert_eq!(&codec.decode(&mut r).unwrap(), instr);
        assert_eq!(r.position() - start, u64::from(instr.encoded_width()));
    }
}

#[test]
fn operands_one_past_the_field_width_are_rejected() {
    let codec = InstructionCodec::new();
    let cases = [
        (Op::Mover, vec![Operand::Reg(4), Operand::Addr(0)], 4, 2),
        (Op::Movem, vec![Operand::Reg(0), Operand::Addr(16)], 16, 4),
        (Op::Out, vec![Operand::Reg(200)], 200, 2),
    ];
    for (op, operands, value, width) in cases {
        let instr = Instruction::new(op, operands).unwrap();
        let mut body = Vec::new();
        let mut w = BitWriter::new(&mut body);
        let err = codec.encode(&instr, &mut w).unwrap_err();
        assert!(
            matches!(err, CodecError::Bits(BitError::Encoding { value: v, width: wd }) if v == value && wd == width),
            "{op:?}: {err}"
        );
        assert_eq!(w.bits_written(), 0);
    }
}

#[test]
fn instruction_shape_follows_the_table() {
    assert!(matches!(
        Instruction::new(Op::Halt, vec![Operand::Reg(0)]),
        Err(CodecError::OperandCount { mnemonic: "HALT", expected: 0, got: 1 })
    ));
    assert!(matches!(
        Instruction::new(Op::Sub, vec![Operand::Reg(0), Operand::Addr(1), Operand::Addr(2)]),
        Err(CodecError::OperandKind { mnemonic: "SUB", index: 1, .. })
    ));
}

#[test]
fn decode_in_r3() {
    // IN R3: 0101 11
    let bytes = [0b0101_1100u8];
    let instr = InstructionCodec::new()
        .decode(&mut BitReader::new(&bytes[..]))
        .unwrap();
    assert_eq!(instr.op(), Op::In);
    assert_eq!(instr.operands(), &[Operand::Reg(3)]);
}
