//! Opcode → shape tables for the primary map and the `0F` secondary page.
//!
//! Both tables are built at compile time from the declarative listings below. The decoder only
//! ever reads them; per-model legality is derived from them once per [`crate::Decoder`].

use crate::inst::{Operation, Repetition, Size, Source};
use crate::model::Model;

/// A byte that modifies the instruction that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Prefix {
    Segment(Source),
    Lock,
    Repetition(Repetition),
    AddressSize,
}

/// Where the shift/rotate group takes its count from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShiftCount {
    One,
    Cl,
    Immediate,
}

/// How the fields of a ModRM byte map onto operands for a given opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ModRmForm {
    /// `r/m, reg`.
    MemRegReg,
    /// `reg, r/m`.
    RegMemReg,
    /// `reg, r/m, imm` with an `immediate`-byte trailing immediate.
    RegMemRegImmediate { immediate: u8 },
    /// `Sreg, r/m16`.
    SegmentFromMemReg,
    /// `r/m16, Sreg`.
    MemRegFromSegment,
    /// Group 1: `ADD`..`CMP r/m, imm`.
    Arithmetic { immediate: u8 },
    /// Group 2: rotates and shifts.
    Shift(ShiftCount),
    /// Group 3: `TEST`/`NOT`/`NEG`/`MUL`/`IMUL`/`DIV`/`IDIV`.
    Unary,
    /// Group 4: byte `INC`/`DEC`.
    IncDec,
    /// Group 5: `INC`/`DEC`/`CALL`/`JMP`/`PUSH`.
    IncToPush,
    /// `POP r/m16`; `reg` must be zero.
    Pop,
    /// `MOV r/m, imm`; `reg` must be zero.
    MovImmediate,
    /// Coprocessor escape; `reg` is the coprocessor's business.
    Escape,
    /// `0F 00`: `SLDT`..`VERW`.
    LocalDescriptor,
    /// `0F 01`: `SGDT`/`LGDT`/`SMSW`/`LMSW`.
    GlobalDescriptor,
}

/// Everything the addressing phase needs to know about a ModRM-carrying opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ModRmShape {
    /// `Undefined` for groups, where `reg` picks the operation.
    pub operation: Operation,
    pub form: ModRmForm,
    pub size: Size,
    /// Register-direct `r/m` is illegal.
    pub memory_only: bool,
}

/// What follows an opcode and what it means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
    Undefined,
    Prefix(Prefix),
    /// `0F`: the next byte indexes the secondary table.
    Escape,
    /// Fully determined by the opcode.
    Complete {
        operation: Operation,
        source: Source,
        destination: Source,
        size: Size,
    },
    /// An `operand`-byte immediate follows; one of `source`/`destination` is `Immediate`.
    Immediate {
        operation: Operation,
        source: Source,
        destination: Source,
        size: Size,
        operand: u8,
    },
    /// `reg, [moffs16]`.
    RegisterAddress {
        operation: Operation,
        destination: Source,
        size: Size,
    },
    /// `[moffs16], reg`.
    AddressRegister {
        operation: Operation,
        source: Source,
        size: Size,
    },
    ModRm(ModRmShape),
    /// A signed `displacement`-byte branch offset follows.
    Relative {
        operation: Operation,
        displacement: u8,
    },
    /// `ptr16:16` follows.
    Far { operation: Operation },
    /// `ENTER iw, ib`.
    DisplacementOperand {
        operation: Operation,
        displacement: u8,
        operand: u8,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Entry {
    pub shape: Shape,
    /// Oldest model on which the opcode is legal.
    pub since: Model,
}

impl Entry {
    pub const UNDEFINED: Entry = Entry {
        shape: Shape::Undefined,
        since: Model::I8086,
    };

    const fn new(shape: Shape) -> Self {
        Self {
            shape,
            since: Model::I8086,
        }
    }

    const fn since(self, since: Model) -> Self {
        Self {
            shape: self.shape,
            since,
        }
    }

    pub fn is_legal_on(&self, model: Model) -> bool {
        !matches!(self.shape, Shape::Undefined) && model.at_least(self.since)
    }
}

const fn complete(operation: Operation, source: Source, destination: Source, size: Size) -> Entry {
    Entry::new(Shape::Complete {
        operation,
        source,
        destination,
        size,
    })
}

const fn immediate(
    operation: Operation,
    source: Source,
    destination: Source,
    size: Size,
    operand: u8,
) -> Entry {
    Entry::new(Shape::Immediate {
        operation,
        source,
        destination,
        size,
        operand,
    })
}

/// `reg, imm` with an immediate as wide as the operation.
const fn register_data(operation: Operation, destination: Source, size: Size) -> Entry {
    immediate(operation, Source::Immediate, destination, size, size.bytes())
}

const fn modrm(operation: Operation, form: ModRmForm, size: Size) -> Entry {
    Entry::new(Shape::ModRm(ModRmShape {
        operation,
        form,
        size,
        memory_only: false,
    }))
}

const fn modrm_memory(operation: Operation, form: ModRmForm, size: Size) -> Entry {
    Entry::new(Shape::ModRm(ModRmShape {
        operation,
        form,
        size,
        memory_only: true,
    }))
}

const fn group(form: ModRmForm, size: Size) -> Entry {
    modrm(Operation::Undefined, form, size)
}

const fn relative(operation: Operation, displacement: u8) -> Entry {
    Entry::new(Shape::Relative {
        operation,
        displacement,
    })
}

const fn prefix(prefix: Prefix) -> Entry {
    Entry::new(Shape::Prefix(prefix))
}

const ALU_BLOCKS: [Operation; 8] = [
    Operation::Add,
    Operation::Or,
    Operation::Adc,
    Operation::Sbb,
    Operation::And,
    Operation::Sub,
    Operation::Xor,
    Operation::Cmp,
];

const QUICK_REGISTER_BLOCKS: [(u8, Operation); 4] = [
    (0x40, Operation::Inc),
    (0x48, Operation::Dec),
    (0x50, Operation::Push),
    (0x58, Operation::Pop),
];

const fn build_primary() -> [Entry; 256] {
    use ModRmForm::*;
    use Operation as Op;
    use Size::*;
    use Source as S;

    let mut t = [Entry::UNDEFINED; 256];

    // Partial ALU blocks at 00, 08, .., 38.
    let mut block = 0;
    while block < ALU_BLOCKS.len() {
        let base = block * 8;
        let op = ALU_BLOCKS[block];
        t[base] = modrm(op, MemRegReg, Byte);
        t[base + 1] = modrm(op, MemRegReg, Word);
        t[base + 2] = modrm(op, RegMemReg, Byte);
        t[base + 3] = modrm(op, RegMemReg, Word);
        t[base + 4] = register_data(op, S::Ax, Byte);
        t[base + 5] = register_data(op, S::Ax, Word);
        block += 1;
    }

    // The gaps between the ALU blocks.
    t[0x06] = complete(Op::Push, S::Es, S::None, Word);
    t[0x07] = complete(Op::Pop, S::None, S::Es, Word);
    t[0x0e] = complete(Op::Push, S::Cs, S::None, Word);
    t[0x0f] = Entry::new(Shape::Escape).since(Model::I80286);
    t[0x16] = complete(Op::Push, S::Ss, S::None, Word);
    t[0x17] = complete(Op::Pop, S::None, S::Ss, Word);
    t[0x1e] = complete(Op::Push, S::Ds, S::None, Word);
    t[0x1f] = complete(Op::Pop, S::None, S::Ds, Word);
    t[0x26] = prefix(Prefix::Segment(S::Es));
    t[0x27] = complete(Op::Daa, S::Ax, S::Ax, Byte);
    t[0x2e] = prefix(Prefix::Segment(S::Cs));
    t[0x2f] = complete(Op::Das, S::Ax, S::Ax, Byte);
    t[0x36] = prefix(Prefix::Segment(S::Ss));
    t[0x37] = complete(Op::Aaa, S::Ax, S::Ax, Word);
    t[0x3e] = prefix(Prefix::Segment(S::Ds));
    t[0x3f] = complete(Op::Aas, S::Ax, S::Ax, Word);

    // Quick-register blocks.
    let mut block = 0;
    while block < QUICK_REGISTER_BLOCKS.len() {
        let (base, op) = QUICK_REGISTER_BLOCKS[block];
        let mut reg = 0;
        while reg < 8 {
            let r = S::WORD_REGISTERS[reg];
            let (source, destination) = match op {
                Op::Push => (r, S::None),
                Op::Pop => (S::None, r),
                _ => (r, r),
            };
            t[base as usize + reg] = complete(op, source, destination, Word);
            reg += 1;
        }
        block += 1;
    }

    t[0x60] = complete(Op::Pusha, S::None, S::None, Word).since(Model::I80186);
    t[0x61] = complete(Op::Popa, S::None, S::None, Word).since(Model::I80186);
    t[0x62] = modrm_memory(Op::Bound, RegMemReg, Word).since(Model::I80186);
    t[0x63] = modrm(Op::Arpl, MemRegReg, Word).since(Model::I80286);
    t[0x64] = prefix(Prefix::Segment(S::Fs)).since(Model::I80386);
    t[0x65] = prefix(Prefix::Segment(S::Gs)).since(Model::I80386);
    t[0x67] = prefix(Prefix::AddressSize).since(Model::I80386);
    t[0x68] = immediate(Op::Push, S::Immediate, S::None, Word, 2).since(Model::I80186);
    t[0x69] = modrm(Op::Imul, RegMemRegImmediate { immediate: 2 }, Word).since(Model::I80186);
    t[0x6a] = immediate(Op::Push, S::Immediate, S::None, Word, 1).since(Model::I80186);
    t[0x6b] = modrm(Op::Imul, RegMemRegImmediate { immediate: 1 }, Word).since(Model::I80186);
    t[0x6c] = complete(Op::Ins, S::None, S::None, Byte).since(Model::I80186);
    t[0x6d] = complete(Op::Ins, S::None, S::None, Word).since(Model::I80186);
    t[0x6e] = complete(Op::Outs, S::None, S::None, Byte).since(Model::I80186);
    t[0x6f] = complete(Op::Outs, S::None, S::None, Word).since(Model::I80186);

    let mut cc = 0;
    while cc < 16 {
        t[0x70 + cc] = relative(Op::CONDITIONAL_BRANCHES[cc], 1);
        cc += 1;
    }

    t[0x80] = group(Arithmetic { immediate: 1 }, Byte);
    t[0x81] = group(Arithmetic { immediate: 2 }, Word);
    t[0x82] = group(Arithmetic { immediate: 1 }, Byte);
    t[0x83] = group(Arithmetic { immediate: 1 }, Word);
    t[0x84] = modrm(Op::Test, MemRegReg, Byte);
    t[0x85] = modrm(Op::Test, MemRegReg, Word);
    t[0x86] = modrm(Op::Xchg, RegMemReg, Byte);
    t[0x87] = modrm(Op::Xchg, RegMemReg, Word);
    t[0x88] = modrm(Op::Mov, MemRegReg, Byte);
    t[0x89] = modrm(Op::Mov, MemRegReg, Word);
    t[0x8a] = modrm(Op::Mov, RegMemReg, Byte);
    t[0x8b] = modrm(Op::Mov, RegMemReg, Word);
    t[0x8c] = modrm(Op::Mov, MemRegFromSegment, Word);
    t[0x8d] = modrm_memory(Op::Lea, RegMemReg, Word);
    t[0x8e] = modrm(Op::Mov, SegmentFromMemReg, Word);
    t[0x8f] = modrm(Op::Pop, Pop, Word);

    t[0x90] = complete(Op::Nop, S::None, S::None, Implied);
    let mut reg = 1;
    while reg < 8 {
        t[0x90 + reg] = complete(Op::Xchg, S::Ax, S::WORD_REGISTERS[reg], Word);
        reg += 1;
    }

    t[0x98] = complete(Op::Cbw, S::Ax, S::Ah, Byte);
    t[0x99] = complete(Op::Cwd, S::Ax, S::Dx, Word);
    t[0x9a] = Entry::new(Shape::Far {
        operation: Op::CallFar,
    });
    t[0x9b] = complete(Op::Wait, S::None, S::None, Implied);
    t[0x9c] = complete(Op::Pushf, S::None, S::None, Word);
    t[0x9d] = complete(Op::Popf, S::None, S::None, Word);
    t[0x9e] = complete(Op::Sahf, S::None, S::None, Byte);
    t[0x9f] = complete(Op::Lahf, S::None, S::None, Byte);

    t[0xa0] = Entry::new(Shape::RegisterAddress {
        operation: Op::Mov,
        destination: S::Ax,
        size: Byte,
    });
    t[0xa1] = Entry::new(Shape::RegisterAddress {
        operation: Op::Mov,
        destination: S::Ax,
        size: Word,
    });
    t[0xa2] = Entry::new(Shape::AddressRegister {
        operation: Op::Mov,
        source: S::Ax,
        size: Byte,
    });
    t[0xa3] = Entry::new(Shape::AddressRegister {
        operation: Op::Mov,
        source: S::Ax,
        size: Word,
    });

    t[0xa4] = complete(Op::Movs, S::None, S::None, Byte);
    t[0xa5] = complete(Op::Movs, S::None, S::None, Word);
    t[0xa6] = complete(Op::Cmps, S::None, S::None, Byte);
    t[0xa7] = complete(Op::Cmps, S::None, S::None, Word);
    t[0xa8] = register_data(Op::Test, S::Ax, Byte);
    t[0xa9] = register_data(Op::Test, S::Ax, Word);
    t[0xaa] = complete(Op::Stos, S::None, S::None, Byte);
    t[0xab] = complete(Op::Stos, S::None, S::None, Word);
    t[0xac] = complete(Op::Lods, S::None, S::None, Byte);
    t[0xad] = complete(Op::Lods, S::None, S::None, Word);
    t[0xae] = complete(Op::Scas, S::None, S::None, Byte);
    t[0xaf] = complete(Op::Scas, S::None, S::None, Word);

    let mut reg = 0;
    while reg < 8 {
        t[0xb0 + reg] = register_data(Op::Mov, S::BYTE_REGISTERS[reg], Byte);
        t[0xb8 + reg] = register_data(Op::Mov, S::WORD_REGISTERS[reg], Word);
        reg += 1;
    }

    t[0xc0] = group(Shift(ShiftCount::Immediate), Byte).since(Model::I80186);
    t[0xc1] = group(Shift(ShiftCount::Immediate), Word).since(Model::I80186);
    t[0xc2] = immediate(Op::RetNear, S::Immediate, S::None, Word, 2);
    t[0xc3] = complete(Op::RetNear, S::None, S::None, Word);
    t[0xc4] = modrm_memory(Op::Les, RegMemReg, Word);
    t[0xc5] = modrm_memory(Op::Lds, RegMemReg, Word);
    t[0xc6] = group(MovImmediate, Byte);
    t[0xc7] = group(MovImmediate, Word);
    t[0xc8] = Entry::new(Shape::DisplacementOperand {
        operation: Op::Enter,
        displacement: 2,
        operand: 1,
    })
    .since(Model::I80186);
    t[0xc9] = complete(Op::Leave, S::None, S::None, Implied).since(Model::I80186);
    t[0xca] = immediate(Op::RetFar, S::Immediate, S::None, Word, 2);
    t[0xcb] = complete(Op::RetFar, S::None, S::None, DWord);
    t[0xcc] = complete(Op::Int3, S::None, S::None, Implied);
    t[0xcd] = immediate(Op::Int, S::Immediate, S::None, Byte, 1);
    t[0xce] = complete(Op::Into, S::None, S::None, Implied);
    t[0xcf] = complete(Op::Iret, S::None, S::None, Implied);

    t[0xd0] = group(Shift(ShiftCount::One), Byte);
    t[0xd1] = group(Shift(ShiftCount::One), Word);
    t[0xd2] = group(Shift(ShiftCount::Cl), Byte);
    t[0xd3] = group(Shift(ShiftCount::Cl), Word);
    t[0xd4] = register_data(Op::Aam, S::Ax, Byte);
    t[0xd5] = register_data(Op::Aad, S::Ax, Byte);
    t[0xd7] = complete(Op::Xlat, S::None, S::None, Byte);

    let mut esc = 0xd8;
    while esc <= 0xdf {
        t[esc] = modrm(Op::Esc, Escape, Implied);
        esc += 1;
    }

    t[0xe0] = relative(Op::Loopne, 1);
    t[0xe1] = relative(Op::Loope, 1);
    t[0xe2] = relative(Op::Loop, 1);
    t[0xe3] = relative(Op::Jcxz, 1);
    t[0xe4] = immediate(Op::In, S::Immediate, S::Ax, Byte, 1);
    t[0xe5] = immediate(Op::In, S::Immediate, S::Ax, Word, 1);
    t[0xe6] = immediate(Op::Out, S::Ax, S::Immediate, Byte, 1);
    t[0xe7] = immediate(Op::Out, S::Ax, S::Immediate, Word, 1);
    t[0xe8] = relative(Op::CallRel, 2);
    t[0xe9] = relative(Op::JmpRel, 2);
    t[0xea] = Entry::new(Shape::Far {
        operation: Op::JmpFar,
    });
    t[0xeb] = relative(Op::JmpRel, 1);
    t[0xec] = complete(Op::In, S::Dx, S::Ax, Byte);
    t[0xed] = complete(Op::In, S::Dx, S::Ax, Word);
    t[0xee] = complete(Op::Out, S::Ax, S::Dx, Byte);
    t[0xef] = complete(Op::Out, S::Ax, S::Dx, Word);

    t[0xf0] = prefix(Prefix::Lock);
    t[0xf2] = prefix(Prefix::Repetition(Repetition::RepNE));
    t[0xf3] = prefix(Prefix::Repetition(Repetition::RepE));
    t[0xf4] = complete(Op::Hlt, S::None, S::None, Implied);
    t[0xf5] = complete(Op::Cmc, S::None, S::None, Implied);
    t[0xf6] = group(Unary, Byte);
    t[0xf7] = group(Unary, Word);
    t[0xf8] = complete(Op::Clc, S::None, S::None, Implied);
    t[0xf9] = complete(Op::Stc, S::None, S::None, Implied);
    t[0xfa] = complete(Op::Cli, S::None, S::None, Implied);
    t[0xfb] = complete(Op::Sti, S::None, S::None, Implied);
    t[0xfc] = complete(Op::Cld, S::None, S::None, Implied);
    t[0xfd] = complete(Op::Std, S::None, S::None, Implied);
    t[0xfe] = group(IncDec, Byte);
    t[0xff] = group(IncToPush, Word);

    t
}

const fn build_secondary() -> [Entry; 256] {
    use ModRmForm::*;
    use Operation as Op;
    use Size::*;
    use Source as S;

    let mut t = [Entry::UNDEFINED; 256];
    t[0x00] = group(LocalDescriptor, Word).since(Model::I80286);
    t[0x01] = group(GlobalDescriptor, Word).since(Model::I80286);
    t[0x02] = modrm(Op::Lar, RegMemReg, Word).since(Model::I80286);
    t[0x03] = modrm(Op::Lsl, RegMemReg, Word).since(Model::I80286);
    t[0x05] = complete(Op::Loadall, S::None, S::None, Implied).since(Model::I80286);
    t[0x06] = complete(Op::Clts, S::None, S::None, Implied).since(Model::I80286);
    t
}

static PRIMARY: [Entry; 256] = build_primary();
static SECONDARY: [Entry; 256] = build_secondary();

/// Shape of a first opcode byte.
pub(crate) fn primary(opcode: u8) -> &'static Entry {
    &PRIMARY[usize::from(opcode)]
}

/// Shape of the byte following `0F`.
pub(crate) fn secondary(opcode: u8) -> &'static Entry {
    &SECONDARY[usize::from(opcode)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alu_blocks_share_one_layout() {
        for (block, op) in ALU_BLOCKS.iter().copied().enumerate() {
            let base = (block * 8) as u8;
            let expect = [
                (ModRmForm::MemRegReg, Size::Byte),
                (ModRmForm::MemRegReg, Size::Word),
                (ModRmForm::RegMemReg, Size::Byte),
                (ModRmForm::RegMemReg, Size::Word),
            ];
            for (i, (form, size)) in expect.into_iter().enumerate() {
                match primary(base + i as u8).shape {
                    Shape::ModRm(shape) => {
                        assert_eq!(shape.operation, op);
                        assert_eq!(shape.form, form);
                        assert_eq!(shape.size, size);
                    }
                    other => panic!("{:#04x}: unexpected shape {other:?}", base + i as u8),
                }
            }
            assert_eq!(
                primary(base + 4).shape,
                Shape::Immediate {
                    operation: op,
                    source: Source::Immediate,
                    destination: Source::Ax,
                    size: Size::Byte,
                    operand: 1,
                }
            );
            assert_eq!(
                primary(base + 5).shape,
                Shape::Immediate {
                    operation: op,
                    source: Source::Immediate,
                    destination: Source::Ax,
                    size: Size::Word,
                    operand: 2,
                }
            );
        }
    }

    #[test]
    fn quick_register_blocks_follow_encoding_order() {
        for reg in 0..8u8 {
            let r = Source::WORD_REGISTERS[usize::from(reg)];
            assert_eq!(
                primary(0x40 + reg).shape,
                Shape::Complete {
                    operation: Operation::Inc,
                    source: r,
                    destination: r,
                    size: Size::Word,
                }
            );
            assert_eq!(
                primary(0x50 + reg).shape,
                Shape::Complete {
                    operation: Operation::Push,
                    source: r,
                    destination: Source::None,
                    size: Size::Word,
                }
            );
            assert_eq!(
                primary(0x58 + reg).shape,
                Shape::Complete {
                    operation: Operation::Pop,
                    source: Source::None,
                    destination: r,
                    size: Size::Word,
                }
            );
        }
    }

    #[test]
    fn conditional_branches_take_one_byte() {
        for cc in 0..16u8 {
            assert_eq!(
                primary(0x70 + cc).shape,
                Shape::Relative {
                    operation: Operation::CONDITIONAL_BRANCHES[usize::from(cc)],
                    displacement: 1,
                }
            );
        }
        assert_eq!(
            primary(0x74).shape,
            Shape::Relative {
                operation: Operation::Je,
                displacement: 1
            }
        );
    }

    #[test]
    fn unmapped_primary_opcodes() {
        let undefined: Vec<u8> = (0..=255u8)
            .filter(|&b| primary(b).shape == Shape::Undefined)
            .collect();
        assert_eq!(undefined, vec![0x66, 0xd6, 0xf1]);
    }

    #[test]
    fn minimum_models() {
        assert_eq!(primary(0x00).since, Model::I8086);
        assert_eq!(primary(0x60).since, Model::I80186);
        assert_eq!(primary(0x61).since, Model::I80186);
        assert_eq!(primary(0x62).since, Model::I80186);
        assert_eq!(primary(0x63).since, Model::I80286);
        assert_eq!(primary(0x0f).since, Model::I80286);
        assert_eq!(primary(0x64).since, Model::I80386);
        assert_eq!(primary(0x67).since, Model::I80386);

        assert!(!primary(0x63).is_legal_on(Model::I80186));
        assert!(primary(0x63).is_legal_on(Model::I80286));
        assert!(primary(0x63).is_legal_on(Model::I80386));
        assert!(!primary(0x66).is_legal_on(Model::I80386));
    }

    #[test]
    fn secondary_page_is_small() {
        let mapped: Vec<u8> = (0..=255u8)
            .filter(|&b| secondary(b).shape != Shape::Undefined)
            .collect();
        assert_eq!(mapped, vec![0x00, 0x01, 0x02, 0x03, 0x05, 0x06]);
        assert!((0..=255u8)
            .filter(|&b| secondary(b).shape != Shape::Undefined)
            .all(|b| secondary(b).since == Model::I80286));
    }

    #[test]
    fn memory_only_opcodes() {
        for opcode in [0x62u8, 0x8d, 0xc4, 0xc5] {
            match primary(opcode).shape {
                Shape::ModRm(shape) => assert!(shape.memory_only, "{opcode:#04x}"),
                other => panic!("{opcode:#04x}: unexpected shape {other:?}"),
            }
        }
    }
}
