//! ModRM byte decoding for 16-bit addressing.

use crate::inst::{Operation, ScaleIndexBase, Size, Source};
use crate::model::Model;
use crate::opcode_tables::{ModRmForm, ModRmShape, ShiftCount};

/// The three fields of a ModRM byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModRm {
    pub mode: u8,
    pub reg: u8,
    pub rm: u8,
}

impl ModRm {
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        Self {
            mode: byte >> 6,
            reg: (byte >> 3) & 7,
            rm: byte & 7,
        }
    }

    #[must_use]
    pub const fn is_register(self) -> bool {
        self.mode == 3
    }
}

const RM_TABLE: [ScaleIndexBase; 8] = [
    ScaleIndexBase::new(Source::Bx, Source::Si),
    ScaleIndexBase::new(Source::Bx, Source::Di),
    ScaleIndexBase::new(Source::Bp, Source::Si),
    ScaleIndexBase::new(Source::Bp, Source::Di),
    ScaleIndexBase::new(Source::None, Source::Si),
    ScaleIndexBase::new(Source::None, Source::Di),
    ScaleIndexBase::new(Source::None, Source::Bp),
    ScaleIndexBase::new(Source::None, Source::Bx),
];

/// The `r/m` half of a ModRM byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MemReg {
    pub source: Source,
    pub sib: ScaleIndexBase,
    pub displacement_size: u8,
}

pub(crate) const fn mem_reg(modrm: ModRm, size: Size) -> MemReg {
    match modrm.mode {
        3 => MemReg {
            source: register(size, modrm.rm),
            sib: ScaleIndexBase::NONE,
            displacement_size: 0,
        },
        0 if modrm.rm == 6 => MemReg {
            source: Source::DirectAddress,
            sib: ScaleIndexBase::NONE,
            displacement_size: 2,
        },
        mode => MemReg {
            source: Source::Indirect,
            sib: RM_TABLE[modrm.rm as usize],
            // mode 0 → none, 1 → disp8, 2 → disp16
            displacement_size: mode,
        },
    }
}

/// General register `index` at `size`; nothing for implied-size operations.
pub(crate) const fn register(size: Size, index: u8) -> Source {
    match size {
        Size::Implied => Source::None,
        Size::Byte => Source::BYTE_REGISTERS[(index & 7) as usize],
        Size::Word | Size::DWord => Source::WORD_REGISTERS[(index & 7) as usize],
    }
}

/// Segment register named by a `reg` field; FS and GS exist from the 80386 on.
pub(crate) const fn segment(index: u8, model: Model) -> Option<Source> {
    match index {
        0..=3 => Some(Source::SEGMENT_REGISTERS[index as usize]),
        4 | 5 if model.at_least(Model::I80386) => Some(Source::SEGMENT_REGISTERS[index as usize]),
        _ => None,
    }
}

/// Everything a ModRM byte contributes to the instruction being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Resolution {
    pub operation: Operation,
    pub source: Source,
    pub destination: Source,
    pub operation_size: Size,
    pub sib: ScaleIndexBase,
    pub displacement_size: u8,
    pub operand_size: u8,
    /// Operand fixed by the encoding rather than read from the stream.
    pub operand: Option<u16>,
}

const ARITHMETIC: [Operation; 8] = [
    Operation::Add,
    Operation::Or,
    Operation::Adc,
    Operation::Sbb,
    Operation::And,
    Operation::Sub,
    Operation::Xor,
    Operation::Cmp,
];

const SHIFTS: [Option<Operation>; 8] = [
    Some(Operation::Rol),
    Some(Operation::Ror),
    Some(Operation::Rcl),
    Some(Operation::Rcr),
    Some(Operation::Sal),
    Some(Operation::Shr),
    None,
    Some(Operation::Sar),
];

const UNARY: [Option<Operation>; 8] = [
    Some(Operation::Test),
    None,
    Some(Operation::Not),
    Some(Operation::Neg),
    Some(Operation::Mul),
    Some(Operation::Imul),
    Some(Operation::Div),
    Some(Operation::Idiv),
];

const LOCAL_DESCRIPTOR: [Option<Operation>; 8] = [
    Some(Operation::Sldt),
    Some(Operation::Str),
    Some(Operation::Lldt),
    Some(Operation::Ltr),
    Some(Operation::Verr),
    Some(Operation::Verw),
    None,
    None,
];

/// Resolves `modrm` against the shape of the opcode that preceded it.
///
/// Returns `None` when the combination is undefined: an unused group slot, a register operand
/// where only memory is allowed, or a segment register the model does not have.
pub(crate) fn resolve(modrm: ModRm, shape: ModRmShape, model: Model) -> Option<Resolution> {
    if shape.memory_only && modrm.is_register() {
        return None;
    }

    let memreg = mem_reg(modrm, shape.size);
    let reg = register(shape.size, modrm.reg);
    let mut out = Resolution {
        operation: shape.operation,
        source: Source::None,
        destination: Source::None,
        operation_size: shape.size,
        sib: memreg.sib,
        displacement_size: memreg.displacement_size,
        operand_size: 0,
        operand: None,
    };

    match shape.form {
        ModRmForm::MemRegReg => {
            out.source = reg;
            out.destination = memreg.source;
        }
        ModRmForm::RegMemReg => {
            out.source = memreg.source;
            out.destination = reg;
        }
        ModRmForm::RegMemRegImmediate { immediate } => {
            out.source = memreg.source;
            out.destination = reg;
            out.operand_size = immediate;
        }
        ModRmForm::SegmentFromMemReg => {
            out.source = memreg.source;
            out.destination = segment(modrm.reg, model)?;
        }
        ModRmForm::MemRegFromSegment => {
            out.source = segment(modrm.reg, model)?;
            out.destination = memreg.source;
        }
        ModRmForm::Arithmetic { immediate } => {
            out.operation = ARITHMETIC[usize::from(modrm.reg)];
            out.source = Source::Immediate;
            out.destination = memreg.source;
            out.operand_size = immediate;
        }
        ModRmForm::Shift(count) => {
            out.operation = SHIFTS[usize::from(modrm.reg)]?;
            out.destination = memreg.source;
            match count {
                ShiftCount::One => {
                    out.source = Source::Immediate;
                    out.operand = Some(1);
                }
                ShiftCount::Cl => out.source = Source::Cx,
                ShiftCount::Immediate => {
                    out.source = Source::Immediate;
                    out.operand_size = 1;
                }
            }
        }
        ModRmForm::Unary => {
            let operation = UNARY[usize::from(modrm.reg)]?;
            out.operation = operation;
            match operation {
                Operation::Test => {
                    out.source = Source::Immediate;
                    out.destination = memreg.source;
                    out.operand_size = shape.size.bytes();
                }
                // The accumulator is implied.
                Operation::Mul | Operation::Imul | Operation::Div | Operation::Idiv => {
                    out.source = memreg.source;
                }
                _ => {
                    out.source = memreg.source;
                    out.destination = memreg.source;
                }
            }
        }
        ModRmForm::IncDec => {
            out.operation = match modrm.reg {
                0 => Operation::Inc,
                1 => Operation::Dec,
                _ => return None,
            };
            out.source = memreg.source;
            out.destination = memreg.source;
        }
        ModRmForm::IncToPush => match modrm.reg {
            0 | 1 => {
                out.operation = if modrm.reg == 0 {
                    Operation::Inc
                } else {
                    Operation::Dec
                };
                out.source = memreg.source;
                out.destination = memreg.source;
            }
            2 | 4 | 6 => {
                out.operation = match modrm.reg {
                    2 => Operation::CallNear,
                    4 => Operation::JmpNear,
                    _ => Operation::Push,
                };
                out.source = memreg.source;
            }
            3 | 5 => {
                if modrm.is_register() {
                    return None;
                }
                out.operation = if modrm.reg == 3 {
                    Operation::CallFar
                } else {
                    Operation::JmpFar
                };
                out.source = memreg.source;
                out.operation_size = Size::DWord;
            }
            _ => return None,
        },
        ModRmForm::Pop => {
            if modrm.reg != 0 {
                return None;
            }
            out.operation = Operation::Pop;
            out.destination = memreg.source;
        }
        ModRmForm::MovImmediate => {
            if modrm.reg != 0 {
                return None;
            }
            out.operation = Operation::Mov;
            out.source = Source::Immediate;
            out.destination = memreg.source;
            out.operand_size = shape.size.bytes();
        }
        ModRmForm::Escape => {
            out.destination = memreg.source;
        }
        ModRmForm::LocalDescriptor => {
            out.operation = LOCAL_DESCRIPTOR[usize::from(modrm.reg)]?;
            out.source = memreg.source;
            out.destination = memreg.source;
        }
        ModRmForm::GlobalDescriptor => {
            out.operation = match modrm.reg {
                0 | 2 if modrm.is_register() => return None,
                0 => Operation::Sgdt,
                2 => Operation::Lgdt,
                4 => Operation::Smsw,
                6 => Operation::Lmsw,
                _ => return None,
            };
            out.source = memreg.source;
            out.destination = memreg.source;
        }
    }

    Some(out)
}
