use core::fmt;

use tracing::{debug, trace};

use crate::gate::Legality;
use crate::inst::{AddressSize, Instruction, Size, Source};
use crate::model::Model;
use crate::modrm::{self, ModRm};
use crate::opcode_tables::{self, ModRmShape, Prefix, Shape};

/// Longest encoding accepted, prefixes included; a prefix run that leaves no room for an opcode
/// within it is rejected as undefined.
pub const MAX_INST_LEN: usize = 15;

/// Where the decoder is within the instruction it is assembling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Awaiting an opcode or prefix.
    Instruction,
    /// `0F` seen; awaiting the secondary opcode.
    SecondaryPage,
    ModRegRm,
    /// 32-bit addressing placeholder: the SIB byte is consumed but not interpreted.
    ScaleIndexBase,
    DisplacementOrOperand,
    ReadyToPost,
}

/// Outcome of one [`Decoder::decode`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeResult {
    /// An instruction (or the undefined sentinel) ended within the supplied bytes.
    ///
    /// `length` counts every byte of the instruction, including bytes supplied by earlier calls
    /// that returned [`DecodeResult::NeedMore`].
    Complete {
        length: usize,
        instruction: Instruction,
    },
    /// All supplied bytes were absorbed; at least `at_least` more are needed (0 if unknown).
    NeedMore { at_least: usize },
}

impl DecodeResult {
    /// Signed form of the result: the instruction length when complete, otherwise the negated
    /// lower bound on the bytes still required.
    #[must_use]
    pub fn count(&self) -> isize {
        match *self {
            DecodeResult::Complete { length, .. } => length as isize,
            DecodeResult::NeedMore { at_least } => -(at_least as isize),
        }
    }

    #[must_use]
    pub fn instruction(&self) -> Option<&Instruction> {
        match self {
            DecodeResult::Complete { instruction, .. } => Some(instruction),
            DecodeResult::NeedMore { .. } => None,
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, DecodeResult::Complete { .. })
    }
}

impl fmt::Display for DecodeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeResult::Complete {
                length,
                instruction,
            } => write!(f, "{instruction} ({length} bytes)"),
            DecodeResult::NeedMore { at_least: 0 } => f.write_str("incomplete"),
            DecodeResult::NeedMore { at_least } => write!(f, "incomplete, need {at_least} more"),
        }
    }
}

/// Incremental decoder for one instruction stream.
///
/// Bytes may be supplied in arbitrarily small pieces; the decoder keeps whatever partial
/// instruction it has assembled between calls and never re-reads consumed bytes. Each call
/// returns at the first instruction boundary it reaches, so unconsumed input must be offered
/// again.
#[derive(Debug, Clone)]
pub struct Decoder {
    model: Model,
    legality: Legality,
    phase: Phase,
    instruction: Instruction,
    modrm_shape: Option<ModRmShape>,
    /// Opcode of the instruction in progress, `0F`-page opcodes as `0x0Fxx`.
    opcode: u16,
    consumed: usize,
    /// Trailing bytes, each new byte entering at the top.
    inward: u64,
    displacement_size: u8,
    operand_size: u8,
    trailing_received: u8,
}

impl Decoder {
    #[must_use]
    pub fn new(model: Model) -> Self {
        debug!(%model, "creating x86 decoder");
        Self {
            model,
            legality: Legality::for_model(model),
            phase: Phase::Instruction,
            instruction: Instruction::default(),
            modrm_shape: None,
            opcode: 0,
            consumed: 0,
            inward: 0,
            displacement_size: 0,
            operand_size: 0,
            trailing_received: 0,
        }
    }

    #[must_use]
    pub fn model(&self) -> Model {
        self.model
    }

    /// True between instructions, i.e. no partial instruction is pending.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Instruction && self.consumed == 0
    }

    /// Drops any partial instruction.
    pub fn reset(&mut self) {
        self.phase = Phase::Instruction;
        self.instruction = Instruction::default();
        self.modrm_shape = None;
        self.opcode = 0;
        self.consumed = 0;
        self.inward = 0;
        self.displacement_size = 0;
        self.operand_size = 0;
        self.trailing_received = 0;
    }

    /// Whether `opcode` starts a legal instruction or prefix on this decoder's model.
    #[must_use]
    pub fn is_legal(&self, opcode: u8) -> bool {
        self.legality.primary(opcode)
    }

    /// Whether `0F opcode` is legal on this decoder's model.
    #[must_use]
    pub fn is_legal_secondary(&self, opcode: u8) -> bool {
        self.legality.secondary(opcode)
    }

    /// Consumes bytes from `bytes` until an instruction completes or the input runs out.
    pub fn decode(&mut self, bytes: &[u8]) -> DecodeResult {
        let mut rest = bytes;

        while self.phase == Phase::Instruction {
            let Some((&byte, tail)) = rest.split_first() else {
                break;
            };
            rest = tail;
            self.consumed += 1;
            self.opcode = u16::from(byte);

            if !self.legality.primary(byte) {
                return self.undefined();
            }
            match opcode_tables::primary(byte).shape {
                Shape::Prefix(prefix) => {
                    if self.consumed >= MAX_INST_LEN {
                        return self.undefined();
                    }
                    self.apply_prefix(prefix);
                }
                Shape::Escape => self.phase = Phase::SecondaryPage,
                shape => {
                    if !self.begin(shape) {
                        return self.undefined();
                    }
                }
            }
        }

        if self.phase == Phase::SecondaryPage {
            if let Some((&byte, tail)) = rest.split_first() {
                rest = tail;
                self.consumed += 1;
                self.opcode = 0x0f00 | u16::from(byte);

                if !self.legality.secondary(byte) {
                    return self.undefined();
                }
                let shape = opcode_tables::secondary(byte).shape;
                if matches!(shape, Shape::Prefix(_) | Shape::Escape) || !self.begin(shape) {
                    return self.undefined();
                }
            }
        }

        if self.phase == Phase::ModRegRm {
            if let Some((&byte, tail)) = rest.split_first() {
                rest = tail;
                self.consumed += 1;

                let modrm = ModRm::from_byte(byte);
                let Some(shape) = self.modrm_shape.take() else {
                    return self.undefined();
                };
                let Some(resolution) = modrm::resolve(modrm, shape, self.model) else {
                    return self.undefined();
                };

                self.instruction.operation = resolution.operation;
                self.instruction.source = resolution.source;
                self.instruction.destination = resolution.destination;
                self.instruction.operation_size = resolution.operation_size;
                self.instruction.sib = resolution.sib;
                if let Some(operand) = resolution.operand {
                    self.instruction.operand = operand;
                }
                self.displacement_size = resolution.displacement_size;
                self.operand_size = resolution.operand_size;

                self.phase = if self.instruction.address_size == AddressSize::Bits32
                    && !modrm.is_register()
                    && modrm.rm == 4
                {
                    Phase::ScaleIndexBase
                } else {
                    self.trailing_phase()
                };
            }
        }

        if self.phase == Phase::ScaleIndexBase {
            if let Some((_, tail)) = rest.split_first() {
                rest = tail;
                self.consumed += 1;
                self.phase = self.trailing_phase();
            }
        }

        if self.phase == Phase::DisplacementOrOperand {
            let required = self.displacement_size + self.operand_size;
            let outstanding = usize::from(required - self.trailing_received);
            let take = outstanding.min(rest.len());
            for &byte in &rest[..take] {
                self.inward = (self.inward >> 8) | (u64::from(byte) << 56);
            }
            self.consumed += take;
            // `take` is bounded by `outstanding`, which fits in a u8.
            self.trailing_received += take as u8;

            if take < outstanding {
                return DecodeResult::NeedMore {
                    at_least: outstanding - take,
                };
            }
            self.peel_trailing();
            self.phase = Phase::ReadyToPost;
        }

        if self.phase == Phase::ReadyToPost {
            return self.post();
        }

        DecodeResult::NeedMore {
            at_least: usize::from(self.consumed != 0),
        }
    }

    fn apply_prefix(&mut self, prefix: Prefix) {
        trace!(?prefix, "prefix");
        match prefix {
            Prefix::Segment(segment) => self.instruction.segment_override = Some(segment),
            Prefix::Lock => self.instruction.lock = true,
            Prefix::Repetition(repetition) => self.instruction.repetition = repetition,
            Prefix::AddressSize => self.instruction.address_size = AddressSize::Bits32,
        }
    }

    /// Moves into whatever phase follows `shape`'s opcode. False for shapes that cannot start an
    /// instruction.
    fn begin(&mut self, shape: Shape) -> bool {
        let inst = &mut self.instruction;
        match shape {
            Shape::Complete {
                operation,
                source,
                destination,
                size,
            } => {
                inst.operation = operation;
                inst.source = source;
                inst.destination = destination;
                inst.operation_size = size;
                self.phase = Phase::ReadyToPost;
            }
            Shape::Immediate {
                operation,
                source,
                destination,
                size,
                operand,
            } => {
                inst.operation = operation;
                inst.source = source;
                inst.destination = destination;
                inst.operation_size = size;
                self.operand_size = operand;
                self.phase = Phase::DisplacementOrOperand;
            }
            Shape::RegisterAddress {
                operation,
                destination,
                size,
            } => {
                inst.operation = operation;
                inst.source = Source::DirectAddress;
                inst.destination = destination;
                inst.operation_size = size;
                self.displacement_size = 2;
                self.phase = Phase::DisplacementOrOperand;
            }
            Shape::AddressRegister {
                operation,
                source,
                size,
            } => {
                inst.operation = operation;
                inst.source = source;
                inst.destination = Source::DirectAddress;
                inst.operation_size = size;
                self.displacement_size = 2;
                self.phase = Phase::DisplacementOrOperand;
            }
            Shape::ModRm(modrm_shape) => {
                inst.operation = modrm_shape.operation;
                inst.operation_size = modrm_shape.size;
                self.modrm_shape = Some(modrm_shape);
                self.phase = Phase::ModRegRm;
            }
            Shape::Relative {
                operation,
                displacement,
            } => {
                inst.operation = operation;
                self.displacement_size = displacement;
                self.phase = Phase::DisplacementOrOperand;
            }
            Shape::Far { operation } => {
                inst.operation = operation;
                inst.source = Source::Immediate;
                self.operand_size = 4;
                self.phase = Phase::DisplacementOrOperand;
            }
            Shape::DisplacementOperand {
                operation,
                displacement,
                operand,
            } => {
                inst.operation = operation;
                inst.source = Source::Immediate;
                self.displacement_size = displacement;
                self.operand_size = operand;
                self.phase = Phase::DisplacementOrOperand;
            }
            Shape::Undefined | Shape::Prefix(_) | Shape::Escape => return false,
        }
        true
    }

    fn trailing_phase(&self) -> Phase {
        if self.displacement_size + self.operand_size > 0 {
            Phase::DisplacementOrOperand
        } else {
            Phase::ReadyToPost
        }
    }

    /// Splits the accumulated trailing bytes into operand (last in the stream) and displacement
    /// (first in the stream).
    fn peel_trailing(&mut self) {
        let mut data = self.inward;
        let mut displacement_size = self.displacement_size;
        let operation = self.instruction.operation;

        match self.operand_size {
            0 => {}
            1 => {
                let byte = (data >> 56) as u8;
                data <<= 8;
                self.instruction.operand = if self.instruction.operation_size == Size::Word
                    && !operation.is_port_io()
                    && !operation.is_shift()
                {
                    i16::from(byte as i8) as u16
                } else {
                    u16::from(byte)
                };
            }
            2 => {
                self.instruction.operand = (data >> 48) as u16;
                data <<= 16;
            }
            4 => {
                // ptr16:16; the segment arrives last.
                self.instruction.operand = (data >> 48) as u16;
                data <<= 16;
                displacement_size = 2;
            }
            other => debug_assert!(false, "operand size {other}"),
        }

        match displacement_size {
            0 => {}
            1 => self.instruction.displacement = i16::from((data >> 56) as u8 as i8),
            2 => self.instruction.displacement = (data >> 48) as u16 as i16,
            other => debug_assert!(false, "displacement size {other}"),
        }
    }

    fn post(&mut self) -> DecodeResult {
        let result = DecodeResult::Complete {
            length: self.consumed,
            instruction: self.instruction,
        };
        trace!(length = self.consumed, operation = ?self.instruction.operation, "decoded");
        self.reset();
        result
    }

    fn undefined(&mut self) -> DecodeResult {
        trace!(
            opcode = self.opcode,
            consumed = self.consumed,
            model = %self.model,
            "undefined encoding"
        );
        let result = DecodeResult::Complete {
            length: self.consumed,
            instruction: Instruction::default(),
        };
        self.reset();
        result
    }
}

/// Decodes a single instruction from the start of `bytes` with a fresh decoder.
#[must_use]
pub fn decode_one(model: Model, bytes: &[u8]) -> DecodeResult {
    Decoder::new(model).decode(bytes)
}
