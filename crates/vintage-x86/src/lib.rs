//! Incremental decoder for 16-bit x86 machine code, 8086 through 80386.
//!
//! Bytes can be fed to a [`Decoder`] in fragments of any size; it resumes where the previous call
//! stopped and reports an instruction together with its total length once the last byte
//! arrives. The set of legal opcodes follows the [`Model`] the decoder was created for.
//!
//! ```
//! use vintage_x86::{DecodeResult, Decoder, Model, Operation, Source};
//!
//! let mut decoder = Decoder::new(Model::I8086);
//! assert_eq!(decoder.decode(&[0xb8, 0x34]), DecodeResult::NeedMore { at_least: 1 });
//!
//! let DecodeResult::Complete { length, instruction } = decoder.decode(&[0x12]) else {
//!     panic!("mov ax, imm16 is three bytes");
//! };
//! assert_eq!(length, 3);
//! assert_eq!(instruction.operation(), Operation::Mov);
//! assert_eq!(instruction.destination(), Source::Ax);
//! assert_eq!(instruction.operand(), 0x1234);
//! assert_eq!(instruction.to_string(), "mov ax, 0x1234");
//! ```

#![forbid(unsafe_code)]

mod decoder;
mod fmt;
mod gate;
mod inst;
mod model;
mod modrm;
mod opcode_tables;

pub use decoder::{decode_one, DecodeResult, Decoder, MAX_INST_LEN};
pub use inst::{
    AddressSize, Instruction, Operation, Repetition, ScaleIndexBase, Size, Source,
};
pub use model::{Model, ParseModelError};
pub use modrm::ModRm;
