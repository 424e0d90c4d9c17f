// Shared test helpers (integration tests compile as separate crates, so put
// common code in a submodule to avoid it becoming its own test target).
#![allow(dead_code)]

use vintage_x86::{DecodeResult, Decoder, Instruction, Model};

/// Tiny deterministic PRNG for test input generation.
pub struct XorShift64(pub u64);

impl XorShift64 {
    pub fn next_u64(&mut self) -> u64 {
        // xorshift64*
        let mut x = self.0;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.0 = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    pub fn fill(&mut self, buf: &mut [u8]) {
        for chunk in buf.chunks_mut(8) {
            let v = self.next_u64().to_le_bytes();
            let n = chunk.len();
            chunk.copy_from_slice(&v[..n]);
        }
    }
}

/// Instructions decoded from a stream, plus the bytes of a trailing partial instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub instructions: Vec<(usize, Instruction)>,
    pub pending: usize,
}

/// Streams `bytes` through one decoder, offering at most `chunk` bytes per call and re-offering
/// whatever a completed call left unconsumed.
pub fn decode_in_chunks(model: Model, bytes: &[u8], chunk: usize) -> Decoded {
    assert!(chunk > 0);
    let mut decoder = Decoder::new(model);
    let mut instructions = Vec::new();
    let mut pos = 0;
    let mut carried = 0;

    while pos < bytes.len() {
        let end = pos.saturating_add(chunk).min(bytes.len());
        match decoder.decode(&bytes[pos..end]) {
            DecodeResult::Complete {
                length,
                instruction,
            } => {
                assert!(
                    length > carried,
                    "completion consumed nothing new: length={length} carried={carried}"
                );
                pos += length - carried;
                carried = 0;
                instructions.push((length, instruction));
            }
            DecodeResult::NeedMore { .. } => {
                carried += end - pos;
                pos = end;
            }
        }
    }

    Decoded {
        instructions,
        pending: carried,
    }
}

/// Decodes one complete instruction, panicking if `bytes` ends early.
pub fn decode(model: Model, bytes: &[u8]) -> (usize, Instruction) {
    match vintage_x86::decode_one(model, bytes) {
        DecodeResult::Complete {
            length,
            instruction,
        } => (length, instruction),
        other => panic!("{bytes:02x?} on {model}: {other:?}"),
    }
}
