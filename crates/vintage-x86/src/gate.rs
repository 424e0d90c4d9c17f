use crate::model::Model;
use crate::opcode_tables;

/// Per-model opcode legality, one bit per opcode for each table.
///
/// Built once from the opcode tables when a decoder is created; a lookup is then a shift and a
/// mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Legality {
    primary: [u64; 4],
    secondary: [u64; 4],
}

impl Legality {
    pub(crate) fn for_model(model: Model) -> Self {
        let mut legality = Self {
            primary: [0; 4],
            secondary: [0; 4],
        };
        for opcode in 0..=u8::MAX {
            if opcode_tables::primary(opcode).is_legal_on(model) {
                set(&mut legality.primary, opcode);
            }
            if opcode_tables::secondary(opcode).is_legal_on(model) {
                set(&mut legality.secondary, opcode);
            }
        }
        legality
    }

    #[inline]
    pub(crate) fn primary(&self, opcode: u8) -> bool {
        get(&self.primary, opcode)
    }

    /// Legality of `0F opcode`; false whenever the escape itself is.
    #[inline]
    pub(crate) fn secondary(&self, opcode: u8) -> bool {
        self.primary(0x0f) && get(&self.secondary, opcode)
    }
}

fn set(bits: &mut [u64; 4], opcode: u8) {
    bits[usize::from(opcode >> 6)] |= 1u64 << (opcode & 63);
}

fn get(bits: &[u64; 4], opcode: u8) -> bool {
    bits[usize::from(opcode >> 6)] & (1u64 << (opcode & 63)) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_models_only_add_opcodes() {
        for pair in Model::ALL.windows(2) {
            let older = Legality::for_model(pair[0]);
            let newer = Legality::for_model(pair[1]);
            for opcode in 0..=u8::MAX {
                if older.primary(opcode) {
                    assert!(newer.primary(opcode), "{opcode:#04x} lost on {}", pair[1]);
                }
                if older.secondary(opcode) {
                    assert!(newer.secondary(opcode), "0f {opcode:02x} lost on {}", pair[1]);
                }
            }
        }
    }

    #[test]
    fn secondary_page_needs_the_escape() {
        let i8086 = Legality::for_model(Model::I8086);
        let i80286 = Legality::for_model(Model::I80286);
        assert!(!i8086.primary(0x0f));
        assert!(!i8086.secondary(0x00));
        assert!(i80286.secondary(0x00));
        assert!(!i80286.secondary(0x04));
    }

    #[test]
    fn bit_positions() {
        let mut bits = [0u64; 4];
        set(&mut bits, 0);
        set(&mut bits, 63);
        set(&mut bits, 64);
        set(&mut bits, 255);
        assert_eq!(bits, [1u64 | (1u64 << 63), 1, 0, 1u64 << 63]);
        assert!(get(&bits, 255));
        assert!(!get(&bits, 254));
    }
}
