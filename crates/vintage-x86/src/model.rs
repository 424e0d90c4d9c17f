use core::fmt;
use core::str::FromStr;

use thiserror::Error;

/// CPU variant whose legal opcode set a [`crate::Decoder`] applies.
///
/// Variants are ordered oldest to newest, so `model >= Model::I80286` reads as "has the 80286
/// instruction set".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Model {
    #[default]
    I8086,
    I80186,
    I80286,
    I80386,
}

impl Model {
    pub const ALL: [Model; 4] = [Model::I8086, Model::I80186, Model::I80286, Model::I80386];

    /// `const` ordering helper; the derived `Ord` is not usable from table builders.
    pub(crate) const fn rank(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn at_least(self, other: Model) -> bool {
        self.rank() >= other.rank()
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Model::I8086 => "8086",
            Model::I80186 => "80186",
            Model::I80286 => "80286",
            Model::I80386 => "80386",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown CPU model {0:?} (expected one of 8086, 80186, 80286, 80386)")]
pub struct ParseModelError(pub String);

impl FromStr for Model {
    type Err = ParseModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();
        let digits = lower.strip_prefix('i').unwrap_or(&lower);
        match digits {
            "8086" | "8088" | "86" => Ok(Model::I8086),
            "80186" | "80188" | "186" => Ok(Model::I80186),
            "80286" | "286" => Ok(Model::I80286),
            "80386" | "386" => Ok(Model::I80386),
            _ => Err(ParseModelError(trimmed.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_spellings() {
        assert_eq!("8086".parse::<Model>(), Ok(Model::I8086));
        assert_eq!("i8088".parse::<Model>(), Ok(Model::I8086));
        assert_eq!(" 186 ".parse::<Model>(), Ok(Model::I80186));
        assert_eq!("I80286".parse::<Model>(), Ok(Model::I80286));
        assert_eq!("386".parse::<Model>(), Ok(Model::I80386));
        assert!("z80".parse::<Model>().is_err());
    }

    #[test]
    fn ordering_matches_history() {
        assert!(Model::I8086 < Model::I80186);
        assert!(Model::I80286.at_least(Model::I80186));
        assert!(!Model::I80186.at_least(Model::I80286));
        for model in Model::ALL {
            assert_eq!(model.to_string().parse::<Model>(), Ok(model));
        }
    }
}
