//! Intel-syntax rendering of decoded instructions.

use core::fmt;

use crate::inst::{Instruction, Operation, Repetition, Size, Source};

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_undefined() {
            return f.write_str("(bad)");
        }
        if self.lock {
            f.write_str("lock ")?;
        }
        match self.repetition {
            Repetition::None => {}
            Repetition::RepE => f.write_str(
                if matches!(self.operation, Operation::Cmps | Operation::Scas) {
                    "repe "
                } else {
                    "rep "
                },
            )?,
            Repetition::RepNE => f.write_str("repne ")?,
        }
        f.write_str(&self.mnemonic())?;

        let operands = self.operand_texts();
        let mut first = true;
        for text in operands.iter().flatten() {
            f.write_str(if first { " " } else { ", " })?;
            f.write_str(text)?;
            first = false;
        }
        Ok(())
    }
}

impl Instruction {
    /// Up to three operands, destination first.
    fn operand_texts(&self) -> [Option<String>; 3] {
        let op = self.operation;

        if op.is_relative_branch() {
            return [Some(signed_hex(i32::from(self.displacement))), None, None];
        }
        if let Some((segment, offset)) = self.far_target() {
            return [Some(format!("{segment:#x}:{offset:#x}")), None, None];
        }
        match op {
            Operation::Daa
            | Operation::Das
            | Operation::Aaa
            | Operation::Aas
            | Operation::Cbw
            | Operation::Cwd => return [None, None, None],
            Operation::Aam | Operation::Aad => {
                return [Some(format!("{:#x}", self.operand)), None, None]
            }
            Operation::Enter => {
                return [
                    Some(format!("{:#x}", self.displacement as u16)),
                    Some(format!("{:#x}", self.operand)),
                    None,
                ]
            }
            _ => {}
        }

        let destination = self.operand_text(self.destination);
        if op.is_single_operand() {
            return [destination, None, None];
        }
        // reg, r/m, imm; the group form leaves the accumulator implied.
        if op == Operation::Imul && self.destination != Source::None {
            return [
                destination,
                self.operand_text(self.source),
                Some(format!("{:#x}", self.operand)),
            ];
        }
        [destination, self.operand_text(self.source), None]
    }

    fn operand_text(&self, source: Source) -> Option<String> {
        match source {
            Source::None => None,
            Source::Immediate => Some(format!("{:#x}", self.operand)),
            memory if memory.is_memory() => Some(self.memory_text(memory)),
            Source::Cx if self.operation.is_shift() => Some("cl".to_string()),
            Source::Dx if self.operation.is_port_io() => Some("dx".to_string()),
            register => register
                .register_name(self.operation_size)
                .map(str::to_string),
        }
    }

    fn memory_text(&self, source: Source) -> String {
        let mut text = String::new();
        text.push_str(size_keyword(self.operation_size));
        text.push('[');
        text.push_str(&self.segment_prefix());
        if source == Source::DirectAddress {
            text.push_str(&format!("{:#x}]", self.displacement as u16));
            return text;
        }
        let mut registers = [self.sib.base, self.sib.index]
            .into_iter()
            .filter_map(|r| r.register_name(Size::Word));
        if let Some(first) = registers.next() {
            text.push_str(first);
        }
        for next in registers {
            text.push('+');
            text.push_str(next);
        }
        if self.displacement != 0 {
            text.push_str(&signed_hex(i32::from(self.displacement)));
        }
        text.push(']');
        text
    }

    fn segment_prefix(&self) -> String {
        self.segment_override
            .filter(|s| s.is_segment())
            .and_then(|s| s.register_name(Size::Word))
            .map(|name| format!("{name}:"))
            .unwrap_or_default()
    }
}

fn size_keyword(size: Size) -> &'static str {
    match size {
        Size::Implied => "",
        Size::Byte => "byte ",
        Size::Word => "word ",
        Size::DWord => "dword ",
    }
}

fn signed_hex(value: i32) -> String {
    if value < 0 {
        format!("-{:#x}", value.unsigned_abs())
    } else {
        format!("+{value:#x}")
    }
}
