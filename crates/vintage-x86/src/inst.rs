//! The decoded-instruction value type and its operand descriptors.

/// Operation performed by an instruction.
///
/// `Undefined` is the sentinel produced for any byte sequence that is not a legal encoding under
/// the configured [`crate::Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Operation {
    #[default]
    Undefined,

    // Decimal/ASCII adjust.
    Aaa,
    Aad,
    Aam,
    Aas,
    Daa,
    Das,

    // Arithmetic and logic.
    Add,
    Adc,
    Sub,
    Sbb,
    And,
    Or,
    Xor,
    Cmp,
    Test,
    Not,
    Neg,
    Mul,
    Imul,
    Div,
    Idiv,
    Inc,
    Dec,
    Cbw,
    Cwd,

    // Shifts and rotates.
    Rol,
    Ror,
    Rcl,
    Rcr,
    Sal,
    Shr,
    Sar,

    // Data movement.
    Mov,
    Xchg,
    Lea,
    Lds,
    Les,
    Lahf,
    Sahf,
    Xlat,
    Push,
    Pop,
    Pushf,
    Popf,
    Pusha,
    Popa,

    // String operations.
    Movs,
    Cmps,
    Scas,
    Lods,
    Stos,
    Ins,
    Outs,

    // Port I/O.
    In,
    Out,

    // Conditional branches, in condition-code order.
    Jo,
    Jno,
    Jb,
    Jnb,
    Je,
    Jne,
    Jbe,
    Jnbe,
    Js,
    Jns,
    Jp,
    Jnp,
    Jl,
    Jnl,
    Jle,
    Jnle,

    Loop,
    Loope,
    Loopne,
    Jcxz,

    // Unconditional control transfer.
    /// `CALL rel16`.
    CallRel,
    /// `CALL r/m16`.
    CallNear,
    /// `CALL ptr16:16` or `CALL m16:16`.
    CallFar,
    /// `JMP rel8` / `JMP rel16`.
    JmpRel,
    /// `JMP r/m16`.
    JmpNear,
    /// `JMP ptr16:16` or `JMP m16:16`.
    JmpFar,
    RetNear,
    RetFar,
    Int,
    Int3,
    Into,
    Iret,

    // Flags and processor control.
    Clc,
    Stc,
    Cli,
    Sti,
    Cld,
    Std,
    Cmc,
    Hlt,
    Wait,
    Nop,
    /// Coprocessor escape (`D8`–`DF`).
    Esc,

    // 80186 additions.
    Bound,
    Enter,
    Leave,

    // 80286 system instructions.
    Arpl,
    Sldt,
    Str,
    Lldt,
    Ltr,
    Verr,
    Verw,
    Sgdt,
    Lgdt,
    Smsw,
    Lmsw,
    Lar,
    Lsl,
    Loadall,
    Clts,
}

impl Operation {
    /// Conditional branches indexed by the low nibble of opcodes `70`–`7F`.
    pub const CONDITIONAL_BRANCHES: [Operation; 16] = [
        Operation::Jo,
        Operation::Jno,
        Operation::Jb,
        Operation::Jnb,
        Operation::Je,
        Operation::Jne,
        Operation::Jbe,
        Operation::Jnbe,
        Operation::Js,
        Operation::Jns,
        Operation::Jp,
        Operation::Jnp,
        Operation::Jl,
        Operation::Jnl,
        Operation::Jle,
        Operation::Jnle,
    ];

    /// Lower-case assembly name, without any operand-size suffix.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Operation::Undefined => "(bad)",
            Operation::Aaa => "aaa",
            Operation::Aad => "aad",
            Operation::Aam => "aam",
            Operation::Aas => "aas",
            Operation::Daa => "daa",
            Operation::Das => "das",
            Operation::Add => "add",
            Operation::Adc => "adc",
            Operation::Sub => "sub",
            Operation::Sbb => "sbb",
            Operation::And => "and",
            Operation::Or => "or",
            Operation::Xor => "xor",
            Operation::Cmp => "cmp",
            Operation::Test => "test",
            Operation::Not => "not",
            Operation::Neg => "neg",
            Operation::Mul => "mul",
            Operation::Imul => "imul",
            Operation::Div => "div",
            Operation::Idiv => "idiv",
            Operation::Inc => "inc",
            Operation::Dec => "dec",
            Operation::Cbw => "cbw",
            Operation::Cwd => "cwd",
            Operation::Rol => "rol",
            Operation::Ror => "ror",
            Operation::Rcl => "rcl",
            Operation::Rcr => "rcr",
            Operation::Sal => "sal",
            Operation::Shr => "shr",
            Operation::Sar => "sar",
            Operation::Mov => "mov",
            Operation::Xchg => "xchg",
            Operation::Lea => "lea",
            Operation::Lds => "lds",
            Operation::Les => "les",
            Operation::Lahf => "lahf",
            Operation::Sahf => "sahf",
            Operation::Xlat => "xlat",
            Operation::Push => "push",
            Operation::Pop => "pop",
            Operation::Pushf => "pushf",
            Operation::Popf => "popf",
            Operation::Pusha => "pusha",
            Operation::Popa => "popa",
            Operation::Movs => "movs",
            Operation::Cmps => "cmps",
            Operation::Scas => "scas",
            Operation::Lods => "lods",
            Operation::Stos => "stos",
            Operation::Ins => "ins",
            Operation::Outs => "outs",
            Operation::In => "in",
            Operation::Out => "out",
            Operation::Jo => "jo",
            Operation::Jno => "jno",
            Operation::Jb => "jb",
            Operation::Jnb => "jnb",
            Operation::Je => "je",
            Operation::Jne => "jne",
            Operation::Jbe => "jbe",
            Operation::Jnbe => "jnbe",
            Operation::Js => "js",
            Operation::Jns => "jns",
            Operation::Jp => "jp",
            Operation::Jnp => "jnp",
            Operation::Jl => "jl",
            Operation::Jnl => "jnl",
            Operation::Jle => "jle",
            Operation::Jnle => "jnle",
            Operation::Loop => "loop",
            Operation::Loope => "loope",
            Operation::Loopne => "loopne",
            Operation::Jcxz => "jcxz",
            Operation::CallRel | Operation::CallNear => "call",
            Operation::CallFar => "callf",
            Operation::JmpRel | Operation::JmpNear => "jmp",
            Operation::JmpFar => "jmpf",
            Operation::RetNear => "ret",
            Operation::RetFar => "retf",
            Operation::Int => "int",
            Operation::Int3 => "int3",
            Operation::Into => "into",
            Operation::Iret => "iret",
            Operation::Clc => "clc",
            Operation::Stc => "stc",
            Operation::Cli => "cli",
            Operation::Sti => "sti",
            Operation::Cld => "cld",
            Operation::Std => "std",
            Operation::Cmc => "cmc",
            Operation::Hlt => "hlt",
            Operation::Wait => "wait",
            Operation::Nop => "nop",
            Operation::Esc => "esc",
            Operation::Bound => "bound",
            Operation::Enter => "enter",
            Operation::Leave => "leave",
            Operation::Arpl => "arpl",
            Operation::Sldt => "sldt",
            Operation::Str => "str",
            Operation::Lldt => "lldt",
            Operation::Ltr => "ltr",
            Operation::Verr => "verr",
            Operation::Verw => "verw",
            Operation::Sgdt => "sgdt",
            Operation::Lgdt => "lgdt",
            Operation::Smsw => "smsw",
            Operation::Lmsw => "lmsw",
            Operation::Lar => "lar",
            Operation::Lsl => "lsl",
            Operation::Loadall => "loadall",
            Operation::Clts => "clts",
        }
    }

    /// Read-modify-write forms whose single operand is both source and destination.
    #[must_use]
    pub const fn is_single_operand(self) -> bool {
        matches!(
            self,
            Operation::Inc
                | Operation::Dec
                | Operation::Not
                | Operation::Neg
                | Operation::Sldt
                | Operation::Str
                | Operation::Lldt
                | Operation::Ltr
                | Operation::Verr
                | Operation::Verw
                | Operation::Sgdt
                | Operation::Lgdt
                | Operation::Smsw
                | Operation::Lmsw
        )
    }

    /// String instructions take a `b`/`w` suffix and iterate under a repetition prefix.
    #[must_use]
    pub const fn is_string(self) -> bool {
        matches!(
            self,
            Operation::Movs
                | Operation::Cmps
                | Operation::Scas
                | Operation::Lods
                | Operation::Stos
                | Operation::Ins
                | Operation::Outs
        )
    }

    #[must_use]
    pub const fn is_port_io(self) -> bool {
        matches!(self, Operation::In | Operation::Out)
    }

    #[must_use]
    pub const fn is_shift(self) -> bool {
        matches!(
            self,
            Operation::Rol
                | Operation::Ror
                | Operation::Rcl
                | Operation::Rcr
                | Operation::Sal
                | Operation::Shr
                | Operation::Sar
        )
    }

    /// Branches that carry a signed displacement relative to the next instruction.
    #[must_use]
    pub const fn is_relative_branch(self) -> bool {
        matches!(
            self,
            Operation::Jo
                | Operation::Jno
                | Operation::Jb
                | Operation::Jnb
                | Operation::Je
                | Operation::Jne
                | Operation::Jbe
                | Operation::Jnbe
                | Operation::Js
                | Operation::Jns
                | Operation::Jp
                | Operation::Jnp
                | Operation::Jl
                | Operation::Jnl
                | Operation::Jle
                | Operation::Jnle
                | Operation::Loop
                | Operation::Loope
                | Operation::Loopne
                | Operation::Jcxz
                | Operation::CallRel
                | Operation::JmpRel
        )
    }
}

/// Operand descriptor: where an operand comes from or goes to.
///
/// Low byte registers are the general registers at operation size 1, so `Ax` names `AL` in a
/// byte-sized instruction. The high byte registers have their own tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Source {
    #[default]
    None,

    Ax,
    Cx,
    Dx,
    Bx,
    Sp,
    Bp,
    Si,
    Di,

    Ah,
    Ch,
    Dh,
    Bh,

    Es,
    Cs,
    Ss,
    Ds,
    Fs,
    Gs,

    /// The instruction's operand value.
    Immediate,
    /// A 16-bit absolute address held in the displacement field.
    DirectAddress,
    /// Memory at base + index + displacement, per the instruction's [`ScaleIndexBase`].
    Indirect,
}

impl Source {
    /// Word registers in encoding order.
    pub const WORD_REGISTERS: [Source; 8] = [
        Source::Ax,
        Source::Cx,
        Source::Dx,
        Source::Bx,
        Source::Sp,
        Source::Bp,
        Source::Si,
        Source::Di,
    ];

    /// Byte registers in encoding order (`AL CL DL BL AH CH DH BH`).
    pub const BYTE_REGISTERS: [Source; 8] = [
        Source::Ax,
        Source::Cx,
        Source::Dx,
        Source::Bx,
        Source::Ah,
        Source::Ch,
        Source::Dh,
        Source::Bh,
    ];

    /// Segment registers in encoding order.
    pub const SEGMENT_REGISTERS: [Source; 6] = [
        Source::Es,
        Source::Cs,
        Source::Ss,
        Source::Ds,
        Source::Fs,
        Source::Gs,
    ];

    /// 3-bit register encoding, where one exists.
    #[must_use]
    pub const fn register_index(self) -> Option<u8> {
        match self {
            Source::Ax | Source::Es => Some(0),
            Source::Cx | Source::Cs => Some(1),
            Source::Dx | Source::Ss => Some(2),
            Source::Bx | Source::Ds => Some(3),
            Source::Sp | Source::Ah | Source::Fs => Some(4),
            Source::Bp | Source::Ch | Source::Gs => Some(5),
            Source::Si | Source::Dh => Some(6),
            Source::Di | Source::Bh => Some(7),
            Source::None | Source::Immediate | Source::DirectAddress | Source::Indirect => None,
        }
    }

    #[must_use]
    pub const fn is_memory(self) -> bool {
        matches!(self, Source::DirectAddress | Source::Indirect)
    }

    #[must_use]
    pub const fn is_segment(self) -> bool {
        matches!(
            self,
            Source::Es | Source::Cs | Source::Ss | Source::Ds | Source::Fs | Source::Gs
        )
    }

    /// Register name at the given operation size, or `None` for non-register descriptors.
    #[must_use]
    pub const fn register_name(self, size: Size) -> Option<&'static str> {
        let byte = matches!(size, Size::Byte);
        let name = match self {
            Source::Ax => {
                if byte {
                    "al"
                } else {
                    "ax"
                }
            }
            Source::Cx => {
                if byte {
                    "cl"
                } else {
                    "cx"
                }
            }
            Source::Dx => {
                if byte {
                    "dl"
                } else {
                    "dx"
                }
            }
            Source::Bx => {
                if byte {
                    "bl"
                } else {
                    "bx"
                }
            }
            Source::Sp => "sp",
            Source::Bp => "bp",
            Source::Si => "si",
            Source::Di => "di",
            Source::Ah => "ah",
            Source::Ch => "ch",
            Source::Dh => "dh",
            Source::Bh => "bh",
            Source::Es => "es",
            Source::Cs => "cs",
            Source::Ss => "ss",
            Source::Ds => "ds",
            Source::Fs => "fs",
            Source::Gs => "gs",
            Source::None | Source::Immediate | Source::DirectAddress | Source::Indirect => {
                return None
            }
        };
        Some(name)
    }
}

/// Width of the data an instruction operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Size {
    /// Size is irrelevant to the operation.
    #[default]
    Implied = 0,
    Byte = 1,
    Word = 2,
    DWord = 4,
}

impl Size {
    #[must_use]
    pub const fn bytes(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressSize {
    #[default]
    Bits16,
    Bits32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Repetition {
    #[default]
    None,
    /// `REP`/`REPE`/`REPZ` (`F3`).
    RepE,
    /// `REPNE`/`REPNZ` (`F2`).
    RepNE,
}

/// Base and index registers of an indirect memory operand.
///
/// 16-bit addressing never scales; `scale` is kept for the 32-bit placeholder and is always 0
/// (i.e. a factor of one) in what this decoder produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScaleIndexBase {
    pub scale: u8,
    pub base: Source,
    pub index: Source,
}

impl ScaleIndexBase {
    pub const NONE: ScaleIndexBase = ScaleIndexBase::new(Source::None, Source::None);

    #[must_use]
    pub const fn new(base: Source, index: Source) -> Self {
        Self {
            scale: 0,
            base,
            index,
        }
    }
}

/// One decoded instruction.
///
/// Produced whole by [`crate::Decoder::decode`] and never mutated afterwards. The default value
/// is the [`Operation::Undefined`] sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Instruction {
    pub(crate) operation: Operation,
    pub(crate) source: Source,
    pub(crate) destination: Source,
    pub(crate) operation_size: Size,
    pub(crate) address_size: AddressSize,
    pub(crate) segment_override: Option<Source>,
    pub(crate) repetition: Repetition,
    pub(crate) lock: bool,
    pub(crate) sib: ScaleIndexBase,
    pub(crate) displacement: i16,
    pub(crate) operand: u16,
}

impl Instruction {
    #[must_use]
    pub const fn operation(&self) -> Operation {
        self.operation
    }

    #[must_use]
    pub const fn source(&self) -> Source {
        self.source
    }

    #[must_use]
    pub const fn destination(&self) -> Source {
        self.destination
    }

    #[must_use]
    pub const fn operation_size(&self) -> Size {
        self.operation_size
    }

    #[must_use]
    pub const fn address_size(&self) -> AddressSize {
        self.address_size
    }

    #[must_use]
    pub const fn segment_override(&self) -> Option<Source> {
        self.segment_override
    }

    #[must_use]
    pub const fn repetition(&self) -> Repetition {
        self.repetition
    }

    #[must_use]
    pub const fn lock(&self) -> bool {
        self.lock
    }

    #[must_use]
    pub const fn sib(&self) -> ScaleIndexBase {
        self.sib
    }

    #[must_use]
    pub const fn displacement(&self) -> i16 {
        self.displacement
    }

    /// Immediate value, port number, far segment, or `1` for the shift-by-one forms.
    #[must_use]
    pub const fn operand(&self) -> u16 {
        self.operand
    }

    #[must_use]
    pub const fn is_undefined(&self) -> bool {
        matches!(self.operation, Operation::Undefined)
    }

    /// The absolute address of a [`Source::DirectAddress`] operand, if the instruction has one.
    #[must_use]
    pub const fn direct_address(&self) -> Option<u16> {
        if matches!(self.source, Source::DirectAddress)
            || matches!(self.destination, Source::DirectAddress)
        {
            Some(self.displacement as u16)
        } else {
            None
        }
    }

    /// `(segment, offset)` of an absolute far `CALL`/`JMP`.
    #[must_use]
    pub const fn far_target(&self) -> Option<(u16, u16)> {
        match (self.operation, self.source) {
            (Operation::CallFar | Operation::JmpFar, Source::Immediate) => {
                Some((self.operand, self.displacement as u16))
            }
            _ => None,
        }
    }

    /// Mnemonic including the `b`/`w` suffix string instructions carry.
    #[must_use]
    pub fn mnemonic(&self) -> std::borrow::Cow<'static, str> {
        let base = self.operation.mnemonic();
        if self.operation.is_string() {
            let suffix = match self.operation_size {
                Size::Byte => "b",
                _ => "w",
            };
            std::borrow::Cow::Owned(format!("{base}{suffix}"))
        } else {
            std::borrow::Cow::Borrowed(base)
        }
    }
}
