use std::fmt;

use crate::regs::{Condition, Flag, Flags, Register16, Register8};

/// Instruction mnemonics of the SM83 instruction set.
///
/// `Prefix` is the 0xCB lead byte and `Illegal` covers the documented opcode
/// holes, which execute as no-ops here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    Nop,
    Ld,
    Ldh,
    Inc,
    Dec,
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
    Rlca,
    Rrca,
    Rla,
    Rra,
    Daa,
    Cpl,
    Scf,
    Ccf,
    Jr,
    Jp,
    Call,
    Ret,
    Reti,
    Rst,
    Push,
    Pop,
    Halt,
    Stop,
    Di,
    Ei,
    Prefix,
    Illegal,
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    Swap,
    Srl,
    Bit,
    Res,
    Set,
}

impl Mnemonic {
    /// Mnemonics whose single-letter `C`/`H` operands name a flag rather
    /// than a register.
    pub const CONDITION_BEARING: [Mnemonic; 4] =
        [Mnemonic::Call, Mnemonic::Jr, Mnemonic::Jp, Mnemonic::Ret];

    /// Parse a metadata mnemonic (case-insensitive). Any `ILLEGAL_xx` name
    /// maps to [`Mnemonic::Illegal`].
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        if upper.starts_with("ILLEGAL") {
            return Some(Self::Illegal);
        }
        Some(match upper.as_str() {
            "NOP" => Self::Nop,
            "LD" => Self::Ld,
            "LDH" => Self::Ldh,
            "INC" => Self::Inc,
            "DEC" => Self::Dec,
            "ADD" => Self::Add,
            "ADC" => Self::Adc,
            "SUB" => Self::Sub,
            "SBC" => Self::Sbc,
            "AND" => Self::And,
            "XOR" => Self::Xor,
            "OR" => Self::Or,
            "CP" => Self::Cp,
            "RLCA" => Self::Rlca,
            "RRCA" => Self::Rrca,
            "RLA" => Self::Rla,
            "RRA" => Self::Rra,
            "DAA" => Self::Daa,
            "CPL" => Self::Cpl,
            "SCF" => Self::Scf,
            "CCF" => Self::Ccf,
            "JR" => Self::Jr,
            "JP" => Self::Jp,
            "CALL" => Self::Call,
            "RET" => Self::Ret,
            "RETI" => Self::Reti,
            "RST" => Self::Rst,
            "PUSH" => Self::Push,
            "POP" => Self::Pop,
            "HALT" => Self::Halt,
            "STOP" => Self::Stop,
            "DI" => Self::Di,
            "EI" => Self::Ei,
            "PREFIX" => Self::Prefix,
            "RLC" => Self::Rlc,
            "RRC" => Self::Rrc,
            "RL" => Self::Rl,
            "RR" => Self::Rr,
            "SLA" => Self::Sla,
            "SRA" => Self::Sra,
            "SWAP" => Self::Swap,
            "SRL" => Self::Srl,
            "BIT" => Self::Bit,
            "RES" => Self::Res,
            "SET" => Self::Set,
            _ => return None,
        })
    }

    #[inline]
    pub fn is_condition_bearing(self) -> bool {
        Self::CONDITION_BEARING.contains(&self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nop => "NOP",
            Self::Ld => "LD",
            Self::Ldh => "LDH",
            Self::Inc => "INC",
            Self::Dec => "DEC",
            Self::Add => "ADD",
            Self::Adc => "ADC",
            Self::Sub => "SUB",
            Self::Sbc => "SBC",
            Self::And => "AND",
            Self::Xor => "XOR",
            Self::Or => "OR",
            Self::Cp => "CP",
            Self::Rlca => "RLCA",
            Self::Rrca => "RRCA",
            Self::Rla => "RLA",
            Self::Rra => "RRA",
            Self::Daa => "DAA",
            Self::Cpl => "CPL",
            Self::Scf => "SCF",
            Self::Ccf => "CCF",
            Self::Jr => "JR",
            Self::Jp => "JP",
            Self::Call => "CALL",
            Self::Ret => "RET",
            Self::Reti => "RETI",
            Self::Rst => "RST",
            Self::Push => "PUSH",
            Self::Pop => "POP",
            Self::Halt => "HALT",
            Self::Stop => "STOP",
            Self::Di => "DI",
            Self::Ei => "EI",
            Self::Prefix => "PREFIX",
            Self::Illegal => "ILLEGAL",
            Self::Rlc => "RLC",
            Self::Rrc => "RRC",
            Self::Rl => "RL",
            Self::Rr => "RR",
            Self::Sla => "SLA",
            Self::Sra => "SRA",
            Self::Swap => "SWAP",
            Self::Srl => "SRL",
            Self::Bit => "BIT",
            Self::Res => "RES",
            Self::Set => "SET",
        }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Addressing-mode side effect applied to an indirect register pair after
/// the memory access (`(HL+)`, `(HL-)`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PostOp {
    #[default]
    None,
    Increment,
    Decrement,
}

/// Where an indirect operand takes its memory address from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Address {
    /// `(BC)`, `(DE)`, `(HL)`: the value of a register pair.
    Pair(Register16),
    /// `(C)`: 0xFF00 plus an 8-bit register.
    High(Register8),
    /// `(a8)`: 0xFF00 plus an 8-bit immediate.
    HighImm8,
    /// `(a16)`: a 16-bit immediate.
    Absolute,
}

/// Operand classification, resolved once when the table is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperandKind {
    Reg8(Register8),
    Reg16(Register16),
    Condition(Condition),
    Imm8,
    Imm16,
    /// Signed 8-bit displacement (`r8`).
    Rel8,
    /// Bit index of BIT/RES/SET.
    Bit(u8),
    /// Fixed call target of RST.
    Vector(u8),
    Indirect(Address, PostOp),
}

impl OperandKind {
    /// Number of immediate bytes this operand consumes from the
    /// instruction stream.
    pub fn immediate_bytes(self) -> u8 {
        match self {
            Self::Imm8 | Self::Rel8 | Self::Indirect(Address::HighImm8, _) => 1,
            Self::Imm16 | Self::Indirect(Address::Absolute, _) => 2,
            _ => 0,
        }
    }
}

impl fmt::Display for OperandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reg8(reg) => write!(f, "{reg}"),
            Self::Reg16(reg) => write!(f, "{reg}"),
            Self::Condition(cond) => write!(f, "{cond}"),
            Self::Imm8 => f.write_str("d8"),
            Self::Imm16 => f.write_str("d16"),
            Self::Rel8 => f.write_str("r8"),
            Self::Bit(bit) => write!(f, "{bit}"),
            Self::Vector(vector) => write!(f, "{vector:02X}H"),
            Self::Indirect(address, post_op) => {
                let suffix = match post_op {
                    PostOp::None => "",
                    PostOp::Increment => "+",
                    PostOp::Decrement => "-",
                };
                match address {
                    Address::Pair(reg) => write!(f, "({reg}{suffix})"),
                    Address::High(reg) => write!(f, "({reg})"),
                    Address::HighImm8 => f.write_str("(a8)"),
                    Address::Absolute => f.write_str("(a16)"),
                }
            }
        }
    }
}

/// Documented effect of an instruction on one flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FlagEffect {
    #[default]
    Unaffected,
    Reset,
    Set,
    Computed,
}

/// Effects on Z, N, H and C, in that order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FlagEffects {
    pub z: FlagEffect,
    pub n: FlagEffect,
    pub h: FlagEffect,
    pub c: FlagEffect,
}

impl FlagEffects {
    pub const NONE: FlagEffects = FlagEffects {
        z: FlagEffect::Unaffected,
        n: FlagEffect::Unaffected,
        h: FlagEffect::Unaffected,
        c: FlagEffect::Unaffected,
    };

    pub fn get(&self, flag: Flag) -> FlagEffect {
        match flag {
            Flag::Z => self.z,
            Flag::N => self.n,
            Flag::H => self.h,
            Flag::C => self.c,
        }
    }

    /// Merge the flags an instruction computed (`after`) with the flags it
    /// started from (`before`).
    pub fn apply(&self, before: Flags, after: Flags) -> Flags {
        let mut out = Flags::empty();
        for flag in Flag::ALL {
            let mask = flag.mask();
            let value = match self.get(flag) {
                FlagEffect::Unaffected => before.contains(mask),
                FlagEffect::Reset => false,
                FlagEffect::Set => true,
                FlagEffect::Computed => after.contains(mask),
            };
            out.set(mask, value);
        }
        out
    }
}

/// Everything the decoder and executor need to know about one opcode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstructionDescriptor {
    pub opcode: u8,
    pub prefixed: bool,
    pub mnemonic: Mnemonic,
    pub operands: Vec<OperandKind>,
    /// Total encoded length, including the 0xCB prefix for CB entries.
    pub length: u8,
    /// T-cycles when no branch is taken.
    pub cycles: u32,
    /// T-cycles when a conditional branch is taken.
    pub branch_cycles: Option<u32>,
    pub flags: FlagEffects,
}

impl InstructionDescriptor {
    /// No-op stand-in for an opcode hole.
    pub fn illegal(opcode: u8, prefixed: bool) -> Self {
        Self {
            opcode,
            prefixed,
            mnemonic: Mnemonic::Illegal,
            operands: Vec::new(),
            length: 1,
            cycles: 4,
            branch_cycles: None,
            flags: FlagEffects::NONE,
        }
    }

    /// Cycles to charge for this instruction given whether its branch
    /// condition held.
    #[inline]
    pub fn cycles_for(&self, taken: bool) -> u32 {
        match (taken, self.branch_cycles) {
            (true, Some(cycles)) => cycles,
            _ => self.cycles,
        }
    }

    /// The condition operand, if this is a conditional branch.
    pub fn condition(&self) -> Option<Condition> {
        self.operands.iter().find_map(|op| match op {
            OperandKind::Condition(cond) => Some(*cond),
            _ => None,
        })
    }
}

impl fmt::Display for InstructionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mnemonic == Mnemonic::Illegal {
            return write!(f, "ILLEGAL_{:02X}", self.opcode);
        }
        f.write_str(self.mnemonic.as_str())?;
        for (i, operand) in self.operands.iter().enumerate() {
            f.write_str(if i == 0 { " " } else { "," })?;
            write!(f, "{operand}")?;
        }
        Ok(())
    }
}
