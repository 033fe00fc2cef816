use std::fmt;
use std::ops::Deref;

use crate::bus::Bus;
use crate::error::BusFault;
use crate::regs::{Condition, Register16, Register8};
use crate::table::{
    Address, InstructionDescriptor, Mnemonic, OpcodeTable, OperandKind, PostOp, CB_PREFIX,
};

/// A memory reference with its immediate part already fetched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemRef {
    Pair(Register16),
    High(Register8),
    HighImm8(u8),
    Absolute(u16),
}

/// An operand with immediates substituted by their values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    Reg8(Register8),
    Reg16(Register16),
    Condition(Condition),
    Imm8(u8),
    Imm16(u16),
    Rel8(i8),
    Bit(u8),
    Vector(u8),
    Mem(MemRef, PostOp),
}

const MAX_OPERANDS: usize = 3;

/// Fixed-capacity operand list; derefs to the filled prefix.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Operands {
    slots: [Operand; MAX_OPERANDS],
    len: usize,
}

impl Operands {
    fn new() -> Self {
        Self {
            slots: [Operand::Imm8(0); MAX_OPERANDS],
            len: 0,
        }
    }

    fn push(&mut self, operand: Operand) {
        self.slots[self.len] = operand;
        self.len += 1;
    }
}

impl Deref for Operands {
    type Target = [Operand];

    fn deref(&self) -> &[Operand] {
        &self.slots[..self.len]
    }
}

impl fmt::Debug for Operands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// One fetched instruction, ready to execute.
///
/// Only [`decode`] builds one, so the descriptor always comes from a table
/// whose operand shapes were validated when it was built.
#[derive(Clone, Copy, Debug)]
pub struct Decoded<'t> {
    pub(crate) descriptor: &'t InstructionDescriptor,
    pub(crate) operands: Operands,
    pub(crate) pc: u16,
    pub(crate) next_pc: u16,
}

impl<'t> Decoded<'t> {
    #[inline]
    pub fn descriptor(&self) -> &'t InstructionDescriptor {
        self.descriptor
    }

    #[inline]
    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    /// Address of the first byte (the opcode or the 0xCB prefix).
    #[inline]
    pub fn pc(&self) -> u16 {
        self.pc
    }

    /// Address of the byte following the instruction.
    #[inline]
    pub fn next_pc(&self) -> u16 {
        self.next_pc
    }

    /// The condition operand of a conditional branch.
    pub fn condition(&self) -> Option<Condition> {
        self.operands.iter().find_map(|op| match op {
            Operand::Condition(cond) => Some(*cond),
            _ => None,
        })
    }
}

/// Fetch the instruction at `pc`.
///
/// Reads the opcode (and the secondary byte after a 0xCB prefix) plus any
/// immediates, little-endian for 16-bit values. Decoding only reads the
/// bus; CPU state is untouched.
pub fn decode<'t, B: Bus + ?Sized>(
    table: &'t OpcodeTable,
    bus: &mut B,
    pc: u16,
) -> Result<Decoded<'t>, BusFault> {
    let opcode = bus.read8(pc)?;
    let (descriptor, mut cursor) = if opcode == CB_PREFIX {
        let byte = bus.read8(pc.wrapping_add(1))?;
        (table.lookup(true, byte), pc.wrapping_add(2))
    } else {
        (table.lookup(false, opcode), pc.wrapping_add(1))
    };

    let mut fetch8 = |bus: &mut B| -> Result<u8, BusFault> {
        let value = bus.read8(cursor)?;
        cursor = cursor.wrapping_add(1);
        Ok(value)
    };

    let mut operands = Operands::new();
    for kind in &descriptor.operands {
        let operand = match *kind {
            OperandKind::Reg8(reg) => Operand::Reg8(reg),
            OperandKind::Reg16(reg) => Operand::Reg16(reg),
            OperandKind::Condition(cond) => Operand::Condition(cond),
            OperandKind::Bit(bit) => Operand::Bit(bit),
            OperandKind::Vector(vector) => Operand::Vector(vector),
            OperandKind::Imm8 => Operand::Imm8(fetch8(bus)?),
            OperandKind::Rel8 => Operand::Rel8(fetch8(bus)? as i8),
            OperandKind::Imm16 => {
                let lo = fetch8(bus)?;
                let hi = fetch8(bus)?;
                Operand::Imm16(u16::from_le_bytes([lo, hi]))
            }
            OperandKind::Indirect(address, post_op) => {
                let mem = match address {
                    Address::Pair(reg) => MemRef::Pair(reg),
                    Address::High(reg) => MemRef::High(reg),
                    Address::HighImm8 => MemRef::HighImm8(fetch8(bus)?),
                    Address::Absolute => {
                        let lo = fetch8(bus)?;
                        let hi = fetch8(bus)?;
                        MemRef::Absolute(u16::from_le_bytes([lo, hi]))
                    }
                };
                Operand::Mem(mem, post_op)
            }
        };
        operands.push(operand);
    }

    Ok(Decoded {
        descriptor,
        operands,
        pc,
        next_pc: pc.wrapping_add(descriptor.length as u16),
    })
}

impl fmt::Display for Decoded<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let descriptor = self.descriptor;
        if descriptor.mnemonic == Mnemonic::Illegal {
            return write!(f, "{descriptor}");
        }

        // LD HL,SP+r8 reads better as one combined operand.
        if let &[Operand::Reg16(dst), Operand::Reg16(base), Operand::Rel8(offset)] = &*self.operands
        {
            return write!(f, "{} {dst},{base}{offset:+}", descriptor.mnemonic);
        }

        f.write_str(descriptor.mnemonic.as_str())?;
        for (i, operand) in self.operands.iter().enumerate() {
            f.write_str(if i == 0 { " " } else { "," })?;
            match *operand {
                Operand::Reg8(reg) => write!(f, "{reg}")?,
                Operand::Reg16(reg) => write!(f, "{reg}")?,
                Operand::Condition(cond) => write!(f, "{cond}")?,
                Operand::Imm8(value) => write!(f, "${value:02X}")?,
                Operand::Imm16(value) => write!(f, "${value:04X}")?,
                Operand::Rel8(offset) if descriptor.mnemonic == Mnemonic::Jr => {
                    let target = self.next_pc.wrapping_add(offset as i16 as u16);
                    write!(f, "${target:04X}")?
                }
                Operand::Rel8(offset) => write!(f, "{offset:+}")?,
                Operand::Bit(bit) => write!(f, "{bit}")?,
                Operand::Vector(vector) => write!(f, "${vector:02X}")?,
                Operand::Mem(mem, post_op) => {
                    let suffix = match post_op {
                        PostOp::None => "",
                        PostOp::Increment => "+",
                        PostOp::Decrement => "-",
                    };
                    match mem {
                        MemRef::Pair(reg) => write!(f, "({reg}{suffix})")?,
                        MemRef::High(reg) => write!(f, "({reg})")?,
                        MemRef::HighImm8(low) => write!(f, "(${:04X})", 0xFF00 | low as u16)?,
                        MemRef::Absolute(addr) => write!(f, "(${addr:04X})")?,
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::FlatBus;

    fn decode_bytes(bytes: &[u8]) -> (Decoded<'static>, FlatBus) {
        let mut bus = FlatBus::new();
        bus.load(0x0100, bytes);
        let decoded = decode(OpcodeTable::builtin(), &mut bus, 0x0100).unwrap();
        (decoded, bus)
    }

    #[test]
    fn reads_little_endian_immediates() {
        let (decoded, _) = decode_bytes(&[0x01, 0x34, 0x12]);
        assert_eq!(decoded.descriptor.mnemonic, Mnemonic::Ld);
        assert_eq!(
            *decoded.operands,
            [Operand::Reg16(Register16::BC), Operand::Imm16(0x1234)]
        );
        assert_eq!(decoded.next_pc, 0x0103);
        assert_eq!(decoded.to_string(), "LD BC,$1234");
    }

    #[test]
    fn cb_prefix_selects_secondary_table() {
        let (decoded, _) = decode_bytes(&[0xCB, 0x7C]);
        assert!(decoded.descriptor.prefixed);
        assert_eq!(decoded.descriptor.mnemonic, Mnemonic::Bit);
        assert_eq!(
            *decoded.operands,
            [Operand::Bit(7), Operand::Reg8(Register8::H)]
        );
        assert_eq!(decoded.next_pc, 0x0102);
        assert_eq!(decoded.to_string(), "BIT 7,H");
    }

    #[test]
    fn relative_jump_renders_target() {
        let (decoded, _) = decode_bytes(&[0x20, 0xFE]);
        assert_eq!(decoded.condition().unwrap().to_string(), "NZ");
        assert_eq!(decoded.operands[1], Operand::Rel8(-2));
        assert_eq!(decoded.to_string(), "JR NZ,$0100");
    }

    #[test]
    fn renders_indirect_forms() {
        assert_eq!(decode_bytes(&[0x3A]).0.to_string(), "LD A,(HL-)");
        assert_eq!(decode_bytes(&[0xE2]).0.to_string(), "LD (C),A");
        assert_eq!(decode_bytes(&[0xF0, 0x44]).0.to_string(), "LDH A,($FF44)");
        assert_eq!(decode_bytes(&[0xEA, 0x00, 0xC0]).0.to_string(), "LD ($C000),A");
        assert_eq!(decode_bytes(&[0xF8, 0xFB]).0.to_string(), "LD HL,SP-5");
        assert_eq!(decode_bytes(&[0xFF]).0.to_string(), "RST $38");
        assert_eq!(decode_bytes(&[0xDD]).0.to_string(), "ILLEGAL_DD");
    }

    #[test]
    fn decoding_does_not_write_the_bus() {
        let (_, bus) = decode_bytes(&[0x36, 0x99]);
        assert_eq!(bus.memory[0x0100], 0x36);
        assert_eq!(bus.memory[0x0101], 0x99);
        assert!(bus.memory[0x0102..].iter().all(|&b| b == 0));
    }

    #[test]
    fn wraps_at_end_of_address_space() {
        let mut bus = FlatBus::new();
        bus.memory[0xFFFF] = 0x3E;
        bus.memory[0x0000] = 0x42;
        let decoded = decode(OpcodeTable::builtin(), &mut bus, 0xFFFF).unwrap();
        assert_eq!(decoded.operands[0], Operand::Reg8(Register8::A));
        assert_eq!(decoded.operands[1], Operand::Imm8(0x42));
        assert_eq!(decoded.next_pc, 0x0001);
    }
}
