use crate::bus::Bus;
use crate::cpu::Cpu;
use crate::decode::{MemRef, Operand};
use crate::error::BusFault;
use crate::regs::{Condition, Flags};
use crate::table::PostOp;

impl Cpu {
    #[inline]
    pub(super) fn clear_flags(&mut self) {
        self.regs.set_flags(Flags::empty());
    }

    /// Whether an optional branch condition holds; no condition always holds.
    #[inline]
    pub(super) fn condition_holds(&self, cond: Option<Condition>) -> bool {
        cond.map_or(true, |cond| cond.holds(self.regs.flags()))
    }

    /// Address a memory operand refers to, given the current registers.
    ///
    /// `(C)` and `(a8)` address the 0xFF00 page.
    pub(super) fn effective_address(&self, mem: MemRef) -> u16 {
        match mem {
            MemRef::Pair(reg) => self.regs.get16(reg),
            MemRef::High(reg) => 0xFF00 | self.regs.get8(reg) as u16,
            MemRef::HighImm8(low) => 0xFF00 | low as u16,
            MemRef::Absolute(addr) => addr,
        }
    }

    /// Step the pair behind `(HL+)`/`(HL-)` once the access is done.
    pub(super) fn apply_post_op(&mut self, mem: MemRef, post_op: PostOp) {
        let MemRef::Pair(reg) = mem else {
            return;
        };
        let value = self.regs.get16(reg);
        match post_op {
            PostOp::None => {}
            PostOp::Increment => self.regs.set16(reg, value.wrapping_add(1)),
            PostOp::Decrement => self.regs.set16(reg, value.wrapping_sub(1)),
        }
    }

    /// Read an 8-bit source: a register, an immediate or memory.
    pub(super) fn read_operand8<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        operand: Operand,
    ) -> Result<u8, BusFault> {
        match operand {
            Operand::Reg8(reg) => Ok(self.regs.get8(reg)),
            Operand::Imm8(value) => Ok(value),
            Operand::Mem(mem, _) => bus.read8(self.effective_address(mem)),
            other => unreachable!("{other:?} is not an 8-bit source"),
        }
    }

    /// Write an 8-bit destination: a register or memory.
    pub(super) fn write_operand8<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        operand: Operand,
        value: u8,
    ) -> Result<(), BusFault> {
        match operand {
            Operand::Reg8(reg) => {
                self.regs.set8(reg, value);
                Ok(())
            }
            Operand::Mem(mem, _) => bus.write8(self.effective_address(mem), value),
            other => unreachable!("{other:?} is not an 8-bit destination"),
        }
    }

    /// Read-modify-write of an 8-bit register or memory cell.
    pub(super) fn modify_operand8<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        operand: Operand,
        f: impl FnOnce(&mut Self, u8) -> u8,
    ) -> Result<(), BusFault> {
        let value = self.read_operand8(bus, operand)?;
        let result = f(self, value);
        self.write_operand8(bus, operand, result)
    }
}
