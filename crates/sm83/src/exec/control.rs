use crate::bus::Bus;
use crate::cpu::{Cpu, Ime};
use crate::decode::Operand;
use crate::error::BusFault;

// PC already points past the instruction when these run, so relative jumps
// and return addresses are taken from it directly.
impl Cpu {
    pub(super) fn exec_jr(&mut self, ops: &[Operand]) -> bool {
        let (cond, offset) = match *ops {
            [Operand::Rel8(offset)] => (None, offset),
            [Operand::Condition(cond), Operand::Rel8(offset)] => (Some(cond), offset),
            _ => unreachable!("JR with operands {ops:?}"),
        };
        if !self.condition_holds(cond) {
            return false;
        }
        self.regs.pc = self.regs.pc.wrapping_add(offset as i16 as u16);
        true
    }

    pub(super) fn exec_jp(&mut self, ops: &[Operand]) -> bool {
        let (cond, target) = match *ops {
            [Operand::Imm16(target)] => (None, target),
            [Operand::Condition(cond), Operand::Imm16(target)] => (Some(cond), target),
            // JP HL
            [Operand::Reg16(reg)] => (None, self.regs.get16(reg)),
            _ => unreachable!("JP with operands {ops:?}"),
        };
        if !self.condition_holds(cond) {
            return false;
        }
        self.regs.pc = target;
        true
    }

    pub(super) fn exec_call<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        ops: &[Operand],
    ) -> Result<bool, BusFault> {
        let (cond, target) = match *ops {
            [Operand::Imm16(target)] => (None, target),
            [Operand::Condition(cond), Operand::Imm16(target)] => (Some(cond), target),
            _ => unreachable!("CALL with operands {ops:?}"),
        };
        if !self.condition_holds(cond) {
            return Ok(false);
        }
        self.push_u16(bus, self.regs.pc)?;
        self.regs.pc = target;
        Ok(true)
    }

    pub(super) fn exec_ret<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        ops: &[Operand],
    ) -> Result<bool, BusFault> {
        let cond = match *ops {
            [] => None,
            [Operand::Condition(cond)] => Some(cond),
            _ => unreachable!("RET with operands {ops:?}"),
        };
        if !self.condition_holds(cond) {
            return Ok(false);
        }
        self.regs.pc = self.pop_u16(bus)?;
        Ok(true)
    }

    /// RETI re-enables interrupts immediately, unlike EI.
    pub(super) fn exec_reti<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<(), BusFault> {
        self.regs.pc = self.pop_u16(bus)?;
        self.set_ime(Ime::Enabled);
        Ok(())
    }

    pub(super) fn exec_rst<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        ops: &[Operand],
    ) -> Result<(), BusFault> {
        let &[Operand::Vector(vector)] = ops else {
            unreachable!("RST with operands {ops:?}");
        };
        self.push_u16(bus, self.regs.pc)?;
        self.regs.pc = vector as u16;
        Ok(())
    }
}
