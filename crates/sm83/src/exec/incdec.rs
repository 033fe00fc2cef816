use crate::bus::Bus;
use crate::cpu::Cpu;
use crate::decode::Operand;
use crate::error::BusFault;

impl Cpu {
    pub(super) fn exec_inc<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        ops: &[Operand],
    ) -> Result<(), BusFault> {
        match *ops {
            // 16-bit INC rr does not touch flags.
            [Operand::Reg16(reg)] => {
                let value = self.regs.get16(reg).wrapping_add(1);
                self.regs.set16(reg, value);
                Ok(())
            }
            [target] => self.modify_operand8(bus, target, Self::alu_inc8),
            _ => unreachable!("INC with operands {ops:?}"),
        }
    }

    pub(super) fn exec_dec<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        ops: &[Operand],
    ) -> Result<(), BusFault> {
        match *ops {
            [Operand::Reg16(reg)] => {
                let value = self.regs.get16(reg).wrapping_sub(1);
                self.regs.set16(reg, value);
                Ok(())
            }
            [target] => self.modify_operand8(bus, target, Self::alu_dec8),
            _ => unreachable!("DEC with operands {ops:?}"),
        }
    }
}
