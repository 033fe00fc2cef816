use crate::bus::Bus;
use crate::cpu::Cpu;
use crate::decode::Operand;
use crate::error::BusFault;

impl Cpu {
    #[inline]
    pub(crate) fn push_u16<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        value: u16,
    ) -> Result<(), BusFault> {
        let [lo, hi] = value.to_le_bytes();
        // Stack grows downward: memory[SP] = low, memory[SP+1] = high.
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        bus.write8(self.regs.sp, hi)?;
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        bus.write8(self.regs.sp, lo)
    }

    #[inline]
    pub(crate) fn pop_u16<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u16, BusFault> {
        let lo = bus.read8(self.regs.sp)?;
        let hi = bus.read8(self.regs.sp.wrapping_add(1))?;
        self.regs.sp = self.regs.sp.wrapping_add(2);
        Ok(u16::from_le_bytes([lo, hi]))
    }

    pub(super) fn exec_push<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        ops: &[Operand],
    ) -> Result<(), BusFault> {
        let &[Operand::Reg16(reg)] = ops else {
            unreachable!("PUSH with operands {ops:?}");
        };
        self.push_u16(bus, self.regs.get16(reg))
    }

    /// POP rr. Writing AF goes through the pair setter, which keeps the low
    /// nibble of F at zero.
    pub(super) fn exec_pop<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        ops: &[Operand],
    ) -> Result<(), BusFault> {
        let &[Operand::Reg16(reg)] = ops else {
            unreachable!("POP with operands {ops:?}");
        };
        let value = self.pop_u16(bus)?;
        self.regs.set16(reg, value);
        Ok(())
    }
}
