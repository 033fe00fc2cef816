use crate::bus::Bus;
use crate::cpu::Cpu;
use crate::decode::Operand;
use crate::error::BusFault;

impl Cpu {
    /// LD and LDH in all their addressing forms.
    pub(super) fn exec_ld<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        ops: &[Operand],
    ) -> Result<(), BusFault> {
        match *ops {
            // LD HL,SP+r8
            [Operand::Reg16(dst), Operand::Reg16(base), Operand::Rel8(offset)] => {
                let value = self.alu_add16_signed(self.regs.get16(base), offset);
                self.regs.set16(dst, value);
            }
            [Operand::Reg16(dst), Operand::Imm16(value)] => self.regs.set16(dst, value),
            [Operand::Reg16(dst), Operand::Reg16(src)] => {
                let value = self.regs.get16(src);
                self.regs.set16(dst, value);
            }
            // LD (a16),SP
            [Operand::Mem(mem, _), Operand::Reg16(src)] => {
                let addr = self.effective_address(mem);
                bus.write16(addr, self.regs.get16(src))?;
            }
            [dst, src] => {
                let value = self.read_operand8(bus, src)?;
                self.write_operand8(bus, dst, value)?;
                for operand in [dst, src] {
                    if let Operand::Mem(mem, post_op) = operand {
                        self.apply_post_op(mem, post_op);
                    }
                }
            }
            _ => unreachable!("LD with operands {ops:?}"),
        }
        Ok(())
    }
}
