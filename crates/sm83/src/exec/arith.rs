use crate::bus::Bus;
use crate::cpu::Cpu;
use crate::decode::Operand;
use crate::error::BusFault;
use crate::regs::{Flag, Register8};
use crate::table::Mnemonic;

impl Cpu {
    /// ADD/ADC/SUB/SBC/AND/XOR/OR/CP with A as the implicit destination.
    pub(super) fn exec_alu8<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        mnemonic: Mnemonic,
        ops: &[Operand],
    ) -> Result<(), BusFault> {
        let src = match *ops {
            [Operand::Reg8(Register8::A), src] | [src] => src,
            _ => unreachable!("{mnemonic} with operands {ops:?}"),
        };
        let value = self.read_operand8(bus, src)?;

        match mnemonic {
            Mnemonic::Add => self.alu_add(value, false),
            Mnemonic::Adc => self.alu_add(value, true),
            Mnemonic::Sub => self.regs.a = self.alu_sub(value, false),
            Mnemonic::Sbc => self.regs.a = self.alu_sub(value, true),
            Mnemonic::And => self.alu_and(value),
            Mnemonic::Xor => self.alu_xor(value),
            Mnemonic::Or => self.alu_or(value),
            Mnemonic::Cp => {
                self.alu_sub(value, false);
            }
            _ => unreachable!("{mnemonic} is not an 8-bit ALU operation"),
        }
        Ok(())
    }

    /// `ADD HL,rr` and `ADD SP,r8`.
    pub(super) fn exec_add16(&mut self, ops: &[Operand]) {
        match *ops {
            [Operand::Reg16(dst), Operand::Reg16(src)] => {
                let result = self.alu_add16(self.regs.get16(dst), self.regs.get16(src));
                self.regs.set16(dst, result);
            }
            [Operand::Reg16(dst), Operand::Rel8(offset)] => {
                let result = self.alu_add16_signed(self.regs.get16(dst), offset);
                self.regs.set16(dst, result);
            }
            _ => unreachable!("ADD with operands {ops:?}"),
        }
    }

    pub(super) fn exec_cpl(&mut self) {
        self.regs.a = !self.regs.a;
        self.set_flag(Flag::N, true);
        self.set_flag(Flag::H, true);
    }

    pub(super) fn exec_scf(&mut self) {
        self.set_flag(Flag::N, false);
        self.set_flag(Flag::H, false);
        self.set_flag(Flag::C, true);
    }

    pub(super) fn exec_ccf(&mut self) {
        let carry = self.get_flag(Flag::C);
        self.set_flag(Flag::N, false);
        self.set_flag(Flag::H, false);
        self.set_flag(Flag::C, !carry);
    }
}
