use crate::bus::Bus;
use crate::cpu::Cpu;
use crate::decode::Operand;
use crate::error::BusFault;
use crate::regs::Flag;
use crate::table::Mnemonic;

impl Cpu {
    /// Rotate or shift `value` the way `mnemonic` does, returning the result
    /// and the bit shifted out.
    fn shift_value(&self, mnemonic: Mnemonic, value: u8) -> (u8, bool) {
        let carry_in = self.get_flag(Flag::C);
        match mnemonic {
            Mnemonic::Rlc => (value.rotate_left(1), value & 0x80 != 0),
            Mnemonic::Rrc => (value.rotate_right(1), value & 0x01 != 0),
            Mnemonic::Rl => ((value << 1) | u8::from(carry_in), value & 0x80 != 0),
            Mnemonic::Rr => (
                (value >> 1) | if carry_in { 0x80 } else { 0 },
                value & 0x01 != 0,
            ),
            Mnemonic::Sla => (value << 1, value & 0x80 != 0),
            Mnemonic::Sra => ((value >> 1) | (value & 0x80), value & 0x01 != 0),
            Mnemonic::Swap => (value.rotate_left(4), false),
            Mnemonic::Srl => (value >> 1, value & 0x01 != 0),
            _ => unreachable!("{mnemonic} is not a rotate or shift"),
        }
    }

    /// RLCA/RRCA/RLA/RRA: the CB rotates applied to A, with Z always clear.
    pub(super) fn exec_rotate_a(&mut self, mnemonic: Mnemonic) {
        let base = match mnemonic {
            Mnemonic::Rlca => Mnemonic::Rlc,
            Mnemonic::Rrca => Mnemonic::Rrc,
            Mnemonic::Rla => Mnemonic::Rl,
            Mnemonic::Rra => Mnemonic::Rr,
            _ => unreachable!("{mnemonic} is not an accumulator rotate"),
        };
        let (result, carry) = self.shift_value(base, self.regs.a);
        self.regs.a = result;

        self.clear_flags();
        self.set_flag(Flag::C, carry);
    }

    /// CB rotates, shifts and SWAP on a register or `(HL)`.
    pub(super) fn exec_shift<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        mnemonic: Mnemonic,
        ops: &[Operand],
    ) -> Result<(), BusFault> {
        let &[target] = ops else {
            unreachable!("{mnemonic} with operands {ops:?}");
        };
        self.modify_operand8(bus, target, |cpu, value| {
            let (result, carry) = cpu.shift_value(mnemonic, value);
            cpu.clear_flags();
            cpu.set_flag(Flag::Z, result == 0);
            cpu.set_flag(Flag::C, carry);
            result
        })
    }

    /// BIT b,r: Z is the complement of the tested bit; C is untouched.
    pub(super) fn exec_bit<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        ops: &[Operand],
    ) -> Result<(), BusFault> {
        let &[Operand::Bit(bit), target] = ops else {
            unreachable!("BIT with operands {ops:?}");
        };
        let value = self.read_operand8(bus, target)?;
        self.set_flag(Flag::Z, value & (1 << bit) == 0);
        self.set_flag(Flag::N, false);
        self.set_flag(Flag::H, true);
        Ok(())
    }

    pub(super) fn exec_res_set<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        mnemonic: Mnemonic,
        ops: &[Operand],
    ) -> Result<(), BusFault> {
        let &[Operand::Bit(bit), target] = ops else {
            unreachable!("{mnemonic} with operands {ops:?}");
        };
        let mask = 1u8 << bit;
        self.modify_operand8(bus, target, |_, value| match mnemonic {
            Mnemonic::Set => value | mask,
            _ => value & !mask,
        })
    }
}
