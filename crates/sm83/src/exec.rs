mod alu;
mod arith;
mod bits;
mod control;
mod helpers;
mod incdec;
mod ld;
mod stack;
mod system;


use crate::bus::Bus;
use crate::cpu::Cpu;
use crate::decode::{Decoded, Operand};
use crate::error::BusFault;
use crate::table::Mnemonic;

/// Execute one decoded instruction and return the T-cycles it took.
///
/// The caller must already have advanced PC to `decoded.next_pc()`; branches
/// overwrite it, everything else leaves it there. After the instruction runs,
/// the descriptor's flag effects are merged into F, so the per-mnemonic code
/// only has to get the computed flags right.
///
/// On a [`BusFault`] the CPU may be left partly updated;
/// [`Dispatcher::step`](crate::Dispatcher::step) restores it.
pub fn execute<B: Bus + ?Sized>(
    decoded: &Decoded<'_>,
    cpu: &mut Cpu,
    bus: &mut B,
) -> Result<u32, BusFault> {
    let descriptor = decoded.descriptor;
    let before = cpu.regs.flags();
    let taken = cpu.exec_decoded(decoded, bus)?;
    let after = cpu.regs.flags();
    cpu.regs.set_flags(descriptor.flags.apply(before, after));
    Ok(descriptor.cycles_for(taken))
}

impl Cpu {
    /// Run the primitive for `decoded`. Returns whether a branch was taken;
    /// only descriptors with branch cycles look at the answer.
    fn exec_decoded<B: Bus + ?Sized>(
        &mut self,
        decoded: &Decoded<'_>,
        bus: &mut B,
    ) -> Result<bool, BusFault> {
        use Mnemonic as M;

        let mnemonic = decoded.descriptor.mnemonic;
        let ops = &*decoded.operands;

        match mnemonic {
            // The 0xCB lead byte never reaches here on its own; the decoder
            // always resolves it against the prefixed table.
            M::Nop | M::Prefix => {}

            M::Ld | M::Ldh => self.exec_ld(bus, ops)?,

            M::Inc => self.exec_inc(bus, ops)?,
            M::Dec => self.exec_dec(bus, ops)?,

            M::Add if matches!(ops.first(), Some(Operand::Reg16(_))) => self.exec_add16(ops),
            M::Add | M::Adc | M::Sub | M::Sbc | M::And | M::Xor | M::Or | M::Cp => {
                self.exec_alu8(bus, mnemonic, ops)?
            }
            M::Daa => self.alu_daa(),
            M::Cpl => self.exec_cpl(),
            M::Scf => self.exec_scf(),
            M::Ccf => self.exec_ccf(),

            M::Rlca | M::Rrca | M::Rla | M::Rra => self.exec_rotate_a(mnemonic),
            M::Rlc | M::Rrc | M::Rl | M::Rr | M::Sla | M::Sra | M::Swap | M::Srl => {
                self.exec_shift(bus, mnemonic, ops)?
            }
            M::Bit => self.exec_bit(bus, ops)?,
            M::Res | M::Set => self.exec_res_set(bus, mnemonic, ops)?,

            M::Jr => return Ok(self.exec_jr(ops)),
            M::Jp => return Ok(self.exec_jp(ops)),
            M::Call => return self.exec_call(bus, ops),
            M::Ret => return self.exec_ret(bus, ops),
            M::Reti => self.exec_reti(bus)?,
            M::Rst => self.exec_rst(bus, ops)?,

            M::Push => self.exec_push(bus, ops)?,
            M::Pop => self.exec_pop(bus, ops)?,

            M::Halt | M::Stop => self.exec_halt(decoded),
            M::Di => self.exec_di(),
            M::Ei => self.exec_ei(),
            M::Illegal => self.exec_illegal(decoded),
        }

        Ok(false)
    }
}
