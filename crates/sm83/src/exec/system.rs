use crate::cpu::{Cpu, Ime};
use crate::decode::Decoded;

impl Cpu {
    /// HALT and STOP both park the CPU until the host wakes it.
    pub(super) fn exec_halt(&mut self, decoded: &Decoded<'_>) {
        log::debug!(
            "{} at 0x{:04X}: halted until woken",
            decoded.descriptor.mnemonic,
            decoded.pc
        );
        self.halt();
    }

    pub(super) fn exec_di(&mut self) {
        self.set_ime(Ime::Disabled);
    }

    pub(super) fn exec_ei(&mut self) {
        // IME becomes 1 after the *next* instruction completes.
        if self.ime() != Ime::Enabled {
            self.set_ime(Ime::Pending);
        }
    }

    pub(super) fn exec_illegal(&mut self, decoded: &Decoded<'_>) {
        log::warn!(
            "illegal opcode {} at 0x{:04X} executed as a no-op",
            decoded.descriptor,
            decoded.pc
        );
    }
}
