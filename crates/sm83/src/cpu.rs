use crate::regs::{Flag, Registers};

/// Execution state of the dispatch loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunState {
    #[default]
    Running,
    /// Entered by HALT or STOP; left only through an external wake signal.
    Halted,
}

/// Interrupt master enable.
///
/// EI does not take effect until the instruction after it has completed,
/// which `Pending` models.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Ime {
    #[default]
    Disabled,
    Pending,
    Enabled,
}

/// SM83 CPU state: registers plus the counters and control latches the
/// dispatch loop needs.
///
/// Only instruction execution mutates it; the host reads it between steps.
#[derive(Clone, Debug)]
pub struct Cpu {
    pub regs: Registers,
    /// Total T-cycles elapsed since power-on or the last reset.
    pub cycles: u64,
    /// Number of instructions executed (halted idle steps excluded).
    pub instructions: u64,
    state: RunState,
    ime: Ime,
    /// Interrupt vector latched by the host, serviced at the next boundary.
    pending_vector: Option<u16>,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    pub fn new() -> Self {
        let mut cpu = Self {
            regs: Registers::default(),
            cycles: 0,
            instructions: 0,
            state: RunState::Running,
            ime: Ime::Disabled,
            pending_vector: None,
        };
        cpu.apply_dmg_boot_state();
        cpu
    }

    /// Reset the CPU to its post-boot state and clear the counters.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Initialize registers to match the DMG boot ROM's state after it
    /// hands control to cartridge code at 0x0100.
    fn apply_dmg_boot_state(&mut self) {
        self.regs.a = 0x01;
        self.regs.f = 0xB0; // Z, N, H, C = 1,0,1,1
        self.regs.b = 0x00;
        self.regs.c = 0x13;
        self.regs.d = 0x00;
        self.regs.e = 0xD8;
        self.regs.h = 0x01;
        self.regs.l = 0x4D;
        self.regs.sp = 0xFFFE;
        self.regs.pc = 0x0100;
    }

    #[inline]
    pub fn get_flag(&self, flag: Flag) -> bool {
        self.regs.flags().contains(flag.mask())
    }

    #[inline]
    pub fn set_flag(&mut self, flag: Flag, value: bool) {
        let mut flags = self.regs.flags();
        flags.set(flag.mask(), value);
        self.regs.set_flags(flags);
    }

    #[inline]
    pub fn state(&self) -> RunState {
        self.state
    }

    #[inline]
    pub fn is_halted(&self) -> bool {
        self.state == RunState::Halted
    }

    pub(crate) fn halt(&mut self) {
        self.state = RunState::Halted;
    }

    /// Leave the halted state. Returns `true` if the CPU was halted.
    pub fn wake(&mut self) -> bool {
        let was_halted = self.is_halted();
        self.state = RunState::Running;
        was_halted
    }

    #[inline]
    pub fn ime(&self) -> Ime {
        self.ime
    }

    #[inline]
    pub fn interrupts_enabled(&self) -> bool {
        self.ime == Ime::Enabled
    }

    pub(crate) fn set_ime(&mut self, ime: Ime) {
        self.ime = ime;
    }

    pub(crate) fn latch_interrupt(&mut self, vector: u16) {
        self.pending_vector = Some(vector);
    }

    pub(crate) fn take_interrupt(&mut self) -> Option<u16> {
        self.pending_vector.take()
    }
}
