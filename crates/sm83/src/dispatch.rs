
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use typed_builder::TypedBuilder;

use crate::bus::Bus;
use crate::cpu::{Cpu, Ime};
use crate::decode::{decode, Decoded};
use crate::error::BusFault;
use crate::exec::execute;
use crate::table::OpcodeTable;

/// T-cycles in one DMG video frame.
pub const CYCLES_PER_FRAME: u64 = 70_224;

/// Cost of servicing an interrupt: two pushes, the jump and the idle cycles.
const INTERRUPT_CYCLES: u32 = 20;

/// Cost of one idle step while halted.
const HALTED_CYCLES: u32 = 4;

/// Tuning for [`Dispatcher::run`].
#[derive(Clone, Copy, Debug, TypedBuilder)]
pub struct DispatchConfig {
    /// Cycle budget of one slice; the stop flag and instruction limit are
    /// also honoured inside a slice.
    #[builder(default = CYCLES_PER_FRAME)]
    pub slice_cycles: u64,
    /// Stop after this many executed instructions.
    #[builder(default, setter(strip_option))]
    pub max_instructions: Option<u64>,
    /// End the run once the CPU halts. Useful for hosts with no source of
    /// wake signals, where a halt would otherwise idle forever.
    #[builder(default)]
    pub stop_on_halt: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// What the host wants after being told about an instruction's cycles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HostSignal {
    #[default]
    Continue,
    /// Wake a halted CPU before the next step.
    Wake,
    /// End the run at this instruction boundary.
    Stop,
}

/// Why [`Dispatcher::run_slice`] or [`Dispatcher::run`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The slice's cycle budget was used up.
    BudgetSpent,
    /// A stop was requested through a [`StopHandle`] or [`HostSignal::Stop`].
    Stopped,
    /// [`DispatchConfig::max_instructions`] was reached.
    InstructionLimit,
    /// The CPU halted and [`DispatchConfig::stop_on_halt`] is set.
    Halted,
}

/// Cloneable handle that asks a running dispatcher to stop at the next
/// instruction boundary. Safe to use from another thread.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives fetch, decode and execute for one CPU over one bus.
///
/// The dispatcher owns the CPU; `B` may be an owned bus or a `&mut`
/// borrow of one.
pub struct Dispatcher<'t, B: Bus> {
    cpu: Cpu,
    bus: B,
    table: &'t OpcodeTable,
    config: DispatchConfig,
    stop: StopHandle,
}

impl<'t, B: Bus> Dispatcher<'t, B> {
    pub fn new(table: &'t OpcodeTable, bus: B) -> Self {
        Self::with_config(table, bus, DispatchConfig::default())
    }

    pub fn with_config(table: &'t OpcodeTable, bus: B, config: DispatchConfig) -> Self {
        Self {
            cpu: Cpu::new(),
            bus,
            table,
            config,
            stop: StopHandle::default(),
        }
    }

    #[inline]
    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    /// Mutable CPU access for the host between steps (e.g. to set PC).
    #[inline]
    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    #[inline]
    pub fn bus(&self) -> &B {
        &self.bus
    }

    #[inline]
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    #[inline]
    pub fn table(&self) -> &'t OpcodeTable {
        self.table
    }

    #[inline]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn into_parts(self) -> (Cpu, B) {
        (self.cpu, self.bus)
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// External wake signal. Returns `true` if the CPU was halted.
    pub fn wake(&mut self) -> bool {
        let woke = self.cpu.wake();
        if woke {
            log::debug!("woken at PC=0x{:04X}", self.cpu.regs.pc);
        }
        woke
    }

    /// Minimal interrupt hook.
    ///
    /// Always wakes a halted CPU. If IME is enabled, the next [`step`]
    /// pushes PC, jumps to `vector` and disables IME instead of executing
    /// an instruction.
    ///
    /// [`step`]: Self::step
    pub fn request_interrupt(&mut self, vector: u16) {
        self.wake();
        if self.cpu.interrupts_enabled() {
            self.cpu.latch_interrupt(vector);
        } else {
            log::debug!("interrupt 0x{vector:04X} ignored: IME is {:?}", self.cpu.ime());
        }
    }

    /// Run one instruction boundary and return the T-cycles it took.
    ///
    /// A [`BusFault`] leaves the CPU exactly as it was before the step:
    /// registers, IME and any latched interrupt are restored, and neither
    /// counter moves. Bus writes that succeeded before the fault stay.
    pub fn step(&mut self) -> Result<u32, BusFault> {
        let saved = self.cpu.clone();
        let result = self.step_inner();
        if let Err(err) = &result {
            log::debug!(
                "bus fault at PC=0x{:04X}, CPU state rolled back: {err}",
                saved.regs.pc
            );
            self.cpu = saved;
        }
        result
    }

    fn step_inner(&mut self) -> Result<u32, BusFault> {
        if let Some(vector) = self.cpu.take_interrupt() {
            return self.service_interrupt(vector);
        }

        if self.cpu.is_halted() {
            self.cpu.cycles += HALTED_CYCLES as u64;
            return Ok(HALTED_CYCLES);
        }

        let decoded = decode(self.table, &mut self.bus, self.cpu.regs.pc)?;
        if log::log_enabled!(log::Level::Trace) {
            self.trace(&decoded);
        }

        let ei_pending = self.cpu.ime() == Ime::Pending;
        self.cpu.regs.pc = decoded.next_pc();
        let cycles = execute(&decoded, &mut self.cpu, &mut self.bus)?;

        // EI takes effect once the instruction after it has completed.
        if ei_pending && self.cpu.ime() == Ime::Pending {
            self.cpu.set_ime(Ime::Enabled);
        }

        self.cpu.cycles += cycles as u64;
        self.cpu.instructions += 1;
        Ok(cycles)
    }

    /// Step until at least `budget` cycles have elapsed or a stop is
    /// requested. `on_cycles` sees every step's cycle count.
    pub fn run_slice<F>(&mut self, budget: u64, mut on_cycles: F) -> Result<RunOutcome, BusFault>
    where
        F: FnMut(u32) -> HostSignal,
    {
        self.run_until(budget, None, &mut on_cycles)
    }

    /// Run slices of [`DispatchConfig::slice_cycles`] until stopped or the
    /// instruction limit is hit. Never returns [`RunOutcome::BudgetSpent`].
    pub fn run<F>(&mut self, mut on_cycles: F) -> Result<RunOutcome, BusFault>
    where
        F: FnMut(u32) -> HostSignal,
    {
        let limit = self.config.max_instructions;
        let slice = self.config.slice_cycles.max(1);
        loop {
            match self.run_until(slice, limit, &mut on_cycles)? {
                RunOutcome::BudgetSpent => continue,
                outcome => return Ok(outcome),
            }
        }
    }

    fn run_until<F>(
        &mut self,
        budget: u64,
        limit: Option<u64>,
        on_cycles: &mut F,
    ) -> Result<RunOutcome, BusFault>
    where
        F: FnMut(u32) -> HostSignal,
    {
        let mut elapsed = 0u64;
        loop {
            if self.stop.is_stop_requested() {
                self.stop.clear();
                return Ok(RunOutcome::Stopped);
            }
            if limit.is_some_and(|limit| self.cpu.instructions >= limit) {
                return Ok(RunOutcome::InstructionLimit);
            }
            if self.config.stop_on_halt && self.cpu.is_halted() {
                return Ok(RunOutcome::Halted);
            }
            if elapsed >= budget {
                return Ok(RunOutcome::BudgetSpent);
            }

            let cycles = self.step()?;
            elapsed += cycles as u64;

            match on_cycles(cycles) {
                HostSignal::Continue => {}
                HostSignal::Wake => {
                    self.wake();
                }
                HostSignal::Stop => self.stop.request_stop(),
            }
        }
    }

    fn service_interrupt(&mut self, vector: u16) -> Result<u32, BusFault> {
        log::debug!(
            "servicing interrupt 0x{vector:04X} from PC=0x{:04X}",
            self.cpu.regs.pc
        );
        self.cpu.push_u16(&mut self.bus, self.cpu.regs.pc)?;
        self.cpu.set_ime(Ime::Disabled);
        self.cpu.regs.pc = vector;
        self.cpu.cycles += INTERRUPT_CYCLES as u64;
        Ok(INTERRUPT_CYCLES)
    }

    fn trace(&self, decoded: &Decoded<'_>) {
        let regs = &self.cpu.regs;
        log::trace!(
            "PC:{:04X} SP:{:04X} AF:{:04X} BC:{:04X} DE:{:04X} HL:{:04X} IME:{:?}  {}",
            regs.pc,
            regs.sp,
            regs.af(),
            regs.bc(),
            regs.de(),
            regs.hl(),
            self.cpu.ime(),
            decoded
        );
    }
}
