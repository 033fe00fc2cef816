pub mod bus;
pub mod cpu;
pub mod decode;
pub mod dispatch;
pub mod error;
pub mod exec;
pub mod regs;
pub mod table;

pub use bus::{Bus, FlatBus};
pub use cpu::{Cpu, Ime, RunState};
pub use decode::{decode, Decoded, MemRef, Operand};
pub use dispatch::{
    DispatchConfig, Dispatcher, HostSignal, RunOutcome, StopHandle, CYCLES_PER_FRAME,
};
pub use error::{BuildFault, BusFault};
pub use exec::execute;
pub use regs::{Condition, Flag, Flags, Register16, Register8, Registers};
pub use table::{InstructionDescriptor, Mnemonic, OpcodeTable, OperandKind};
