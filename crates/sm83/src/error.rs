use thiserror::Error;

/// The opcode metadata could not be turned into a complete table.
///
/// Raised only while building an [`OpcodeTable`](crate::OpcodeTable); a
/// table that built successfully never produces one afterwards.
#[derive(Debug, Error)]
pub enum BuildFault {
    #[error("opcode metadata is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read opcode metadata: {0}")]
    Io(#[from] std::io::Error),

    #[error("{table} table has a malformed opcode key {key:?}")]
    BadKey { table: &'static str, key: String },

    #[error("{table} table has opcode 0x{opcode:02X} more than once")]
    DuplicateOpcode { table: &'static str, opcode: u8 },

    #[error("{table} table is missing opcode 0x{opcode:02X}")]
    MissingOpcode { table: &'static str, opcode: u8 },

    #[error("opcode {context} has unknown mnemonic {mnemonic:?}")]
    UnknownMnemonic { context: String, mnemonic: String },

    #[error("opcode {context} has an operand that cannot be classified: {operand:?}")]
    UnknownOperand { context: String, operand: String },

    #[error("opcode {context} lists {count} operands (at most 3 are supported)")]
    TooManyOperands { context: String, count: usize },

    #[error("opcode {context} has operands {shape} that {mnemonic} cannot execute")]
    BadShape {
        context: String,
        mnemonic: String,
        shape: String,
    },

    #[error("opcode {context} claims {bytes} bytes but its operands need {expected}")]
    BadLength {
        context: String,
        bytes: u8,
        expected: u8,
    },

    #[error("opcode {context} has an invalid effect {effect:?} for flag {flag}")]
    BadFlagEffect {
        context: String,
        flag: char,
        effect: String,
    },

    #[error("opcode {context} has an invalid cycle list {cycles:?}")]
    BadCycles { context: String, cycles: Vec<u32> },
}

/// An address access rejected by the bus implementation.
///
/// The core never swallows these: they surface from
/// [`Dispatcher::step`](crate::Dispatcher::step) unchanged so the host can
/// decide whether to abort, ignore or trap.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BusFault {
    #[error("write of 0x{value:02X} to read-only address 0x{addr:04X}")]
    ReadOnly { addr: u16, value: u8 },

    #[error("access to unmapped address 0x{addr:04X}")]
    Unmapped { addr: u16 },

    #[error("bus rejected access to 0x{addr:04X}: {reason}")]
    Custom { addr: u16, reason: String },
}
