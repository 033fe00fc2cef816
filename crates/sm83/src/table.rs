mod classify;
mod descriptor;
mod metadata;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::io::Read;

use lazy_static::lazy_static;

pub use descriptor::{
    Address, FlagEffect, FlagEffects, InstructionDescriptor, Mnemonic, OperandKind, PostOp,
};
pub use metadata::{Metadata, RawFlags, RawOpcode, RawOperand};

use crate::error::BuildFault;

/// Lead byte that selects the CB-prefixed table.
pub const CB_PREFIX: u8 = 0xCB;

const BUILTIN_METADATA: &str = include_str!("../data/opcodes.json");

lazy_static! {
    static ref BUILTIN: OpcodeTable = match OpcodeTable::from_json(BUILTIN_METADATA) {
        Ok(table) => table,
        Err(err) => panic!("built-in opcode metadata is inconsistent: {err}"),
    };
}

/// Fixed mapping from opcode bytes to instruction descriptors.
///
/// Holds exactly 256 primary and 256 CB-prefixed descriptors, so
/// [`lookup`](Self::lookup) is total. Immutable once built.
#[derive(Clone, Debug)]
pub struct OpcodeTable {
    primary: Box<[InstructionDescriptor]>,
    prefixed: Box<[InstructionDescriptor]>,
}

impl OpcodeTable {
    /// The table built from the metadata embedded in this crate.
    ///
    /// Built on first use. Panics if the embedded metadata is inconsistent,
    /// which aborts startup rather than running with a partial table.
    pub fn builtin() -> &'static OpcodeTable {
        &BUILTIN
    }

    pub fn from_json(json: &str) -> Result<Self, BuildFault> {
        let metadata: Metadata = serde_json::from_str(json)?;
        Self::from_metadata(&metadata)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, BuildFault> {
        let metadata: Metadata = serde_json::from_reader(reader)?;
        Self::from_metadata(&metadata)
    }

    pub fn from_metadata(metadata: &Metadata) -> Result<Self, BuildFault> {
        let primary = build_half("unprefixed", false, &metadata.unprefixed)?;
        let prefixed = build_half("cbprefixed", true, &metadata.cbprefixed)?;
        log::debug!(
            "built opcode table: {} unprefixed, {} cb-prefixed descriptors",
            primary.len(),
            prefixed.len()
        );
        Ok(Self { primary, prefixed })
    }

    /// Descriptor for `byte`, taken from the CB table when `prefix` is set.
    #[inline]
    pub fn lookup(&self, prefix: bool, byte: u8) -> &InstructionDescriptor {
        if prefix {
            &self.prefixed[byte as usize]
        } else {
            &self.primary[byte as usize]
        }
    }

    /// All 512 descriptors, unprefixed first.
    pub fn iter(&self) -> impl Iterator<Item = &InstructionDescriptor> {
        self.primary.iter().chain(self.prefixed.iter())
    }
}

fn build_half(
    table: &'static str,
    prefixed: bool,
    entries: &BTreeMap<String, RawOpcode>,
) -> Result<Box<[InstructionDescriptor]>, BuildFault> {
    let mut slots: Vec<Option<InstructionDescriptor>> = vec![None; 256];

    for (key, raw) in entries {
        let opcode = parse_key(key).ok_or_else(|| BuildFault::BadKey {
            table,
            key: key.clone(),
        })?;
        let slot = &mut slots[opcode as usize];
        if slot.is_some() {
            return Err(BuildFault::DuplicateOpcode { table, opcode });
        }
        let context = format!("{table} 0x{opcode:02X}");
        *slot = Some(classify::build_descriptor(opcode, prefixed, raw, &context)?);
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(opcode, slot)| {
            slot.ok_or(BuildFault::MissingOpcode {
                table,
                opcode: opcode as u8,
            })
        })
        .collect()
}

/// Parse a `0xNN` key (hex digits in either case).
fn parse_key(key: &str) -> Option<u8> {
    let digits = key.strip_prefix("0x").or_else(|| key.strip_prefix("0X"))?;
    if digits.len() != 2 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(digits, 16).ok()
}
