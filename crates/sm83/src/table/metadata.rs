//! Serde schema of the opcode metadata document.
//!
//! The layout follows the widely shared `Opcodes.json` format: two objects,
//! `unprefixed` and `cbprefixed`, keyed by `0xNN` strings.

use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Metadata {
    pub unprefixed: BTreeMap<String, RawOpcode>,
    pub cbprefixed: BTreeMap<String, RawOpcode>,
}

#[derive(Debug, Deserialize)]
pub struct RawOpcode {
    pub mnemonic: String,
    pub bytes: u8,
    /// T-cycles; the first entry is the base cost, an optional second entry
    /// is the cost when a conditional branch is taken.
    pub cycles: Vec<u32>,
    #[serde(default)]
    pub operands: Vec<RawOperand>,
    #[serde(default)]
    pub flags: RawFlags,
}

#[derive(Debug, Deserialize)]
pub struct RawOperand {
    pub name: String,
    #[serde(default = "default_immediate")]
    pub immediate: bool,
    #[serde(default)]
    pub increment: bool,
    #[serde(default)]
    pub decrement: bool,
}

fn default_immediate() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct RawFlags {
    #[serde(rename = "Z", default = "unaffected")]
    pub z: String,
    #[serde(rename = "N", default = "unaffected")]
    pub n: String,
    #[serde(rename = "H", default = "unaffected")]
    pub h: String,
    #[serde(rename = "C", default = "unaffected")]
    pub c: String,
}

impl Default for RawFlags {
    fn default() -> Self {
        Self {
            z: unaffected(),
            n: unaffected(),
            h: unaffected(),
            c: unaffected(),
        }
    }
}

fn unaffected() -> String {
    "-".to_string()
}
