use crate::error::BuildFault;
use crate::regs::{Condition, Flag, Register16, Register8};

use super::descriptor::{
    Address, FlagEffect, FlagEffects, InstructionDescriptor, Mnemonic, OperandKind, PostOp,
};
use super::metadata::{RawFlags, RawOpcode, RawOperand};

const MAX_OPERANDS: usize = 3;

/// Turn one metadata entry into a descriptor.
///
/// `context` names the entry in error messages (e.g. `cbprefixed 0x7C`).
pub(super) fn build_descriptor(
    opcode: u8,
    prefixed: bool,
    raw: &RawOpcode,
    context: &str,
) -> Result<InstructionDescriptor, BuildFault> {
    let mnemonic =
        Mnemonic::from_name(&raw.mnemonic).ok_or_else(|| BuildFault::UnknownMnemonic {
            context: context.to_string(),
            mnemonic: raw.mnemonic.clone(),
        })?;

    if mnemonic == Mnemonic::Illegal {
        return Ok(InstructionDescriptor::illegal(opcode, prefixed));
    }

    if raw.operands.len() > MAX_OPERANDS {
        return Err(BuildFault::TooManyOperands {
            context: context.to_string(),
            count: raw.operands.len(),
        });
    }

    let operands = raw
        .operands
        .iter()
        .map(|operand| classify(mnemonic, operand, context))
        .collect::<Result<Vec<_>, _>>()?;

    if !shape_supported(mnemonic, &operands) {
        let shape = operands
            .iter()
            .map(|op| op.to_string())
            .collect::<Vec<_>>()
            .join(",");
        return Err(BuildFault::BadShape {
            context: context.to_string(),
            mnemonic: mnemonic.to_string(),
            shape: format!("[{shape}]"),
        });
    }

    let expected = 1
        + u8::from(prefixed)
        + operands
            .iter()
            .map(|op| op.immediate_bytes())
            .sum::<u8>();
    if raw.bytes != expected {
        return Err(BuildFault::BadLength {
            context: context.to_string(),
            bytes: raw.bytes,
            expected,
        });
    }

    let (cycles, branch_cycles) = parse_cycles(&raw.cycles, context)?;

    Ok(InstructionDescriptor {
        opcode,
        prefixed,
        mnemonic,
        operands,
        length: raw.bytes,
        cycles,
        branch_cycles,
        flags: parse_flags(&raw.flags, context)?,
    })
}

/// Classify one operand in the context of its instruction.
pub(super) fn classify(
    mnemonic: Mnemonic,
    operand: &RawOperand,
    context: &str,
) -> Result<OperandKind, BuildFault> {
    let unknown = || BuildFault::UnknownOperand {
        context: context.to_string(),
        operand: operand.name.clone(),
    };

    let base = classify_name(mnemonic, &operand.name).ok_or_else(unknown)?;
    if operand.immediate {
        return Ok(base);
    }

    let post_op = match (mnemonic, operand.increment, operand.decrement) {
        (Mnemonic::Ld, true, true) => return Err(unknown()),
        (Mnemonic::Ld, true, false) => PostOp::Increment,
        (Mnemonic::Ld, false, true) => PostOp::Decrement,
        _ => PostOp::None,
    };

    let address = match base {
        OperandKind::Reg16(reg) => Address::Pair(reg),
        OperandKind::Reg8(reg) => Address::High(reg),
        OperandKind::Imm8 => Address::HighImm8,
        OperandKind::Imm16 => Address::Absolute,
        _ => return Err(unknown()),
    };
    if post_op != PostOp::None && !matches!(address, Address::Pair(_)) {
        return Err(unknown());
    }

    Ok(OperandKind::Indirect(address, post_op))
}

fn classify_name(mnemonic: Mnemonic, name: &str) -> Option<OperandKind> {
    if mnemonic == Mnemonic::Rst {
        let digits = name.strip_suffix('H').unwrap_or(name);
        return u8::from_str_radix(digits, 16)
            .ok()
            .map(OperandKind::Vector);
    }

    if let Some(reg) = Register16::from_name(name) {
        return Some(OperandKind::Reg16(reg));
    }

    if let Some(reg) = Register8::from_name(name) {
        if mnemonic.is_condition_bearing() && matches!(reg, Register8::C | Register8::H) {
            return Condition::from_name(name).map(OperandKind::Condition);
        }
        return Some(OperandKind::Reg8(reg));
    }

    if let Some(cond) = Condition::from_name(name) {
        return Some(OperandKind::Condition(cond));
    }

    match name {
        "d8" | "a8" => Some(OperandKind::Imm8),
        "d16" | "a16" => Some(OperandKind::Imm16),
        "r8" => Some(OperandKind::Rel8),
        "0" | "1" | "2" | "3" | "4" | "5" | "6" | "7" => name.parse().ok().map(OperandKind::Bit),
        _ => None,
    }
}

/// Operand combinations the executor implements for each mnemonic.
fn shape_supported(mnemonic: Mnemonic, operands: &[OperandKind]) -> bool {
    use Mnemonic as M;
    use OperandKind::{Condition as Cond, Imm16, Indirect, Reg16, Reg8, Rel8, Vector};

    let is_mem = |op: &OperandKind| matches!(op, Indirect(..));
    let is_dst8 = |op: &OperandKind| matches!(op, Reg8(_) | Indirect(..));
    let is_src8 = |op: &OperandKind| matches!(op, Reg8(_) | OperandKind::Imm8 | Indirect(..));

    match (mnemonic, operands) {
        (
            M::Nop
            | M::Rlca
            | M::Rrca
            | M::Rla
            | M::Rra
            | M::Daa
            | M::Cpl
            | M::Scf
            | M::Ccf
            | M::Halt
            | M::Di
            | M::Ei
            | M::Prefix
            | M::Reti,
            [],
        ) => true,
        (M::Stop, [] | [OperandKind::Imm8]) => true,
        (M::Ld, [Reg16(_), Reg16(Register16::SP), Rel8]) => true,
        (M::Ld, [Reg16(_), Imm16 | Reg16(_)]) => true,
        (M::Ld, [Indirect(Address::Absolute, _), Reg16(_)]) => true,
        (M::Ld | M::Ldh, [dst, src]) => {
            is_dst8(dst) && is_src8(src) && !(is_mem(dst) && is_mem(src))
        }
        (M::Inc | M::Dec, [Reg16(_)]) => true,
        (M::Inc | M::Dec, [op]) => is_dst8(op),
        (M::Add, [Reg16(_), Reg16(_) | Rel8]) => true,
        (M::Add | M::Adc | M::Sbc, [Reg8(Register8::A), src]) => is_src8(src),
        (M::Add | M::Adc | M::Sub | M::Sbc | M::And | M::Xor | M::Or | M::Cp, [src]) => {
            is_src8(src)
        }
        (M::Jr, [Rel8] | [Cond(_), Rel8]) => true,
        (M::Jp, [Imm16] | [Cond(_), Imm16] | [Reg16(_)]) => true,
        (M::Call, [Imm16] | [Cond(_), Imm16]) => true,
        (M::Ret, [] | [Cond(_)]) => true,
        (M::Rst, [Vector(_)]) => true,
        (M::Push | M::Pop, [Reg16(_)]) => true,
        (M::Rlc | M::Rrc | M::Rl | M::Rr | M::Sla | M::Sra | M::Swap | M::Srl, [op]) => {
            is_dst8(op)
        }
        (M::Bit | M::Res | M::Set, [OperandKind::Bit(_), op]) => is_dst8(op),
        _ => false,
    }
}

/// Base cost first; a second entry is the branch-taken cost and must be
/// the larger of the two.
fn parse_cycles(cycles: &[u32], context: &str) -> Result<(u32, Option<u32>), BuildFault> {
    let valid = !cycles.is_empty()
        && cycles.len() <= 2
        && cycles.iter().all(|&c| c != 0 && c % 4 == 0)
        && cycles.get(1).map_or(true, |&taken| taken > cycles[0]);
    if !valid {
        return Err(BuildFault::BadCycles {
            context: context.to_string(),
            cycles: cycles.to_vec(),
        });
    }
    Ok((cycles[0], cycles.get(1).copied()))
}

fn parse_flags(raw: &RawFlags, context: &str) -> Result<FlagEffects, BuildFault> {
    let effect = |flag: Flag, value: &str| {
        let letter = match flag {
            Flag::Z => 'Z',
            Flag::N => 'N',
            Flag::H => 'H',
            Flag::C => 'C',
        };
        match value {
            "-" => Ok(FlagEffect::Unaffected),
            "0" => Ok(FlagEffect::Reset),
            "1" => Ok(FlagEffect::Set),
            v if v.len() == 1 && v.starts_with(letter) => Ok(FlagEffect::Computed),
            _ => Err(BuildFault::BadFlagEffect {
                context: context.to_string(),
                flag: letter,
                effect: value.to_string(),
            }),
        }
    };

    Ok(FlagEffects {
        z: effect(Flag::Z, &raw.z)?,
        n: effect(Flag::N, &raw.n)?,
        h: effect(Flag::H, &raw.h)?,
        c: effect(Flag::C, &raw.c)?,
    })
}
