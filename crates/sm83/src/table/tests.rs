use once_cell::sync::Lazy;
use serde_json::{json, Value};

use super::*;
use crate::regs::{Condition, Flag, Register16, Register8};

static BUILTIN_JSON: Lazy<Value> =
    Lazy::new(|| serde_json::from_str(BUILTIN_METADATA).expect("embedded metadata is JSON"));

/// Build a table from the embedded metadata after applying `edit`.
fn build_edited(edit: impl FnOnce(&mut Value)) -> Result<OpcodeTable, BuildFault> {
    let mut value = BUILTIN_JSON.clone();
    edit(&mut value);
    OpcodeTable::from_json(&value.to_string())
}

fn unprefixed(value: &mut Value) -> &mut serde_json::Map<String, Value> {
    value["unprefixed"].as_object_mut().unwrap()
}

#[test]
fn builtin_table_is_total() {
    let table = OpcodeTable::builtin();
    for prefixed in [false, true] {
        for byte in 0..=255u8 {
            let descriptor = table.lookup(prefixed, byte);
            assert_eq!(descriptor.opcode, byte);
            assert_eq!(descriptor.prefixed, prefixed);
            assert!(descriptor.length >= 1);
            assert!(descriptor.cycles >= 4 && descriptor.cycles % 4 == 0);
        }
    }
    assert_eq!(table.iter().count(), 512);
}

#[test]
fn lengths_match_immediate_widths() {
    for descriptor in OpcodeTable::builtin().iter() {
        let expected = 1
            + u8::from(descriptor.prefixed)
            + descriptor
                .operands
                .iter()
                .map(|op| op.immediate_bytes())
                .sum::<u8>();
        if descriptor.mnemonic == Mnemonic::Illegal {
            assert_eq!(descriptor.length, 1, "{descriptor}");
        } else {
            assert_eq!(descriptor.length, expected, "{descriptor}");
        }
    }
}

#[test]
fn c_is_a_condition_only_in_branches() {
    let table = OpcodeTable::builtin();
    let carry = OperandKind::Condition(Condition {
        flag: Flag::C,
        negated: false,
    });

    // JR C / JP C / CALL C / RET C
    for opcode in [0x38, 0xDA, 0xDC, 0xD8] {
        assert_eq!(table.lookup(false, opcode).operands[0], carry);
    }

    // LD (C),A / LD A,(C) / LD C,d8
    assert_eq!(
        table.lookup(false, 0xE2).operands,
        vec![
            OperandKind::Indirect(Address::High(Register8::C), PostOp::None),
            OperandKind::Reg8(Register8::A),
        ]
    );
    assert_eq!(
        table.lookup(false, 0xF2).operands[1],
        OperandKind::Indirect(Address::High(Register8::C), PostOp::None)
    );
    assert_eq!(
        table.lookup(false, 0x0E).operands[0],
        OperandKind::Reg8(Register8::C)
    );
}

#[test]
fn only_condition_bearing_mnemonics_carry_conditions() {
    for descriptor in OpcodeTable::builtin().iter() {
        let has_condition = descriptor.condition().is_some();
        if has_condition {
            assert!(descriptor.mnemonic.is_condition_bearing(), "{descriptor}");
        }
        assert_eq!(
            has_condition,
            descriptor.branch_cycles.is_some(),
            "{descriptor}"
        );
    }
}

#[test]
fn hl_post_ops() {
    let table = OpcodeTable::builtin();
    let hl = |post_op| OperandKind::Indirect(Address::Pair(Register16::HL), post_op);

    assert_eq!(table.lookup(false, 0x22).operands[0], hl(PostOp::Increment));
    assert_eq!(table.lookup(false, 0x2A).operands[1], hl(PostOp::Increment));
    assert_eq!(table.lookup(false, 0x32).operands[0], hl(PostOp::Decrement));
    assert_eq!(table.lookup(false, 0x3A).operands[1], hl(PostOp::Decrement));
    assert_eq!(table.lookup(false, 0x7E).operands[1], hl(PostOp::None));
}

#[test]
fn high_page_and_absolute_addresses() {
    let table = OpcodeTable::builtin();
    assert_eq!(
        table.lookup(false, 0xE0).operands[0],
        OperandKind::Indirect(Address::HighImm8, PostOp::None)
    );
    assert_eq!(table.lookup(false, 0xE0).length, 2);
    assert_eq!(
        table.lookup(false, 0xFA).operands[1],
        OperandKind::Indirect(Address::Absolute, PostOp::None)
    );
    assert_eq!(table.lookup(false, 0xFA).length, 3);
}

#[test]
fn rst_operands_are_vectors() {
    let table = OpcodeTable::builtin();
    for (opcode, vector) in (0xC7..=0xFF).step_by(8).zip((0x00..=0x38).step_by(8)) {
        let descriptor = table.lookup(false, opcode);
        assert_eq!(descriptor.mnemonic, Mnemonic::Rst);
        assert_eq!(descriptor.operands, vec![OperandKind::Vector(vector)]);
    }
}

#[test]
fn holes_are_illegal_no_ops() {
    let table = OpcodeTable::builtin();
    for opcode in [
        0xD3, 0xDB, 0xDD, 0xE3, 0xE4, 0xEB, 0xEC, 0xED, 0xF4, 0xFC, 0xFD,
    ] {
        let descriptor = table.lookup(false, opcode);
        assert_eq!(descriptor.mnemonic, Mnemonic::Illegal);
        assert_eq!(descriptor.length, 1);
        assert_eq!(descriptor.cycles, 4);
        assert_eq!(descriptor.flags, FlagEffects::NONE);
        assert_eq!(descriptor.to_string(), format!("ILLEGAL_{opcode:02X}"));
    }
}

#[test]
fn branch_cycles() {
    let table = OpcodeTable::builtin();
    let cycles = |prefixed, opcode| {
        let d = table.lookup(prefixed, opcode);
        (d.cycles, d.branch_cycles)
    };
    assert_eq!(cycles(false, 0x20), (8, Some(12)));
    assert_eq!(cycles(false, 0xC2), (12, Some(16)));
    assert_eq!(cycles(false, 0xCC), (12, Some(24)));
    assert_eq!(cycles(false, 0xD0), (8, Some(20)));
    assert_eq!(cycles(false, 0xC9), (16, None));
    assert_eq!(cycles(true, 0x7E), (12, None));
    assert_eq!(cycles(true, 0x06), (16, None));
}

#[test]
fn flag_effects_are_parsed() {
    let table = OpcodeTable::builtin();
    // INC B: Z 0 H -
    let inc = table.lookup(false, 0x04).flags;
    assert_eq!(inc.z, FlagEffect::Computed);
    assert_eq!(inc.n, FlagEffect::Reset);
    assert_eq!(inc.h, FlagEffect::Computed);
    assert_eq!(inc.c, FlagEffect::Unaffected);
    // SCF: - 0 0 1
    let scf = table.lookup(false, 0x37).flags;
    assert_eq!(scf.c, FlagEffect::Set);
}

#[test]
fn from_reader_matches_builtin() {
    let table = OpcodeTable::from_reader(BUILTIN_METADATA.as_bytes()).unwrap();
    assert!(table.iter().eq(OpcodeTable::builtin().iter()));
}

#[test]
fn metadata_accepts_lowercase_mnemonics_and_default_flags() {
    let table = build_edited(|value| {
        let nop = json!({"mnemonic": "nop", "bytes": 1, "cycles": [4]});
        unprefixed(value).insert("0x00".into(), nop);
    })
    .unwrap();
    let nop = table.lookup(false, 0x00);
    assert_eq!(nop.mnemonic, Mnemonic::Nop);
    assert_eq!(nop.flags, FlagEffects::NONE);
}

#[test]
fn rejects_invalid_json() {
    assert!(matches!(
        OpcodeTable::from_json("{\"unprefixed\": "),
        Err(BuildFault::Json(_))
    ));
}

#[test]
fn rejects_missing_opcode() {
    let err = build_edited(|value| {
        unprefixed(value).remove("0x10");
    })
    .unwrap_err();
    assert!(matches!(
        err,
        BuildFault::MissingOpcode {
            table: "unprefixed",
            opcode: 0x10
        }
    ));
}

#[test]
fn rejects_duplicate_opcode() {
    let err = build_edited(|value| {
        let entry = value["unprefixed"]["0x10"].clone();
        unprefixed(value).insert("0X10".into(), entry);
    })
    .unwrap_err();
    assert!(matches!(
        err,
        BuildFault::DuplicateOpcode {
            table: "unprefixed",
            opcode: 0x10
        }
    ));
}

#[test]
fn rejects_malformed_keys() {
    for key in ["0x1G", "0x100", "16", "0x+1"] {
        let err = build_edited(|value| {
            let entry = value["cbprefixed"]["0x00"].clone();
            value["cbprefixed"]
                .as_object_mut()
                .unwrap()
                .insert(key.into(), entry);
        })
        .unwrap_err();
        assert!(
            matches!(err, BuildFault::BadKey { table: "cbprefixed", .. }),
            "{key}: {err}"
        );
    }
}

#[test]
fn rejects_unknown_mnemonic() {
    let err = build_edited(|value| {
        value["unprefixed"]["0x00"]["mnemonic"] = json!("FROB");
    })
    .unwrap_err();
    assert!(matches!(err, BuildFault::UnknownMnemonic { .. }));
}

#[test]
fn rejects_unknown_operand() {
    let err = build_edited(|value| {
        value["unprefixed"]["0x06"]["operands"][1]["name"] = json!("d9");
    })
    .unwrap_err();
    assert!(matches!(err, BuildFault::UnknownOperand { .. }), "{err}");
}

#[test]
fn post_op_markers_outside_ld_are_ignored() {
    let table = build_edited(|value| {
        value["unprefixed"]["0x34"]["operands"][0]["increment"] = json!(true);
    })
    .unwrap();
    assert_eq!(
        table.lookup(false, 0x34).operands,
        vec![OperandKind::Indirect(
            Address::Pair(Register16::HL),
            PostOp::None
        )]
    );
}

#[test]
fn rejects_too_many_operands() {
    let err = build_edited(|value| {
        value["unprefixed"]["0xF8"]["operands"]
            .as_array_mut()
            .unwrap()
            .push(json!({"name": "A", "immediate": true}));
    })
    .unwrap_err();
    assert!(matches!(err, BuildFault::TooManyOperands { count: 4, .. }));
}

#[test]
fn rejects_unexecutable_shape() {
    // LD (HL),(HL) is a memory-to-memory move.
    let err = build_edited(|value| {
        value["unprefixed"]["0x36"]["operands"][1] = json!({"name": "HL", "immediate": false});
        value["unprefixed"]["0x36"]["bytes"] = json!(1);
    })
    .unwrap_err();
    assert!(matches!(err, BuildFault::BadShape { .. }), "{err}");
}

#[test]
fn rejects_wrong_length() {
    let err = build_edited(|value| {
        value["unprefixed"]["0x06"]["bytes"] = json!(3);
    })
    .unwrap_err();
    assert!(matches!(
        err,
        BuildFault::BadLength {
            bytes: 3,
            expected: 2,
            ..
        }
    ));
}

#[test]
fn rejects_bad_cycles() {
    let cases = [
        ("0x00", json!([])),
        ("0x00", json!([6])),
        ("0x00", json!([0])),
        ("0x00", json!([8, 12, 16])),
        // Taken cost listed first, as some metadata files order it.
        ("0x20", json!([12, 8])),
        ("0x20", json!([8, 8])),
    ];
    for (key, cycles) in cases {
        let err = build_edited(|value| {
            value["unprefixed"][key]["cycles"] = cycles.clone();
        })
        .unwrap_err();
        assert!(matches!(err, BuildFault::BadCycles { .. }), "{cycles}: {err}");
    }
}

#[test]
fn rejects_bad_flag_effects() {
    for effect in ["X", "N", "ZZ"] {
        let err = build_edited(|value| {
            value["unprefixed"]["0x00"]["flags"]["Z"] = json!(effect);
        })
        .unwrap_err();
        assert!(
            matches!(err, BuildFault::BadFlagEffect { flag: 'Z', .. }),
            "{effect}: {err}"
        );
    }
}
