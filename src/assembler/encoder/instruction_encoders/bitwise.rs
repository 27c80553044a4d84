/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Shift/rotate group (`RLC, RRC, RL, RR, SLA, SRA, SLL, SRL`), bit-test
//! group (`BIT, SET, RES, TSET, CHG`), and the carry/bit-scan helpers
//! (`STCF, LDCF, XORCF, BS1B, BS1F`). `BIT`/`SET`/`RES` each have a direct-
//! memory form (§4.4.2) in addition to the register form; `RES` further has
//! a distinct encoding when its target is an 8-bit register.

use crate::assembler::encoder::constants::*;
use crate::assembler::encoder::memory::{emit_standalone, select_addr_size};
use crate::assembler::encoder::registers::code;
use crate::ast::{Mode, Operand};
use crate::emitter::Emitter;
use crate::errors::{AssemblyError, Site};

/// `(direct)` form shared by `BIT`/`SET`/`RES` (§4.4.2/§4.4.3): a width-
/// selected `0xF0/0xF1/0xF2` address prefix, the address bytes, then the
/// operation byte (bit-index merged in) *last* -- unlike the generic
/// memory-operand prefix, which would put an opcode byte before the
/// address.
fn emit_bit_direct(target: &Operand, op: u8, bit: u8, emitter: &mut Emitter) {
    match select_addr_size(target) {
        8 => {
            emitter.emit_byte(DIRECT_STORE_PREFIX_8);
            emitter.emit_byte(target.value as u8);
        }
        16 => {
            emitter.emit_byte(DIRECT_STORE_PREFIX_16);
            emitter.emit_word(target.value as u16);
        }
        _ => {
            emitter.emit_byte(DIRECT_STORE_PREFIX_24);
            emitter.emit_word24(target.value as u32);
        }
    }
    emitter.emit_byte(op + bit);
}

pub fn try_encode(
    mnemonic: &str,
    operands: &[Operand],
    emitter: &mut Emitter,
    site: &Site,
) -> Result<bool, AssemblyError> {
    match mnemonic.to_ascii_uppercase().as_str() {
        "RLC" => encode_shift(operands, RLC_BASE, mnemonic, emitter, site).map(|()| true),
        "RRC" => encode_shift(operands, RRC_BASE, mnemonic, emitter, site).map(|()| true),
        "RL" => encode_shift(operands, RL_BASE, mnemonic, emitter, site).map(|()| true),
        "RR" => encode_shift(operands, RR_BASE, mnemonic, emitter, site).map(|()| true),
        "SLA" => encode_shift(operands, SLA_BASE, mnemonic, emitter, site).map(|()| true),
        "SRA" => encode_shift(operands, SRA_BASE, mnemonic, emitter, site).map(|()| true),
        "SLL" => encode_shift(operands, SLL_BASE, mnemonic, emitter, site).map(|()| true),
        "SRL" => encode_shift(operands, SRL_BASE, mnemonic, emitter, site).map(|()| true),
        "BIT" => encode_bit(operands, BIT_DIRECT_OP_BASE, mnemonic, emitter, site).map(|()| true),
        "SET" => encode_bit(operands, SET_DIRECT_OP_BASE, mnemonic, emitter, site).map(|()| true),
        "RES" => encode_res(operands, mnemonic, emitter, site).map(|()| true),
        "TSET" => encode_bit_prefixed(operands, TSET_PREFIX, mnemonic, emitter, site).map(|()| true),
        "CHG" => encode_bit_prefixed(operands, CHG_PREFIX, mnemonic, emitter, site).map(|()| true),
        "STCF" => no_operand(operands, STCF_OP, mnemonic, emitter, site).map(|()| true),
        "LDCF" => no_operand(operands, LDCF_OP, mnemonic, emitter, site).map(|()| true),
        "XORCF" => no_operand(operands, XORCF_OP, mnemonic, emitter, site).map(|()| true),
        "BS1B" => encode_bs1(operands, BS1B_OP, mnemonic, emitter, site).map(|()| true),
        "BS1F" => encode_bs1(operands, BS1F_OP, mnemonic, emitter, site).map(|()| true),
        _ => Ok(false),
    }
}

fn err(mnemonic: &str, reason: impl Into<String>, site: &Site) -> AssemblyError {
    AssemblyError::UnsupportedOperandCombo {
        site: site.clone(),
        mnemonic: mnemonic.to_string(),
        reason: reason.into(),
    }
}

fn no_operand(
    operands: &[Operand],
    opcode: u8,
    mnemonic: &str,
    emitter: &mut Emitter,
    site: &Site,
) -> Result<(), AssemblyError> {
    if !operands.is_empty() {
        return Err(err(mnemonic, "takes no operands", site));
    }
    emitter.emit_byte(opcode);
    Ok(())
}

/// `op r`: a shift/rotate-by-one on a register, one prefix byte plus the
/// shift-group opcode merged with the register code.
fn encode_shift(
    operands: &[Operand],
    group: u8,
    mnemonic: &str,
    emitter: &mut Emitter,
    site: &Site,
) -> Result<(), AssemblyError> {
    let [r] = operands else {
        return Err(err(mnemonic, "expects a single register operand", site));
    };
    if r.mode != Mode::Register {
        return Err(err(mnemonic, "operand must be a register", site));
    }
    emitter.emit_byte(SHIFT_PREFIX);
    emitter.emit_byte(group + code(r.reg.unwrap()));
    Ok(())
}

/// `BIT n,r` / `SET n,r` / `BIT n,(mem)` / ...: register form merges the
/// bit index and register code into one byte after a fixed prefix; the
/// direct-memory form (§4.4.2) uses the `*_DIRECT_OP_BASE` opcode followed
/// by the address bytes and then the bit index.
fn encode_bit(
    operands: &[Operand],
    direct_op: u8,
    mnemonic: &str,
    emitter: &mut Emitter,
    site: &Site,
) -> Result<(), AssemblyError> {
    let [n, target] = operands else {
        return Err(err(mnemonic, "expects bit-index, target", site));
    };
    if n.mode != Mode::Immediate {
        return Err(err(mnemonic, "bit index must be a constant", site));
    }
    let bit = (n.value & 0x07) as u8;
    if target.mode == Mode::Register {
        emitter.emit_byte(BIT_REGISTER_FORM_PREFIX);
        emitter.emit_byte((bit << 4) | code(target.reg.unwrap()));
        return Ok(());
    }
    if target.mode == Mode::Direct {
        emit_bit_direct(target, direct_op, bit, emitter);
        return Ok(());
    }
    emitter.emit_byte(direct_op);
    emit_standalone(target, emitter, site)?;
    emitter.emit_byte(bit);
    Ok(())
}

/// `RES n,r` has a dedicated register-width encoding distinct from `BIT`/
/// `SET`'s shared register form (§4.4.3), in addition to the direct-memory
/// form all three share.
fn encode_res(operands: &[Operand], mnemonic: &str, emitter: &mut Emitter, site: &Site) -> Result<(), AssemblyError> {
    let [n, target] = operands else {
        return Err(err(mnemonic, "expects bit-index, target", site));
    };
    if n.mode != Mode::Immediate {
        return Err(err(mnemonic, "bit index must be a constant", site));
    }
    let bit = (n.value & 0x07) as u8;
    if target.mode == Mode::Register {
        emitter.emit_byte(RES_REG_PREFIX_BASE + code(target.reg.unwrap()));
        emitter.emit_byte(RES_REG_OP + bit);
        return Ok(());
    }
    if target.mode == Mode::Direct {
        emit_bit_direct(target, RES_DIRECT_OP_BASE, bit, emitter);
        return Ok(());
    }
    emitter.emit_byte(RES_DIRECT_OP_BASE);
    emit_standalone(target, emitter, site)?;
    emitter.emit_byte(bit);
    Ok(())
}

/// `TSET n,r` / `CHG n,r`: test-and-set / toggle a single bit, prefix byte
/// plus a merged bit-index/register byte.
fn encode_bit_prefixed(
    operands: &[Operand],
    prefix: u8,
    mnemonic: &str,
    emitter: &mut Emitter,
    site: &Site,
) -> Result<(), AssemblyError> {
    let [n, r] = operands else {
        return Err(err(mnemonic, "expects bit-index, register", site));
    };
    if n.mode != Mode::Immediate || r.mode != Mode::Register {
        return Err(err(mnemonic, "expects bit-index, register", site));
    }
    emitter.emit_byte(prefix);
    emitter.emit_byte((((n.value & 0x07) as u8) << 4) | code(r.reg.unwrap()));
    Ok(())
}

/// `BS1B r` / `BS1F r`: scan a register for its highest/lowest set bit.
fn encode_bs1(operands: &[Operand], op: u8, mnemonic: &str, emitter: &mut Emitter, site: &Site) -> Result<(), AssemblyError> {
    let [r] = operands else {
        return Err(err(mnemonic, "expects a single register operand", site));
    };
    if r.mode != Mode::Register {
        return Err(err(mnemonic, "operand must be a register", site));
    }
    emitter.emit_byte(BS1_PREFIX);
    emitter.emit_byte((op << 4) | code(r.reg.unwrap()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::RegisterId;
    use crate::emitter::Pass;

    fn site() -> Site {
        Site::new("t.asm", 1)
    }

    fn emit_pass() -> Emitter {
        let mut em = Emitter::new();
        em.pass = Pass::Emit;
        em.set_origin(0);
        em
    }

    #[test]
    fn bit_on_register_uses_register_form_prefix() {
        let mut em = emit_pass();
        let n = Operand::immediate(3, true, true);
        let r = Operand::register(RegisterId::General(2), crate::ast::Size::Byte);
        encode_bit(&[n, r], BIT_DIRECT_OP_BASE, "BIT", &mut em, &site()).unwrap();
        assert_eq!(em.output, vec![BIT_REGISTER_FORM_PREFIX, (3 << 4) | 2]);
    }

    #[test]
    fn res_on_register_uses_dedicated_encoding() {
        let mut em = emit_pass();
        let n = Operand::immediate(5, true, true);
        let r = Operand::register(RegisterId::General(1), crate::ast::Size::Byte);
        encode_res(&[n, r], "RES", &mut em, &site()).unwrap();
        assert_eq!(em.output, vec![RES_REG_PREFIX_BASE + 1, RES_REG_OP + 5]);
    }

    #[test]
    fn bit_on_direct_address_uses_direct_store_prefix() {
        let mut em = emit_pass();
        let n = Operand::immediate(3, true, true);
        let target = Operand {
            mode: Mode::Direct,
            size: crate::ast::Size::None,
            reg: None,
            index_reg: None,
            condition: None,
            value: 0x1234,
            value_known: true,
            is_constant: true,
            addr_size: 16,
            symbol_name: None,
        };
        encode_bit(&[n, target], BIT_DIRECT_OP_BASE, "BIT", &mut em, &site()).unwrap();
        assert_eq!(em.output, vec![DIRECT_STORE_PREFIX_16, 0x34, 0x12, BIT_DIRECT_OP_BASE + 3]);
    }

    #[test]
    fn res_on_direct_address_uses_direct_store_prefix() {
        let mut em = emit_pass();
        let n = Operand::immediate(5, true, true);
        let target = Operand {
            mode: Mode::Direct,
            size: crate::ast::Size::None,
            reg: None,
            index_reg: None,
            condition: None,
            value: 0x34,
            value_known: true,
            is_constant: true,
            addr_size: 8,
            symbol_name: None,
        };
        encode_res(&[n, target], "RES", &mut em, &site()).unwrap();
        assert_eq!(em.output, vec![DIRECT_STORE_PREFIX_8, 0x34, RES_DIRECT_OP_BASE + 5]);
    }

    #[test]
    fn shift_merges_register_code_into_group_byte() {
        let mut em = emit_pass();
        let r = Operand::register(RegisterId::General(4), crate::ast::Size::Byte);
        encode_shift(&[r], SLA_BASE, "SLA", &mut em, &site()).unwrap();
        assert_eq!(em.output, vec![SHIFT_PREFIX, SLA_BASE + 4]);
    }
}
