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

//! Arithmetic group: `ADD, ADC, SUB, SBC, CP, AND, OR, XOR` (plus their
//! `*W` word-width aliases), `INC, DEC` (with their `n,r` third-operand
//! form per §4.4.3), `NEG, CPL, DAA, MUL, MULS, DIV, DIVS`.

use crate::assembler::encoder::constants::*;
use crate::assembler::encoder::memory::emit_standalone;
use crate::assembler::encoder::registers::code;
use crate::ast::{Mode, Operand};
use crate::emitter::Emitter;
use crate::errors::{AssemblyError, Site};

pub fn try_encode(
    mnemonic: &str,
    operands: &[Operand],
    emitter: &mut Emitter,
    site: &Site,
) -> Result<bool, AssemblyError> {
    let upper = mnemonic.to_ascii_uppercase();
    match upper.as_str() {
        "ADD" | "ADDW" => encode_binary(mnemonic, operands, ADD_BASE, emitter, site).map(|()| true),
        "ADC" => encode_binary(mnemonic, operands, ADC_BASE, emitter, site).map(|()| true),
        "SUB" => encode_binary(mnemonic, operands, SUB_BASE, emitter, site).map(|()| true),
        "SBC" => encode_binary(mnemonic, operands, SBC_BASE, emitter, site).map(|()| true),
        "AND" | "ANDW" => encode_binary(mnemonic, operands, AND_BASE, emitter, site).map(|()| true),
        "OR" | "ORW" => encode_binary(mnemonic, operands, OR_BASE, emitter, site).map(|()| true),
        "XOR" | "XORW" => encode_binary(mnemonic, operands, XOR_BASE, emitter, site).map(|()| true),
        "CP" | "CPW" => encode_binary(mnemonic, operands, CP_BASE, emitter, site).map(|()| true),
        "INC" | "INCW" => encode_inc_dec(mnemonic, operands, INC_BASE, emitter, site).map(|()| true),
        "DEC" | "DECW" => encode_inc_dec(mnemonic, operands, DEC_BASE, emitter, site).map(|()| true),
        "NEG" => encode_unary(mnemonic, operands, NEG_OP, emitter, site).map(|()| true),
        "CPL" => encode_unary(mnemonic, operands, CPL_OP, emitter, site).map(|()| true),
        "DAA" => encode_unary(mnemonic, operands, DAA_OP, emitter, site).map(|()| true),
        "MUL" => encode_mul_div(mnemonic, operands, MUL_OP, emitter, site).map(|()| true),
        "MULS" => encode_mul_div(mnemonic, operands, MULS_OP, emitter, site).map(|()| true),
        "DIV" => encode_mul_div(mnemonic, operands, DIV_OP, emitter, site).map(|()| true),
        "DIVS" => encode_mul_div(mnemonic, operands, DIVS_OP, emitter, site).map(|()| true),
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

/// `op dst, src` with `dst` always a register. `src` may be an immediate,
/// a register, or a memory operand; a one-byte tag distinguishes the three
/// so the encoder doesn't need a separate opcode per shape.
fn encode_binary(
    mnemonic: &str,
    operands: &[Operand],
    base: u8,
    emitter: &mut Emitter,
    site: &Site,
) -> Result<(), AssemblyError> {
    let [dst, src] = operands else {
        return Err(err(mnemonic, "expects destination register, source", site));
    };
    if dst.mode != Mode::Register {
        return Err(err(mnemonic, "destination must be a register", site));
    }
    emitter.emit_byte(base + code(dst.reg.unwrap()));
    match src.mode {
        Mode::Immediate => {
            emitter.emit_byte(0x00);
            match dst.size {
                crate::ast::Size::Byte => emitter.emit_byte(src.value as u8),
                crate::ast::Size::Long => emitter.emit_long(src.value as u32),
                _ => emitter.emit_word(src.value as u16),
            }
        }
        Mode::Register => {
            emitter.emit_byte(0x01);
            emitter.emit_byte(code(src.reg.unwrap()));
        }
        _ => {
            emitter.emit_byte(0x02);
            emit_standalone(src, emitter, site)?;
        }
    }
    Ok(())
}

/// `INC r` / `INC n,r` / `INC r,n`: the count `n` (default 1) is folded
/// `mod 8` into the high bits of the operand byte alongside the register
/// code, per §4.4.3.
fn encode_inc_dec(
    mnemonic: &str,
    operands: &[Operand],
    base: u8,
    emitter: &mut Emitter,
    site: &Site,
) -> Result<(), AssemblyError> {
    let (n, r) = match operands {
        [r] if r.mode == Mode::Register => (1i64, r),
        [n, r] if n.mode == Mode::Immediate && r.mode == Mode::Register => (n.value, r),
        [r, n] if r.mode == Mode::Register && n.mode == Mode::Immediate => (n.value, r),
        _ => return Err(err(mnemonic, "expects r, [n,]r, or r,n", site)),
    };
    emitter.emit_byte(base);
    emitter.emit_byte((((n.rem_euclid(8)) as u8) << 3) | code(r.reg.unwrap()));
    Ok(())
}

fn encode_unary(
    mnemonic: &str,
    operands: &[Operand],
    opcode: u8,
    emitter: &mut Emitter,
    site: &Site,
) -> Result<(), AssemblyError> {
    match operands {
        [] => {
            emitter.emit_byte(opcode);
            Ok(())
        }
        [r] if r.mode == Mode::Register => {
            emitter.emit_byte(opcode);
            emitter.emit_byte(code(r.reg.unwrap()));
            Ok(())
        }
        _ => Err(err(mnemonic, "takes no operands or a single register", site)),
    }
}

fn encode_mul_div(
    mnemonic: &str,
    operands: &[Operand],
    opcode: u8,
    emitter: &mut Emitter,
    site: &Site,
) -> Result<(), AssemblyError> {
    let [dst, src] = operands else {
        return Err(err(mnemonic, "expects destination register pair, source", site));
    };
    if dst.mode != Mode::Register {
        return Err(err(mnemonic, "destination must be a register", site));
    }
    emitter.emit_byte(opcode);
    emitter.emit_byte(code(dst.reg.unwrap()));
    match src.mode {
        Mode::Register => emitter.emit_byte(code(src.reg.unwrap())),
        Mode::Immediate => emitter.emit_word(src.value as u16),
        _ => return Err(err(mnemonic, "source must be a register or immediate", site)),
    }
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
    fn add_reg_imm_tags_the_immediate_shape() {
        let mut em = emit_pass();
        let dst = Operand::register(RegisterId::General(1), crate::ast::Size::Byte);
        let src = Operand::immediate(3, true, true);
        encode_binary("ADD", &[dst, src], ADD_BASE, &mut em, &site()).unwrap();
        assert_eq!(em.output, vec![ADD_BASE + 1, 0x00, 3]);
    }

    #[test]
    fn inc_default_count_is_one() {
        let mut em = emit_pass();
        let r = Operand::register(RegisterId::General(2), crate::ast::Size::Byte);
        encode_inc_dec("INC", &[r], INC_BASE, &mut em, &site()).unwrap();
        assert_eq!(em.output, vec![INC_BASE, (1u8 << 3) | 2]);
    }

    #[test]
    fn inc_explicit_count_wraps_mod_eight() {
        let mut em = emit_pass();
        let n = Operand::immediate(9, true, true);
        let r = Operand::register(RegisterId::General(0), crate::ast::Size::Byte);
        encode_inc_dec("INC", &[n, r], INC_BASE, &mut em, &site()).unwrap();
        assert_eq!(em.output, vec![INC_BASE, (1u8 << 3)]);
    }
}
