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

//! Control-flow group: `RET, RETI, RETD, SWI, JP, JR, JRL, CALL, CALR,
//! DJNZ`. Carries the branch-displacement stability rule of §4.4.3/§4.5:
//! `JR`/`JRL` always emit their full fixed width, even during Sizing,
//! and `BranchOutOfRange` is reported only once the Emit pass confirms
//! the final displacement.

use crate::assembler::encoder::constants::*;
use crate::assembler::encoder::memory::emit_standalone;
use crate::assembler::encoder::registers::code;
use crate::ast::{Mode, Operand, Size};
use crate::emitter::{Emitter, Pass};
use crate::errors::{AssemblyError, Site};

/// `JP`/`CALL` target width selection depends only on the value's
/// magnitude, unlike the `is_constant`-gated three-way selection in
/// `memory::select_addr_size`: there is no 8-bit form here to oscillate
/// into, so a plain magnitude check is sufficient and keeps widths
/// monotonically non-decreasing across sizing iterations (§4.4.3, §4.5).
fn jp_target_width(target: &Operand) -> u8 {
    if target.addr_size != 0 {
        return target.addr_size;
    }
    if (0..=0xFFFF).contains(&target.value) {
        16
    } else {
        24
    }
}

pub fn try_encode(
    mnemonic: &str,
    operands: &[Operand],
    emitter: &mut Emitter,
    site: &Site,
) -> Result<bool, AssemblyError> {
    match mnemonic.to_ascii_uppercase().as_str() {
        "RET" => no_operand_op(operands, RET, mnemonic, emitter, site).map(|()| true),
        "RETI" => no_operand_op(operands, RETI, mnemonic, emitter, site).map(|()| true),
        "RETD" => {
            let [imm] = operands else {
                return Err(err(mnemonic, "expects a 16-bit immediate", site));
            };
            emitter.emit_byte(RETD);
            emitter.emit_word(imm.value as u16);
            Ok(true)
        }
        "SWI" => {
            let [imm] = operands else {
                return Err(err(mnemonic, "expects a vector number 0..7", site));
            };
            emitter.emit_byte(SWI_BASE + (imm.value as u8 & 0x07));
            Ok(true)
        }
        "JP" => encode_jp(operands, emitter, site).map(|()| true),
        "JR" => encode_jr(operands, JR_BASE, 2, emitter, site).map(|()| true),
        "JRL" => encode_jr(operands, JRL_BASE, 3, emitter, site).map(|()| true),
        "CALL" => encode_call(operands, emitter, site).map(|()| true),
        "CALR" => {
            let [target] = operands else {
                return Err(err(mnemonic, "expects a single target", site));
            };
            emitter.emit_byte(CALR_OP);
            // `emit_byte` already advanced `pc` past the opcode, so
            // `pc + 2` lands on `start + 3` -- mirrors `encode_jr`'s
            // `pc + (total_len - 1)` for CALR's 3-byte total length.
            let disp = target.value - (emitter.pc as i64 + 2);
            emitter.emit_word(disp as u16);
            Ok(true)
        }
        "DJNZ" => encode_djnz(operands, emitter, site).map(|()| true),
        _ => Ok(false),
    }
}

fn err(mnemonic: &str, reason: &str, site: &Site) -> AssemblyError {
    AssemblyError::UnsupportedOperandCombo {
        site: site.clone(),
        mnemonic: mnemonic.to_string(),
        reason: reason.to_string(),
    }
}

fn no_operand_op(
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

fn encode_jp(operands: &[Operand], emitter: &mut Emitter, site: &Site) -> Result<(), AssemblyError> {
    match operands {
        [target] if target.mode != Mode::Condition => match target.mode {
            Mode::RegIndirect | Mode::Indexed | Mode::IndexedReg | Mode::PostInc | Mode::PreDec => {
                emitter.emit_byte(JP_INDIRECT);
                emit_standalone(target, emitter, site)?;
                Ok(())
            }
            _ => {
                if jp_target_width(target) <= 16 {
                    emitter.emit_byte(JP_ABS16);
                    emitter.emit_word(target.value as u16);
                } else {
                    emitter.emit_byte(JP_ABS24);
                    emitter.emit_word24(target.value as u32);
                }
                Ok(())
            }
        },
        [cc, target] if cc.mode == Mode::Condition => {
            let cc_code = cc.condition.unwrap().code();
            match target.mode {
                Mode::RegIndirect | Mode::Indexed | Mode::IndexedReg | Mode::PostInc | Mode::PreDec => {
                    emitter.emit_byte(JP_INDIRECT);
                    emit_standalone(target, emitter, site)?;
                    emitter.emit_byte(JP_INDIRECT_COND_BASE + cc_code);
                    Ok(())
                }
                _ => {
                    if jp_target_width(target) <= 16 {
                        emitter.emit_byte(JP_COND16_BASE + cc_code);
                        emitter.emit_word(target.value as u16);
                    } else {
                        emitter.emit_byte(JP_COND24_BASE + cc_code);
                        emitter.emit_word24(target.value as u32);
                    }
                    Ok(())
                }
            }
        }
        _ => Err(err("JP", "expects [cc,] target", site)),
    }
}

fn encode_call(operands: &[Operand], emitter: &mut Emitter, site: &Site) -> Result<(), AssemblyError> {
    let [target] = operands else {
        return Err(err("CALL", "expects a single target", site));
    };
    if jp_target_width(target) <= 16 {
        emitter.emit_byte(CALL_ABS16);
        emitter.emit_word(target.value as u16);
    } else {
        emitter.emit_byte(CALL_ABS24);
        emitter.emit_word24(target.value as u32);
    }
    Ok(())
}

/// `JR`/`JRL cc,target` (or unconditional `JR target`, condition `T`
/// implied). Always emits `total_len` bytes regardless of pass so sizes
/// converge (I3); the range check is suppressed during Sizing.
fn encode_jr(
    operands: &[Operand],
    base: u8,
    total_len: u32,
    emitter: &mut Emitter,
    site: &Site,
) -> Result<(), AssemblyError> {
    let (cc_code, target) = match operands {
        [target] => (crate::ast::Condition::T.code(), target),
        [cc, target] if cc.mode == Mode::Condition => (cc.condition.unwrap().code(), target),
        _ => return Err(err("JR", "expects [cc,] target", site)),
    };
    emitter.emit_byte(base + cc_code);
    let disp = target.value - (emitter.pc as i64 + (total_len as i64 - 1));
    let bits = if total_len == 2 { 8 } else { 16 };
    if emitter.pass == Pass::Emit {
        let (lo, hi) = if bits == 8 { (-128i64, 127i64) } else { (-32768i64, 32767i64) };
        if disp < lo || disp > hi {
            return Err(AssemblyError::BranchOutOfRange {
                site: site.clone(),
                disp,
                bits,
            });
        }
    }
    if total_len == 2 {
        emitter.emit_byte(disp as u8);
    } else {
        emitter.emit_word(disp as u16);
    }
    Ok(())
}

fn encode_djnz(operands: &[Operand], emitter: &mut Emitter, site: &Site) -> Result<(), AssemblyError> {
    let [r, target] = operands else {
        return Err(err("DJNZ", "expects register,target", site));
    };
    if r.mode != Mode::Register {
        return Err(err("DJNZ", "first operand must be a register", site));
    }
    let reg_code = code(r.reg.unwrap());
    match r.size {
        Size::Byte => {
            emitter.emit_byte(DJNZ_8BIT_PREFIX_BASE + (reg_code >> 1));
            emitter.emit_byte(DJNZ_8BIT_OP_BASE + (reg_code & 1));
        }
        Size::Word => {
            emitter.emit_byte(DJNZ_16BIT_PREFIX_BASE + reg_code);
            emitter.emit_byte(DJNZ_16BIT_OP);
        }
        _ => return Err(err("DJNZ", "register must be byte or word width", site)),
    }
    let disp = target.value - (emitter.pc as i64 + 1);
    if emitter.pass == Pass::Emit && !(-128..=127).contains(&disp) {
        return Err(AssemblyError::BranchOutOfRange {
            site: site.clone(),
            disp,
            bits: 8,
        });
    }
    emitter.emit_byte(disp as u8);
    Ok(())
}
