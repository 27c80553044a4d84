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

//! Stack group: `PUSH, POP, PUSHW, LINK, UNLK`.

use crate::assembler::encoder::constants::*;
use crate::assembler::encoder::registers::code;
use crate::ast::{Mode, Operand, RegisterId};
use crate::emitter::Emitter;
use crate::errors::{AssemblyError, Site};

pub fn try_encode(
    mnemonic: &str,
    operands: &[Operand],
    emitter: &mut Emitter,
    site: &Site,
) -> Result<bool, AssemblyError> {
    match mnemonic.to_ascii_uppercase().as_str() {
        "PUSH" => encode_push(operands, PUSH_BASE, mnemonic, emitter, site).map(|()| true),
        "PUSHW" => encode_push(operands, PUSHW_BASE, mnemonic, emitter, site).map(|()| true),
        "POP" => encode_pop(operands, mnemonic, emitter, site).map(|()| true),
        "LINK" => {
            let [imm] = operands else {
                return Err(AssemblyError::UnsupportedOperandCombo {
                    site: site.clone(),
                    mnemonic: mnemonic.to_string(),
                    reason: "expects a frame-size immediate".to_string(),
                });
            };
            emitter.emit_byte(LINK);
            emitter.emit_word(imm.value as u16);
            Ok(true)
        }
        "UNLK" => {
            if !operands.is_empty() {
                return Err(AssemblyError::UnsupportedOperandCombo {
                    site: site.clone(),
                    mnemonic: mnemonic.to_string(),
                    reason: "takes no operands".to_string(),
                });
            }
            emitter.emit_byte(UNLK);
            Ok(true)
        }
        _ => Ok(false),
    }
}

fn encode_push(
    operands: &[Operand],
    base: u8,
    mnemonic: &str,
    emitter: &mut Emitter,
    site: &Site,
) -> Result<(), AssemblyError> {
    let [r] = operands else {
        return Err(AssemblyError::UnsupportedOperandCombo {
            site: site.clone(),
            mnemonic: mnemonic.to_string(),
            reason: "expects exactly one register operand".to_string(),
        });
    };
    if r.mode != Mode::Register {
        return Err(AssemblyError::UnsupportedOperandCombo {
            site: site.clone(),
            mnemonic: mnemonic.to_string(),
            reason: "operand must be a register".to_string(),
        });
    }
    emitter.emit_byte(base + code(r.reg.unwrap()));
    Ok(())
}

fn encode_pop(
    operands: &[Operand],
    mnemonic: &str,
    emitter: &mut Emitter,
    site: &Site,
) -> Result<(), AssemblyError> {
    let [r] = operands else {
        return Err(AssemblyError::UnsupportedOperandCombo {
            site: site.clone(),
            mnemonic: mnemonic.to_string(),
            reason: "expects exactly one register operand".to_string(),
        });
    };
    if r.mode != Mode::Register {
        return Err(AssemblyError::UnsupportedOperandCombo {
            site: site.clone(),
            mnemonic: mnemonic.to_string(),
            reason: "operand must be a register".to_string(),
        });
    }
    // POP F' (alternate flags) is not wired upstream; leave unsupported
    // rather than guess at an encoding.
    if r.reg == Some(RegisterId::FPrime) {
        return Err(AssemblyError::UnsupportedOperandCombo {
            site: site.clone(),
            mnemonic: mnemonic.to_string(),
            reason: "POP F' is not a representable instruction".to_string(),
        });
    }
    emitter.emit_byte(POP_BASE + code(r.reg.unwrap()));
    Ok(())
}
