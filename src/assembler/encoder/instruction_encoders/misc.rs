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

//! System group (`NOP, EI, DI, HALT, SCF/RCF/CCF/ZCF`) and the extension
//! group (`EXTZ, EXTS, SCC`). All single-byte or single-byte-plus-operand
//! forms with no addressing-mode complexity.

use crate::assembler::encoder::constants::*;
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
    let opcode = match mnemonic.to_ascii_uppercase().as_str() {
        "NOP" => NOP,
        "HALT" => HALT,
        "EI" => EI,
        "DI" => DI,
        "SCF" => SCF,
        "RCF" => RCF,
        "CCF" => CCF,
        "ZCF" => ZCF,
        "EXTZ" | "EXTS" | "SCC" => {
            return encode_extension(mnemonic, operands, emitter, site).map(|()| true);
        }
        _ => return Ok(false),
    };
    if !operands.is_empty() {
        return Err(AssemblyError::UnsupportedOperandCombo {
            site: site.clone(),
            mnemonic: mnemonic.to_string(),
            reason: "takes no operands".to_string(),
        });
    }
    emitter.emit_byte(opcode);
    Ok(true)
}

/// `EXTZ r` / `EXTS r`: zero/sign-extend a register in place, one byte
/// selecting the register width extended from byte to word (or word to
/// long). `SCC cc,r` loads 0/1 into `r` per condition `cc`.
fn encode_extension(
    mnemonic: &str,
    operands: &[Operand],
    emitter: &mut Emitter,
    site: &Site,
) -> Result<(), AssemblyError> {
    match mnemonic.to_ascii_uppercase().as_str() {
        "EXTZ" | "EXTS" => {
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
            let base = if mnemonic.eq_ignore_ascii_case("EXTZ") { 0xEC } else { 0xED };
            emitter.emit_byte(base + code(r.reg.unwrap()));
            Ok(())
        }
        "SCC" => {
            let [cc, r] = operands else {
                return Err(AssemblyError::UnsupportedOperandCombo {
                    site: site.clone(),
                    mnemonic: mnemonic.to_string(),
                    reason: "expects condition,register".to_string(),
                });
            };
            if cc.mode != Mode::Condition || r.mode != Mode::Register {
                return Err(AssemblyError::UnsupportedOperandCombo {
                    site: site.clone(),
                    mnemonic: mnemonic.to_string(),
                    reason: "expects condition,register".to_string(),
                });
            }
            emitter.emit_byte(0xF8);
            emitter.emit_byte((cc.condition.unwrap().code() << 4) | code(r.reg.unwrap()));
            Ok(())
        }
        _ => unreachable!(),
    }
}
