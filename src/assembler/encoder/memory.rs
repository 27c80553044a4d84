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

//! §4.4.2: memory-operand encoding, both the standalone form (a mode byte
//! following a generic prefix) and the compact form (mode bits merged
//! into the operation's own prefix byte).

use super::constants::*;
use super::registers::base_code;
use crate::ast::{Mode, Operand};
use crate::emitter::Emitter;
use crate::errors::{AssemblyError, Site};

/// Auto-selects the direct-address width per §4.4.2: an explicit `:8|16|24`
/// suffix always wins; otherwise a known `is_constant` value ≤ 0xFF takes
/// the 8-bit form, ≤ 0xFFFF the 16-bit form, else 24-bit. A forward
/// reference (`is_constant == false`) never takes the 8-bit form, which is
/// what keeps the relaxation loop from oscillating (§4.5).
pub fn select_addr_size(op: &Operand) -> u8 {
    if op.addr_size != 0 {
        return op.addr_size;
    }
    if op.is_constant && op.value_known && (0..=0xFF).contains(&op.value) {
        8
    } else if (0..=0xFFFF).contains(&op.value) {
        16
    } else {
        24
    }
}

/// Auto-selects the indexed-displacement width the same way, but over the
/// signed 8-bit range.
pub fn select_disp_size(op: &Operand) -> u8 {
    if op.addr_size == 8 || op.addr_size == 16 {
        return op.addr_size;
    }
    if op.is_constant && op.value_known && (-128..=127).contains(&op.value) {
        8
    } else {
        16
    }
}

/// Emits the standalone-form bytes for a memory operand (everything
/// except `Register`/`Immediate`/`Condition`). `compact_src_base` is None
/// here: this is the generic prefixed path, used whenever an instruction
/// has no merged compact form.
pub fn emit_standalone(op: &Operand, emitter: &mut Emitter, site: &Site) -> Result<(), AssemblyError> {
    match op.mode {
        Mode::RegIndirect => {
            let c = base_code_or_err(op, site)?;
            emitter.emit_byte(c);
        }
        Mode::PostInc => {
            let c = base_code_or_err(op, site)?;
            emitter.emit_byte(MEM_POSTINC_BASE + c);
        }
        Mode::PreDec => {
            let c = base_code_or_err(op, site)?;
            emitter.emit_byte(MEM_PREDEC_BASE + c);
        }
        Mode::Indexed => {
            let c = base_code_or_err(op, site)?;
            if select_disp_size(op) == 8 {
                emitter.emit_byte(MEM_INDEXED8_BASE + c);
                emitter.emit_byte(op.value as u8);
            } else {
                emitter.emit_byte(MEM_INDEXED16_BASE + c);
                emitter.emit_word(op.value as u16);
            }
        }
        Mode::IndexedReg => {
            let c = base_code_or_err(op, site)?;
            let idx = op.index_reg.and_then(super::registers::base_code).ok_or_else(|| {
                AssemblyError::InvalidOperand {
                    site: site.clone(),
                    reason: "index register has no addressing base code".to_string(),
                }
            })?;
            emitter.emit_byte(MEM_INDEXED_REG_BASE + c);
            emitter.emit_byte(idx);
        }
        Mode::Direct => match select_addr_size(op) {
            8 => {
                emitter.emit_byte(MEM_DIRECT8);
                emitter.emit_byte(op.value as u8);
            }
            16 => {
                emitter.emit_byte(MEM_DIRECT16);
                emitter.emit_word(op.value as u16);
            }
            _ => {
                emitter.emit_byte(MEM_DIRECT24);
                emitter.emit_word24(op.value as u32);
            }
        },
        _ => {
            return Err(AssemblyError::InvalidOperand {
                site: site.clone(),
                reason: format!("{} is not a memory operand", op.mode),
            });
        }
    }
    Ok(())
}

fn base_code_or_err(op: &Operand, site: &Site) -> Result<u8, AssemblyError> {
    op.reg.and_then(base_code).ok_or_else(|| AssemblyError::InvalidOperand {
        site: site.clone(),
        reason: "expected an addressable register (HL/IX/IY/IZ or their 32-bit forms)".to_string(),
    })
}

/// Byte length `emit_standalone` would produce for this operand, without
/// touching the emitter. Used by encoders that need to report an
/// instruction's total size before committing to emission (never needed
/// when the emitter itself is driving Sizing, but kept for encoders that
/// must branch on width before picking an opcode byte).
pub fn standalone_len(op: &Operand) -> u32 {
    match op.mode {
        Mode::RegIndirect | Mode::PostInc | Mode::PreDec => 1,
        Mode::Indexed => 1 + (select_disp_size(op) as u32) / 8,
        Mode::IndexedReg => 2,
        Mode::Direct => 1 + (select_addr_size(op) as u32) / 8,
        _ => 0,
    }
}

/// Emits the merged compact-form mode byte for memory operands used by
/// `LD`/arithmetic reg<->(mem) combinations (§4.4.2), returning the
/// displacement/address bytes that still need to follow via the caller
/// (the mode byte itself already carries the register-width base).
pub fn emit_compact_mode_byte(
    op: &Operand,
    base: u8,
    emitter: &mut Emitter,
    site: &Site,
) -> Result<(), AssemblyError> {
    let c = base_code_or_err(op, site)?;
    match op.mode {
        Mode::RegIndirect => {
            emitter.emit_byte(base + COMPACT_MODE_INDIRECT + c);
        }
        Mode::PreDec => {
            emitter.emit_byte(base + COMPACT_MODE_PREDEC + c);
        }
        Mode::PostInc => {
            emitter.emit_byte(base + COMPACT_MODE_POSTINC + c);
        }
        Mode::Indexed => {
            if select_disp_size(op) == 8 {
                emitter.emit_byte(base + COMPACT_MODE_INDEXED8 + c);
                emitter.emit_byte(op.value as u8);
            } else {
                emitter.emit_byte(base + COMPACT_MODE_INDEXED16 + c);
                emitter.emit_word(op.value as u16);
            }
        }
        _ => {
            return Err(AssemblyError::InvalidOperand {
                site: site.clone(),
                reason: format!("{} has no compact-form encoding", op.mode),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Operand, RegisterId, Size};
    use crate::emitter::{Emitter, Pass};

    fn site() -> Site {
        Site::new("t.asm", 1)
    }

    fn hl_indirect() -> Operand {
        Operand {
            mode: Mode::RegIndirect,
            size: Size::Word,
            reg: Some(RegisterId::General(3)),
            index_reg: None,
            condition: None,
            value: 0,
            value_known: true,
            is_constant: true,
            addr_size: 0,
            symbol_name: None,
        }
    }

    #[test]
    fn reg_indirect_emits_base_code() {
        let mut em = Emitter::new();
        em.pass = Pass::Emit;
        em.set_origin(0);
        emit_standalone(&hl_indirect(), &mut em, &site()).unwrap();
        assert_eq!(em.output, vec![3]);
    }

    #[test]
    fn direct_8bit_selected_for_small_constant() {
        let op = Operand {
            mode: Mode::Direct,
            size: Size::None,
            reg: None,
            index_reg: None,
            condition: None,
            value: 0xFF,
            value_known: true,
            is_constant: true,
            addr_size: 0,
            symbol_name: None,
        };
        assert_eq!(select_addr_size(&op), 8);
    }

    #[test]
    fn direct_non_constant_never_takes_8bit_form() {
        let op = Operand {
            mode: Mode::Direct,
            size: Size::None,
            reg: None,
            index_reg: None,
            condition: None,
            value: 0x10,
            value_known: true,
            is_constant: false,
            addr_size: 0,
            symbol_name: None,
        };
        assert_eq!(select_addr_size(&op), 16);
    }

    #[test]
    fn direct_24bit_selected_past_16bit_range() {
        let op = Operand {
            mode: Mode::Direct,
            size: Size::None,
            reg: None,
            index_reg: None,
            condition: None,
            value: 0x10000,
            value_known: true,
            is_constant: true,
            addr_size: 0,
            symbol_name: None,
        };
        assert_eq!(select_addr_size(&op), 24);
    }
}
