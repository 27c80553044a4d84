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

//! Load/store group: `LD, LDA, LDC, LDW, EX`, and the block-transfer family
//! `LDI, LDIR, LDD, LDDR, LDIW, LDIRW, LDDW, LDDRW`. The biggest group,
//! since `LD` alone covers register-immediate, register-register,
//! register-memory and memory-register shapes.
//!
//! §9 calls out two shapes this assembler does not attempt to encode:
//! memory-to-memory transfers (`LD (addr1),(addr2)`, `LD (mem),(XBC+d)`)
//! and `EX F,F'`. Both surface `UnsupportedOperandCombo` rather than a
//! guessed-at byte sequence.

use crate::assembler::encoder::constants::*;
use crate::assembler::encoder::memory::{emit_compact_mode_byte, emit_standalone, select_addr_size};
use crate::assembler::encoder::registers::code;
use crate::ast::{Mode, Operand, RegisterId, Size};
use crate::emitter::Emitter;
use crate::errors::{AssemblyError, Site};

pub fn try_encode(
    mnemonic: &str,
    operands: &[Operand],
    emitter: &mut Emitter,
    site: &Site,
) -> Result<bool, AssemblyError> {
    match mnemonic.to_ascii_uppercase().as_str() {
        "LD" | "LDW" => encode_ld(mnemonic, operands, emitter, site).map(|()| true),
        "LDA" => encode_lda(operands, emitter, site).map(|()| true),
        "LDC" => encode_ldc(operands, emitter, site).map(|()| true),
        "EX" => encode_ex(operands, emitter, site).map(|()| true),
        "LDI" => block_op(operands, LDI, mnemonic, emitter, site).map(|()| true),
        "LDIR" => block_op(operands, LDIR, mnemonic, emitter, site).map(|()| true),
        "LDD" => block_op(operands, LDD, mnemonic, emitter, site).map(|()| true),
        "LDDR" => block_op(operands, LDDR, mnemonic, emitter, site).map(|()| true),
        "LDIW" => block_op(operands, LDIW, mnemonic, emitter, site).map(|()| true),
        "LDIRW" => block_op(operands, LDIRW, mnemonic, emitter, site).map(|()| true),
        "LDDW" => block_op(operands, LDDW, mnemonic, emitter, site).map(|()| true),
        "LDDRW" => block_op(operands, LDDRW, mnemonic, emitter, site).map(|()| true),
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

fn is_memory_mode(op: &Operand) -> bool {
    matches!(
        op.mode,
        Mode::RegIndirect | Mode::PostInc | Mode::PreDec | Mode::Indexed | Mode::IndexedReg | Mode::Direct
    )
}

/// Block-transfer forms take no operands: the source/destination/counter
/// registers are implicit (`XHL`/`XDE`/`XBC` by ASL convention).
fn block_op(
    operands: &[Operand],
    opcode: u8,
    mnemonic: &str,
    emitter: &mut Emitter,
    site: &Site,
) -> Result<(), AssemblyError> {
    if !operands.is_empty() {
        return Err(err(mnemonic, "takes no operands; source/dest/count registers are implicit", site));
    }
    emitter.emit_byte(opcode);
    Ok(())
}

fn compact_src_base(size: Size) -> u8 {
    match size {
        Size::Byte => COMPACT_SRC_BYTE_BASE,
        Size::Long => COMPACT_SRC_LONG_BASE,
        Size::Word | Size::None => COMPACT_SRC_WORD_BASE,
    }
}

fn encode_ld(mnemonic: &str, operands: &[Operand], emitter: &mut Emitter, site: &Site) -> Result<(), AssemblyError> {
    let [dst, src] = operands else {
        return Err(err(mnemonic, "expects two operands", site));
    };
    if is_memory_mode(dst) && is_memory_mode(src) {
        return Err(err(
            mnemonic,
            "memory-to-memory transfers are not representable; stage through a register",
            site,
        ));
    }
    match (dst.mode, src.mode) {
        (Mode::Register, Mode::Immediate) => {
            let base = match dst.size {
                Size::Byte => LD_R_IMM8_BASE,
                Size::Word => LD_RR_IMM16_BASE,
                Size::Long => LD_RRRR_IMM32_BASE,
                Size::None => return Err(err(mnemonic, "destination register has no known width", site)),
            };
            emitter.emit_byte(base + code(dst.reg.unwrap()));
            match dst.size {
                Size::Byte => emitter.emit_byte(src.value as u8),
                Size::Word => emitter.emit_word(src.value as u16),
                Size::Long => emitter.emit_long(src.value as u32),
                Size::None => unreachable!(),
            }
            Ok(())
        }
        (Mode::Register, Mode::Register) => {
            emitter.emit_byte(LD_REG_REG_BASE);
            emitter.emit_byte((code(dst.reg.unwrap()) << 4) | code(src.reg.unwrap()));
            Ok(())
        }
        (Mode::Register, _) if is_memory_mode(src) => {
            if let Mode::Direct = src.mode {
                let addr_size = select_addr_size(src);
                let prefix = match addr_size {
                    8 => DIRECT_STORE_PREFIX_8,
                    16 => DIRECT_STORE_PREFIX_16,
                    _ => DIRECT_STORE_PREFIX_24,
                };
                emitter.emit_byte(prefix);
                match addr_size {
                    8 => emitter.emit_byte(src.value as u8),
                    16 => emitter.emit_word(src.value as u16),
                    _ => emitter.emit_long(src.value as u32),
                }
                emitter.emit_byte(LD_MEM_TO_REG_OP + code(dst.reg.unwrap()));
            } else {
                emit_compact_mode_byte(src, compact_src_base(dst.size), emitter, site)?;
                emitter.emit_byte(code(dst.reg.unwrap()));
            }
            Ok(())
        }
        (_, Mode::Register) if is_memory_mode(dst) => {
            if let Mode::Direct = dst.mode {
                let addr_size = select_addr_size(dst);
                let prefix = match addr_size {
                    8 => DIRECT_STORE_PREFIX_8,
                    16 => DIRECT_STORE_PREFIX_16,
                    _ => DIRECT_STORE_PREFIX_24,
                };
                emitter.emit_byte(prefix);
                match addr_size {
                    8 => emitter.emit_byte(dst.value as u8),
                    16 => emitter.emit_word(dst.value as u16),
                    _ => emitter.emit_long(dst.value as u32),
                }
                emitter.emit_byte(LD_REG_TO_MEM_OP + code(src.reg.unwrap()));
            } else {
                emit_compact_mode_byte(dst, COMPACT_DST_BASE, emitter, site)?;
                emitter.emit_byte(code(src.reg.unwrap()));
            }
            Ok(())
        }
        _ => Err(err(mnemonic, "unsupported operand shape", site)),
    }
}

/// `LDA r, (mem)`: load the effective address of a memory operand into a
/// register, never dereferencing it.
fn encode_lda(operands: &[Operand], emitter: &mut Emitter, site: &Site) -> Result<(), AssemblyError> {
    let [dst, src] = operands else {
        return Err(err("LDA", "expects register,memory-operand", site));
    };
    if dst.mode != Mode::Register {
        return Err(err("LDA", "destination must be a register", site));
    }
    if !is_memory_mode(src) {
        return Err(err("LDA", "source must be a memory operand", site));
    }
    emitter.emit_byte(LDA_BASE + code(dst.reg.unwrap()));
    emit_standalone(src, emitter, site)?;
    Ok(())
}

/// `LDC cr,r` / `LDC r,cr`: transfer to/from a named control register
/// (`LDC_TABLE`), width-prefixed per §4.4.3.
fn encode_ldc(operands: &[Operand], emitter: &mut Emitter, site: &Site) -> Result<(), AssemblyError> {
    let [a, b] = operands else {
        return Err(err("LDC", "expects two operands, one a control register name", site));
    };
    let ctrl_name = |op: &Operand| op.symbol_name.as_deref();
    let lookup = |name: &str| LDC_TABLE.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, c)| *c);

    if let Some(name) = ctrl_name(a).and_then(|n| lookup(n).map(|c| (n, c))).map(|(_, c)| c) {
        if b.mode != Mode::Register {
            return Err(err("LDC", "expects a register operand alongside the control register", site));
        }
        emit_ldc_prefix(b.size, emitter, site)?;
        emitter.emit_byte(LDC_FROM_CTRL_OP);
        emitter.emit_byte((name << 3) | code(b.reg.unwrap()));
        return Ok(());
    }
    if let Some(name) = ctrl_name(b).and_then(|n| lookup(n).map(|c| (n, c))).map(|(_, c)| c) {
        if a.mode != Mode::Register {
            return Err(err("LDC", "expects a register operand alongside the control register", site));
        }
        emit_ldc_prefix(a.size, emitter, site)?;
        emitter.emit_byte(LDC_TO_CTRL_OP);
        emitter.emit_byte((name << 3) | code(a.reg.unwrap()));
        return Ok(());
    }
    Err(err("LDC", "neither operand names a known control register", site))
}

fn emit_ldc_prefix(size: Size, emitter: &mut Emitter, site: &Site) -> Result<(), AssemblyError> {
    let prefix = match size {
        Size::Byte => LDC_PREFIX_BYTE,
        Size::Word | Size::None => LDC_PREFIX_WORD,
        Size::Long => LDC_PREFIX_LONG,
    };
    let _ = site;
    emitter.emit_byte(prefix);
    Ok(())
}

/// `EX r,r'`: swap two registers. `EX F,F'` is excluded per §9 since the
/// alternate flag register has no upstream representation to exchange with.
fn encode_ex(operands: &[Operand], emitter: &mut Emitter, site: &Site) -> Result<(), AssemblyError> {
    let [a, b] = operands else {
        return Err(err("EX", "expects two register operands", site));
    };
    if a.reg == Some(RegisterId::FPrime) || b.reg == Some(RegisterId::FPrime) {
        return Err(err("EX", "EX F,F' is not a representable instruction", site));
    }
    if a.mode != Mode::Register || b.mode != Mode::Register {
        return Err(err("EX", "both operands must be registers", site));
    }
    emitter.emit_byte(EX_BASE + code(a.reg.unwrap()));
    emitter.emit_byte(code(b.reg.unwrap()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Operand, RegisterId, Size};
    use crate::emitter::Pass;

    fn site() -> Site {
        Site::new("t.asm", 1)
    }

    fn emit_pass() -> Emitter {
        let mut em = Emitter::new();
        em.pass = Pass::Emit;
        em.set_origin(0x100);
        em
    }

    #[test]
    fn ld_reg_imm8_matches_worked_example() {
        // `LD A, #5` -> `25 05` (§4.4.3's worked example).
        let mut em = emit_pass();
        let dst = Operand::register(RegisterId::General(1), Size::Byte);
        let src = Operand::immediate(5, true, true);
        encode_ld("LD", &[dst, src], &mut em, &site()).unwrap();
        assert_eq!(em.output, vec![0x25, 0x05]);
    }

    #[test]
    fn ld_reg_imm32_matches_worked_example() {
        // `LD XWA, #12345678H` -> `40 78 56 34 12`.
        let mut em = emit_pass();
        let dst = Operand::register(RegisterId::General(0), Size::Long);
        let src = Operand::immediate(0x12345678, true, true);
        encode_ld("LD", &[dst, src], &mut em, &site()).unwrap();
        assert_eq!(em.output, vec![0x40, 0x78, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn memory_to_memory_is_rejected() {
        let mut em = emit_pass();
        let dst = Operand {
            mode: Mode::Direct,
            size: Size::Byte,
            reg: None,
            index_reg: None,
            condition: None,
            value: 0x10,
            value_known: true,
            is_constant: true,
            addr_size: 0,
            symbol_name: None,
        };
        let src = dst.clone();
        let result = encode_ld("LD", &[dst, src], &mut em, &site());
        assert!(matches!(result, Err(AssemblyError::UnsupportedOperandCombo { .. })));
    }

    #[test]
    fn ex_f_prime_is_rejected() {
        let mut em = emit_pass();
        let a = Operand::register(RegisterId::F, Size::Byte);
        let b = Operand::register(RegisterId::FPrime, Size::Byte);
        let result = encode_ex(&[a, b], &mut em, &site());
        assert!(matches!(result, Err(AssemblyError::UnsupportedOperandCombo { .. })));
    }

    #[test]
    fn block_transfer_takes_no_operands() {
        let mut em = emit_pass();
        block_op(&[], LDIR, "LDIR", &mut em, &site()).unwrap();
        assert_eq!(em.output, vec![LDIR]);
    }
}
