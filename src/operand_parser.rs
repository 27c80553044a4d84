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

//! C3: the operand parser. Turns a token cursor positioned at the start of
//! an operand slot into an `Operand` record, resolving the register and
//! condition-code tables and recognising every addressing-mode shape of
//! §4.3. The one piece of real context sensitivity lives in
//! `classify_ambiguous_ident`: `C` names both a register and a condition,
//! and only a peek past the next comma settles which one is meant.

use crate::ast::{Condition, Mode, Operand, RegisterId, Size};
use crate::errors::{AssemblyError, Site};
use crate::expr::{self, EvalContext};
use crate::lexer::{Cursor, Token};

/// Resolves a case-folded name to its register identity and width, per the
/// tables of §4.4.1. Only one width applies per spelling (`A` is always
/// byte, `WA` always word, `XWA` always long), so this is a flat map
/// rather than a per-width family lookup.
pub fn register_lookup(name: &str) -> Option<(RegisterId, Size)> {
    let upper = name.to_ascii_uppercase();
    const BYTE_NAMES: [&str; 8] = ["W", "A", "B", "C", "D", "E", "H", "L"];
    const WORD_NAMES: [&str; 8] = ["WA", "BC", "DE", "HL", "IX", "IY", "IZ", "SP"];
    const LONG_NAMES: [&str; 8] = ["XWA", "XBC", "XDE", "XHL", "XIX", "XIY", "XIZ", "XSP"];
    const INDEX_BYTE_NAMES: [&str; 6] = ["IXH", "IXL", "IYH", "IYL", "IZH", "IZL"];
    const QBYTE_NAMES: [&str; 8] = ["QW", "QA", "QB", "QC", "QD", "QE", "QH", "QL"];
    const QWORD_NAMES: [&str; 7] = ["QWA", "QBC", "QDE", "QHL", "QIX", "QIY", "QIZ"];
    const QINDEX_BYTE_NAMES: [&str; 6] = ["QIXH", "QIXL", "QIYH", "QIYL", "QIZH", "QIZL"];

    if let Some(code) = BYTE_NAMES.iter().position(|&n| n == upper) {
        return Some((RegisterId::General(code as u8), Size::Byte));
    }
    if let Some(code) = WORD_NAMES.iter().position(|&n| n == upper) {
        return Some((RegisterId::General(code as u8), Size::Word));
    }
    if let Some(code) = LONG_NAMES.iter().position(|&n| n == upper) {
        return Some((RegisterId::General(code as u8), Size::Long));
    }
    if let Some(code) = INDEX_BYTE_NAMES.iter().position(|&n| n == upper) {
        return Some((RegisterId::IndexByte(8 + code as u8), Size::Byte));
    }
    if let Some(code) = QBYTE_NAMES.iter().position(|&n| n == upper) {
        return Some((RegisterId::QBank(16 + code as u8), Size::Byte));
    }
    if let Some(code) = QWORD_NAMES.iter().position(|&n| n == upper) {
        return Some((RegisterId::QBank(8 + code as u8), Size::Word));
    }
    if let Some(code) = QINDEX_BYTE_NAMES.iter().position(|&n| n == upper) {
        return Some((RegisterId::QIndexByte(24 + code as u8), Size::Byte));
    }
    match upper.as_str() {
        "PC" => Some((RegisterId::Pc, Size::Long)),
        "SR" => Some((RegisterId::Sr, Size::Word)),
        "F" => Some((RegisterId::F, Size::Byte)),
        "F'" => Some((RegisterId::FPrime, Size::Byte)),
        _ => None,
    }
}

/// Resolves a name to a condition code, accepting every alias in §4.3's
/// table (`Z/EQ`, `C/ULT`, and so on).
pub fn condition_lookup(name: &str) -> Option<Condition> {
    let upper = name.to_ascii_uppercase();
    Some(match upper.as_str() {
        "F" => Condition::F,
        "LT" => Condition::Lt,
        "LE" => Condition::Le,
        "ULE" => Condition::Ule,
        "PE" | "OV" => Condition::Pe,
        "MI" | "M" => Condition::Mi,
        "Z" | "EQ" => Condition::Z,
        "C" | "ULT" => Condition::Ult,
        "T" => Condition::T,
        "GE" => Condition::Ge,
        "GT" => Condition::Gt,
        "UGT" => Condition::Ugt,
        "PO" | "NOV" => Condition::Po,
        "PL" | "P" => Condition::Pl,
        "NZ" | "NE" => Condition::Nz,
        "NC" | "UGE" => Condition::Nc,
        _ => return None,
    })
}

fn expect_punct(cursor: &mut Cursor<'_>, c: char, site: &Site) -> Result<(), AssemblyError> {
    match cursor.next() {
        Some(Token::Punct(p)) if *p == c => Ok(()),
        _ => Err(AssemblyError::ExpectedX {
            site: site.clone(),
            expected: format!("'{c}'"),
        }),
    }
}

/// An optional `:8`/`:16`/`:24` address/displacement-size suffix, as found
/// inside a parenthesised operand.
fn parse_optional_size_suffix(cursor: &mut Cursor<'_>, site: &Site) -> Result<u8, AssemblyError> {
    if matches!(cursor.peek(), Some(Token::Punct(':'))) {
        cursor.next();
        match cursor.next() {
            Some(Token::Number(n)) if *n == 8 || *n == 16 || *n == 24 => Ok(*n as u8),
            _ => Err(AssemblyError::ExpectedX {
                site: site.clone(),
                expected: "'8', '16' or '24'".to_string(),
            }),
        }
    } else {
        Ok(0)
    }
}

fn mem_operand(mode: Mode, size: Size, reg: RegisterId) -> Operand {
    Operand {
        mode,
        size,
        reg: Some(reg),
        index_reg: None,
        condition: None,
        value: 0,
        value_known: true,
        is_constant: true,
        addr_size: 0,
        symbol_name: None,
    }
}

fn indexed(mode: Mode, size: Size, reg: RegisterId, ev: expr::EvalResult, addr_size: u8) -> Operand {
    Operand {
        mode,
        size,
        reg: Some(reg),
        index_reg: None,
        condition: None,
        value: ev.value,
        value_known: ev.known,
        is_constant: ev.is_constant,
        addr_size,
        symbol_name: None,
    }
}

fn indexed_by_reg(size: Size, reg: RegisterId, index_reg: RegisterId) -> Operand {
    Operand {
        mode: Mode::IndexedReg,
        size,
        reg: Some(reg),
        index_reg: Some(index_reg),
        condition: None,
        value: 0,
        value_known: true,
        is_constant: true,
        addr_size: 0,
        symbol_name: None,
    }
}

fn direct(ev: expr::EvalResult, addr_size: u8, symbol_name: Option<String>) -> Operand {
    Operand {
        mode: Mode::Direct,
        size: Size::None,
        reg: None,
        index_reg: None,
        condition: None,
        value: ev.value,
        value_known: ev.known,
        is_constant: ev.is_constant,
        addr_size,
        symbol_name,
    }
}

/// Parses one operand slot starting at the cursor's current position,
/// consuming tokens up to (but not past) the next top-level comma or the
/// end of the line.
pub fn parse_operand(
    cursor: &mut Cursor<'_>,
    ctx: &mut dyn EvalContext,
    site: &Site,
) -> Result<Operand, AssemblyError> {
    match cursor.peek() {
        Some(Token::Punct('#')) => {
            cursor.next();
            let ev = expr::evaluate(cursor, ctx, site)?;
            Ok(Operand::immediate(ev.value, ev.known, ev.is_constant))
        }
        Some(Token::Punct('(')) => parse_paren_operand(cursor, ctx, site),
        Some(Token::Ident(name)) => {
            let name = name.clone();
            let as_register = register_lookup(&name);
            let as_condition = condition_lookup(&name);
            match (as_register, as_condition) {
                (Some((reg, size)), Some(cc)) => {
                    // Only `C` genuinely overlaps (§9); resolve by peeking
                    // past the next top-level comma.
                    if next_operand_looks_like_register(cursor) {
                        cursor.next();
                        Ok(Operand::register(reg, size))
                    } else {
                        cursor.next();
                        Ok(Operand::condition(cc))
                    }
                }
                (Some((reg, size)), None) => {
                    cursor.next();
                    Ok(Operand::register(reg, size))
                }
                (None, Some(cc)) => {
                    cursor.next();
                    Ok(Operand::condition(cc))
                }
                (None, None) => {
                    let ev = expr::evaluate(cursor, ctx, site)?;
                    let mut op = Operand::immediate(ev.value, ev.known, ev.is_constant);
                    if !ev.known {
                        op.symbol_name = Some(name);
                    }
                    Ok(op)
                }
            }
        }
        _ => {
            let ev = expr::evaluate(cursor, ctx, site)?;
            Ok(Operand::immediate(ev.value, ev.known, ev.is_constant))
        }
    }
}

/// Rule 5 of §4.3: look past the next top-level comma. If what follows
/// begins with `(`, `#`, `$`, a number, or a register name, the current
/// ambiguous identifier is a register; otherwise it's a condition.
fn next_operand_looks_like_register(cursor: &Cursor<'_>) -> bool {
    match cursor.peek_past_next_comma() {
        None => false,
        Some(Token::Punct('(')) | Some(Token::Punct('#')) | Some(Token::Punct('$')) | Some(Token::Number(_)) => {
            true
        }
        Some(Token::Ident(name)) => register_lookup(name).is_some(),
        _ => false,
    }
}

fn parse_paren_operand(
    cursor: &mut Cursor<'_>,
    ctx: &mut dyn EvalContext,
    site: &Site,
) -> Result<Operand, AssemblyError> {
    cursor.next(); // consume '('

    // (-reg) -- PreDec.
    if matches!(cursor.peek(), Some(Token::Punct('-'))) {
        let mark = cursor.save();
        cursor.next();
        if let Some(Token::Ident(name)) = cursor.peek().cloned() {
            if let Some((reg, size)) = register_lookup(&name) {
                cursor.next();
                if matches!(cursor.peek(), Some(Token::Punct(')'))) {
                    cursor.next();
                    return Ok(mem_operand(Mode::PreDec, size, reg));
                }
            }
        }
        cursor.restore(mark);
    }

    if let Some(Token::Ident(name)) = cursor.peek().cloned() {
        if let Some((reg, size)) = register_lookup(&name) {
            let mark = cursor.save();
            cursor.next();
            match cursor.peek() {
                Some(Token::Punct(')')) => {
                    cursor.next();
                    return Ok(mem_operand(Mode::RegIndirect, size, reg));
                }
                Some(Token::Punct('+')) => {
                    let plus_mark = cursor.save();
                    cursor.next();
                    if matches!(cursor.peek(), Some(Token::Punct(')'))) {
                        cursor.next();
                        return Ok(mem_operand(Mode::PostInc, size, reg));
                    }
                    if let Some(Token::Ident(idx_name)) = cursor.peek().cloned() {
                        if let Some((idx_reg, _)) = register_lookup(&idx_name) {
                            let idx_mark = cursor.save();
                            cursor.next();
                            if matches!(cursor.peek(), Some(Token::Punct(')'))) {
                                cursor.next();
                                return Ok(indexed_by_reg(size, reg, idx_reg));
                            }
                            cursor.restore(idx_mark);
                        }
                    }
                    cursor.restore(plus_mark);
                    cursor.next(); // consume '+'
                    let ev = expr::evaluate(cursor, ctx, site)?;
                    let addr_size = parse_optional_size_suffix(cursor, site)?;
                    expect_punct(cursor, ')', site)?;
                    return Ok(indexed(Mode::Indexed, size, reg, ev, addr_size));
                }
                Some(Token::Punct('-')) => {
                    cursor.next();
                    let ev = expr::evaluate(cursor, ctx, site)?;
                    let negated = expr::EvalResult {
                        value: ev.value.wrapping_neg(),
                        ..ev
                    };
                    let addr_size = parse_optional_size_suffix(cursor, site)?;
                    expect_punct(cursor, ')', site)?;
                    return Ok(indexed(Mode::Indexed, size, reg, negated, addr_size));
                }
                _ => {
                    cursor.restore(mark);
                }
            }
        }
    }

    // Direct: (expr[:size])
    let ev = expr::evaluate(cursor, ctx, site)?;
    let addr_size = parse_optional_size_suffix(cursor, site)?;
    expect_punct(cursor, ')', site)?;
    Ok(direct(ev, addr_size, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use std::collections::HashMap;

    struct TestCtx {
        pc: i64,
        symbols: HashMap<String, (i64, bool)>,
    }

    impl EvalContext for TestCtx {
        fn pc(&self) -> i64 {
            self.pc
        }
        fn lookup(&mut self, name: &str) -> Option<(i64, bool)> {
            self.symbols.get(&name.to_ascii_uppercase()).copied()
        }
        fn is_final_pass(&self) -> bool {
            false
        }
    }

    fn parse(src: &str) -> Operand {
        let tokens = tokenize(src, "t.asm", 1).unwrap();
        let mut cursor = Cursor::new(&tokens);
        let mut ctx = TestCtx {
            pc: 0,
            symbols: HashMap::new(),
        };
        parse_operand(&mut cursor, &mut ctx, &Site::new("t.asm", 1)).unwrap()
    }

    #[test]
    fn immediate_operand() {
        let op = parse("#5");
        assert_eq!(op.mode, Mode::Immediate);
        assert_eq!(op.value, 5);
    }

    #[test]
    fn register_operand_byte_width() {
        let op = parse("A");
        assert_eq!(op.mode, Mode::Register);
        assert_eq!(op.reg, Some(RegisterId::General(1)));
        assert_eq!(op.size, Size::Byte);
    }

    #[test]
    fn register_indirect() {
        let op = parse("(HL)");
        assert_eq!(op.mode, Mode::RegIndirect);
        assert_eq!(op.reg, Some(RegisterId::General(3)));
    }

    #[test]
    fn post_increment() {
        let op = parse("(HL+)");
        assert_eq!(op.mode, Mode::PostInc);
    }

    #[test]
    fn pre_decrement() {
        let op = parse("(-HL)");
        assert_eq!(op.mode, Mode::PreDec);
    }

    #[test]
    fn indexed_with_displacement() {
        let op = parse("(HL+5)");
        assert_eq!(op.mode, Mode::Indexed);
        assert_eq!(op.value, 5);
    }

    #[test]
    fn indexed_by_register() {
        let op = parse("(HL+A)");
        assert_eq!(op.mode, Mode::IndexedReg);
        assert_eq!(op.index_reg, Some(RegisterId::General(1)));
    }

    #[test]
    fn direct_addressing_with_size_suffix() {
        let op = parse("(1234H:16)");
        assert_eq!(op.mode, Mode::Direct);
        assert_eq!(op.value, 0x1234);
        assert_eq!(op.addr_size, 16);
    }

    #[test]
    fn z_alone_is_condition_not_register() {
        let tokens = tokenize("Z", "t.asm", 1).unwrap();
        let mut cursor = Cursor::new(&tokens);
        let mut ctx = TestCtx {
            pc: 0,
            symbols: HashMap::new(),
        };
        let op = parse_operand(&mut cursor, &mut ctx, &Site::new("t.asm", 1)).unwrap();
        assert_eq!(op.mode, Mode::Condition);
        assert_eq!(op.condition, Some(Condition::Z));
    }

    #[test]
    fn ambiguous_c_before_register_operand_is_register() {
        let op = parse("C, #5");
        assert_eq!(op.mode, Mode::Register);
    }

    #[test]
    fn ambiguous_c_before_bare_target_is_condition() {
        let op = parse("C, LOOP");
        assert_eq!(op.mode, Mode::Condition);
        assert_eq!(op.condition, Some(Condition::Ult));
    }
}
