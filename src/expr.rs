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

//! C2: the expression evaluator. A precedence-climbing recursive-descent
//! parser over i64, carrying two bits of metadata alongside the value
//! through every subexpression: `known` (can the value be trusted *this*
//! sizing iteration) and `is_constant` (will the value ever change again,
//! once known). Both propagate by logical AND across subexpressions —
//! one unresolved forward reference makes the whole expression unknown,
//! one label reference makes the whole expression non-constant.

use crate::errors::{AssemblyError, Site};
use crate::lexer::{Cursor, Token};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalResult {
    pub value: i64,
    pub known: bool,
    pub is_constant: bool,
}

impl EvalResult {
    fn known_const(value: i64) -> Self {
        EvalResult {
            value,
            known: true,
            is_constant: true,
        }
    }
}

/// What an expression needs from the outside world: the symbol table and
/// the program counter. Implemented by the pass driver so this module
/// never needs to know about sizing iterations or the symbol table's
/// internal shape.
pub trait EvalContext {
    /// Current program counter, for `$`.
    fn pc(&self) -> i64;
    /// Resolves a bare identifier. `None` means undefined. The second
    /// element of the tuple is `is_constant` for that symbol (true for
    /// `EQU`, false for a `Label`, since labels move until the layout is
    /// final).
    fn lookup(&mut self, name: &str) -> Option<(i64, bool)>;
    /// True during the final emit pass: an undefined symbol there is a
    /// hard error rather than merely `known = false`.
    fn is_final_pass(&self) -> bool;
}

pub fn evaluate(
    cursor: &mut Cursor<'_>,
    ctx: &mut dyn EvalContext,
    site: &Site,
) -> Result<EvalResult, AssemblyError> {
    parse_or(cursor, ctx, site)
}

fn parse_or(
    cursor: &mut Cursor<'_>,
    ctx: &mut dyn EvalContext,
    site: &Site,
) -> Result<EvalResult, AssemblyError> {
    let mut lhs = parse_and(cursor, ctx, site)?;
    while matches!(cursor.peek(), Some(Token::OrOr)) {
        cursor.next();
        let rhs = parse_and(cursor, ctx, site)?;
        lhs = combine(lhs, rhs, |a, b| ((a != 0) || (b != 0)) as i64);
    }
    Ok(lhs)
}

fn parse_and(
    cursor: &mut Cursor<'_>,
    ctx: &mut dyn EvalContext,
    site: &Site,
) -> Result<EvalResult, AssemblyError> {
    let mut lhs = parse_bor(cursor, ctx, site)?;
    while matches!(cursor.peek(), Some(Token::AndAnd)) {
        cursor.next();
        let rhs = parse_bor(cursor, ctx, site)?;
        lhs = combine(lhs, rhs, |a, b| ((a != 0) && (b != 0)) as i64);
    }
    Ok(lhs)
}

fn parse_bor(
    cursor: &mut Cursor<'_>,
    ctx: &mut dyn EvalContext,
    site: &Site,
) -> Result<EvalResult, AssemblyError> {
    let mut lhs = parse_bxor(cursor, ctx, site)?;
    while matches!(cursor.peek(), Some(Token::Punct('|'))) {
        cursor.next();
        let rhs = parse_bxor(cursor, ctx, site)?;
        lhs = combine(lhs, rhs, |a, b| a | b);
    }
    Ok(lhs)
}

fn parse_bxor(
    cursor: &mut Cursor<'_>,
    ctx: &mut dyn EvalContext,
    site: &Site,
) -> Result<EvalResult, AssemblyError> {
    let mut lhs = parse_band(cursor, ctx, site)?;
    while matches!(cursor.peek(), Some(Token::Punct('^'))) {
        cursor.next();
        let rhs = parse_band(cursor, ctx, site)?;
        lhs = combine(lhs, rhs, |a, b| a ^ b);
    }
    Ok(lhs)
}

fn parse_band(
    cursor: &mut Cursor<'_>,
    ctx: &mut dyn EvalContext,
    site: &Site,
) -> Result<EvalResult, AssemblyError> {
    let mut lhs = parse_eq(cursor, ctx, site)?;
    while matches!(cursor.peek(), Some(Token::Punct('&'))) {
        cursor.next();
        let rhs = parse_eq(cursor, ctx, site)?;
        lhs = combine(lhs, rhs, |a, b| a & b);
    }
    Ok(lhs)
}

fn parse_eq(
    cursor: &mut Cursor<'_>,
    ctx: &mut dyn EvalContext,
    site: &Site,
) -> Result<EvalResult, AssemblyError> {
    let mut lhs = parse_rel(cursor, ctx, site)?;
    loop {
        let op = match cursor.peek() {
            Some(Token::EqEq) => |a: i64, b: i64| (a == b) as i64,
            Some(Token::NotEq) => |a: i64, b: i64| (a != b) as i64,
            _ => break,
        };
        cursor.next();
        let rhs = parse_rel(cursor, ctx, site)?;
        lhs = combine(lhs, rhs, op);
    }
    Ok(lhs)
}

fn parse_rel(
    cursor: &mut Cursor<'_>,
    ctx: &mut dyn EvalContext,
    site: &Site,
) -> Result<EvalResult, AssemblyError> {
    let mut lhs = parse_shift(cursor, ctx, site)?;
    loop {
        let op: fn(i64, i64) -> i64 = match cursor.peek() {
            Some(Token::Punct('<')) => |a, b| (a < b) as i64,
            Some(Token::Punct('>')) => |a, b| (a > b) as i64,
            Some(Token::LtEq) => |a, b| (a <= b) as i64,
            Some(Token::GtEq) => |a, b| (a >= b) as i64,
            _ => break,
        };
        cursor.next();
        let rhs = parse_shift(cursor, ctx, site)?;
        lhs = combine(lhs, rhs, op);
    }
    Ok(lhs)
}

fn parse_shift(
    cursor: &mut Cursor<'_>,
    ctx: &mut dyn EvalContext,
    site: &Site,
) -> Result<EvalResult, AssemblyError> {
    let mut lhs = parse_add(cursor, ctx, site)?;
    loop {
        let op: fn(i64, i64) -> i64 = match cursor.peek() {
            Some(Token::Shl) => |a, b| a.wrapping_shl(b as u32 & 63),
            Some(Token::Shr) => |a, b| a.wrapping_shr(b as u32 & 63),
            _ => break,
        };
        cursor.next();
        let rhs = parse_add(cursor, ctx, site)?;
        lhs = combine(lhs, rhs, op);
    }
    Ok(lhs)
}

fn parse_add(
    cursor: &mut Cursor<'_>,
    ctx: &mut dyn EvalContext,
    site: &Site,
) -> Result<EvalResult, AssemblyError> {
    let mut lhs = parse_mul(cursor, ctx, site)?;
    loop {
        let op: fn(i64, i64) -> i64 = match cursor.peek() {
            Some(Token::Punct('+')) => |a, b| a.wrapping_add(b),
            Some(Token::Punct('-')) => |a, b| a.wrapping_sub(b),
            _ => break,
        };
        cursor.next();
        let rhs = parse_mul(cursor, ctx, site)?;
        lhs = combine(lhs, rhs, op);
    }
    Ok(lhs)
}

fn parse_mul(
    cursor: &mut Cursor<'_>,
    ctx: &mut dyn EvalContext,
    site: &Site,
) -> Result<EvalResult, AssemblyError> {
    let mut lhs = parse_unary(cursor, ctx, site)?;
    loop {
        match cursor.peek() {
            Some(Token::Punct('*')) => {
                cursor.next();
                let rhs = parse_unary(cursor, ctx, site)?;
                lhs = combine(lhs, rhs, |a, b| a.wrapping_mul(b));
            }
            Some(Token::Punct('/')) => {
                cursor.next();
                let rhs = parse_unary(cursor, ctx, site)?;
                if rhs.known && rhs.value == 0 {
                    return Err(AssemblyError::DivByZero { site: site.clone() });
                }
                let divisor = if rhs.value == 0 { 1 } else { rhs.value };
                lhs = combine(lhs, rhs, |a, _| a.wrapping_div(divisor));
            }
            Some(Token::Punct('%')) => {
                cursor.next();
                let rhs = parse_unary(cursor, ctx, site)?;
                if rhs.known && rhs.value == 0 {
                    return Err(AssemblyError::DivByZero { site: site.clone() });
                }
                let divisor = if rhs.value == 0 { 1 } else { rhs.value };
                lhs = combine(lhs, rhs, |a, _| a.wrapping_rem(divisor));
            }
            _ => break,
        }
    }
    Ok(lhs)
}

fn parse_unary(
    cursor: &mut Cursor<'_>,
    ctx: &mut dyn EvalContext,
    site: &Site,
) -> Result<EvalResult, AssemblyError> {
    match cursor.peek() {
        Some(Token::Punct('-')) => {
            cursor.next();
            let v = parse_unary(cursor, ctx, site)?;
            Ok(EvalResult {
                value: v.value.wrapping_neg(),
                ..v
            })
        }
        Some(Token::Punct('+')) => {
            cursor.next();
            parse_unary(cursor, ctx, site)
        }
        Some(Token::Punct('~')) => {
            cursor.next();
            let v = parse_unary(cursor, ctx, site)?;
            Ok(EvalResult { value: !v.value, ..v })
        }
        Some(Token::Punct('!')) => {
            cursor.next();
            let v = parse_unary(cursor, ctx, site)?;
            Ok(EvalResult {
                value: (v.value == 0) as i64,
                ..v
            })
        }
        Some(Token::Ident(name)) if is_builtin(name) => {
            let builtin = name.to_ascii_uppercase();
            cursor.next();
            let v = parse_unary(cursor, ctx, site)?;
            let value = match builtin.as_str() {
                "HIGH" | "HI" => (v.value >> 8) & 0xFF,
                "LOW" | "LO" => v.value & 0xFF,
                "BANK" => (v.value >> 16) & 0xFF,
                _ => unreachable!(),
            };
            Ok(EvalResult { value, ..v })
        }
        _ => parse_primary(cursor, ctx, site),
    }
}

fn is_builtin(name: &str) -> bool {
    matches!(
        name.to_ascii_uppercase().as_str(),
        "HIGH" | "HI" | "LOW" | "LO" | "BANK"
    )
}

fn parse_primary(
    cursor: &mut Cursor<'_>,
    ctx: &mut dyn EvalContext,
    site: &Site,
) -> Result<EvalResult, AssemblyError> {
    match cursor.next().cloned() {
        Some(Token::Number(n)) => Ok(EvalResult::known_const(n)),
        Some(Token::Char(n)) => Ok(EvalResult::known_const(n)),
        Some(Token::Punct('$')) => Ok(EvalResult {
            value: ctx.pc(),
            known: true,
            is_constant: false,
        }),
        Some(Token::Punct('(')) => {
            let inner = evaluate(cursor, ctx, site)?;
            match cursor.next() {
                Some(Token::Punct(')')) => Ok(inner),
                _ => Err(AssemblyError::ExpectedX {
                    site: site.clone(),
                    expected: "')'".to_string(),
                }),
            }
        }
        Some(Token::Ident(name)) => match ctx.lookup(&name) {
            Some((value, is_constant)) => Ok(EvalResult {
                value,
                known: true,
                is_constant,
            }),
            None => {
                if ctx.is_final_pass() {
                    Err(AssemblyError::UndefinedSymbol {
                        site: site.clone(),
                        name,
                    })
                } else {
                    Ok(EvalResult {
                        value: 0,
                        known: false,
                        is_constant: false,
                    })
                }
            }
        },
        _ => Err(AssemblyError::ExpectedX {
            site: site.clone(),
            expected: "expression".to_string(),
        }),
    }
}

fn combine(lhs: EvalResult, rhs: EvalResult, op: fn(i64, i64) -> i64) -> EvalResult {
    EvalResult {
        value: op(lhs.value, rhs.value),
        known: lhs.known && rhs.known,
        is_constant: lhs.is_constant && rhs.is_constant,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use std::collections::HashMap;

    struct TestCtx {
        pc: i64,
        symbols: HashMap<String, (i64, bool)>,
        final_pass: bool,
    }

    impl EvalContext for TestCtx {
        fn pc(&self) -> i64 {
            self.pc
        }
        fn lookup(&mut self, name: &str) -> Option<(i64, bool)> {
            self.symbols.get(&name.to_ascii_uppercase()).copied()
        }
        fn is_final_pass(&self) -> bool {
            self.final_pass
        }
    }

    fn eval(src: &str, ctx: &mut TestCtx) -> Result<EvalResult, AssemblyError> {
        let tokens = tokenize(src, "t.asm", 1).unwrap();
        let mut cursor = Cursor::new(&tokens);
        evaluate(&mut cursor, ctx, &Site::new("t.asm", 1))
    }

    fn plain_ctx() -> TestCtx {
        TestCtx {
            pc: 0x100,
            symbols: HashMap::new(),
            final_pass: true,
        }
    }

    #[test]
    fn arithmetic_precedence() {
        let mut ctx = plain_ctx();
        let r = eval("2 + 3 * 4", &mut ctx).unwrap();
        assert_eq!(r.value, 14);
    }

    #[test]
    fn parens_override_precedence() {
        let mut ctx = plain_ctx();
        let r = eval("(2 + 3) * 4", &mut ctx).unwrap();
        assert_eq!(r.value, 20);
    }

    #[test]
    fn pc_reference() {
        let mut ctx = plain_ctx();
        let r = eval("$ + 2", &mut ctx).unwrap();
        assert_eq!(r.value, 0x102);
        assert!(!r.is_constant);
    }

    #[test]
    fn high_low_bank_builtins() {
        let mut ctx = plain_ctx();
        assert_eq!(eval("HIGH(1234H)", &mut ctx).unwrap().value, 0x12);
        assert_eq!(eval("LOW(1234H)", &mut ctx).unwrap().value, 0x34);
        assert_eq!(eval("BANK(12AB34H)", &mut ctx).unwrap().value, 0x12);
    }

    #[test]
    fn undefined_symbol_unknown_during_sizing() {
        let mut ctx = plain_ctx();
        ctx.final_pass = false;
        let r = eval("FOO + 1", &mut ctx).unwrap();
        assert!(!r.known);
    }

    #[test]
    fn undefined_symbol_errors_on_final_pass() {
        let mut ctx = plain_ctx();
        ctx.final_pass = true;
        assert!(matches!(
            eval("FOO + 1", &mut ctx),
            Err(AssemblyError::UndefinedSymbol { .. })
        ));
    }

    #[test]
    fn label_reference_is_not_constant() {
        let mut ctx = plain_ctx();
        ctx.symbols.insert("LOOP".to_string(), (0x200, false));
        let r = eval("LOOP", &mut ctx).unwrap();
        assert!(r.known);
        assert!(!r.is_constant);
    }

    #[test]
    fn divide_by_zero_errors() {
        let mut ctx = plain_ctx();
        assert!(matches!(
            eval("1 / 0", &mut ctx),
            Err(AssemblyError::DivByZero { .. })
        ));
    }

    #[test]
    fn relational_and_logical_operators() {
        let mut ctx = plain_ctx();
        assert_eq!(eval("3 < 4", &mut ctx).unwrap().value, 1);
        assert_eq!(eval("(1 == 1) && (2 == 3)", &mut ctx).unwrap().value, 0);
        assert_eq!(eval("(1 == 2) || (3 == 3)", &mut ctx).unwrap().value, 1);
    }
}
