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

//! The data model shared by every stage of the assembler: the generic
//! `Operand` record C3 produces and C4 consumes, the directive set, and
//! the per-line shape the line parser hands to the pass driver.

use std::fmt;

/// Width of a register or memory access. `None` applies to operand modes
/// that carry no intrinsic width (e.g. a bare condition code).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Size {
    Byte,
    Word,
    Long,
    None,
}

impl Size {
    pub fn bytes(self) -> u32 {
        match self {
            Size::Byte => 1,
            Size::Word => 2,
            Size::Long => 4,
            Size::None => 0,
        }
    }
}

/// Which register bank/family a register name resolves into. The encoder
/// (§4.4.1) only needs the numeric code per width, but keeping the family
/// tag lets the operand parser reject width-mismatched combinations (e.g.
/// `LD A, HL`) before the encoder ever sees them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RegisterId {
    /// 8/16/32-bit current-bank general registers, indexed 0..7 within
    /// their width (`W,A,B,C,D,E,L,H` / `WA..SP` / `XWA..XSP`).
    General(u8),
    /// Index-register high/low byte pseudo-registers (8-bit table, codes
    /// 8..13).
    IndexByte(u8),
    /// Q-bank mirror of a General register (8/16-bit tables, codes
    /// 16..23 / 8..14 respectively).
    QBank(u8),
    /// Q-bank index byte (8-bit table, codes 24..29).
    QIndexByte(u8),
    Pc,
    Sr,
    F,
    FPrime,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Condition {
    F = 0,
    Lt = 1,
    Le = 2,
    Ule = 3,
    Pe = 4,
    Mi = 5,
    Z = 6,
    Ult = 7,
    T = 8,
    Ge = 9,
    Gt = 10,
    Ugt = 11,
    Po = 12,
    Pl = 13,
    Nz = 14,
    Nc = 15,
}

impl Condition {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// The addressing mode an `Operand` was parsed into (§3, §4.3).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Mode {
    Immediate,
    Register,
    RegIndirect,
    PostInc,
    PreDec,
    Indexed,
    IndexedReg,
    Direct,
    Condition,
}

/// The tagged operand record of spec §3. Created fresh per operand slot
/// during line parsing, consumed once by the encoder, never retained
/// across lines (a fresh line reparses fresh operands).
#[derive(Debug, Clone, PartialEq)]
pub struct Operand {
    pub mode: Mode,
    pub size: Size,
    pub reg: Option<RegisterId>,
    pub index_reg: Option<RegisterId>,
    pub condition: Option<Condition>,
    pub value: i64,
    pub value_known: bool,
    pub is_constant: bool,
    /// Explicit `:8`/`:16`/`:24` suffix on a Direct/Indexed operand; 0
    /// means "let the encoder auto-select" (§4.4.2).
    pub addr_size: u8,
    /// Retained only when the operand is an unresolved bare identifier,
    /// so macro-argument reconstruction (§4.5) can rebuild source text.
    pub symbol_name: Option<String>,
}

impl Operand {
    pub fn immediate(value: i64, known: bool, is_constant: bool) -> Self {
        Operand {
            mode: Mode::Immediate,
            size: Size::None,
            reg: None,
            index_reg: None,
            condition: None,
            value,
            value_known: known,
            is_constant,
            addr_size: 0,
            symbol_name: None,
        }
    }

    pub fn register(reg: RegisterId, size: Size) -> Self {
        Operand {
            mode: Mode::Register,
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

    pub fn condition(cc: Condition) -> Self {
        Operand {
            mode: Mode::Condition,
            size: Size::None,
            reg: None,
            index_reg: None,
            condition: Some(cc),
            value: 0,
            value_known: true,
            is_constant: true,
            addr_size: 0,
            symbol_name: None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Immediate => "immediate",
            Mode::Register => "register",
            Mode::RegIndirect => "register indirect",
            Mode::PostInc => "post-increment",
            Mode::PreDec => "pre-decrement",
            Mode::Indexed => "indexed",
            Mode::IndexedReg => "register-indexed",
            Mode::Direct => "direct",
            Mode::Condition => "condition",
        };
        f.write_str(s)
    }
}

/// One element of a `DB`/`DW`/`DD` list: either an expression or a quoted
/// string contributing one byte per character (§6).
#[derive(Debug, Clone, PartialEq)]
pub enum DataItem {
    Expr(Operand),
    Str(String),
}

/// Directives recognised by the line parser (§6). `ORG`/`EQU`/`SET`
/// resolve directly against the symbol table and pass driver rather than
/// being deferred, since their effect (moving `pc`, binding a symbol) is
/// immediate and order-sensitive.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Org(Operand),
    Equ(String, Operand),
    Set(String, Operand),
    DefineByte(Vec<DataItem>),
    DefineWord(Vec<DataItem>),
    DefineLong(Vec<DataItem>),
    DefineSpace(Operand, Option<Operand>),
    Align(Operand),
    Include(String),
    Binclude(String, Option<Operand>, Option<Operand>),
    Cpu(String),
    MaxMode(bool),
    End,
    Page,
    Listing,
    MacroStart(String, Vec<String>),
    MacroEnd,
}

/// A single logical source line, after label/mnemonic/operand parsing but
/// before encoding. `raw_operand_tokens` retains the unparsed operand text
/// so macro-body substitution and diagnostics can quote it verbatim.
#[derive(Debug, Clone, Default)]
pub struct ParsedLine {
    pub line_number: usize,
    pub label: Option<String>,
    pub mnemonic: Option<String>,
    pub operands: Vec<Operand>,
    pub directive: Option<Directive>,
    pub raw_text: String,
}
