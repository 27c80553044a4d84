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

use std::path::PathBuf;

use thiserror::Error;

/// A single source location, attached to almost every error variant so the
/// CLI can report `file:line` the way the rest of the ASL family does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub file: PathBuf,
    pub line: usize,
}

impl Site {
    pub fn new(file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl std::fmt::Display for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    // --- Lexical ---
    #[error("{site}: unterminated string literal")]
    UnterminatedString { site: Site },
    #[error("{site}: unexpected character {ch:?}")]
    UnexpectedChar { site: Site, ch: char },

    // --- Syntactic ---
    #[error("{site}: invalid operand: {reason}")]
    InvalidOperand { site: Site, reason: String },
    #[error("{site}: expected {expected}")]
    ExpectedX { site: Site, expected: String },
    #[error("{site}: unknown instruction or macro: {name}")]
    UnknownInstructionOrMacro { site: Site, name: String },

    // --- Semantic ---
    #[error("{site}: undefined symbol: {name}")]
    UndefinedSymbol { site: Site, name: String },
    #[error("{site}: redefinition of symbol: {name}")]
    Redefinition { site: Site, name: String },
    #[error("{site}: division by zero")]
    DivByZero { site: Site },
    #[error("{site}: branch out of range ({disp}, must fit in a {bits}-bit signed displacement)")]
    BranchOutOfRange { site: Site, disp: i64, bits: u8 },
    #[error("{site}: unsupported operand combination for {mnemonic}: {reason}")]
    UnsupportedOperandCombo {
        site: Site,
        mnemonic: String,
        reason: String,
    },
    #[error("{site}: structural error: {reason}")]
    StructuralError { site: Site, reason: String },

    // --- Resource ---
    #[error("{site}: cannot open file: {path}")]
    CannotOpenFile { site: Site, path: PathBuf },
    #[error("{site}: include nesting too deep (max {max})")]
    IncludeTooDeep { site: Site, max: usize },
    #[error("{site}: macro expansion nesting too deep (max {max})")]
    MacroTooDeep { site: Site, max: usize },
    #[error("{site}: path too long: {path}")]
    PathTooLong { site: Site, path: String },

    // --- Fatal ---
    #[error("out of memory")]
    OutOfMemory,
    #[error("too many errors ({count}), aborting file")]
    TooManyErrors { count: usize },
}

impl AssemblyError {
    /// True for the handful of variants that abort the current file
    /// immediately rather than being recorded and continuing (§7, §5).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AssemblyError::OutOfMemory | AssemblyError::TooManyErrors { .. }
        )
    }
}

/// Accumulates non-fatal errors across both passes so the driver can keep
/// scanning after a bad line (§7's propagation policy) and report
/// everything at the end. Also enforces the "too many errors" guard (§5).
#[derive(Debug, Default)]
pub struct ErrorSink {
    errors: Vec<AssemblyError>,
    threshold: usize,
}

pub const DEFAULT_ERROR_THRESHOLD: usize = 10_000;

impl ErrorSink {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            threshold: DEFAULT_ERROR_THRESHOLD,
        }
    }

    #[cfg(test)]
    pub fn with_threshold(threshold: usize) -> Self {
        Self {
            errors: Vec::new(),
            threshold,
        }
    }

    /// Records an error. Returns `Err` (fatal) when the caller must abort
    /// the file immediately: either the error itself is fatal, or the
    /// threshold has just been crossed.
    pub fn push(&mut self, err: AssemblyError) -> Result<(), AssemblyError> {
        if err.is_fatal() {
            return Err(err);
        }
        self.errors.push(err);
        if self.errors.len() >= self.threshold {
            return Err(AssemblyError::TooManyErrors {
                count: self.errors.len(),
            });
        }
        Ok(())
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn count(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssemblyError> {
        self.errors.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_aborts() {
        let mut sink = ErrorSink::with_threshold(2);
        let site = Site::new("test.asm", 1);
        assert!(
            sink.push(AssemblyError::DivByZero { site: site.clone() })
                .is_ok()
        );
        assert!(matches!(
            sink.push(AssemblyError::DivByZero { site }),
            Err(AssemblyError::TooManyErrors { count: 2 })
        ));
    }

    #[test]
    fn fatal_short_circuits_immediately() {
        let mut sink = ErrorSink::new();
        assert!(matches!(
            sink.push(AssemblyError::OutOfMemory),
            Err(AssemblyError::OutOfMemory)
        ));
        assert!(!sink.has_errors());
    }
}
