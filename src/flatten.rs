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

//! Source-level preprocessing that runs once, before any sizing iteration:
//! resolves `INCLUDE` recursively into one flat line list, and collects
//! `MACRO .. ENDM` bodies into the symbol table (A3). Both are purely
//! textual and independent of pass/iteration, so doing them once up front
//! means the sizing loop only ever walks plain instruction/directive lines.

use std::path::{Path, PathBuf};

use crate::errors::{AssemblyError, Site};
use crate::file_reader::FileReader;
use crate::lexer::{self, Token};
use crate::macro_engine::MacroCollector;
use crate::symbol_table::{SymbolKind, SymbolTable};

pub const MAX_INCLUDE_DEPTH: usize = 16;

/// One line of post-flatten source: already past `INCLUDE` resolution and
/// macro-definition collection, ready for the pass driver's per-iteration
/// walk.
#[derive(Debug, Clone)]
pub struct RawLine {
    pub file: PathBuf,
    pub line: usize,
    pub text: String,
}

/// First identifier-shaped token on the line that isn't a leading label,
/// alongside the tokens that follow it -- just enough to recognize
/// `INCLUDE`/`BINCLUDE`/`MACRO`/`ENDM` without running the full line parser
/// (which needs an `EvalContext` this phase has no use for).
fn leading_keyword(tokens: &[Token]) -> Option<(&'static str, usize)> {
    const KEYWORDS: [&str; 4] = ["INCLUDE", "BINCLUDE", "MACRO", "ENDM"];
    let as_keyword = |s: &str| -> Option<&'static str> {
        let upper = s.to_ascii_uppercase();
        KEYWORDS.iter().find(|k| **k == upper).copied()
    };

    match tokens.first() {
        Some(Token::Ident(head)) => {
            if let Some(kw) = as_keyword(head) {
                return Some((kw, 1));
            }
            // `name: KEYWORD ...` or `name KEYWORD ...` (label-before-MACRO form).
            match tokens.get(1) {
                Some(Token::Punct(':')) => {
                    if let Some(Token::Ident(next)) = tokens.get(2) {
                        as_keyword(next).map(|kw| (kw, 3))
                    } else {
                        None
                    }
                }
                Some(Token::Ident(next)) => as_keyword(next).map(|kw| (kw, 2)),
                _ => None,
            }
        }
        _ => None,
    }
}

pub fn resolve_include_path(source_dir: &Path, raw: &str) -> PathBuf {
    let candidate = PathBuf::from(raw);
    if candidate.is_absolute() {
        candidate
    } else {
        source_dir.join(candidate)
    }
}

/// Recursively flattens `path` (and anything it `INCLUDE`s) into a single
/// ordered line list, registering any `MACRO` bodies found along the way
/// into `symbols`.
pub fn flatten_file(
    path: &Path,
    reader: &dyn FileReader,
    symbols: &mut SymbolTable,
    depth: usize,
) -> Result<Vec<RawLine>, AssemblyError> {
    if depth > MAX_INCLUDE_DEPTH {
        return Err(AssemblyError::IncludeTooDeep {
            site: Site::new(path.to_string_lossy().to_string(), 0),
            max: MAX_INCLUDE_DEPTH,
        });
    }

    let source = reader
        .read_to_string(path)
        .map_err(|_| AssemblyError::CannotOpenFile {
            site: Site::new(path.to_string_lossy().to_string(), 0),
            path: path.to_path_buf(),
        })?;

    let source_dir = path.parent().unwrap_or_else(|| Path::new(""));
    let mut out = Vec::new();
    let mut collector = MacroCollector::new();

    for (idx, text) in source.lines().enumerate() {
        let line_number = idx + 1;
        let site = Site::new(path.to_string_lossy().to_string(), line_number);

        if collector.is_active() {
            if let Some((name, params, body)) = collector.feed(text) {
                symbols.define_macro(&name, params, body, site);
            }
            continue;
        }

        let tokens = lexer::tokenize(text, &path.to_string_lossy(), line_number)?;
        match leading_keyword(&tokens) {
            Some(("MACRO", kw_idx)) => {
                let name = match tokens.first() {
                    Some(Token::Ident(n)) if kw_idx > 1 => n.clone(),
                    _ => {
                        return Err(AssemblyError::ExpectedX {
                            site,
                            expected: "a name before MACRO".to_string(),
                        });
                    }
                };
                let params = tokens[kw_idx..]
                    .iter()
                    .filter_map(|t| match t {
                        Token::Ident(n) => Some(n.clone()),
                        _ => None,
                    })
                    .collect();
                collector.start(name, params);
            }
            Some(("ENDM", _)) => {
                return Err(AssemblyError::ExpectedX {
                    site,
                    expected: "ENDM without a matching MACRO".to_string(),
                });
            }
            Some(("INCLUDE", kw_idx)) => {
                let rest = &tokens[kw_idx..];
                let raw_path = match rest.first() {
                    Some(Token::Str(s)) => s.clone(),
                    Some(Token::Ident(s)) => s.clone(),
                    _ => {
                        return Err(AssemblyError::ExpectedX {
                            site,
                            expected: "a quoted path".to_string(),
                        });
                    }
                };
                let included = resolve_include_path(source_dir, &raw_path);
                let mut nested = flatten_file(&included, reader, symbols, depth + 1)?;
                out.append(&mut nested);
            }
            _ => out.push(RawLine {
                file: path.to_path_buf(),
                line: line_number,
                text: text.to_string(),
            }),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_reader::MockFileReader;

    #[test]
    fn include_is_spliced_inline() {
        let mut reader = MockFileReader::default();
        reader.add_file("main.asm", "NOP\nINCLUDE \"child.asm\"\nHALT");
        reader.add_file("child.asm", "EI");
        let mut symbols = SymbolTable::new();
        let lines = flatten_file(Path::new("main.asm"), &reader, &mut symbols, 0).unwrap();
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["NOP", "EI", "HALT"]);
    }

    #[test]
    fn macro_body_is_collected_not_emitted() {
        let mut reader = MockFileReader::default();
        reader.add_file(
            "main.asm",
            "PUSHALL MACRO\nPUSH WA\nPUSH BC\nENDM\nNOP",
        );
        let mut symbols = SymbolTable::new();
        let lines = flatten_file(Path::new("main.asm"), &reader, &mut symbols, 0).unwrap();
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["NOP"]);
        let sym = symbols.lookup("PUSHALL").unwrap();
        assert_eq!(sym.kind, SymbolKind::Macro);
        let def = sym.macro_def.as_ref().unwrap();
        assert_eq!(def.body, vec!["PUSH WA".to_string(), "PUSH BC".to_string()]);
    }

    #[test]
    fn include_cycle_is_bounded() {
        let mut reader = MockFileReader::default();
        reader.add_file("a.asm", "INCLUDE \"a.asm\"");
        let mut symbols = SymbolTable::new();
        let result = flatten_file(Path::new("a.asm"), &reader, &mut symbols, 0);
        assert!(matches!(result, Err(AssemblyError::IncludeTooDeep { .. })));
    }
}
