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

//! A3: macro collection and expansion. Collection is driven line-by-line
//! from outside (the pass driver hands every line to `MacroCollector`
//! while it is active); expansion substitutes `%1`..`%9` positional
//! parameters into the stored body and hands the result back as plain
//! source lines to be re-parsed, recursively, up to a fixed depth.

use crate::errors::{AssemblyError, Site};

pub const MAX_MACRO_DEPTH: usize = 16;

/// Accumulates the body of a `MACRO .. ENDM` block while it is being
/// defined. Lives in the driver's state only while collecting; the
/// finished `(name, params, body)` is handed to the symbol table.
#[derive(Debug, Default)]
pub struct MacroCollector {
    name: Option<String>,
    params: Vec<String>,
    body: Vec<String>,
    active: bool,
}

impl MacroCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn start(&mut self, name: String, params: Vec<String>) {
        self.name = Some(name);
        self.params = params;
        self.body.clear();
        self.active = true;
    }

    /// Feeds one raw source line to the collector. Returns `Some((name,
    /// params, body))` when the line was `ENDM` and collection finished;
    /// otherwise appends the line to the body and returns `None`.
    pub fn feed(&mut self, raw_line: &str) -> Option<(String, Vec<String>, Vec<String>)> {
        if raw_line.trim().eq_ignore_ascii_case("endm") {
            self.active = false;
            let name = self.name.take().unwrap_or_default();
            let params = std::mem::take(&mut self.params);
            let body = std::mem::take(&mut self.body);
            Some((name, params, body))
        } else {
            self.body.push(raw_line.to_string());
            None
        }
    }
}

/// Substitutes `%1`..`%9` positional parameters in a macro body line with
/// the caller-supplied argument text. Unmatched `%n` (argument not
/// supplied) substitutes the empty string.
pub fn substitute_params(line: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(line.len());
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '%' && i + 1 < chars.len() && chars[i + 1].is_ascii_digit() {
            let n = chars[i + 1].to_digit(10).unwrap() as usize;
            if n >= 1 && n <= 9 {
                if let Some(arg) = args.get(n - 1) {
                    out.push_str(arg);
                }
                i += 2;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Bookkeeping for active macro expansions: one frame per nested
/// expansion, checked against `MAX_MACRO_DEPTH` before pushing a new one.
#[derive(Debug, Default)]
pub struct ExpansionStack {
    depth: usize,
}

impl ExpansionStack {
    pub fn new() -> Self {
        Self { depth: 0 }
    }

    pub fn enter(&mut self, site: &Site) -> Result<(), AssemblyError> {
        if self.depth >= MAX_MACRO_DEPTH {
            return Err(AssemblyError::MacroTooDeep {
                site: site.clone(),
                max: MAX_MACRO_DEPTH,
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_gathers_body_until_endm() {
        let mut collector = MacroCollector::new();
        collector.start("PUSHALL".to_string(), vec![]);
        assert!(collector.feed("PUSH WA").is_none());
        assert!(collector.feed("PUSH BC").is_none());
        let result = collector.feed("ENDM");
        assert!(result.is_some());
        let (name, _params, body) = result.unwrap();
        assert_eq!(name, "PUSHALL");
        assert_eq!(body, vec!["PUSH WA".to_string(), "PUSH BC".to_string()]);
        assert!(!collector.is_active());
    }

    #[test]
    fn positional_parameter_substitution() {
        let args = vec!["A".to_string(), "#5".to_string()];
        assert_eq!(substitute_params("LD %1, %2", &args), "LD A, #5");
    }

    #[test]
    fn unmatched_parameter_substitutes_empty() {
        let args = vec!["A".to_string()];
        assert_eq!(substitute_params("LD %1, %2", &args), "LD A, ");
    }

    #[test]
    fn expansion_stack_rejects_deep_recursion() {
        let mut stack = ExpansionStack::new();
        let site = Site::new("t.asm", 1);
        for _ in 0..MAX_MACRO_DEPTH {
            stack.enter(&site).unwrap();
        }
        assert!(matches!(
            stack.enter(&site),
            Err(AssemblyError::MacroTooDeep { .. })
        ));
    }
}
