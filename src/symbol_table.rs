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

//! C1: the symbol table. Case-insensitive name -> (kind, value, defined?)
//! map with the redefinition rules of spec §4.1.

use std::collections::HashMap;

use crate::errors::{AssemblyError, Site};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Label,
    Equ,
    Set,
    Macro,
    Section,
}

#[derive(Debug, Clone)]
pub struct MacroDef {
    pub params: Vec<String>,
    pub body: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub value: i64,
    pub defined: bool,
    pub site: Site,
    pub macro_def: Option<MacroDef>,
    /// Bumped by `get_value` so an implementer can later report unused
    /// symbols; not read anywhere else in the core today.
    pub referenced: bool,
}

/// Case-folds a name the same way for every lookup and insert, so the
/// table never has to reconcile two different foldings later.
fn fold(name: &str) -> String {
    name.to_ascii_uppercase()
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.entries.get(&fold(name))
    }

    /// Defines or updates a symbol. Sizing-pass semantics (spec §4.1):
    /// a `Label`/`Equ` may be defined once; redefining with a different
    /// kind, or redefining a `Label`/`Equ` with the same kind *in the
    /// first sizing iteration*, is an error. In later sizing iterations a
    /// `Label`'s value is allowed to move (labels legitimately shift as
    /// earlier encodings grow) — only `Set` may always be freely rebound.
    pub fn define(
        &mut self,
        name: &str,
        kind: SymbolKind,
        value: i64,
        site: Site,
        sizing_iteration: u32,
    ) -> Result<(), AssemblyError> {
        let key = fold(name);
        if let Some(existing) = self.entries.get_mut(&key) {
            if kind == SymbolKind::Set || existing.kind == SymbolKind::Set {
                if kind != existing.kind && sizing_iteration <= 1 {
                    return Err(AssemblyError::Redefinition {
                        site,
                        name: name.to_string(),
                    });
                }
            } else if existing.kind != kind && sizing_iteration <= 1 {
                return Err(AssemblyError::Redefinition {
                    site,
                    name: name.to_string(),
                });
            } else if existing.kind == kind
                && kind != SymbolKind::Set
                && sizing_iteration <= 1
                && existing.defined
            {
                return Err(AssemblyError::Redefinition {
                    site,
                    name: name.to_string(),
                });
            }
            existing.value = value;
            existing.defined = true;
            existing.site = site;
        } else {
            self.entries.insert(
                key,
                Symbol {
                    kind,
                    value,
                    defined: true,
                    site,
                    macro_def: None,
                    referenced: false,
                },
            );
        }
        Ok(())
    }

    pub fn define_macro(&mut self, name: &str, params: Vec<String>, body: Vec<String>, site: Site) {
        let key = fold(name);
        self.entries.insert(
            key,
            Symbol {
                kind: SymbolKind::Macro,
                value: 0,
                defined: true,
                site,
                macro_def: Some(MacroDef { params, body }),
                referenced: false,
            },
        );
    }

    /// Marks the symbol referenced and returns its value, if defined.
    pub fn get_value(&mut self, name: &str) -> Option<i64> {
        let key = fold(name);
        let entry = self.entries.get_mut(&key)?;
        entry.referenced = true;
        Some(entry.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&fold(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Symbol)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> Site {
        Site::new("t.asm", 1)
    }

    #[test]
    fn case_insensitive_lookup() {
        let mut table = SymbolTable::new();
        table
            .define("Loop", SymbolKind::Label, 10, site(), 1)
            .unwrap();
        assert_eq!(table.lookup("LOOP").unwrap().value, 10);
        assert_eq!(table.lookup("loop").unwrap().value, 10);
    }

    #[test]
    fn label_redefinition_rejected_in_first_iteration() {
        let mut table = SymbolTable::new();
        table
            .define("X", SymbolKind::Label, 0, site(), 1)
            .unwrap();
        assert!(matches!(
            table.define("X", SymbolKind::Label, 0, site(), 1),
            Err(AssemblyError::Redefinition { .. })
        ));
    }

    #[test]
    fn label_value_may_move_across_sizing_iterations() {
        let mut table = SymbolTable::new();
        table
            .define("X", SymbolKind::Label, 4, site(), 1)
            .unwrap();
        table
            .define("X", SymbolKind::Label, 6, site(), 2)
            .unwrap();
        assert_eq!(table.lookup("X").unwrap().value, 6);
    }

    #[test]
    fn set_may_always_be_rebound() {
        let mut table = SymbolTable::new();
        table.define("N", SymbolKind::Set, 1, site(), 1).unwrap();
        table.define("N", SymbolKind::Set, 2, site(), 1).unwrap();
        table.define("N", SymbolKind::Set, 3, site(), 5).unwrap();
        assert_eq!(table.lookup("N").unwrap().value, 3);
    }

    #[test]
    fn equ_vs_label_kind_mismatch_rejected() {
        let mut table = SymbolTable::new();
        table.define("X", SymbolKind::Equ, 1, site(), 1).unwrap();
        assert!(matches!(
            table.define("X", SymbolKind::Label, 1, site(), 1),
            Err(AssemblyError::Redefinition { .. })
        ));
    }
}
