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

pub mod assembler;
pub mod ast;
pub mod driver;
pub mod emitter;
pub mod errors;
pub mod expr;
pub mod file_reader;
pub mod flatten;
pub mod lexer;
pub mod line_parser;
pub mod macro_engine;
pub mod operand_parser;
pub mod symbol_table;

use std::path::Path;

use file_reader::FileReader;

/// The library's sole entry point: assembles `source_path` (and anything
/// it transitively `INCLUDE`s) through `reader`, running the size-
/// relaxation loop of C5 to a fixed point before the final Emit pass.
///
/// Unlike the rest of the pipeline, which records ordinary assembly
/// errors in the returned `AssembleOutput` and keeps going, this only
/// returns `Err` for the handful of fatal conditions (§7): a malformed
/// top-level `INCLUDE`/`MACRO` structure, or either fatal `AssemblyError`
/// variant escaping the pass loop.
pub fn assemble(source_path: &Path, reader: &dyn FileReader) -> Result<driver::AssembleOutput, errors::AssemblyError> {
    driver::assemble(source_path, reader)
}
