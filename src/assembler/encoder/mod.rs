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

//! §4.4: the mnemonic-keyed encoder. Each group module owns one
//! `try_encode` that returns `Ok(false)` when the mnemonic isn't one of
//! its own, so [`encode_instruction`] just tries each group in turn.

pub mod constants;
mod instruction_encoders;
pub mod memory;
pub mod registers;

use crate::ast::Operand;
use crate::emitter::Emitter;
use crate::errors::{AssemblyError, Site};

/// Encodes one instruction line. Returns `Ok(true)` when `mnemonic` was
/// recognized by some group (bytes already emitted), `Ok(false)` when no
/// group claims it, letting the pass driver fall back to macro expansion
/// before reporting `UnknownInstructionOrMacro` (§7).
pub fn encode_instruction(
    mnemonic: &str,
    operands: &[Operand],
    emitter: &mut Emitter,
    site: &Site,
) -> Result<bool, AssemblyError> {
    for group in [
        instruction_encoders::misc::try_encode,
        instruction_encoders::stack::try_encode,
        instruction_encoders::control_flow::try_encode,
        instruction_encoders::load_store::try_encode,
        instruction_encoders::arithmetic::try_encode,
        instruction_encoders::bitwise::try_encode,
    ] {
        if group(mnemonic, operands, emitter, site)? {
            return Ok(true);
        }
    }
    Ok(false)
}
