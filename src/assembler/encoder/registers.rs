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

//! §4.4.1: the three register-code lookup functions, plus the base-code
//! accessor memory addressing needs (only the plain 16/32-bit general
//! registers `HL, IX, IY, IZ, ...` can serve as an addressing-mode base).

use crate::ast::RegisterId;

/// The raw numeric code embedded in a `RegisterId`, regardless of family.
/// This is what every encoding table in §4.4.1/§4.4.2 actually keys on.
pub fn code(reg: RegisterId) -> u8 {
    match reg {
        RegisterId::General(c) => c,
        RegisterId::IndexByte(c) => c,
        RegisterId::QBank(c) => c,
        RegisterId::QIndexByte(c) => c,
        RegisterId::Pc => 0,
        RegisterId::Sr => 0,
        RegisterId::F => 0,
        RegisterId::FPrime => 0,
    }
}

/// The `0..7` base code used to select a memory addressing mode. Only the
/// plain current-bank general registers can act as an address base.
pub fn base_code(reg: RegisterId) -> Option<u8> {
    match reg {
        RegisterId::General(c) if c <= 7 => Some(c),
        _ => None,
    }
}
