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

//! C4: the instruction encoder lives entirely in [`encoder`]. The pass
//! sequencing that used to live here (constant table, symbol table,
//! bytecode generation) is now [`crate::driver`], which works over the
//! current `ast`/`symbol_table` types instead of a single fixed target.

pub mod encoder;
