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

//! End-to-end scenarios, driven entirely through `MockFileReader` so no
//! real files are touched. Each test hands the public `assemble` entry
//! point a short program the way the CLI would and checks the resulting
//! ROM bytes.

use std::path::Path;

use tlcs900asm::assemble;
use tlcs900asm::driver::AssembleOutput;
use tlcs900asm::file_reader::MockFileReader;

fn assemble_str(src: &str) -> AssembleOutput {
    let mut reader = MockFileReader::default();
    reader.add_file("prog.asm", src);
    assemble(Path::new("prog.asm"), &reader).unwrap()
}

#[test]
fn s1_bare_nop_assembles_to_a_single_byte() {
    let out = assemble_str("NOP");
    assert!(!out.has_errors());
    assert_eq!(out.bytes, vec![0x00]);
}

#[test]
fn s2_short_immediate_register_load() {
    let out = assemble_str("ORG 100H\nLD A, #5");
    assert!(!out.has_errors());
    assert_eq!(out.bytes, vec![0x25, 0x05]);
}

#[test]
fn s3_long_register_immediate_load() {
    let out = assemble_str("ORG 0\nLD XWA, #12345678H");
    assert!(!out.has_errors());
    assert_eq!(out.bytes, vec![0x40, 0x78, 0x56, 0x34, 0x12]);
}

#[test]
fn s4_backward_branch_targets_its_own_label() {
    let out = assemble_str("ORG 0\nLOOP: NOP\nJR LOOP");
    assert!(!out.has_errors());
    // NOP at 0, JR at 1-2; displacement is relative to the end of the
    // JR instruction (address 3), so LOOP (0) gives disp = -3.
    assert_eq!(out.bytes, vec![0x00, 0x68, 0xFD]);
}

#[test]
fn s5_forward_branch_resolves_after_a_sizing_pass() {
    let out = assemble_str("ORG 0\nJR FWD\nNOP\nFWD: NOP");
    assert!(!out.has_errors());
    assert_eq!(out.bytes, vec![0x68, 0x01, 0x00, 0x00]);
}

#[test]
fn s6_define_byte_mixes_numeric_and_string_items() {
    let out = assemble_str("ORG 0\nDB 1,2,\"AB\",3");
    assert!(!out.has_errors());
    assert_eq!(out.bytes, vec![0x01, 0x02, 0x41, 0x42, 0x03]);
}

#[test]
fn s7_equ_symbol_participates_in_an_expression() {
    let out = assemble_str("ORG 0\nX EQU 5\nDW X*2+1");
    assert!(!out.has_errors());
    assert_eq!(out.bytes, vec![0x0B, 0x00]);
}

#[test]
fn s8_forward_reference_converges_to_24bit_direct_address() {
    // SYM isn't known until after many lines, so the direct-address
    // form has to widen across sizing iterations rather than locking
    // in an 8- or 16-bit guess on the first pass.
    let mut src = String::from("ORG 0\nLD WA,(SYM)\n");
    for _ in 0..40 {
        src.push_str("NOP\n");
    }
    src.push_str("SYM EQU 12000H\n");
    let out = assemble_str(&src);
    assert!(!out.has_errors());
    assert_eq!(out.bytes.len(), 5 + 40);
    assert!(out.iterations >= 2);
}

#[test]
fn direct_address_boundary_0xff_takes_the_8bit_form() {
    let out = assemble_str("ORG 0\nADDR EQU 0FFH\nLD A,(ADDR)");
    assert!(!out.has_errors());
    assert_eq!(out.bytes.len(), 3);
}

#[test]
fn direct_address_boundary_0x10000_takes_the_24bit_form() {
    let out = assemble_str("ORG 0\nADDR EQU 10000H\nLD A,(ADDR)");
    assert!(!out.has_errors());
    assert_eq!(out.bytes.len(), 5);
}

#[test]
fn jr_displacement_at_the_positive_boundary_is_accepted() {
    // JR is 2 bytes; the farthest forward target still fitting an
    // 8-bit signed displacement is 127 bytes past the end of JR.
    let mut src = String::from("ORG 0\nJR FWD\n");
    for _ in 0..127 {
        src.push_str("NOP\n");
    }
    src.push_str("FWD: NOP\n");
    let out = assemble_str(&src);
    assert!(!out.has_errors());
    assert_eq!(out.bytes[1], 0x7F);
}

#[test]
fn jr_displacement_just_past_the_boundary_is_rejected() {
    let mut src = String::from("ORG 0\nJR FWD\n");
    for _ in 0..128 {
        src.push_str("NOP\n");
    }
    src.push_str("FWD: NOP\n");
    let out = assemble_str(&src);
    assert!(out.has_errors());
}

#[test]
fn jr_displacement_at_the_negative_boundary_is_accepted() {
    let mut src = String::from("ORG 0\nLOOP: NOP\n");
    for _ in 0..126 {
        src.push_str("NOP\n");
    }
    src.push_str("JR LOOP\n");
    let out = assemble_str(&src);
    assert!(!out.has_errors());
}

#[test]
fn calr_targeting_its_own_next_instruction_emits_zero_displacement() {
    let out = assemble_str("ORG 0\nCALR NEXT\nNEXT: NOP");
    assert!(!out.has_errors());
    assert_eq!(&out.bytes[0..3], &[0x1E, 0x00, 0x00]);
}

#[test]
fn calr_accepts_a_backward_displacement_to_its_own_start() {
    let out = assemble_str("ORG 0\nHERE: CALR HERE");
    assert!(!out.has_errors());
    assert_eq!(&out.bytes[0..3], &[0x1E, 0xFD, 0xFF]);
}

#[test]
fn macro_expands_with_positional_argument_substitution() {
    let src = "SETBOTH MACRO\nLD A, %1\nLD B, %1\nENDM\nORG 0\nSETBOTH #9";
    let out = assemble_str(src);
    assert!(!out.has_errors());
    assert_eq!(out.bytes, vec![0x25, 0x09, 0x26, 0x09]);
}

#[test]
fn include_is_spliced_inline_before_assembly() {
    let mut reader = MockFileReader::default();
    reader.add_file("main.asm", "ORG 0\nINCLUDE \"child.asm\"\nNOP");
    reader.add_file("child.asm", "DB 7");
    let out = assemble(Path::new("main.asm"), &reader).unwrap();
    assert!(!out.has_errors());
    assert_eq!(out.bytes, vec![0x07, 0x00]);
}

#[test]
fn binclude_slices_a_binary_blob_by_offset_and_length() {
    let mut reader = MockFileReader::default();
    reader.add_file("main.asm", "ORG 0\nBINCLUDE \"blob.bin\", 1, 2");
    reader.add_binary_file("blob.bin", &[0xAA, 0xBB, 0xCC, 0xDD]);
    let out = assemble(Path::new("main.asm"), &reader).unwrap();
    assert!(!out.has_errors());
    assert_eq!(out.bytes, vec![0xBB, 0xCC]);
}

#[test]
fn align_pads_to_the_next_power_of_two_boundary() {
    let out = assemble_str("ORG 0\nDB 1\nALIGN 4\nDB 2");
    assert!(!out.has_errors());
    assert_eq!(out.bytes, vec![0x01, 0x00, 0x00, 0x00, 0x02]);
}

#[test]
fn define_space_reserves_bytes_with_an_explicit_fill() {
    let out = assemble_str("ORG 0\nDS 3, 0FFH\nDB 1");
    assert!(!out.has_errors());
    assert_eq!(out.bytes, vec![0xFF, 0xFF, 0xFF, 0x01]);
}

#[test]
fn end_directive_stops_assembly_at_that_line() {
    let out = assemble_str("ORG 0\nDB 1\nEND\nDB 2");
    assert!(!out.has_errors());
    assert_eq!(out.bytes, vec![0x01]);
}

#[test]
fn redefining_an_equ_with_a_new_value_is_reported() {
    let out = assemble_str("X EQU 1\nX EQU 2\nORG 0\nNOP");
    assert!(out.has_errors());
}

#[test]
fn undefined_symbol_on_the_final_pass_is_reported() {
    let out = assemble_str("ORG 0\nDW UNDEFINED_SYMBOL");
    assert!(out.has_errors());
}

#[test]
fn unknown_mnemonic_is_reported_without_aborting_the_rest_of_the_file() {
    let out = assemble_str("ORG 0\nFROBNICATE A, B\nDB 9");
    assert!(out.has_errors());
    assert_eq!(out.bytes.last().copied(), Some(9));
}

#[test]
fn divide_by_zero_in_a_constant_expression_is_reported() {
    let out = assemble_str("ORG 0\nDB 1/0");
    assert!(out.has_errors());
}

#[test]
fn maxmode_off_rejects_an_explicit_24bit_suffix() {
    let out = assemble_str("ORG 0\nMAXMODE OFF\nLD A,(1000H:24)");
    assert!(out.has_errors());
}

#[test]
fn origin_sets_the_output_base_for_the_whole_rom() {
    let out = assemble_str("ORG 40H\nNOP");
    assert!(!out.has_errors());
    assert_eq!(out.bytes, vec![0x00]);
}

#[test]
fn include_nesting_past_the_limit_is_a_resource_error() {
    let mut reader = MockFileReader::default();
    reader.add_file("a.asm", "INCLUDE \"a.asm\"");
    let result = assemble(Path::new("a.asm"), &reader);
    assert!(result.is_err());
}
