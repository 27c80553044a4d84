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

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use tlcs900asm::assemble;
use tlcs900asm::driver::AssembleOutput;
use tlcs900asm::file_reader::AsmFileReader;

#[derive(Parser)]
#[clap(version = "0.1.0", author = "Connor Nolan")]
struct Opts {
    /// Source file to assemble.
    input: PathBuf,
    /// Output ROM path; defaults to the input with its extension replaced by `.rom`.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Echo per-pass summaries (iteration count, bytes emitted, error count).
    #[arg(short, long)]
    verbose: bool,
    /// Write an address/bytes/source listing to this path.
    #[arg(short, long)]
    listing: Option<PathBuf>,
}

fn default_output_path(input: &std::path::Path) -> PathBuf {
    input.with_extension("rom")
}

fn format_listing(output: &AssembleOutput) -> String {
    let mut out = String::new();
    for entry in &output.listing {
        let mut byte_cols = String::new();
        for b in &entry.bytes {
            byte_cols.push_str(&format!("{b:02X} "));
        }
        out.push_str(&format!("{:06X}  {:<24}{}\n", entry.pc, byte_cols, entry.text));
    }
    out
}

/// Runs one assembly and writes its outputs. Returns whether assembly
/// succeeded (no errors recorded) so `main` can pick an exit code (§6):
/// `Ok(true)` -> 0, `Ok(false)` -> 1, `Err` (usage/IO failure) -> 2.
fn run(opts: &Opts) -> Result<bool> {
    let reader = AsmFileReader;
    let output = assemble(&opts.input, &reader)?;

    let output_path = opts.output.clone().unwrap_or_else(|| default_output_path(&opts.input));
    fs::write(&output_path, &output.bytes)
        .with_context(|| format!("failed to write output file: {}", output_path.display()))?;

    if let Some(listing_path) = &opts.listing {
        fs::write(listing_path, format_listing(&output))
            .with_context(|| format!("failed to write listing file: {}", listing_path.display()))?;
    }

    for err in output.errors.iter() {
        eprintln!("{err}");
    }

    if opts.verbose {
        eprintln!(
            "{}: {} iterations, {} bytes, {} error(s)",
            opts.input.display(),
            output.iterations,
            output.bytes.len(),
            output.errors.count(),
        );
    }

    if output.has_errors() {
        eprintln!(
            "{}: assembly failed with {} error(s)",
            opts.input.display(),
            output.errors.count()
        );
        Ok(false)
    } else {
        println!("Successfully assembled {} to {}", opts.input.display(), output_path.display());
        Ok(true)
    }
}

fn main() -> ExitCode {
    let opts = Opts::parse();
    match run(&opts) {
        Ok(true) => ExitCode::from(0),
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
