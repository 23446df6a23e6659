// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

// Succeeds. With an argument, the argument is created as an output file first.

use std::fs;
use std::process::ExitCode;

fn main() -> ExitCode {
    match std::env::args().nth(1) {
        None => ExitCode::SUCCESS,
        Some(output) => match fs::write(&output, b"converted") {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("cannot write {output}: {e}");
                ExitCode::from(2)
            }
        },
    }
}
