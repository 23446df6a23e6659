// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

// Exits with the status given as first argument, 1 by default.

fn main() {
    let code = std::env::args()
        .nth(1)
        .and_then(|c| c.parse().ok())
        .unwrap_or(1);
    std::process::exit(code);
}
