// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

// Dies from SIGKILL without ever exiting normally.

use nix::sys::signal::{raise, Signal};

fn main() {
    let _ = raise(Signal::SIGKILL);
    // unreachable unless raise failed
    std::process::exit(3);
}
