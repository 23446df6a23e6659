// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

// Sleeps for the number of milliseconds given as first argument, then succeeds.

use std::thread;
use std::time::Duration;

fn main() {
    let millis: u64 = std::env::args()
        .nth(1)
        .and_then(|m| m.parse().ok())
        .unwrap_or(100);
    thread::sleep(Duration::from_millis(millis));
}
