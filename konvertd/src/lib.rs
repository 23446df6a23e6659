// SPDX-License-Identifier: MIT
// konvertd: media conversion daemon
//
// - Accepts uploads over HTTP and converts them with ffmpeg.
// - Runs the converters on a fixed pool of worker threads.
// - Rate limits clients and prunes old artifacts in the background.
//
// Author: Johannes Leupolz <dev@leupolz.eu>

pub mod config;
pub mod conversion;
pub mod http;
pub mod job_engine;
pub mod process_tools;
pub mod rate_limiter;
pub mod retention;
