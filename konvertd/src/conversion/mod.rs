// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

pub mod filename;
pub mod preset;
pub mod zip;

pub use filename::{published_name, sanitize_filename};
pub use preset::{ffmpeg_args, Quality, TargetFormat, UnsupportedFormat};
pub use zip::{select_zip_inputs, zip_args};
