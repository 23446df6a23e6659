// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Audio container the upload is converted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetFormat {
    #[default]
    Mp3,
    Wav,
    Ogg,
    Aac,
    Flac,
    M4a,
    Opus,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 7] = [
        TargetFormat::Mp3,
        TargetFormat::Wav,
        TargetFormat::Ogg,
        TargetFormat::Aac,
        TargetFormat::Flac,
        TargetFormat::M4a,
        TargetFormat::Opus,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            TargetFormat::Mp3 => "mp3",
            TargetFormat::Wav => "wav",
            TargetFormat::Ogg => "ogg",
            TargetFormat::Aac => "aac",
            TargetFormat::Flac => "flac",
            TargetFormat::M4a => "m4a",
            TargetFormat::Opus => "opus",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid format. Supported: mp3, wav, ogg, aac, flac, m4a, opus")]
pub struct UnsupportedFormat(pub String);

impl FromStr for TargetFormat {
    type Err = UnsupportedFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetFormat::ALL
            .into_iter()
            .find(|format| format.extension() == s)
            .ok_or_else(|| UnsupportedFormat(s.to_string()))
    }
}

/// Quality preset. Unknown names fall back to `Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    High,
    #[default]
    Medium,
    Low,
    /// Low bitrate mono, tuned for speech
    Podcast,
}

impl Quality {
    pub fn parse_or_default(s: &str) -> Self {
        match s {
            "high" => Quality::High,
            "medium" => Quality::Medium,
            "low" => Quality::Low,
            "podcast" => Quality::Podcast,
            _ => Quality::default(),
        }
    }
}

/// Builds the ffmpeg argument vector. Paths end up as single argv entries.
pub fn ffmpeg_args(
    input: &Path,
    output: &Path,
    format: TargetFormat,
    quality: Quality,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "ffmpeg".into(),
        "-nostdin".into(),
        "-i".into(),
        input.to_string_lossy().into_owned(),
        "-vn".into(),
    ];

    let codec = match format {
        TargetFormat::Mp3 => "libmp3lame",
        TargetFormat::Aac | TargetFormat::M4a => "aac",
        TargetFormat::Ogg => "libvorbis",
        TargetFormat::Opus => "libopus",
        TargetFormat::Flac => "flac",
        TargetFormat::Wav => "pcm_s16le",
    };
    args.extend(["-acodec".into(), codec.into()]);

    let preset: &[&str] = match (format, quality) {
        (TargetFormat::Mp3, Quality::High) => &["-b:a", "320k"],
        (TargetFormat::Mp3, Quality::Medium) => &["-q:a", "2"],
        (TargetFormat::Mp3, Quality::Low) => &["-q:a", "5"],
        (TargetFormat::Mp3, Quality::Podcast) => &["-b:a", "64k", "-ac", "1"],

        (TargetFormat::Aac | TargetFormat::M4a, Quality::High) => &["-b:a", "256k"],
        (TargetFormat::Aac | TargetFormat::M4a, Quality::Medium) => &["-b:a", "192k"],
        (TargetFormat::Aac | TargetFormat::M4a, Quality::Low) => &["-b:a", "128k"],
        (TargetFormat::Aac | TargetFormat::M4a, Quality::Podcast) => {
            &["-b:a", "64k", "-ac", "1"]
        }

        (TargetFormat::Ogg, Quality::High) => &["-q:a", "6"],
        (TargetFormat::Ogg, Quality::Medium) => &["-q:a", "4"],
        (TargetFormat::Ogg, Quality::Low) => &["-q:a", "3"],
        (TargetFormat::Ogg, Quality::Podcast) => &["-q:a", "1", "-ac", "1"],

        (TargetFormat::Opus, Quality::High) => &["-b:a", "192k"],
        (TargetFormat::Opus, Quality::Medium) => &["-b:a", "128k"],
        (TargetFormat::Opus, Quality::Low) => &["-b:a", "96k"],
        (TargetFormat::Opus, Quality::Podcast) => &["-b:a", "48k", "-ac", "1"],

        // lossless formats only change for podcasts
        (TargetFormat::Flac | TargetFormat::Wav, Quality::Podcast) => {
            &["-ar", "22050", "-ac", "1"]
        }
        (TargetFormat::Flac | TargetFormat::Wav, _) => &[],
    };
    args.extend(preset.iter().map(|s| s.to_string()));

    args.push(output.to_string_lossy().into_owned());
    args.push("-y".into());
    args
}
