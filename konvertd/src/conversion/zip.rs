// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::path::{Path, PathBuf};

/// Resolves requested names against the downloads directory.
///
/// Only the final path component of each request is used, and only files that
/// exist are kept, so a batch can never reach outside `downloads_dir`.
pub fn select_zip_inputs<S: AsRef<str>>(downloads_dir: &Path, requested: &[S]) -> Vec<PathBuf> {
    requested
        .iter()
        .filter_map(|name| Path::new(name.as_ref()).file_name().map(|n| n.to_owned()))
        .map(|basename| downloads_dir.join(basename))
        .filter(|path| path.is_file())
        .collect()
}

/// `zip -j -q <archive> <files...>`
pub fn zip_args(archive: &Path, inputs: &[PathBuf]) -> Vec<String> {
    let mut args = vec![
        "zip".to_string(),
        "-j".to_string(),
        "-q".to_string(),
        archive.to_string_lossy().into_owned(),
    ];
    args.extend(inputs.iter().map(|p| p.to_string_lossy().into_owned()));
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_only_existing_basenames_are_selected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.mp3"), b"a").unwrap();
        fs::write(dir.path().join("b.ogg"), b"b").unwrap();
        fs::create_dir(dir.path().join("sub.mp3")).unwrap();

        let selected = select_zip_inputs(
            dir.path(),
            &["a.mp3", "../../b.ogg", "/etc/passwd", "missing.wav", "sub.mp3", ".."],
        );

        assert_eq!(
            selected,
            vec![dir.path().join("a.mp3"), dir.path().join("b.ogg")]
        );
    }

    #[test]
    fn test_zip_args() {
        let args = zip_args(
            Path::new("dl/batch_1.zip"),
            &[PathBuf::from("dl/a.mp3"), PathBuf::from("dl/b.ogg")],
        );
        assert_eq!(
            args,
            vec!["zip", "-j", "-q", "dl/batch_1.zip", "dl/a.mp3", "dl/b.ogg"]
        );
    }
}
