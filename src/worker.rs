//! File-or-stdio open, binary/text mode selection, output-path defaulting,
//! and backup-rename-on-collision. `-`/omitted paths mean the standard
//! stream, the output path can be derived from the input's extension, and
//! a colliding input is renamed out of the way before the output is opened
//! for writing.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Opens `path` for reading, or standard input when `path` is `None` or
/// `Some("-")`. Buffered uniformly so the document reader's line-oriented
/// scan and the block reader's byte-oriented scan share one code path.
pub fn open_input(path: Option<&Path>) -> io::Result<Box<dyn BufRead>> {
    match path {
        None => Ok(Box::new(BufReader::new(io::stdin()))),
        Some(p) if p == Path::new("-") => Ok(Box::new(BufReader::new(io::stdin()))),
        Some(p) => Ok(Box::new(BufReader::new(File::open(p)?))),
    }
}

/// Opens `path` for writing, or standard output when `path` is `None` or
/// `Some("-")`. If `path` collides with `input_path`, the existing file is
/// renamed aside with a `_bkup` suffix first, so the rewrite never
/// destroys the source it was derived from.
pub fn open_output(path: Option<&Path>, input_path: Option<&Path>) -> io::Result<Box<dyn Write>> {
    match path {
        None => Ok(Box::new(io::stdout())),
        Some(p) if p == Path::new("-") => Ok(Box::new(io::stdout())),
        Some(p) => {
            if input_path == Some(p) {
                backup_aside(p)?;
            }
            Ok(Box::new(File::create(p)?))
        }
    }
}

fn backup_aside(path: &Path) -> io::Result<()> {
    let mut backup = path.to_path_buf();
    let suffixed = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => format!("{name}_bkup"),
        None => "_bkup".to_owned(),
    };
    backup.set_file_name(suffixed);
    std::fs::rename(path, backup)
}

/// Swaps a `.pcapng` input extension for `new_ext` (`.pcapng` in,
/// `.yaml`-like document out, or the reverse), used when only an input
/// path is given on the command line.
pub fn derive_output_path(input: &Path, new_ext: &str) -> PathBuf {
    input.with_extension(new_ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_sibling_path_by_swapping_extension() {
        let out = derive_output_path(Path::new("capture.pcapng"), "yaml");
        assert_eq!(out, Path::new("capture.yaml"));
    }

    #[test]
    fn backup_rename_leaves_original_bytes_under_the_suffixed_name() {
        let dir = std::env::temp_dir().join(format!(
            "pcapweave_worker_test_{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("same.yaml");
        std::fs::write(&path, b"original").unwrap();

        let _ = open_output(Some(&path), Some(&path)).unwrap();

        let backup = dir.join("same.yaml_bkup");
        assert_eq!(std::fs::read(&backup).unwrap(), b"original");
        assert!(!path.exists() || std::fs::read(&path).unwrap().is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
