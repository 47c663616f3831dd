//! Destination stream for the listing.

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use crate::error::{GoconstError, GoconstResult};

/// Where the listing goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    /// `-` means standard output; anything else is a file path.
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            Self::Stdout
        } else {
            Self::File(PathBuf::from(arg))
        }
    }
}

/// How an existing output file is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    Truncate,
    Append,
}

/// Opens the destination once for the whole run.
///
/// Files are created when missing. The returned writer is buffered and must
/// be flushed by the caller.
pub fn open_output(target: &OutputTarget, mode: WriteMode) -> GoconstResult<Box<dyn Write>> {
    match target {
        OutputTarget::Stdout => Ok(Box::new(BufWriter::new(io::stdout()))),
        OutputTarget::File(path) => {
            let mut options = OpenOptions::new();
            options.create(true);
            match mode {
                WriteMode::Truncate => options.write(true).truncate(true),
                WriteMode::Append => options.append(true),
            };
            let file = options
                .open(path)
                .map_err(|e| GoconstError::output_open(path, e))?;
            Ok(Box::new(BufWriter::new(file)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_once(target: &OutputTarget, mode: WriteMode, text: &str) {
        let mut out = open_output(target, mode).unwrap();
        out.write_all(text.as_bytes()).unwrap();
        out.flush().unwrap();
    }

    #[test]
    fn test_from_arg() {
        assert_eq!(OutputTarget::from_arg("-"), OutputTarget::Stdout);
        assert_eq!(
            OutputTarget::from_arg("out.txt"),
            OutputTarget::File(PathBuf::from("out.txt"))
        );
    }

    #[test]
    fn test_truncate_and_append() {
        let dir = tempfile::tempdir().unwrap();
        let target = OutputTarget::File(dir.path().join("consts.txt"));

        write_once(&target, WriteMode::Truncate, "one\n");
        write_once(&target, WriteMode::Truncate, "two\n");
        let path = dir.path().join("consts.txt");
        assert_eq!(fs::read_to_string(&path).unwrap(), "two\n");

        write_once(&target, WriteMode::Append, "three\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "two\nthree\n");
    }

    #[test]
    fn test_open_failure() {
        let dir = tempfile::tempdir().unwrap();
        let target = OutputTarget::File(dir.path().join("missing/dir/out.txt"));
        let err = open_output(&target, WriteMode::Truncate).err().unwrap();
        assert!(matches!(err, GoconstError::OutputOpen { .. }));
        assert!(err.to_string().contains("missing/dir/out.txt"));
    }
}
