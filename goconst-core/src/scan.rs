//! Deterministic discovery of the Go source files of one directory.
//!
//! Go packages are flat: only the directory's own entries are considered,
//! never subdirectories. Test files (`_test.go`) are always excluded.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{GoconstError, GoconstResult};

/// Whether `path` names a non-test Go source file.
#[inline]
pub fn is_go_source(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "go")
        && !path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.ends_with("_test.go"))
}

/// Gathers the non-test `.go` files of `dir`, sorted by file name.
///
/// A missing directory is an I/O error; a path that is not a directory is
/// an invalid argument.
pub fn gather_go_files(dir: &Path) -> GoconstResult<Vec<PathBuf>> {
    let meta = std::fs::metadata(dir).map_err(|e| GoconstError::io(dir, e))?;
    if !meta.is_dir() {
        return Err(GoconstError::invalid_argument(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| GoconstError::io(dir, std::io::Error::from(e)))?;
        let path = entry.path();
        if entry.file_type().is_file() && is_go_source(path) {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_gather_sorted_non_test_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.go"), "package p").unwrap();
        fs::write(dir.path().join("a.go"), "package p").unwrap();
        fs::write(dir.path().join("a_test.go"), "package p").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/c.go"), "package sub").unwrap();

        let files = gather_go_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.go", "b.go"]);
    }

    #[test]
    fn test_missing_dir_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = gather_go_files(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, GoconstError::Io { .. }));
    }

    #[test]
    fn test_file_is_invalid_argument() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("x.go");
        fs::write(&file, "package p").unwrap();
        let err = gather_go_files(&file).unwrap_err();
        assert!(matches!(err, GoconstError::InvalidArgument { .. }));
    }

    #[test]
    fn test_is_go_source() {
        assert!(is_go_source(Path::new("pkg/const.go")));
        assert!(!is_go_source(Path::new("pkg/const_test.go")));
        assert!(!is_go_source(Path::new("pkg/const.rs")));
    }
}
