//! Source loading: files to parsed [`SourceUnit`]s sharing one [`FileSet`].

pub mod comments;
pub mod constraint;
pub mod literal;
pub mod parse;
pub mod syntax;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::GoconstResult;
use crate::scan::gather_go_files;

pub use comments::{Comment, CommentGroup};
pub use parse::GoParser;
pub use syntax::{
    is_exported, BinaryOp, ConstBlock, ConstSpec, Decl, Expr, ExprKind, Ident, ImportSpec,
    SourceUnit, TypeExpr, TypeSpec, UnaryOp,
};

/// Index of a file registered in a [`FileSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub usize);

/// A source position: file, 1-based line and 1-based byte column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pos {
    pub file: FileId,
    pub line: usize,
    pub column: usize,
}

/// A [`Pos`] with its file path resolved, printed as `path:line:col`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub path: PathBuf,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.path.display(), self.line, self.column)
    }
}

/// Registry of every file parsed during a run.
#[derive(Debug, Default)]
pub struct FileSet {
    files: Vec<PathBuf>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, path: impl Into<PathBuf>) -> FileId {
        self.files.push(path.into());
        FileId(self.files.len() - 1)
    }

    pub fn path(&self, id: FileId) -> Option<&Path> {
        self.files.get(id.0).map(PathBuf::as_path)
    }

    pub fn position(&self, pos: Pos) -> Position {
        Position {
            path: self.path(pos.file).map(Path::to_path_buf).unwrap_or_default(),
            line: pos.line,
            column: pos.column,
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// The units of one declared package, in file-name order.
#[derive(Debug, Clone)]
pub struct PackageGroup {
    /// Package name or caller-supplied label
    pub name: String,
    pub units: Vec<SourceUnit>,
}

/// Parses every non-test `.go` file of `dir` and groups the units by package name.
///
/// Groups come back ordered by package name. The first file that fails to
/// parse aborts the whole directory.
pub fn load_dir(parser: &mut GoParser, fset: &mut FileSet, dir: &Path) -> GoconstResult<Vec<PackageGroup>> {
    let files = gather_go_files(dir)?;
    let mut by_package: BTreeMap<String, Vec<SourceUnit>> = BTreeMap::new();
    for path in files {
        let unit = parser.parse_file(fset, &path)?;
        debug!(file = %path.display(), package = %unit.package, "Parsed source file");
        by_package.entry(unit.package.clone()).or_default().push(unit);
    }
    Ok(by_package
        .into_iter()
        .map(|(name, units)| PackageGroup { name, units })
        .collect())
}

/// Parses an explicit file list into a single group.
///
/// An empty label falls back to the package name of the first file.
pub fn load_files(
    parser: &mut GoParser,
    fset: &mut FileSet,
    label: &str,
    files: &[PathBuf],
) -> GoconstResult<PackageGroup> {
    let mut units = Vec::with_capacity(files.len());
    for path in files {
        let unit = parser.parse_file(fset, path)?;
        debug!(file = %path.display(), package = %unit.package, "Parsed source file");
        units.push(unit);
    }
    let name = if label.is_empty() {
        units.first().map(|u| u.package.clone()).unwrap_or_default()
    } else {
        label.to_string()
    };
    Ok(PackageGroup { name, units })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_fileset_positions() {
        let mut fset = FileSet::new();
        let a = fset.add_file("pkg/a.go");
        let b = fset.add_file("pkg/b.go");
        assert_ne!(a, b);
        assert_eq!(fset.len(), 2);
        let pos = Pos {
            file: b,
            line: 3,
            column: 7,
        };
        assert_eq!(fset.position(pos).to_string(), "pkg/b.go:3:7");
    }

    #[test]
    fn test_load_dir_groups_by_package() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.go"), "package beta\n\nconst B = 2\n").unwrap();
        fs::write(dir.path().join("a.go"), "package alpha\n\nconst A = 1\n").unwrap();
        fs::write(dir.path().join("a_test.go"), "package alpha\n\nconst T = 3\n").unwrap();

        let mut parser = GoParser::new().unwrap();
        let mut fset = FileSet::new();
        let groups = load_dir(&mut parser, &mut fset, dir.path()).unwrap();

        let names: Vec<_> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert_eq!(groups[0].units.len(), 1);
        assert_eq!(fset.len(), 2);
    }

    #[test]
    fn test_load_dir_parse_error_aborts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ok.go"), "package p\n\nconst A = 1\n").unwrap();
        fs::write(dir.path().join("zz.go"), "package p\n\nconst (\n").unwrap();

        let mut parser = GoParser::new().unwrap();
        let mut fset = FileSet::new();
        assert!(load_dir(&mut parser, &mut fset, dir.path()).is_err());
    }

    #[test]
    fn test_load_files_label_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("c.go");
        fs::write(&file, "package util\n\nconst Pi = 3.14159\n").unwrap();

        let mut parser = GoParser::new().unwrap();
        let mut fset = FileSet::new();
        let group = load_files(&mut parser, &mut fset, "", &[file.clone()]).unwrap();
        assert_eq!(group.name, "util");

        let labeled = load_files(&mut parser, &mut fset, "mylabel", &[file]).unwrap();
        assert_eq!(labeled.name, "mylabel");
    }
}
