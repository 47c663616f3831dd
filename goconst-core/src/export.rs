//! The export pipeline: directories and file lists to the listing stream.
//!
//! ```rust,ignore
//! use goconst_core::prelude::*;
//!
//! let request = ExportRequest::new().with_dir("./pkg/limits");
//! let mut exporter = Exporter::new(ExportOptions::default())?;
//! let report = exporter.run(&mut std::io::stdout(), &request);
//! for failure in &report.failures {
//!     eprintln!("{}", failure);
//! }
//! ```

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::config::ExportOptions;
use crate::error::{GoconstError, GoconstResult, IoResultExt};
use crate::extract::extract_package;
use crate::render::render_file;
use crate::resolve::{check_package, Importer};
use crate::source::{load_dir, load_files, FileSet, GoParser, PackageGroup};

/// What to export: directories first, then an explicit file group.
#[derive(Debug, Clone, Default)]
pub struct ExportRequest {
    pub dirs: Vec<PathBuf>,
    /// Label for the file group; empty means the files' package name
    pub package: String,
    pub files: Vec<PathBuf>,
}

impl ExportRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dirs.push(dir.into());
        self
    }

    pub fn with_files<I, P>(mut self, package: impl Into<String>, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.package = package.into();
        self.files.extend(files.into_iter().map(Into::into));
        self
    }
}

/// Which part of a request failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureContext {
    Directory(PathBuf),
    Files,
}

/// An error confined to one directory or to the file group.
#[derive(Debug)]
pub struct GroupFailure {
    pub context: FailureContext,
    pub error: GoconstError,
}

impl fmt::Display for GroupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            FailureContext::Directory(dir) => write!(
                f,
                "Failed to parse directory {}. Cause: {}",
                dir.display(),
                self.error
            ),
            FailureContext::Files => write!(f, "Failed to parse files. Cause: {}", self.error),
        }
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub groups: usize,
    pub files: usize,
    pub blocks: usize,
    pub constants: usize,
    /// Exported names that had no constant value
    pub skipped: usize,
    pub imported_packages: usize,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub failures: Vec<GroupFailure>,
    pub stats: ExportStats,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs exports with one parser, file set and import cache for the whole run.
pub struct Exporter {
    options: ExportOptions,
    parser: GoParser,
    fset: FileSet,
    importer: Importer,
}

impl Exporter {
    pub fn new(options: ExportOptions) -> GoconstResult<Self> {
        let importer = Importer::new(&options)?;
        Ok(Self {
            parser: GoParser::new()?,
            fset: FileSet::new(),
            importer,
            options,
        })
    }

    /// Exports every directory of `request`, then its file group.
    ///
    /// A failure stops only the directory or file group it occurred in.
    pub fn run(&mut self, out: &mut dyn Write, request: &ExportRequest) -> RunReport {
        let mut report = RunReport::default();

        for dir in &request.dirs {
            if let Err(err) = self.export_dir(out, dir, &mut report.stats) {
                error!(dir = %dir.display(), error = %err, "Directory export failed");
                report.failures.push(GroupFailure {
                    context: FailureContext::Directory(dir.clone()),
                    error: err,
                });
            }
        }

        if !request.files.is_empty() {
            if let Err(err) = self.export_files(out, &request.package, &request.files, &mut report.stats) {
                error!(error = %err, "File export failed");
                report.failures.push(GroupFailure {
                    context: FailureContext::Files,
                    error: err,
                });
            }
        }

        report.stats.imported_packages = self.importer.loaded();
        report
    }

    /// Exports every package group found in `dir`, in package-name order.
    pub fn export_dir(&mut self, out: &mut dyn Write, dir: &Path, stats: &mut ExportStats) -> GoconstResult<()> {
        let groups = load_dir(&mut self.parser, &mut self.fset, dir)?;
        for group in &groups {
            self.export_group(out, group, stats)?;
        }
        Ok(())
    }

    /// Exports an explicit file list as one package group.
    pub fn export_files(
        &mut self,
        out: &mut dyn Write,
        label: &str,
        files: &[PathBuf],
        stats: &mut ExportStats,
    ) -> GoconstResult<()> {
        let group = load_files(&mut self.parser, &mut self.fset, label, files)?;
        self.export_group(out, &group, stats)
    }

    fn export_group(&mut self, out: &mut dyn Write, group: &PackageGroup, stats: &mut ExportStats) -> GoconstResult<()> {
        let resolved = check_package(
            &group.name,
            &self.fset,
            &group.units,
            &mut self.importer,
            self.options.strict_imports,
        )?;
        let extraction = extract_package(&group.name, &group.units, &resolved, self.options.report_skipped);

        for file in &extraction.files {
            render_file(out, file).with_path(&file.file_name)?;
        }

        stats.groups += 1;
        stats.files += extraction.files.len();
        stats.blocks += extraction.block_count();
        stats.constants += extraction.constant_count();
        stats.skipped += extraction.skipped;

        info!(
            package = %group.name,
            files = extraction.files.len(),
            constants = extraction.constant_count(),
            "Exported package"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Target;

    fn exporter() -> Exporter {
        Exporter::new(ExportOptions {
            target: Target::new("linux", "amd64"),
            import_roots: Vec::new(),
            ..ExportOptions::default()
        })
        .unwrap()
    }

    #[test]
    fn test_failure_display() {
        let dir = GroupFailure {
            context: FailureContext::Directory(PathBuf::from("pkg/x")),
            error: GoconstError::invalid_argument("boom"),
        };
        assert_eq!(
            dir.to_string(),
            "Failed to parse directory pkg/x. Cause: Invalid argument: boom"
        );
        let files = GroupFailure {
            context: FailureContext::Files,
            error: GoconstError::invalid_argument("boom"),
        };
        assert_eq!(files.to_string(), "Failed to parse files. Cause: Invalid argument: boom");
    }

    #[test]
    fn test_stats_counted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.go"),
            "package p\n\nconst (\n\tA = 1\n\tb = 2\n)\n\nconst C = A + 1\n",
        )
        .unwrap();

        let mut out = Vec::new();
        let report = exporter().run(&mut out, &ExportRequest::new().with_dir(dir.path()));
        assert!(report.is_clean());
        assert_eq!(report.stats.groups, 1);
        assert_eq!(report.stats.files, 1);
        assert_eq!(report.stats.blocks, 2);
        assert_eq!(report.stats.constants, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "// package p, file a.go\n\nA = 1\n\nC = 2\n\n"
        );
    }

    #[test]
    fn test_analysis_failure_leaves_no_output_for_group() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.go"), "package p\n\nconst A int8 = 1000\n").unwrap();

        let mut out = Vec::new();
        let report = exporter().run(&mut out, &ExportRequest::new().with_dir(dir.path()));
        assert!(out.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].error, GoconstError::Analysis { .. }));
    }
}
