//! goconst-core: exact constant export for Go source packages
//!
//! This library parses Go packages, evaluates every constant declaration
//! with Go's exact constant arithmetic, and writes the exported constants as
//! an aligned, comment-preserving text listing.
//!
//! # Features
//!
//! - **Exact evaluation**: arbitrary-precision integers and rationals,
//!   `iota`, implicit repetition, typed overflow checks and float rounding
//! - **Imports**: qualified constants from packages in the enclosing Go
//!   module, `vendor/`, `GOROOT` and `GOPATH`
//! - **Build constraints**: imported packages are filtered for a target
//!   `GOOS`/`GOARCH`
//! - **Comments**: block and spec doc comments and trailing comments are
//!   carried into the listing
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use goconst_core::prelude::*;
//!
//! let mut exporter = Exporter::new(ExportOptions::default())?;
//! let request = ExportRequest::new().with_dir("./limits");
//! let report = exporter.run(&mut std::io::stdout(), &request);
//! ```
//!
//! # Module Organization
//!
//! - [`source`]: tree-sitter parsing into declaration units, comment groups
//!   and build constraints
//! - [`resolve`]: scope building, dependency ordering and constant folding
//! - [`extract`]: pairing exported names with resolved values
//! - [`render`]: the aligned text listing
//! - [`export`]: the directory / file-group pipeline
//! - [`output`]: the destination stream
//! - [`error`]: typed error handling

pub mod config;
pub mod constant;
pub mod error;
pub mod export;
pub mod extract;
pub mod logging;
pub mod output;
pub mod prelude;
pub mod render;
pub mod resolve;
pub mod scan;
pub mod source;
pub mod types;

// ============================================================================
// Explicit Re-exports
// ============================================================================

// Error types
pub use error::{GoconstError, GoconstResult, IoResultExt};

// Configuration
pub use config::{
    default_import_roots, load_config, ExportOptions, GoconstConfig, ImportConfig, Target,
    TargetConfig, CONFIG_FILE_NAME,
};

// Values and types
pub use constant::{Constant, Value};
pub use types::{Basic, Sizes, Type, Untyped};

// Pipeline
pub use export::{ExportRequest, ExportStats, Exporter, FailureContext, GroupFailure, RunReport};
pub use extract::{extract_package, ExportedBlock, ExportedConst, ExportedFile, Extraction};
pub use output::{open_output, OutputTarget, WriteMode};
pub use render::{render_block, render_file, render_to_string};
pub use resolve::{check_package, Importer, Package, ResolvedPackage};

// Sources
pub use scan::{gather_go_files, is_go_source};
pub use source::{load_dir, load_files, FileSet, GoParser, PackageGroup, SourceUnit};

// Logging
pub use logging::init_logging;
