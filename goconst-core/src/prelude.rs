//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use goconst_core::prelude::*;
//! ```

// Errors
pub use crate::error::{GoconstError, GoconstResult};

// Configuration
pub use crate::config::{load_config, ExportOptions, GoconstConfig, Target};

// Export pipeline
pub use crate::export::{ExportRequest, Exporter, GroupFailure, RunReport};

// Output
pub use crate::output::{open_output, OutputTarget, WriteMode};
