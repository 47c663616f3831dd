//! Pairing exported constant names with their resolved values.
//!
//! The extractor walks the const blocks of each file in source order and
//! keeps every exported name that has a value in the [`ResolvedPackage`].
//! Names without a value (blank identifiers, redeclarations) are skipped
//! silently unless skip reporting is on.

use tracing::{debug, warn};

use crate::resolve::ResolvedPackage;
use crate::source::{is_exported, CommentGroup, ConstBlock, SourceUnit};

/// One constant line of the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedConst {
    pub name: String,
    /// Exact textual value
    pub value: String,
    /// Spec doc comment lines, on the first name of a spec only
    pub doc: Vec<String>,
    /// Trailing comment lines, on the last name of a spec only
    pub comment: Vec<String>,
}

/// One const declaration of a file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportedBlock {
    /// Block doc comment lines
    pub doc: Vec<String>,
    /// Longest exported name in the block, in characters
    pub width: usize,
    pub constants: Vec<ExportedConst>,
}

/// The listing section of one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub package: String,
    pub file_name: String,
    pub blocks: Vec<ExportedBlock>,
}

/// Extraction result for a package group.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub files: Vec<ExportedFile>,
    /// Exported names that produced no line
    pub skipped: usize,
}

impl Extraction {
    pub fn constant_count(&self) -> usize {
        self.files
            .iter()
            .flat_map(|f| &f.blocks)
            .map(|b| b.constants.len())
            .sum()
    }

    pub fn block_count(&self) -> usize {
        self.files.iter().map(|f| f.blocks.len()).sum()
    }
}

fn comment_lines(group: Option<&CommentGroup>) -> Vec<String> {
    group.map(CommentGroup::lines).unwrap_or_default()
}

/// Builds the listing sections for every unit of a checked package group.
pub fn extract_package(
    label: &str,
    units: &[SourceUnit],
    resolved: &ResolvedPackage,
    report_skipped: bool,
) -> Extraction {
    let mut extraction = Extraction::default();
    for unit in units {
        let file_name = unit.file_name();
        let blocks = unit
            .const_blocks()
            .map(|block| extract_block(block, resolved, report_skipped, &file_name, &mut extraction.skipped))
            .collect();
        extraction.files.push(ExportedFile {
            package: label.to_string(),
            file_name,
            blocks,
        });
    }
    extraction
}

fn extract_block(
    block: &ConstBlock,
    resolved: &ResolvedPackage,
    report_skipped: bool,
    file_name: &str,
    skipped: &mut usize,
) -> ExportedBlock {
    let width = block
        .specs
        .iter()
        .flat_map(|spec| &spec.names)
        .filter(|ident| is_exported(&ident.name))
        .map(|ident| ident.name.chars().count())
        .max()
        .unwrap_or(0);

    let mut constants = Vec::new();
    for spec in &block.specs {
        let first = constants.len();
        for ident in &spec.names {
            if !is_exported(&ident.name) {
                continue;
            }
            let Some(value) = resolved.exact_value(&ident.name) else {
                *skipped += 1;
                if report_skipped {
                    warn!(file = file_name, name = %ident.name, line = ident.pos.line, "Skipped exported name without a constant value");
                } else {
                    debug!(file = file_name, name = %ident.name, "Skipped name");
                }
                continue;
            };
            constants.push(ExportedConst {
                name: ident.name.clone(),
                value,
                doc: Vec::new(),
                comment: Vec::new(),
            });
        }
        // Doc and trailing comments go to the first and last names that produced a line.
        if constants.len() > first {
            constants[first].doc = comment_lines(spec.doc.as_ref());
            if let Some(last) = constants.last_mut() {
                last.comment = comment_lines(spec.comment.as_ref());
            }
        }
    }

    ExportedBlock {
        doc: comment_lines(block.doc.as_ref()),
        width,
        constants,
    }
}
