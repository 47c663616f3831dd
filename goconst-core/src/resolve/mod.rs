//! Constant evaluation for a package group.
//!
//! [`check_package`] evaluates every constant of the exported package with
//! exact arithmetic, following Go's typing and representability rules.
//! Constants of imported packages are reached through the shared
//! [`Importer`].

pub(crate) mod checker;
pub mod importer;
pub mod ops;

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::constant::Constant;
use crate::error::{GoconstError, GoconstResult};
use crate::source::{FileSet, SourceUnit};
use crate::types::Type;

use checker::{Checked, Checker, Mode};

pub use importer::Importer;

/// What an imported package exposes to constant expressions.
#[derive(Debug, Clone, Default)]
pub struct Package {
    /// Import path
    pub path: String,
    /// Declared package name
    pub name: String,
    /// Constants, or the rendered reason they are invalid
    pub consts: HashMap<String, Result<Constant, String>>,
    pub types: HashMap<String, Result<Type, String>>,
    /// Variables, functions and anything else that is not a constant
    pub others: HashSet<String>,
}

impl Package {
    pub fn empty(path: &str, name: &str) -> Self {
        Self {
            path: path.to_string(),
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub(crate) fn from_checked(path: &str, name: &str, checked: Checked, fset: &FileSet) -> Self {
        let mut package = Self::empty(path, name);
        for (key, result) in checked.consts {
            package.consts.insert(key, result.map_err(|d| d.render(fset)));
        }
        for (key, result) in checked.types {
            package.types.insert(key, result.map_err(|d| d.render(fset)));
        }
        package.others.extend(checked.others);
        package
    }
}

/// Typed values of every constant in a package group.
#[derive(Debug, Clone, Default)]
pub struct ResolvedPackage {
    pub label: String,
    values: HashMap<String, Constant>,
}

impl ResolvedPackage {
    pub fn lookup(&self, name: &str) -> Option<&Constant> {
        self.values.get(name)
    }

    /// Exact textual form of `name`'s value.
    pub fn exact_value(&self, name: &str) -> Option<String> {
        self.lookup(name).map(Constant::exact_string)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Type-checks the constants of one package group.
///
/// Any error in the group fails the whole group; the first error by source
/// position is reported as `path:line:col: message`.
pub fn check_package(
    label: &str,
    fset: &FileSet,
    units: &[SourceUnit],
    importer: &mut Importer,
    strict_imports: bool,
) -> GoconstResult<ResolvedPackage> {
    let checked = Checker::new(label, units, importer).run(Mode::Root { strict_imports });
    if let Some(diag) = checked.first_error() {
        return Err(GoconstError::analysis(label, diag.render(fset)));
    }

    let values: HashMap<String, Constant> = checked
        .consts
        .into_iter()
        .filter_map(|(name, result)| result.ok().map(|c| (name, c)))
        .collect();

    debug!(package = label, constants = values.len(), "Checked package");
    Ok(ResolvedPackage {
        label: label.to_string(),
        values,
    })
}
