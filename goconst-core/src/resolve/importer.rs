//! Locating, parsing and checking imported packages.
//!
//! Imported packages are found through the enclosing `go.mod` module first
//! (module path prefix, then `vendor/`), then through the configured search
//! roots. Their files are filtered by build constraints for the configured
//! target and checked leniently: a constant that fails to evaluate only
//! matters if the exported package actually refers to it.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use super::checker::{Checker, Mode};
use super::Package;
use crate::config::{ExportOptions, Target};
use crate::error::GoconstResult;
use crate::scan::gather_go_files;
use crate::source::constraint::{file_name_matches, header_matches};
use crate::source::{FileSet, GoParser, SourceUnit};
use crate::types::Sizes;

/// Run-wide cache of imported packages.
pub struct Importer {
    roots: Vec<PathBuf>,
    target: Target,
    parser: GoParser,
    fset: FileSet,
    cache: HashMap<String, Rc<Package>>,
    failures: HashMap<String, String>,
    loading: HashSet<String>,
}

impl Importer {
    pub fn new(options: &ExportOptions) -> GoconstResult<Self> {
        Ok(Self {
            roots: options.import_roots.clone(),
            target: options.target.clone(),
            parser: GoParser::new()?,
            fset: FileSet::new(),
            cache: HashMap::new(),
            failures: HashMap::new(),
            loading: HashSet::new(),
        })
    }

    pub fn sizes(&self) -> Sizes {
        self.target.sizes()
    }

    /// Number of packages imported successfully so far.
    pub fn loaded(&self) -> usize {
        self.cache.len()
    }

    /// Imports `path` as seen from a file in `from_dir`.
    pub fn import(&mut self, path: &str, from_dir: &Path) -> Result<Rc<Package>, String> {
        if let Some(package) = self.cache.get(path) {
            return Ok(Rc::clone(package));
        }
        if let Some(reason) = self.failures.get(path) {
            return Err(reason.clone());
        }
        if self.loading.contains(path) {
            return Err("import cycle not allowed".to_string());
        }

        let result = match path {
            "unsafe" => {
                let mut package = Package::empty("unsafe", "unsafe");
                package.others.extend(["Sizeof", "Alignof", "Offsetof", "Pointer"].map(String::from));
                Ok(package)
            }
            "C" => Err("cgo is not supported".to_string()),
            _ => match self.locate(path, from_dir) {
                Some(dir) => self.load(path, &dir),
                None => Err("cannot find package".to_string()),
            },
        };

        match result {
            Ok(package) => {
                let package = Rc::new(package);
                self.cache.insert(path.to_string(), Rc::clone(&package));
                Ok(package)
            }
            Err(reason) => {
                warn!(import = path, reason = %reason, "Import failed");
                self.failures.insert(path.to_string(), reason.clone());
                Err(reason)
            }
        }
    }

    fn locate(&self, path: &str, from_dir: &Path) -> Option<PathBuf> {
        if path.starts_with("./") || path.starts_with("../") {
            let dir = from_dir.join(path);
            return dir.is_dir().then_some(dir);
        }
        if let Some((root, module)) = find_module(from_dir) {
            if path == module {
                return Some(root);
            }
            if let Some(rest) = path.strip_prefix(module.as_str()).and_then(|r| r.strip_prefix('/')) {
                let dir = root.join(rest);
                if dir.is_dir() {
                    return Some(dir);
                }
            }
            let vendored = root.join("vendor").join(path);
            if vendored.is_dir() {
                return Some(vendored);
            }
        }
        self.roots.iter().map(|root| root.join(path)).find(|dir| dir.is_dir())
    }

    fn load(&mut self, path: &str, dir: &Path) -> Result<Package, String> {
        let files = gather_go_files(dir).map_err(|e| e.to_string())?;
        let mut units = Vec::new();
        for file in files {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if name.starts_with('_') || name.starts_with('.') || !file_name_matches(&name, &self.target) {
                continue;
            }
            let source = fs::read_to_string(&file).map_err(|e| format!("{}: {}", file.display(), e))?;
            if !header_matches(&source, &self.target) {
                debug!(file = %file.display(), "Excluded by build constraints");
                continue;
            }
            let unit = self
                .parser
                .parse_source(&mut self.fset, &file, &source)
                .map_err(|e| e.to_string())?;
            units.push(unit);
        }

        let name = majority_package(&units)
            .ok_or_else(|| format!("no buildable Go source files in {}", dir.display()))?;
        units.retain(|u| u.package == name);

        self.loading.insert(path.to_string());
        let checked = Checker::new(path, &units, self).run(Mode::Imported);
        self.loading.remove(path);

        debug!(
            import = path,
            dir = %dir.display(),
            files = units.len(),
            "Imported package"
        );
        Ok(Package::from_checked(path, &name, checked, &self.fset))
    }
}

/// The package name declared by most files; ties go to the smaller name.
fn majority_package(units: &[SourceUnit]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for unit in units {
        *counts.entry(unit.package.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(name, _)| name.to_string())
}

fn module_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#"(?m)^\s*module\s+"?([^"\s]+)"?"#).expect("Hardcoded regex pattern is valid")
    })
}

/// Finds the enclosing module: the nearest `go.mod` walking up from `dir`.
pub fn find_module(dir: &Path) -> Option<(PathBuf, String)> {
    let start = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    let mut current = Some(start.as_path());
    while let Some(candidate) = current {
        let go_mod = candidate.join("go.mod");
        if go_mod.is_file() {
            let text = fs::read_to_string(&go_mod).ok()?;
            let module = module_regex().captures(&text)?.get(1)?.as_str().to_string();
            return Some((candidate.to_path_buf(), module));
        }
        current = candidate.parent();
    }
    None
}
