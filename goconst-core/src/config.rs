//! Export options and configuration loading from goconst.toml.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::fs;

use crate::types::Sizes;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "goconst.toml";

/// Standard Go install locations probed when `GOROOT` is unset.
const GOROOT_CANDIDATES: &[&str] = &["/usr/local/go", "/usr/lib/go", "/opt/go"];

/// Architectures with a 32-bit `int`.
const ARCH_32: &[&str] = &["386", "arm", "mips", "mipsle", "ppc", "riscv", "sparc", "armbe"];

/// Build target used for imported packages' build constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub goos: String,
    pub goarch: String,
}

impl Target {
    pub fn new(goos: impl Into<String>, goarch: impl Into<String>) -> Self {
        Self {
            goos: goos.into(),
            goarch: goarch.into(),
        }
    }

    /// `GOOS`/`GOARCH` from the environment, falling back to the host platform.
    pub fn host() -> Self {
        let goos = non_empty_var("GOOS").unwrap_or_else(|| host_goos().to_string());
        let goarch = non_empty_var("GOARCH").unwrap_or_else(|| host_goarch().to_string());
        Self { goos, goarch }
    }

    pub fn sizes(&self) -> Sizes {
        let word_bits = if ARCH_32.contains(&self.goarch.as_str()) { 32 } else { 64 };
        Sizes { word_bits }
    }
}

impl Default for Target {
    fn default() -> Self {
        Self::host()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn host_goos() -> &'static str {
    match env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

fn host_goarch() -> &'static str {
    match env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "loongarch64" => "loong64",
        "powerpc64" if cfg!(target_endian = "little") => "ppc64le",
        "powerpc64" => "ppc64",
        "wasm32" => "wasm",
        other => other,
    }
}

/// Import search roots from `GOROOT` and `GOPATH`.
///
/// Missing variables fall back to a standard Go install location and
/// `$HOME/go`. Roots that do not exist are left out.
pub fn default_import_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();

    match non_empty_var("GOROOT") {
        Some(goroot) => roots.push(PathBuf::from(goroot).join("src")),
        None => {
            if let Some(found) = GOROOT_CANDIDATES.iter().map(Path::new).find(|p| p.is_dir()) {
                roots.push(found.join("src"));
            }
        }
    }

    match env::var_os("GOPATH").filter(|v| !v.is_empty()) {
        Some(gopath) => roots.extend(env::split_paths(&gopath).map(|p| p.join("src"))),
        None => {
            if let Some(home) = env::var_os("HOME") {
                roots.push(PathBuf::from(home).join("go").join("src"));
            }
        }
    }

    roots.retain(|r| r.is_dir());
    roots
}

/// Options for one export run.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub target: Target,
    /// Searched in order after the enclosing module
    pub import_roots: Vec<PathBuf>,
    /// Every import of an exported package must be locatable
    pub strict_imports: bool,
    /// Log a warning for each exported name that is not written
    pub report_skipped: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            target: Target::host(),
            import_roots: default_import_roots(),
            strict_imports: false,
            report_skipped: false,
        }
    }
}

/// Main configuration structure for goconst.toml.
#[derive(Debug, Deserialize, Default)]
pub struct GoconstConfig {
    /// Target platform for build constraints.
    pub target: Option<TargetConfig>,
    /// Import resolution settings.
    pub imports: Option<ImportConfig>,
    /// Warn about exported names that produce no line.
    pub report_skipped: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
pub struct TargetConfig {
    pub goos: Option<String>,
    pub goarch: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ImportConfig {
    /// Extra search roots, tried before the defaults.
    pub paths: Option<Vec<PathBuf>>,
    pub strict: Option<bool>,
}

impl GoconstConfig {
    /// Overlays the configured values onto `options`.
    pub fn apply(&self, options: &mut ExportOptions) {
        if let Some(target) = &self.target {
            if let Some(goos) = &target.goos {
                options.target.goos = goos.clone();
            }
            if let Some(goarch) = &target.goarch {
                options.target.goarch = goarch.clone();
            }
        }
        if let Some(imports) = &self.imports {
            if let Some(paths) = &imports.paths {
                let mut roots = paths.clone();
                roots.append(&mut options.import_roots);
                options.import_roots = roots;
            }
            if let Some(strict) = imports.strict {
                options.strict_imports = strict;
            }
        }
        if let Some(report) = self.report_skipped {
            options.report_skipped = report;
        }
    }
}

/// Loads configuration from `path` if it exists.
pub fn load_config(path: &Path) -> Result<Option<GoconstConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let cfg = toml::from_str(&content)
        .with_context(|| format!("Invalid {}", path.display()))?;
    Ok(Some(cfg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_follow_arch() {
        assert_eq!(Target::new("linux", "amd64").sizes().word_bits, 64);
        assert_eq!(Target::new("linux", "386").sizes().word_bits, 32);
        assert_eq!(Target::new("linux", "arm").sizes().word_bits, 32);
        assert_eq!(Target::new("js", "wasm").sizes().word_bits, 64);
    }

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(&dir.path().join(CONFIG_FILE_NAME)).unwrap().is_none());
    }

    #[test]
    fn test_load_and_apply_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            "report_skipped = true\n\n[target]\ngoos = \"windows\"\n\n[imports]\npaths = [\"/opt/gosrc\"]\nstrict = true\n",
        )
        .unwrap();

        let cfg = load_config(&path).unwrap().unwrap();
        let mut options = ExportOptions {
            target: Target::new("linux", "amd64"),
            import_roots: vec![PathBuf::from("/usr/local/go/src")],
            strict_imports: false,
            report_skipped: false,
        };
        cfg.apply(&mut options);

        assert_eq!(options.target, Target::new("windows", "amd64"));
        assert_eq!(
            options.import_roots,
            vec![PathBuf::from("/opt/gosrc"), PathBuf::from("/usr/local/go/src")]
        );
        assert!(options.strict_imports);
        assert!(options.report_skipped);
    }

    #[test]
    fn test_invalid_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "report_skipped = \"maybe\"\n").unwrap();
        assert!(load_config(&path).is_err());
    }
}
