//! Build constraints: `GOOS`/`GOARCH` file-name suffixes and `//go:build` lines.
//!
//! Only files of imported packages are filtered; files named on the command
//! line or found in an exported directory are always parsed.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::Target;

const KNOWN_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "js", "linux",
    "nacl", "netbsd", "openbsd", "plan9", "solaris", "wasip1", "windows", "zos",
];

const KNOWN_ARCH: &[&str] = &[
    "386", "amd64", "amd64p32", "arm", "armbe", "arm64", "arm64be", "loong64", "mips", "mipsle",
    "mips64", "mips64le", "mips64p32", "mips64p32le", "ppc", "ppc64", "ppc64le", "riscv",
    "riscv64", "s390", "s390x", "sparc", "sparc64", "wasm",
];

const UNIX_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "linux",
    "netbsd", "openbsd", "solaris",
];

impl Target {
    /// Whether a single build tag is satisfied.
    pub fn matches_tag(&self, tag: &str) -> bool {
        if tag == self.goos || tag == self.goarch || tag == "gc" {
            return true;
        }
        match tag {
            "unix" => UNIX_OS.contains(&self.goos.as_str()),
            "linux" => self.goos == "android",
            "darwin" => self.goos == "ios",
            "solaris" => self.goos == "illumos",
            _ => tag.starts_with("go1."),
        }
    }
}

/// Whether a file name's `_GOOS`, `_GOARCH` or `_GOOS_GOARCH` suffix admits the target.
pub fn file_name_matches(name: &str, target: &Target) -> bool {
    let stem = name.split('.').next().unwrap_or(name);
    let Some(underscore) = stem.find('_') else {
        return true;
    };
    let parts: Vec<&str> = stem[underscore..].split('_').collect();
    let n = parts.len();
    if n >= 2 && KNOWN_OS.contains(&parts[n - 2]) && KNOWN_ARCH.contains(&parts[n - 1]) {
        return target.matches_tag(parts[n - 2]) && target.matches_tag(parts[n - 1]);
    }
    let last = parts[n - 1];
    if KNOWN_OS.contains(&last) || KNOWN_ARCH.contains(&last) {
        return target.matches_tag(last);
    }
    true
}

/// Whether the build constraints in a file's header admit the target.
///
/// A `//go:build` line wins; legacy `// +build` lines are honored only when
/// no `//go:build` line is present. Unparseable expressions exclude the file.
pub fn header_matches(source: &str, target: &Target) -> bool {
    let mut plus_lines = Vec::new();
    for line in source.lines() {
        let line = line.trim();
        if line.starts_with("package ") || line == "package" {
            break;
        }
        if let Some(expr) = line.strip_prefix("//go:build") {
            return eval_expr(expr, target).unwrap_or(false);
        }
        if let Some(expr) = line.strip_prefix("// +build") {
            plus_lines.push(expr.to_string());
        }
    }
    plus_lines.iter().all(|line| plus_build_matches(line, target))
}

/// `// +build a,b c` means `(a && b) || c`; several lines are ANDed.
fn plus_build_matches(line: &str, target: &Target) -> bool {
    line.split_whitespace().any(|term| {
        term.split(',').all(|tag| match tag.strip_prefix('!') {
            Some(negated) => !target.matches_tag(negated),
            None => target.matches_tag(tag),
        })
    })
}

fn token_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"&&|\|\||!|\(|\)|[A-Za-z0-9_.]+|\S").expect("Hardcoded regex pattern is valid")
    })
}

/// Evaluates a `//go:build` expression; `None` on a syntax error.
pub fn eval_expr(expr: &str, target: &Target) -> Option<bool> {
    let tokens: Vec<&str> = token_regex().find_iter(expr).map(|m| m.as_str()).collect();
    let mut parser = ExprParser {
        tokens,
        pos: 0,
        target,
    };
    let value = parser.or()?;
    (parser.pos == parser.tokens.len()).then_some(value)
}

struct ExprParser<'a> {
    tokens: Vec<&'a str>,
    pos: usize,
    target: &'a Target,
}

impl<'a> ExprParser<'a> {
    fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).copied()
    }

    fn or(&mut self) -> Option<bool> {
        let mut value = self.and()?;
        while self.peek() == Some("||") {
            self.pos += 1;
            let rhs = self.and()?;
            value = value || rhs;
        }
        Some(value)
    }

    fn and(&mut self) -> Option<bool> {
        let mut value = self.not()?;
        while self.peek() == Some("&&") {
            self.pos += 1;
            let rhs = self.not()?;
            value = value && rhs;
        }
        Some(value)
    }

    fn not(&mut self) -> Option<bool> {
        match self.peek()? {
            "!" => {
                self.pos += 1;
                self.not().map(|v| !v)
            }
            "(" => {
                self.pos += 1;
                let value = self.or()?;
                if self.peek() != Some(")") {
                    return None;
                }
                self.pos += 1;
                Some(value)
            }
            tag if tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') => {
                self.pos += 1;
                Some(self.target.matches_tag(tag))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux_amd64() -> Target {
        Target::new("linux", "amd64")
    }

    #[test]
    fn test_file_name_suffixes() {
        let t = linux_amd64();
        assert!(file_name_matches("const.go", &t));
        assert!(file_name_matches("const_linux.go", &t));
        assert!(!file_name_matches("const_windows.go", &t));
        assert!(file_name_matches("const_linux_amd64.go", &t));
        assert!(!file_name_matches("const_linux_arm64.go", &t));
        assert!(!file_name_matches("zerrors_386.go", &t));
        // a bare OS name is not a suffix
        assert!(file_name_matches("windows.go", &t));
        assert!(file_name_matches("my_helper.go", &t));
    }

    #[test]
    fn test_android_satisfies_linux() {
        let t = Target::new("android", "arm64");
        assert!(file_name_matches("sys_linux.go", &t));
        assert!(t.matches_tag("unix"));
        assert!(!Target::new("windows", "amd64").matches_tag("unix"));
    }

    #[test]
    fn test_go_build_expressions() {
        let t = linux_amd64();
        assert_eq!(eval_expr(" linux && amd64", &t), Some(true));
        assert_eq!(eval_expr(" !windows", &t), Some(true));
        assert_eq!(eval_expr(" (darwin || freebsd) && !cgo", &t), Some(false));
        assert_eq!(eval_expr(" unix && go1.21", &t), Some(true));
        assert_eq!(eval_expr(" linux &&", &t), None);
        assert_eq!(eval_expr(" (linux", &t), None);
    }

    #[test]
    fn test_header_matches() {
        let t = linux_amd64();
        assert!(!header_matches("//go:build windows\n\npackage sys\n", &t));
        assert!(header_matches("// Copyright\n\n//go:build linux\n\npackage sys\n", &t));
        assert!(header_matches("package sys\n//go:build windows\n", &t));
        assert!(!header_matches("// +build darwin freebsd\n\npackage sys\n", &t));
        assert!(header_matches("// +build linux,amd64 windows\n\npackage sys\n", &t));
    }
}
