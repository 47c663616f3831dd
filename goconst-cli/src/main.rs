//! goconst CLI - exports the exported constants of Go packages.
//!
//! Features:
//! - Directory mode (`-d`, repeatable) and file mode (positional files, `-p` label)
//! - Exact constant values, including imported constants
//! - Truncating or appending output (`-o`, `-a`)
//! - Build-constraint aware import resolution (`--goos`, `--goarch`)

use anyhow::{anyhow, bail, Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::process;
use tracing::info;

use goconst_core::{
    init_logging, load_config, open_output, ExportOptions, ExportRequest, Exporter, OutputTarget,
    RunReport, WriteMode, CONFIG_FILE_NAME,
};

#[derive(Parser, Debug)]
#[command(
    name = "goconst",
    author,
    version,
    about = "Golang constants parser",
    long_about = "Parse go source files and export constants definitions"
)]
pub struct Cli {
    /// Output file path (`-` for stdout)
    #[arg(short = 'o', long = "out", default_value = "-")]
    out: String,

    /// Append to the output file instead of truncating it
    #[arg(short = 'a', long)]
    append: bool,

    /// Directories to parse
    #[arg(short = 'd', long = "dir", value_name = "DIR")]
    dirs: Vec<PathBuf>,

    /// Package that the files belong to
    #[arg(short = 'p', long = "pkg", default_value = "")]
    package: String,

    /// Go source files exported as one package
    #[arg(value_name = "GO_SOURCE_FILE")]
    files: Vec<PathBuf>,

    /// Extra import search roots, tried before GOROOT and GOPATH
    #[arg(short = 'I', long = "import-path", value_name = "DIR")]
    import_paths: Vec<PathBuf>,

    /// Target operating system for build constraints
    #[arg(long)]
    goos: Option<String>,

    /// Target architecture for build constraints
    #[arg(long)]
    goarch: Option<String>,

    /// Fail a package when any of its imports cannot be found
    #[arg(long)]
    strict_imports: bool,

    /// Warn about exported names that produce no line
    #[arg(long)]
    report_skipped: bool,

    /// Configuration file (defaults to ./goconst.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

/// Merges defaults, the configuration file and command-line flags.
fn build_options(cli: &Cli) -> Result<ExportOptions> {
    let mut options = ExportOptions::default();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    if cli.config.is_some() && !config_path.exists() {
        bail!("Config file not found: {}", config_path.display());
    }
    if let Some(cfg) = load_config(&config_path)? {
        cfg.apply(&mut options);
    }

    if !cli.import_paths.is_empty() {
        let mut roots = cli.import_paths.clone();
        roots.append(&mut options.import_roots);
        options.import_roots = roots;
    }
    if let Some(goos) = &cli.goos {
        options.target.goos = goos.clone();
    }
    if let Some(goarch) = &cli.goarch {
        options.target.goarch = goarch.clone();
    }
    options.strict_imports |= cli.strict_imports;
    options.report_skipped |= cli.report_skipped;
    Ok(options)
}

fn build_request(cli: &Cli) -> ExportRequest {
    ExportRequest {
        dirs: cli.dirs.clone(),
        package: cli.package.clone(),
        files: cli.files.clone(),
    }
}

/// Runs one export. Only setup failures are errors; group failures are
/// reported on stderr and left in the returned report.
fn run(cli: &Cli) -> Result<RunReport> {
    let options = build_options(cli)?;
    let mode = if cli.append {
        WriteMode::Append
    } else {
        WriteMode::Truncate
    };
    let target = OutputTarget::from_arg(&cli.out);
    let mut out = open_output(&target, mode)
        .map_err(|e| anyhow!("Failed to open file {}. Cause: {}", cli.out, e))?;

    let mut exporter = Exporter::new(options).context("Failed to initialize the Go parser")?;
    let report = exporter.run(&mut out, &build_request(cli));
    out.flush().context("Failed to flush output")?;

    for failure in &report.failures {
        eprintln!("{}", failure);
    }
    info!(
        groups = report.stats.groups,
        files = report.stats.files,
        constants = report.stats.constants,
        skipped = report.stats.skipped,
        imported = report.stats.imported_packages,
        failures = report.failures.len(),
        "Export finished"
    );
    Ok(report)
}

fn main() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("[PANIC] goconst internal error: {}", info);
        eprintln!("[PANIC] The process will exit with code 101.");
    }));

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = err.print();
                process::exit(0);
            }
            _ => {
                eprintln!("Failed to parse arguments: {}", err);
                process::exit(1);
            }
        },
    };

    init_logging(cli.log_json);

    if let Err(err) = run(&cli) {
        eprintln!("{:#}", err);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn create_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("goconst").chain(args.iter().copied())).unwrap()
    }

    // --- argument parsing TESTS ---

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.out, "-");
        assert!(!cli.append);
        assert!(cli.dirs.is_empty());
        assert!(cli.files.is_empty());
        assert_eq!(cli.package, "");
    }

    #[test]
    fn test_repeatable_dirs_and_positional_files() {
        let cli = parse(&["-d", "a", "--dir", "b", "-p", "util", "x.go", "y.go", "-o", "out.txt", "-a"]);
        assert_eq!(cli.dirs, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(cli.package, "util");
        assert_eq!(cli.files, vec![PathBuf::from("x.go"), PathBuf::from("y.go")]);
        assert_eq!(cli.out, "out.txt");
        assert!(cli.append);
    }

    #[test]
    fn test_help_and_unknown_flags() {
        let help = Cli::try_parse_from(["goconst", "--help"]).unwrap_err();
        assert_eq!(help.kind(), ErrorKind::DisplayHelp);
        let bad = Cli::try_parse_from(["goconst", "--bogus"]).unwrap_err();
        assert_eq!(bad.kind(), ErrorKind::UnknownArgument);
    }

    // --- option merging TESTS ---

    #[test]
    fn test_flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("goconst.toml");
        create_file(
            &config,
            "[target]\ngoos = \"darwin\"\ngoarch = \"arm64\"\n\n[imports]\npaths = [\"/from/config\"]\n",
        );
        let config_arg = config.to_string_lossy().to_string();
        let cli = parse(&["--config", &config_arg, "--goarch", "amd64", "-I", "/from/flag", "--report-skipped"]);

        let options = build_options(&cli).unwrap();
        assert_eq!(options.target.goos, "darwin");
        assert_eq!(options.target.goarch, "amd64");
        assert_eq!(options.import_roots[0], PathBuf::from("/from/flag"));
        assert_eq!(options.import_roots[1], PathBuf::from("/from/config"));
        assert!(options.report_skipped);
        assert!(!options.strict_imports);
    }

    #[test]
    fn test_missing_explicit_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml").to_string_lossy().to_string();
        let cli = parse(&["--config", &missing]);
        assert!(build_options(&cli).is_err());
    }

    // --- end-to-end TESTS ---

    #[test]
    fn test_run_writes_listing_file() {
        let dir = tempfile::tempdir().unwrap();
        create_file(
            &dir.path().join("pkg/const.go"),
            "package pkg\n\nconst (\n\tFoo = 1 // doc\n\tBar = 2\n)\n",
        );
        let out = dir.path().join("out.txt");
        let pkg = dir.path().join("pkg").to_string_lossy().to_string();
        let missing = dir.path().join("missing").to_string_lossy().to_string();
        let out_arg = out.to_string_lossy().to_string();

        let cli = parse(&["-d", &missing, "-d", &pkg, "-o", &out_arg]);
        let report = run(&cli).unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            "// package pkg, file const.go\n\nFoo = 1 // doc\nBar = 2\n\n"
        );

        let cli = parse(&["-d", &pkg, "-o", &out_arg, "-a"]);
        run(&cli).unwrap();
        let text = fs::read_to_string(&out).unwrap();
        assert_eq!(text.matches("// package pkg").count(), 2);
    }

    #[test]
    fn test_unopenable_output_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("no/such/dir/out.txt").to_string_lossy().to_string();
        let cli = parse(&["-o", &out]);
        let err = run(&cli).unwrap_err();
        assert!(err.to_string().starts_with("Failed to open file"));
    }
}
