//! Command-line interface for changegate.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::warn;
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::config::{self, Config};
use crate::gate::{Gate, ValidationRequest};
use crate::judge::Decision;
use crate::report;
use crate::retry::FileRetryStore;
use crate::testrun::TestOutcome;

/// Exit codes.
pub const EXIT_ALLOW: i32 = 0;
pub const EXIT_DENY: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Default config file names to search for.
const DEFAULT_CONFIG_NAMES: &[&str] = &["changegate.yaml", ".changegate.yaml"];

/// File extensions the gate validates.
const SUPPORTED_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "js", "jsx", "mjs", "cjs"];

/// Embedded default config, written by `changegate init`.
const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("templates/default.yaml");

/// Static quality gate for proposed code changes.
///
/// Changegate analyzes a proposed TypeScript/JavaScript file, decides
/// whether to allow or deny it (or ask for human review when the input
/// is unreadable), and renders a correction prompt on denial. Retry
/// state is kept per session so repeated denials escalate and
/// eventually fail open.
#[derive(Parser)]
#[command(name = "changegate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a proposed change (file or directory)
    #[command(visible_alias = "check")]
    Validate(ValidateArgs),
    /// Create a changegate config file from the default template
    Init(InitArgs),
}

/// Arguments for the validate command.
#[derive(Parser)]
pub struct ValidateArgs {
    /// Path to validate (file or directory)
    pub path: PathBuf,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Session id the retry state is keyed by
    #[arg(short, long, default_value = "cli")]
    pub session: String,

    /// Read the proposed content from stdin; the path only names the
    /// target file
    #[arg(long)]
    pub stdin: bool,

    /// Path to a test-outcome JSON summary (single-file mode only)
    #[arg(long)]
    pub tests: Option<PathBuf>,

    /// Directory for retry-state files (default: user cache dir)
    #[arg(long)]
    pub state_dir: Option<PathBuf>,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "changegate.yaml")]
    pub output: PathBuf,
}

/// Discover a config file in the current directory.
fn discover_config() -> Option<PathBuf> {
    DEFAULT_CONFIG_NAMES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Load the effective config: explicit path, discovered file, or
/// built-in defaults.
fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let config = match explicit {
        Some(path) => Config::parse_file(path)?,
        None => match discover_config() {
            Some(path) => Config::parse_file(path)?,
            None => Config::default(),
        },
    };
    config::validate(&config)?;
    Ok(config)
}

/// Build the retry store: explicit dir, user cache dir, or a local
/// fallback next to the working directory.
fn build_store(state_dir: Option<&Path>) -> FileRetryStore {
    match state_dir {
        Some(dir) => FileRetryStore::new(dir),
        None => FileRetryStore::default_location()
            .unwrap_or_else(|| FileRetryStore::new(".changegate/sessions")),
    }
}

/// Collect validatable files under a directory.
fn collect_files(root: &Path, config: &Config) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            if e.file_type().is_dir() && (name.starts_with('.') || name == "node_modules") {
                return false;
            }
            true
        })
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if SUPPORTED_EXTENSIONS.contains(&ext) && !config.is_path_excluded(path) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// Run the validate command.
pub fn run_validate(args: &ValidateArgs) -> anyhow::Result<i32> {
    if args.format != "pretty" && args.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let config = load_config(args.config.as_deref())?;
    let store = Arc::new(build_store(args.state_dir.as_deref()));
    let gate = Gate::new(config, store);

    let metadata = match std::fs::metadata(&args.path) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: cannot access {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };

    if metadata.is_dir() {
        if args.stdin {
            eprintln!("Error: --stdin requires a file path, not a directory");
            return Ok(EXIT_ERROR);
        }
        if args.tests.is_some() {
            warn!("--tests is ignored in directory mode");
        }
        return run_batch(&gate, args);
    }

    let path_str = args.path.to_string_lossy().to_string();
    if gate.config().is_path_excluded(&args.path) {
        println!("{} is excluded by config, nothing to validate", path_str);
        return Ok(EXIT_ALLOW);
    }

    let content = if args.stdin {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&args.path)?
    };

    let test_outcome = match &args.tests {
        Some(path) => Some(TestOutcome::parse_file(path)?),
        None => None,
    };

    let verdict = gate.validate(&ValidationRequest {
        file_path: &path_str,
        content: &content,
        session_id: &args.session,
        test_outcome,
    });

    match args.format.as_str() {
        "json" => report::write_json(&path_str, &verdict)?,
        _ => report::write_pretty(&path_str, &verdict),
    }

    Ok(exit_code(verdict.decision))
}

/// Validate every supported file under a directory.
///
/// Files are independent, so the analysis fans out; the retry store is
/// the only shared state and is internally synchronized. Results print
/// in path order regardless of completion order.
fn run_batch(gate: &Gate, args: &ValidateArgs) -> anyhow::Result<i32> {
    let files = collect_files(&args.path, gate.config())?;
    if files.is_empty() {
        eprintln!("Warning: no files to validate under {:?}", args.path);
        return Ok(EXIT_ALLOW);
    }

    let verdicts: Vec<_> = files
        .par_iter()
        .map(|path| {
            let path_str = path.to_string_lossy().to_string();
            let session = format!("{}:{}", args.session, path_str);
            let verdict = match std::fs::read_to_string(path) {
                Ok(content) => gate.validate(&ValidationRequest {
                    file_path: &path_str,
                    content: &content,
                    session_id: &session,
                    test_outcome: None,
                }),
                Err(e) => {
                    warn!("failed to read {:?}: {}", path, e);
                    return (path_str, None);
                }
            };
            (path_str, Some(verdict))
        })
        .collect();

    let mut worst = EXIT_ALLOW;
    for (path_str, verdict) in &verdicts {
        let verdict = match verdict {
            Some(v) => v,
            None => {
                worst = worst.max(EXIT_ERROR);
                continue;
            }
        };
        match args.format.as_str() {
            "json" => report::write_json(path_str, verdict)?,
            _ => report::write_pretty(path_str, verdict),
        }
        worst = worst.max(exit_code(verdict.decision));
    }

    Ok(worst)
}

fn exit_code(decision: Decision) -> i32 {
    match decision {
        Decision::Allow => EXIT_ALLOW,
        Decision::Deny => EXIT_DENY,
        Decision::Ask => EXIT_ERROR,
    }
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        return Ok(EXIT_ERROR);
    }

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(&args.output, DEFAULT_CONFIG_TEMPLATE)?;

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to fit your thresholds", args.output.display());
    println!(
        "  2. Run: changegate validate <file> --config {}",
        args.output.display()
    );

    Ok(EXIT_ALLOW)
}
