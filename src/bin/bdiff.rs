//! Command-line interface for bdiff
//!
//! Usage:
//!   bdiff diff `<before>` `<after>` [--language L] [--format text|json] [--algorithm A]
//!   bdiff canonical `<path>`        - Print the canonical form of a file
//!   bdiff strip `<path>`            - Print a file without comments and docstrings
//!   bdiff tokens `<path>`           - Print the token stream, one token per line
//!   bdiff list-languages
//!
//! `diff` exits with the number of change records (0 means no behavioral difference). Any
//! failure exits with 255.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use bdiff::bdiff::config::{BdiffConfig, Loader, OutputFormat, ERROR_EXIT_CODE};
use bdiff::bdiff::source::SourceText;
use bdiff::{DiffAlgorithm, DiffEngine, Language, LanguageRegistry};
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "bdiff", version)]
#[command(about = "Tell whether an edit changed what a program does")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file layered over the built-in defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two versions of a file, ignoring cosmetic edits
    Diff {
        before: PathBuf,
        after: PathBuf,

        /// Language name or alias (default: inferred from the extension)
        #[arg(short, long)]
        language: Option<String>,

        /// Output format
        #[arg(short, long, value_parser = ["text", "json"])]
        format: Option<String>,

        /// Diff algorithm: myers, patience or lcs
        #[arg(short, long)]
        algorithm: Option<DiffAlgorithm>,
    },

    /// Print the canonical form of a file
    Canonical {
        path: PathBuf,
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Print a file with comments and docstrings removed
    Strip {
        path: PathBuf,
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Print the token stream of a file
    Tokens {
        path: PathBuf,
        #[arg(short, long)]
        language: Option<String>,
    },

    /// List the supported languages
    ListLanguages,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(ERROR_EXIT_CODE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(ERROR_EXIT_CODE)
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "bdiff=debug",
        _ => "bdiff=trace",
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

fn run(cli: Cli) -> Result<u8> {
    let registry = LanguageRegistry::with_defaults();
    match cli.command {
        Commands::Diff {
            before,
            after,
            language,
            format,
            algorithm,
        } => {
            let mut overrides = Vec::new();
            if let Some(format) = format {
                overrides.push(("output.format", format));
            }
            if let Some(algorithm) = algorithm {
                overrides.push(("diff.algorithm", algorithm.name().to_string()));
            }
            let config = load_config(cli.config.as_deref(), overrides)?;
            handle_diff(registry, &config, &before, &after, language)
        }
        Commands::Canonical { path, language } => {
            let config = load_config(cli.config.as_deref(), Vec::new())?;
            let language = resolve(&registry, &config, language.as_deref(), &[path.as_path()])?;
            let source = read(&path)?;
            let canonical = language
                .canonicalize(&source)
                .with_context(|| format!("canonicalizing {}", path.display()))?;
            print!("{canonical}");
            Ok(0)
        }
        Commands::Strip { path, language } => {
            let config = load_config(cli.config.as_deref(), Vec::new())?;
            let language = resolve(&registry, &config, language.as_deref(), &[path.as_path()])?;
            let source = SourceText::new(read(&path)?);
            let tokens = language
                .tokenize(&source)
                .with_context(|| format!("tokenizing {}", path.display()))?;
            print!("{}", language.strip(&source, &tokens));
            Ok(0)
        }
        Commands::Tokens { path, language } => {
            let config = load_config(cli.config.as_deref(), Vec::new())?;
            let language = resolve(&registry, &config, language.as_deref(), &[path.as_path()])?;
            let source = SourceText::new(read(&path)?);
            let tokens = language
                .tokenize(&source)
                .with_context(|| format!("tokenizing {}", path.display()))?;
            for token in tokens {
                println!("{token}");
            }
            Ok(0)
        }
        Commands::ListLanguages => {
            for name in registry.available() {
                let language = registry.get(&name)?;
                println!(
                    "{:<10} {} (.{})",
                    name,
                    language.description(),
                    language.extensions().join(", .")
                );
            }
            Ok(0)
        }
    }
}

fn handle_diff(
    registry: LanguageRegistry,
    config: &BdiffConfig,
    before: &Path,
    after: &Path,
    language: Option<String>,
) -> Result<u8> {
    let language = resolve(&registry, config, language.as_deref(), &[before, after])?
        .name()
        .to_string();
    let old = read(before)?;
    let new = read(after)?;
    debug!(%language, algorithm = %config.diff.algorithm, "comparing files");

    let engine = DiffEngine::with_registry(registry).with_algorithm(config.diff.algorithm);
    let verdict = engine
        .diff(&old, &new, &language)
        .with_context(|| format!("comparing {} with {}", before.display(), after.display()))?;

    match config.output.format {
        OutputFormat::Text => {
            for record in &verdict.changes {
                eprintln!("{record}");
            }
            if verdict.changed() {
                eprintln!("warning: behavior has been changed");
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&verdict)?);
        }
    }
    Ok(config.output.exit_code(verdict.len()))
}

fn load_config(path: Option<&Path>, overrides: Vec<(&str, String)>) -> Result<BdiffConfig> {
    let mut loader = Loader::new().with_environment();
    if let Some(path) = path {
        loader = loader.with_file(path);
    }
    for (key, value) in overrides {
        loader = loader.set_override(key, value)?;
    }
    loader.build().context("loading configuration")
}

/// Explicit language first, then the extension of the first recognizable path, then the
/// configured fallback.
fn resolve<'r>(
    registry: &'r LanguageRegistry,
    config: &BdiffConfig,
    explicit: Option<&str>,
    paths: &[&Path],
) -> Result<&'r dyn Language> {
    if let Some(name) = explicit {
        return Ok(registry.get(name)?);
    }
    if let Some(language) = paths.iter().find_map(|path| registry.for_path(path)) {
        return Ok(language);
    }
    Ok(registry.get(&config.diff.language)?)
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}
