use blackpulse_export::error::category_of;
use blackpulse_export::{ExportConfig, export};
use clap::{Parser, Subcommand};
use eyre::{Context, Result, eyre};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Export BlackPulse messages from SQLite to Markdown files.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the SQLite store (messages.db).
    /// Defaults to ./data/messages.db if not set in config.
    #[arg(long, value_name = "PATH", global = true)]
    db: Option<PathBuf>,

    /// Path to a specific configuration file.
    /// Defaults to $XDG_CONFIG_HOME/blackpulse-export/config.toml
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Read from a temporary copy of the store instead of the live file.
    #[arg(long, global = true)]
    snapshot: bool,

    /// Print each file written.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only print warnings and errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Every message in one combined file.
    Dump {
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// One file per message id listed in the id file, with comments.
    Selective {
        /// Newline-separated message ids.
        #[arg(long, value_name = "FILE")]
        ids: Option<PathBuf>,
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },
    /// One file per message, with comments.
    Individual {
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },
    /// Combined files capped at an estimated number of lines.
    Paginate {
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
        #[arg(long, value_name = "N")]
        max_lines: Option<usize>,
    },
}

#[derive(Deserialize, Default)]
struct FileConfig {
    db_path: Option<PathBuf>,
    dump_file: Option<PathBuf>,
    individual_dir: Option<PathBuf>,
    selected_dir: Option<PathBuf>,
    paginated_dir: Option<PathBuf>,
    id_file: Option<PathBuf>,
    max_lines_per_file: Option<usize>,
}

fn load_file_config(explicit_path: Option<&Path>) -> Result<FileConfig> {
    let path = if let Some(p) = explicit_path {
        if !p.exists() {
            return Err(eyre!("Config file not found: {}", p.display()));
        }
        Some(p.to_path_buf())
    } else {
        dirs::config_dir()
            .map(|d| d.join("blackpulse-export/config.toml"))
            .filter(|p| p.exists())
    };

    match path {
        None => Ok(FileConfig::default()),
        Some(p) => {
            let content = fs::read_to_string(&p)
                .wrap_err_with(|| format!("Failed to read config: {}", p.display()))?;
            toml::from_str(&content)
                .wrap_err_with(|| format!("Failed to parse config: {}", p.display()))
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: Cli) -> Result<()> {
    // 1. Load config file (CLI path > default path)
    let file_cfg = load_file_config(cli.config.as_deref())?;

    // 2. Resolve every setting (CLI > Config > Default)
    let defaults = ExportConfig::default();
    let mut config = ExportConfig {
        db_path: cli.db.or(file_cfg.db_path).unwrap_or(defaults.db_path),
        dump_file: file_cfg.dump_file.unwrap_or(defaults.dump_file),
        individual_dir: file_cfg.individual_dir.unwrap_or(defaults.individual_dir),
        selected_dir: file_cfg.selected_dir.unwrap_or(defaults.selected_dir),
        paginated_dir: file_cfg.paginated_dir.unwrap_or(defaults.paginated_dir),
        id_file: file_cfg.id_file.unwrap_or(defaults.id_file),
        max_lines_per_file: file_cfg
            .max_lines_per_file
            .unwrap_or(defaults.max_lines_per_file),
        snapshot: cli.snapshot,
        quiet: cli.quiet,
    };

    // 3. Run the selected mode
    match cli.command {
        Command::Dump { output } => {
            if let Some(output) = output {
                config.dump_file = output;
            }
            export::export_full_dump(&config)?;
        }
        Command::Selective { ids, output_dir } => {
            if let Some(ids) = ids {
                config.id_file = ids;
            }
            if let Some(dir) = output_dir {
                config.selected_dir = dir;
            }
            export::export_selective(&config)?;
        }
        Command::Individual { output_dir } => {
            if let Some(dir) = output_dir {
                config.individual_dir = dir;
            }
            export::export_individual(&config)?;
        }
        Command::Paginate {
            output_dir,
            max_lines,
        } => {
            if let Some(dir) = output_dir {
                config.paginated_dir = dir;
            }
            if let Some(n) = max_lines {
                config.max_lines_per_file = n;
            }
            export::export_paginated(&config)?;
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Err(err) = run(cli) {
        eprintln!("[{}] {:#}", category_of(&err), err);
        std::process::exit(1);
    }
}
