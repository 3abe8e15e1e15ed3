//! tagrenamer - Organize a music collection by its embedded tags.
//!
//! Usage:
//!   tagrenamer scan [PATH]         Scan and summarize a collection
//!   tagrenamer duplicates [PATH]   Find files that would be renamed onto each other
//!   tagrenamer rename [PATH]       Move files into <artist>/<album>/<track> - <title>.<ext>
//!   tagrenamer --help              Show help

mod rename;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result};
use tracing::{Level, info};

use tagrenamer_analyze::DuplicateConfig;
use tagrenamer_core::{Callbacks, Event, EventKind, Settings, ShellScript};
use tagrenamer_scan::{ScanConfig, ScanOutcome, TreeScanner};
use tagrenamer_tags::{LoftyTagReader, SafeString};

use crate::rename::{RenameOptions, RenameSummary, duplicate_report, rename_collection, sanitize_all};

#[derive(Parser)]
#[command(
    name = "tagrenamer",
    version,
    about = "Organize a music collection by its embedded tags",
    long_about = "tagrenamer reads the tags of every mp3, ogg and flac file below a \
                  directory and moves each file to <artist>/<album>/<track> - <title>.<ext>.\n\n\
                  Use --dry-run to see what would happen without touching any file."
)]
struct Cli {
    /// Plan and report every action without touching the filesystem
    #[arg(short = 'n', long, global = true)]
    dry_run: bool,

    /// Use the album artist tag as artist (for various-artists albums)
    #[arg(long = "albumartist", global = true)]
    album_artist: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a collection and show a summary
    Scan {
        /// Path to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Find files whose sanitized tags are identical
    Duplicates {
        /// Path to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Maximum number of duplicate groups to show (0 = all)
        #[arg(short = 't', long, default_value = "0")]
        top: usize,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Move every music file into the artist/album layout
    Rename {
        /// Collection root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Write the equivalent shell commands to this file
        #[arg(short, long)]
        shell: Option<PathBuf>,

        /// Print the equivalent shell commands to stdout
        #[arg(long)]
        print_shell: bool,

        /// Remove duplicates instead of leaving them in place
        #[arg(long)]
        remove_duplicates: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let settings = Settings::builder()
        .dry_run(cli.dry_run)
        .album_artist(cli.album_artist)
        .build()
        .context("Invalid settings")?;

    match cli.command {
        Command::Scan { path, format } => run_scan(&path, settings, format)?,
        Command::Duplicates { path, top, format } => run_duplicates(&path, settings, top, format)?,
        Command::Rename {
            path,
            shell,
            print_shell,
            remove_duplicates,
        } => {
            let options = RenameOptions { remove_duplicates };
            run_rename(&path, settings, shell, print_shell, options)?;
        }
    }

    Ok(())
}

fn setup_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .compact()
        .init();
}

/// Scan `path` with the lofty reader.
fn scan(path: &Path, settings: Settings, callbacks: Arc<Callbacks>) -> Result<ScanOutcome> {
    eprintln!("Scanning {}...", path.display());

    let config = ScanConfig::new(path);
    let outcome = TreeScanner::new(&LoftyTagReader)
        .with_callbacks(callbacks)
        .scan(&config, settings)
        .context("Scan failed")?;

    for warning in &outcome.warnings {
        tracing::warn!(path = %warning.path.display(), kind = ?warning.kind, "{}", warning.message);
    }
    Ok(outcome)
}

/// Run a scan and display summary.
fn run_scan(path: &Path, settings: Settings, format: OutputFormat) -> Result<()> {
    let outcome = scan(path, settings, Arc::default())?;

    match format {
        OutputFormat::Text => {
            println!();
            println!("{}", "─".repeat(60));
            println!(" {}", outcome.root_path.display());
            println!(
                " {} music files, {} other files, {} directories",
                outcome.stats.total_music_files, outcome.stats.total_files, outcome.stats.total_entries
            );
            println!(" Deepest level: {}", outcome.stats.max_level);
            println!(" Scanned in {:.2}s", outcome.duration.as_secs_f64());
            println!("{}", "─".repeat(60));

            if !outcome.warnings.is_empty() {
                println!();
                println!("{} warning(s) during scan", outcome.warnings.len());
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "root": outcome.root_path,
                "stats": outcome.stats,
                "warnings": outcome.warnings,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}

/// Run duplicate detection.
fn run_duplicates(path: &Path, settings: Settings, top_n: usize, format: OutputFormat) -> Result<()> {
    let mut outcome = scan(path, settings, Arc::default())?;

    eprintln!("Finding duplicates...");
    sanitize_all(&mut outcome.tree, &SafeString, &mut RenameSummary::default())?;
    let config = DuplicateConfig {
        max_groups: top_n,
        ..DuplicateConfig::default()
    };
    let report = duplicate_report(&outcome.tree, config);

    match format {
        OutputFormat::Text => {
            println!();
            println!("{}", "─".repeat(70));
            println!(" Duplicate Music Report");
            println!("{}", "─".repeat(70));
            println!();

            if report.groups.is_empty() {
                println!(" No duplicate music files found.");
            } else {
                println!(
                    " Found {} duplicate groups ({} files, {} redundant)",
                    report.group_count,
                    report.files_with_duplicates,
                    report.total_redundant_files()
                );
                println!();

                for (i, group) in report.groups.iter().enumerate() {
                    println!(" Group {} ({} files): {}", i + 1, group.count(), group.label);
                    for path in &group.paths {
                        println!("   {}", path.display());
                    }
                    println!();
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// Run the rename, optionally emitting the equivalent shell script.
fn run_rename(
    path: &Path,
    settings: Settings,
    shell: Option<PathBuf>,
    print_shell: bool,
    options: RenameOptions,
) -> Result<()> {
    let dry_run = settings.dry_run;
    let script = ShellScript::new();
    let callbacks = script.attach(report_callbacks()).shared();

    let mut outcome = scan(path, settings, Arc::clone(&callbacks))?;
    let summary = rename_collection(&mut outcome.tree, outcome.root, &SafeString, callbacks, options)?;

    if print_shell {
        print!("{}", script.render());
    }
    if let Some(shell_path) = shell {
        std::fs::write(&shell_path, script.render())
            .with_context(|| format!("Failed to write {}", shell_path.display()))?;
        eprintln!("Shell script written to {}", shell_path.display());
    }

    let verb = if dry_run { "Would move" } else { "Moved" };
    eprintln!();
    eprintln!(" {verb} {} files, {} already in place", summary.moved, summary.unchanged);
    if summary.duplicates_removed > 0 || summary.duplicates_skipped > 0 {
        eprintln!(
            " Duplicates: {} removed, {} left in place",
            summary.duplicates_removed, summary.duplicates_skipped
        );
    }
    if summary.directories_removed > 0 {
        eprintln!(" Empty directories removed: {}", summary.directories_removed);
    }
    for (path, reason) in &summary.unsanitizable {
        eprintln!(" Skipped {}: {reason}", path.display());
    }
    for path in &summary.collisions {
        eprintln!(" Skipped {}: target name already taken", path.display());
    }

    Ok(())
}

/// Handlers that report moves and removals as they happen.
fn report_callbacks() -> Callbacks {
    Callbacks::new()
        .on(EventKind::Move, |event| {
            if let Event::Move { node, .. } = event {
                info!(category = "move", "{}", node.relpath().display());
            }
            Ok(())
        })
        .on(EventKind::Remove, |event| {
            if let Event::Remove(node) = event {
                info!(category = "remove", "{}", node.relpath().display());
            }
            Ok(())
        })
}
