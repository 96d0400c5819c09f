//! CLI entry point for keyremap
//!
//! Provides command-line interface for checking rules files,
//! inspecting compiled tables, replaying key events through the
//! dispatcher, and running the live keyboard hook.

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;
use keyremap::config::{expand_path, ConfigManager, FileWatcher, DEFAULT_CONFIG_PATH};
use keyremap::core::{
    compile,
    compiler::{CompiledTables, ShortcutTable},
    conflict::ConflictDetector,
    get_orphaned_keys,
    normalizer::pre_process_remap_table,
    parser::{format_rules, parse_rules_file},
    validate_buffer,
    validator::validate_rule,
    RemapBuffer, Scope,
};
use keyremap::engine::{publish_buffer, RemapEngine};
use keyremap::hook::simulate::{parse_event, render_events};
use keyremap::hook::{Disposition, Simulator, TableHandle};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Backups kept after a successful `normalize`
const MAX_BACKUPS: usize = 10;

#[derive(Parser)]
#[command(name = "keyremap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to rules file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log at debug level (overrides KEYREMAP_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check rules for invalid entries and duplicate sources
    Check,

    /// List remapped keys that nothing produces any more
    Orphans,

    /// Show the runtime tables the rules compile to
    Compile {
        /// Print tables as JSON
        #[arg(long)]
        json: bool,
    },

    /// Merge Left/Right modifier pairs and save the rules file
    Normalize {
        /// Print the result instead of saving it
        #[arg(long)]
        dry_run: bool,
    },

    /// Replay key events (e.g. `LCtrl+ A+ A- LCtrl-`) through the dispatcher
    Simulate {
        /// Events: key name followed by `+` (down) or `-` (up)
        #[arg(required = true, allow_hyphen_values = true)]
        events: Vec<String>,

        /// Process name of the focused application
        #[arg(long)]
        app: Option<String>,
    },

    /// Install the keyboard hook and apply rules until stopped
    Run,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let path = expand_path(&cli.config);

    match cli.command {
        Commands::Check => check_rules(&path)?,
        Commands::Orphans => list_orphans(&path)?,
        Commands::Compile { json } => show_tables(&path, json)?,
        Commands::Normalize { dry_run } => normalize_rules(&path, dry_run)?,
        Commands::Simulate { events, app } => simulate(&path, &events, app.as_deref())?,
        Commands::Run => run(path)?,
    }

    Ok(())
}

/// Logs go to stderr so command output stays clean.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("KEYREMAP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_rules(path: &Path) -> anyhow::Result<RemapBuffer> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read rules file {}", path.display()))?;
    Ok(parse_rules_file(&content, path)?)
}

/// Check rules for problems; exits with status 1 if any are found
fn check_rules(path: &Path) -> anyhow::Result<()> {
    println!("{} Parsing rules: {}", "→".cyan(), path.display());
    let buffer = load_rules(path)?;
    println!("{} Found {} rules\n", "✓".green(), buffer.len());

    let mut problems = 0;

    for rule in &buffer {
        if let Err(e) = validate_rule(rule) {
            problems += 1;
            println!("{} {}", "✗".red().bold(), e);
        }
    }

    let mut detector = ConflictDetector::new();
    for rule in &buffer {
        detector.add_rule(rule.clone());
    }
    let conflicts = detector.find_conflicts();

    for (i, conflict) in conflicts.iter().enumerate() {
        problems += 1;
        println!(
            "{} {} {}",
            format!("Conflict {}", i + 1).yellow().bold(),
            conflict.source.to_string().cyan(),
            format!("[{} / {}]", conflict.scope, conflict.condition).dimmed(),
        );

        for (idx, rule) in conflict.conflicting_rules.iter().enumerate() {
            println!("  {} {}", format!("{}.", idx + 1).dimmed(), rule);
        }
        println!();
    }

    for rule in buffer.iter().filter(|r| r.is_single_key()) {
        if let Scope::App(name) = &rule.scope {
            println!(
                "{} Single-key rules apply globally; '{}' scope is ignored at runtime: {}",
                "⚠".yellow(),
                name,
                rule
            );
        }
    }

    if problems == 0 {
        println!("{} {}", "✓".green().bold(), "No problems detected!".bold());
    } else {
        println!(
            "{} Found {} problem{}; these rules will not be applied.",
            "✗".red().bold(),
            problems,
            if problems == 1 { "" } else { "s" }
        );
        std::process::exit(1);
    }

    Ok(())
}

fn list_orphans(path: &Path) -> anyhow::Result<()> {
    let buffer = load_rules(path)?;
    let orphans = get_orphaned_keys(&buffer);

    if orphans.is_empty() {
        println!("{} Every remapped key can still be typed", "✓".green());
        return Ok(());
    }

    println!(
        "{} {} key{} can no longer be typed:",
        "⚠".yellow(),
        orphans.len(),
        if orphans.len() == 1 { "" } else { "s" }
    );
    for key in orphans {
        println!("  {}", key.to_string().cyan().bold());
    }

    Ok(())
}

fn compile_valid(path: &Path) -> anyhow::Result<CompiledTables> {
    let buffer = load_rules(path)?;
    validate_buffer(&buffer).context("Rules are invalid; run `keyremap check`")?;
    Ok(compile(&buffer))
}

fn show_tables(path: &Path, json: bool) -> anyhow::Result<()> {
    let tables = compile_valid(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tables)?);
        return Ok(());
    }

    println!("{}", "Single-key remaps".bold());
    for (key, remap) in tables.single_keys.sorted() {
        println!(
            "  {} {} → {}",
            key.to_string().cyan().bold(),
            format!("[{}]", remap.condition).dimmed(),
            remap.target.to_string().green()
        );
    }

    println!("\n{}", "Global shortcuts".bold());
    print_shortcuts(&tables.global_shortcuts);

    let mut apps: Vec<_> = tables.app_shortcuts.iter().collect();
    apps.sort_by(|a, b| a.0.cmp(b.0));
    for (name, table) in apps {
        println!("\n{} {}", "Shortcuts for".bold(), name.magenta().bold());
        print_shortcuts(table);
    }

    println!(
        "\n{} {} single-key entries, {} shortcut entries",
        "✓".green(),
        tables.single_keys.len(),
        tables.slot_count()
    );
    Ok(())
}

fn print_shortcuts(table: &ShortcutTable) {
    for entry in table.entries() {
        println!(
            "  {} → {}",
            entry.source.to_string().cyan().bold(),
            entry.target.to_string().green()
        );
    }
}

fn normalize_rules(path: &Path, dry_run: bool) -> anyhow::Result<()> {
    let manager = ConfigManager::new(path.to_path_buf())?;
    let buffer = manager.load()?;

    if dry_run {
        validate_buffer(&buffer)?;
        print!("{}", format_rules(&pre_process_remap_table(&buffer)));
        return Ok(());
    }

    let tx = manager.begin_transaction()?;
    let backup = tx.backup_path().to_path_buf();
    let saved = tx.commit(&buffer)?;
    manager.cleanup_old_backups(MAX_BACKUPS)?;

    println!(
        "{} Saved {} rules ({} merged) to {}",
        "✓".green(),
        saved.len(),
        buffer.len() - saved.len(),
        manager.config_path().display()
    );
    println!("  Backup: {}", backup.display().to_string().dimmed());
    Ok(())
}

fn simulate(path: &Path, tokens: &[String], app: Option<&str>) -> anyhow::Result<()> {
    let events = tokens
        .iter()
        .map(|token| {
            parse_event(token).with_context(|| {
                format!("Invalid event '{}': expected a key name followed by + or -", token)
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut sim = Simulator::from_tables(compile_valid(path)?);
    sim.set_foreground(app);

    for event in events {
        let disposition = sim.feed(event);
        let seen = sim.take_delivered();
        let marker = match disposition {
            Disposition::Forward => "pass".green(),
            Disposition::Suppress => "eat ".yellow(),
        };
        println!(
            "{:<10} {} {}",
            event.to_string().cyan(),
            marker,
            render_events(&seen)
        );
    }

    sim.release_all();
    let leftover = sim.take_delivered();
    if !leftover.is_empty() {
        println!("{:<10} {}", "(release)".dimmed(), render_events(&leftover));
    }

    Ok(())
}

fn run(path: PathBuf) -> anyhow::Result<()> {
    let manager = ConfigManager::new(path)?;
    let buffer = manager.load()?;

    let mut engine = RemapEngine::new();
    engine.apply(&buffer)?;
    engine.enable()?;

    let tables = engine.tables().clone();
    println!(
        "{} Remapping active with {} rules from {}",
        "✓".green(),
        buffer.len(),
        manager.config_path().display()
    );
    thread::spawn(move || watch_and_reload(manager, tables));

    keyremap::platform::run_message_loop()?;
    engine.disable()?;
    Ok(())
}

/// Republishes tables whenever the rules file changes.
///
/// An edit that fails to parse or validate keeps the current tables live.
fn watch_and_reload(manager: ConfigManager, tables: TableHandle) {
    let watcher = match FileWatcher::new(manager.config_path()) {
        Ok(watcher) => watcher,
        Err(e) => {
            warn!("Hot reload disabled: {}", e);
            return;
        }
    };

    loop {
        if !watcher.wait_for_change(Duration::from_secs(1)) {
            continue;
        }

        let reloaded = manager
            .load()
            .map_err(anyhow::Error::from)
            .and_then(|buffer| publish_buffer(&tables, &buffer).map_err(anyhow::Error::from));

        match reloaded {
            Ok(()) => info!("Reloaded {}", manager.config_path().display()),
            Err(e) => warn!("Keeping previous rules: {:#}", e),
        }
    }
}
