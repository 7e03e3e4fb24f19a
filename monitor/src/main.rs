//! Career Page Monitor CLI
//!
//! Runs the monitor, manages targets and reads the result history from the
//! data directory (`--data-dir` or `MONITOR_DATA_DIR`).

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use common::{ResultRow, RunStatus, Target, VisaVerdict};
use monitor::{
    export_csv, overview, HistoryFilter, MonitorConfig, MonitorContext, MonitorError, RunOptions,
    SyncDirection,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SyncArg {
    /// Merge the reference-manager collection into targets.csv
    Pull,
    /// Create remote records for targets without an external key
    Push,
}

#[derive(Parser)]
#[command(
    name = "monitor",
    version,
    about = "Watch career pages for changes and visa sponsorship mentions"
)]
struct Cli {
    /// Directory holding targets.csv, results.csv and the snapshot folders
    #[arg(long, global = true, env = "MONITOR_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every target now and record the results
    Run {
        /// Archive pages that changed (HTML copy, reference manager, screenshot)
        #[arg(long)]
        archive: bool,
    },

    /// Add, edit, remove or sync monitored targets
    Targets {
        #[command(subcommand)]
        command: TargetCommand,
    },

    /// Show the result history, newest first
    History {
        /// Only rows for this company (repeatable)
        #[arg(long = "company")]
        companies: Vec<String>,
        /// Only rows with this status (repeatable)
        #[arg(long = "status", value_parser = parse_status)]
        statuses: Vec<RunStatus>,
        /// Write the filtered rows as CSV to this file ("-" for stdout)
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Summary metrics over targets and history
    Overview,
}

#[derive(Subcommand)]
enum TargetCommand {
    /// List targets
    List,
    /// Add a target
    Add {
        company: String,
        url: String,
        role: String,
    },
    /// Change the target identified by company and role
    Edit {
        company: String,
        role: String,
        #[arg(long)]
        new_company: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        new_role: Option<String>,
    },
    /// Remove the target identified by company and role
    Remove { company: String, role: String },
    /// Sync with the configured reference manager
    Sync {
        #[arg(value_enum, default_value = "pull")]
        direction: SyncArg,
    },
}

fn parse_status(raw: &str) -> Result<RunStatus, String> {
    raw.parse::<RunStatus>().map_err(|err| err.to_string())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = execute(cli) {
        eprintln!("❌ {err:#}");
        process::exit(1);
    }
}

fn execute(cli: Cli) -> Result<()> {
    let mut config = MonitorConfig::from_env();
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir);
    }
    let context = MonitorContext::from_config(&config).context("failed to set up monitor")?;
    let json = cli.output == OutputFormat::Json;

    match cli.command {
        Commands::Run { archive } => {
            let report = context.run(RunOptions { archive })?;
            if json {
                print_json(&report)?;
                return Ok(());
            }
            for row in &report.rows {
                print_row(row);
            }
            for warning in &report.warnings {
                println!("⚠️  {warning}");
            }
            if !report.rows.is_empty() {
                println!(
                    "\n✨ Monitoring complete! {} change(s), {} error(s)",
                    report.changes(),
                    report.errors()
                );
            }
        }

        Commands::Targets { command } => targets(&context, command, json)?,

        Commands::History {
            companies,
            statuses,
            csv,
        } => {
            let filter = HistoryFilter {
                companies,
                statuses,
            };
            let entries = context.results().history(&filter)?;
            let rows: Vec<ResultRow> = entries.iter().map(|e| e.row.clone()).collect();

            match csv {
                Some(path) if path.as_os_str() == "-" => export_csv(&rows, io::stdout())?,
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("failed to create {}", path.display()))?;
                    export_csv(&rows, file)?;
                    println!("💾 Exported {} rows to {:?}", rows.len(), path);
                }
                None if json => print_json(&entries)?,
                None if entries.is_empty() => println!("No results yet."),
                None => {
                    for entry in &entries {
                        print!("[{}] {}  ", entry.index, entry.row.date);
                        print_row(&entry.row);
                    }
                }
            }
        }

        Commands::Overview => {
            let targets = context.registry().load()?;
            let rows = context.results().read_all()?;
            let summary = overview(&targets, &rows);
            if json {
                print_json(&summary)?;
            } else {
                println!("📋 Targets:        {}", summary.targets);
                println!("🔁 Runs:           {}", summary.runs);
                println!("🆕 Changes:        {}", summary.changes);
                println!("🛂 Visa mentions:  {}", summary.visa_yes);
                println!("❌ Errors:         {}", summary.errors);
                println!(
                    "🕒 Last run:       {}",
                    summary.last_run.as_deref().unwrap_or("never")
                );
            }
        }
    }

    Ok(())
}

fn targets(context: &MonitorContext, command: TargetCommand, json: bool) -> Result<()> {
    let registry = context.registry();

    match command {
        TargetCommand::List => {
            let targets = registry.load()?;
            if json {
                print_json(&targets)?;
            } else if targets.is_empty() {
                println!("No targets defined. Add some targets first.");
            } else {
                for target in &targets {
                    println!("🏢 {} | {} | {}", target.company, target.role, target.url);
                }
            }
        }
        TargetCommand::Add { company, url, role } => {
            let targets = registry.add(Target::new(&company, &url, &role))?;
            println!("✅ Targets saved successfully! ({} total)", targets.len());
        }
        TargetCommand::Edit {
            company,
            role,
            new_company,
            url,
            new_role,
        } => {
            let current = registry
                .load()?
                .into_iter()
                .find(|t| t.same_slot(&company, &role))
                .ok_or_else(|| MonitorError::TargetNotFound {
                    company: company.clone(),
                    role: role.clone(),
                })?;
            let replacement = Target::new(
                new_company.as_deref().unwrap_or(&current.company),
                url.as_deref().unwrap_or(&current.url),
                new_role.as_deref().unwrap_or(&current.role),
            );
            registry.edit(&company, &role, replacement)?;
            println!("✅ Updated {company} - {role}");
        }
        TargetCommand::Remove { company, role } => {
            let removed = registry.remove(&company, &role)?;
            println!("🗑️  Removed {} - {}", removed.company, removed.role);
        }
        TargetCommand::Sync { direction } => {
            let direction = match direction {
                SyncArg::Pull => SyncDirection::Pull,
                SyncArg::Push => SyncDirection::Push,
            };
            let summary = context.sync_targets(direction)?;
            if json {
                print_json(&summary)?;
            } else {
                println!(
                    "🔄 Sync complete: {} added, {} updated, {} linked, {} skipped",
                    summary.added, summary.updated, summary.linked, summary.skipped
                );
            }
        }
    }

    Ok(())
}

fn print_row(row: &ResultRow) {
    let icon = match row.status {
        RunStatus::FirstSnapshot => "📸",
        RunStatus::Changed => "🆕",
        RunStatus::Unchanged => "✅",
        RunStatus::Error => "❌",
    };
    println!(
        "{icon} {} - {}: {}",
        row.company,
        row.role,
        row.status.describe()
    );
    if let Some(detail) = &row.detail {
        println!("   {detail}");
    }
    if row.visa == VisaVerdict::Yes {
        println!("   🛂 Visa sponsorship: {}", row.evidence);
    }
    if let Some(archive) = &row.archive {
        println!("   🗄️  Archived: {archive}");
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
