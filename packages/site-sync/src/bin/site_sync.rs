//! Sync components from the hosted site builder.
//!
//! Exits 0 when the run completes or is skipped because nothing changed,
//! and 1 on any run-level failure.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use site_sync::types::capture::short_fingerprint;
use site_sync::{
    format_bytes, Orchestrator, RunOptions, RunOutcome, StatsReport, StorageUsage, SyncConfig,
    SyncReport, TracingTelemetry,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "site-sync")]
#[command(about = "Mirror a hosted landing page into local components")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Convert even when the page is unchanged
    #[arg(long)]
    force_sync: bool,

    /// Identify components without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Keep expired history
    #[arg(long)]
    skip_cleanup: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show fingerprint history and storage usage
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = SyncConfig::from_env().context("Failed to load configuration")?;
    init_tracing(&config, cli.verbose);

    let orchestrator = Orchestrator::from_config(config, Arc::new(TracingTelemetry))
        .context("Failed to set up sync pipeline")?;

    match cli.command {
        Some(Commands::Stats) => {
            let stats = orchestrator.stats().await.context("Failed to read stats")?;
            print_stats(&stats);
        }
        None => {
            let options = RunOptions {
                force_sync: cli.force_sync,
                dry_run: cli.dry_run,
                skip_cleanup: cli.skip_cleanup,
            };
            let report = orchestrator.run(options).await.context("Sync failed")?;
            print_report(&report);
        }
    }

    Ok(())
}

fn init_tracing(config: &SyncConfig, verbose: bool) {
    let default_level = if verbose {
        "debug".to_string()
    } else {
        config.log_level.clone()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn print_report(report: &SyncReport) {
    println!();
    println!("{}", "=== Sync Report ===".bold());
    print_usage("Storage before", &report.usage_before);

    match report.outcome {
        RunOutcome::Skipped => {
            println!("{}", "No changes detected, skipping conversion".yellow());
            return;
        }
        RunOutcome::DryRun => println!("{}", "Dry run: nothing written".cyan()),
        RunOutcome::Completed => {}
    }

    println!();
    println!("Components identified: {}", report.total);
    for component in &report.components {
        println!(
            "  {} {} ({}, confidence {:.2}, {} params)",
            "•".dimmed(),
            component.name,
            component.component_type,
            component.confidence,
            component.parameter_count
        );
    }

    if report.outcome == RunOutcome::Completed {
        println!();
        println!("{} {}", "Succeeded:".green(), report.succeeded);
        if report.failed > 0 {
            println!("{} {}", "Failed:".red(), report.failed);
            for failure in &report.failures {
                println!("  {} {}: {}", "✗".red(), failure.name, failure.reason);
            }
        }
        if report.pruned > 0 {
            println!("Removed {} expired history entries", report.pruned);
        }
    }

    if let Some(usage) = &report.usage_after {
        print_usage("Storage after", usage);
    }

    println!();
    println!("Finished in {:.1}s", report.elapsed.as_secs_f64());
}

fn print_stats(stats: &StatsReport) {
    println!();
    println!("{}", "=== Fingerprint History ===".bold());
    println!("Total captures:    {}", stats.statistics.total);
    println!("Unique versions:   {}", stats.statistics.unique);
    println!("Duplicates:        {}", stats.statistics.duplicates);
    println!(
        "Most recent change: {}",
        stats
            .statistics
            .most_recent_change
            .as_deref()
            .unwrap_or("none")
    );

    if !stats.recent.is_empty() {
        println!();
        for entry in &stats.recent {
            println!(
                "  {:<20} {}",
                entry.label,
                short_fingerprint(&entry.fingerprint).dimmed()
            );
        }
    }

    print_usage("Storage", &stats.usage);
}

fn print_usage(title: &str, usage: &StorageUsage) {
    println!();
    println!("{}", title.bold());
    println!("  Current:   {}", format_bytes(usage.current));
    println!("  History:   {}", format_bytes(usage.history));
    println!("  Processed: {}", format_bytes(usage.processed));
    println!("  Total:     {}", format_bytes(usage.total));
}
