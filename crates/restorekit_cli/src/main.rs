//! `restorekit` command: restore a working copy from its backup directory.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use restorekit_io_fs::{EnumRestoreStep, ReportRestore, SpecRestorePlan, restore};

/// Restore documentation, sources, data and manifests from a backup copy.
#[derive(Parser, Debug)]
#[command(name = "restorekit", version)]
struct Cli {
    /// Backup directory to read from.
    #[arg(short, long, env = "RESTOREKIT_SOURCE")]
    source: PathBuf,

    /// Working copy to restore into. Created if missing.
    #[arg(short, long, env = "RESTOREKIT_DESTINATION")]
    destination: PathBuf,

    /// Log level for stderr diagnostics (`RUST_LOG` takes precedence).
    #[arg(long, default_value = restorekit_log::DEFAULT_LOG_LEVEL)]
    log_level: String,
}

fn step_icon(step: EnumRestoreStep) -> &'static str {
    match step {
        EnumRestoreStep::TopLevelFiles => "📝",
        EnumRestoreStep::MirrorSrc => "📁",
        EnumRestoreStep::MergeDataScripts => "📁",
        EnumRestoreStep::MergeGithub => "⚙️",
        EnumRestoreStep::AudioFixture => "🎵",
        EnumRestoreStep::PackageManifests => "📦",
    }
}

fn print_summary(report: &ReportRestore) {
    println!("✅ Restoration complete!");
    println!("   {report}");
    println!("\n📌 Next steps:");
    println!("   1. Stage all changes: git add .");
    println!("   2. Commit: git commit -m 'feat: restore code from backup'");
    println!("   3. Push: git push origin main");
}

fn run(cli: Cli) -> Result<()> {
    println!(
        "🔧 Restoring {} from {}...",
        cli.destination.display(),
        cli.source.display()
    );

    let mut print_step = |step: EnumRestoreStep| println!("{} {step}...", step_icon(step));
    let report = restore(
        &cli.source,
        &cli.destination,
        &SpecRestorePlan::default(),
        &mut print_step,
    )
    .with_context(|| {
        format!(
            "failed to restore {} from {}",
            cli.destination.display(),
            cli.source.display()
        )
    })?;

    print_summary(&report);
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    restorekit_log::init_logging(Some(&cli.log_level));
    tracing::debug!(?cli, "parsed arguments");

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
