//! haml2erb CLI - one-shot HAML to ERB template migration.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use haml2erb_core::{convert_directory, convert_file, find_templates, ConvertOptions, FileConversion};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "haml2erb")]
#[command(version)]
#[command(about = "Convert HAML templates to ERB", long_about = None)]
struct Cli {
    /// Template file or directory to convert
    path: PathBuf,

    /// Validate the produced ERB and report syntax problems
    #[arg(long)]
    check: bool,

    /// Convert without writing any file
    #[arg(long)]
    dry_run: bool,

    /// Delete each original .haml file after successful conversion
    #[arg(long)]
    delete: bool,

    /// Skip the confirmation prompt when deleting originals
    #[arg(long)]
    force: bool,

    /// Print full error chains and backtraces
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.debug {
        std::env::set_var("RUST_BACKTRACE", "full");
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "haml2erb=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let options = ConvertOptions {
        delete_original: cli.delete,
        validate: cli.check,
        dry_run: cli.dry_run,
    };

    let results = if cli.path.is_dir() {
        let templates = find_templates(&cli.path);
        if templates.is_empty() {
            println!("No .haml templates found under {}", cli.path.display());
            return Ok(());
        }
        if !confirm_if_deleting(&cli, templates.len())? {
            println!("Aborted.");
            return Ok(());
        }
        convert_directory(&cli.path, &options)
    } else {
        if !confirm_if_deleting(&cli, 1)? {
            println!("Aborted.");
            return Ok(());
        }
        vec![convert_file(&cli.path, &options)]
    };

    let mut failed = 0usize;
    for result in &results {
        print_result(result);
        if !result.is_success() {
            failed += 1;
        }
    }

    print_summary(&results, failed, cli.dry_run);

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// Deleting originals is irreversible; ask first unless --force (or a dry
/// run, which deletes nothing).
fn confirm_if_deleting(cli: &Cli, count: usize) -> Result<bool> {
    if !cli.delete || cli.force || cli.dry_run {
        return Ok(true);
    }
    print!(
        "Delete {} original .haml file(s) after conversion? [y/N] ",
        count
    );
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn print_result(result: &FileConversion) {
    if result.is_success() {
        let marker = if result.dry_run { "→" } else { "✓" };
        println!("{} {}", marker.green(), result.path.display());
    } else {
        let skipped = if result.skipped { " (skipped)" } else { "" };
        println!("{} {}{}", "✗".red(), result.path.display(), skipped);
        for error in &result.errors {
            match error.line {
                Some(line) => eprintln!("  {} line {}: {}", "✗".red(), line, error.message),
                None => eprintln!("  {} {}", "✗".red(), error.message),
            }
        }
    }
    for warning in &result.warnings {
        match warning.line {
            Some(line) => eprintln!("  {} line {}: {}", "⚠".yellow(), line, warning.message),
            None => eprintln!("  {} {}", "⚠".yellow(), warning.message),
        }
    }
}

fn print_summary(results: &[FileConversion], failed: usize, dry_run: bool) {
    let total = results.len();
    let warnings: usize = results.iter().map(|r| r.warnings.len()).sum();

    println!("\n{}", "=== Summary ===".bold());
    println!("Total files:     {}", total);
    println!(
        "Converted:       {} {}",
        total - failed,
        if failed == 0 { "✓".green() } else { "✓".normal() }
    );
    if failed > 0 {
        println!("Failed:          {} {}", failed, "✗".red());
    }
    if warnings > 0 {
        println!("Warnings:        {} {}", warnings, "⚠".yellow());
    }
    if dry_run {
        println!("\nDry run: no files were written.");
    }
}
