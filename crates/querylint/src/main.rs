//! Command-line front end: parse the given Python files, run both checkers
//! over each, and print findings as text or JSON. A file that fails to parse
//! is reported and skipped; remaining files are still analyzed.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use querylint_checkers::{FileLinter, Finding};

#[derive(Parser)]
#[command(name = "querylint", version, about = "Django queryset / Celery task misuse linter")]
struct Cli {
    /// Python source files to analyze
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(Outcome { findings: 0, errors: 0 }) => ExitCode::SUCCESS,
        Ok(Outcome { findings: 0, .. }) => ExitCode::from(2),
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("{}: {err:#}", "querylint".red().bold());
            ExitCode::from(2)
        }
    }
}

struct Outcome {
    findings: usize,
    errors: usize,
}

fn run(cli: &Cli) -> Result<Outcome> {
    tracing::debug!(files = cli.files.len(), "starting analysis");
    let mut ctx = querylint_core::install();
    let mut reports: Vec<(PathBuf, Vec<Finding>)> = Vec::new();
    let mut errors = 0usize;

    for path in &cli.files {
        let source = match std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))
        {
            Ok(source) => source,
            Err(err) => {
                eprintln!("{}: {err:#}", "querylint".red().bold());
                errors += 1;
                continue;
            }
        };
        let module_name = module_name_for(path);
        match FileLinter::new(&mut ctx).lint_source(&source, &module_name) {
            Ok(findings) => reports.push((path.clone(), findings)),
            Err(err) => {
                eprintln!("{}: {}: {err}", "querylint".red().bold(), path.display());
                errors += 1;
            }
        }
    }

    let total: usize = reports.iter().map(|(_, f)| f.len()).sum();
    match cli.format {
        OutputFormat::Text => print_text(&reports),
        OutputFormat::Json => print_json(&reports)?,
    }

    Ok(Outcome {
        findings: total,
        errors,
    })
}

fn module_name_for(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "module".to_string())
}

fn print_text(reports: &[(PathBuf, Vec<Finding>)]) {
    let mut total = 0usize;
    for (path, findings) in reports {
        for finding in findings {
            total += 1;
            println!(
                "{}:{}:{}: {} {} [{}]",
                path.display(),
                finding.location.line,
                finding.location.column,
                finding.code.as_str().red().bold(),
                finding.short_message,
                finding.code.message_id().dimmed(),
            );
        }
    }
    if total == 0 {
        println!("{}", "no issues found".green());
    } else {
        println!(
            "{}",
            format!("{total} issue{} found", if total == 1 { "" } else { "s" })
                .red()
                .bold()
        );
    }
}

fn print_json(reports: &[(PathBuf, Vec<Finding>)]) -> Result<()> {
    let mut entries = Vec::new();
    for (path, findings) in reports {
        for finding in findings {
            let mut value = serde_json::to_value(finding)?;
            value["file"] = serde_json::Value::String(path.display().to_string());
            entries.push(value);
        }
    }
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}
