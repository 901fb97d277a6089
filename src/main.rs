use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pcl_lab::{
    load_passwords, load_records, save_records, write_report_csv, CheckerResults, Filter, Query,
    RandomSource, Report, Transformation,
};

#[derive(Parser)]
#[command(name = "pcl-lab", version, about = "Mutate passwords and analyze checker verdicts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply a rule pipeline to a password list
    Mutate {
        /// Password list (.csv with password[,entropy], or one per line)
        passwords: PathBuf,

        /// JSON array of rules
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Output records JSON
        #[arg(short, long, default_value = "records.json")]
        output: PathBuf,

        /// Seed for reproducible mutations
        #[arg(long, env = "PCL_LAB_SEED")]
        seed: Option<u64>,
    },

    /// Attach one checker's verdicts to saved records
    Ingest {
        records: PathBuf,

        /// Checker name the verdicts are stored under
        #[arg(short, long)]
        checker: String,

        /// CSV with password,reason,score
        #[arg(short, long)]
        results: PathBuf,
    },

    /// Filter saved records and summarize checker verdicts
    Query {
        records: PathBuf,

        /// JSON array of filters
        #[arg(short, long)]
        filters: Option<PathBuf>,

        /// Write the filtered records here
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write the summary table as CSV here
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    match Cli::parse().command {
        Command::Mutate {
            passwords,
            rules,
            output,
            seed,
        } => run_mutate(passwords, rules, output, seed),
        Command::Ingest {
            records,
            checker,
            results,
        } => run_ingest(records, checker, results),
        Command::Query {
            records,
            filters,
            output,
            report,
        } => run_query(records, filters, output, report),
    }
}

fn run_mutate(
    passwords: PathBuf,
    rules: Option<PathBuf>,
    output: PathBuf,
    seed: Option<u64>,
) -> Result<()> {
    let raw = load_passwords(&passwords)?;
    let pipeline = match rules {
        Some(path) => Transformation::from_file(path)?,
        None => Transformation::new(),
    };

    let records = match seed {
        Some(seed) => pipeline.apply_to_passwords(raw, &mut RandomSource::seeded(seed)),
        None => pipeline.apply_to_passwords(raw, &mut RandomSource::from_entropy()),
    };

    let errors = records.iter().filter(|r| !r.rule_errors.is_empty()).count();
    save_records(&output, &records)?;

    println!(
        "✓ Mutated {} passwords with {} rules ({} records with rule errors)",
        records.len(),
        pipeline.rule_count(),
        errors
    );
    println!("✓ Records written to {}", output.display());

    Ok(())
}

fn run_ingest(records_path: PathBuf, checker: String, results: PathBuf) -> Result<()> {
    let mut records = load_records(&records_path)?;
    let results = CheckerResults::from_csv(checker, &results)?;

    let summary = results.attach(&mut records);
    save_records(&records_path, &records)?;

    println!(
        "✓ {}: attached {} verdicts, {} records unmatched",
        results.checker, summary.attached, summary.unmatched
    );

    Ok(())
}

fn run_query(
    records_path: PathBuf,
    filters: Option<PathBuf>,
    output: Option<PathBuf>,
    report_path: Option<PathBuf>,
) -> Result<()> {
    let records = load_records(&records_path)?;
    let total = records.len();

    let mut query = Query::new(records);
    if let Some(path) = filters {
        query.set_chain(Filter::load_chain(path)?);
    }
    query.apply_filter();

    let report = Report::build(query.records());

    println!("📊 {} of {} records after filtering", query.len(), total);
    println!("   Mean entropy change: {:.2}", report.mean_entropy_change);
    for summary in &report.checkers {
        println!("   {}", summary.summary());
        for share in summary.reasons.iter().take(5) {
            println!("      {:>6.2}%  {}", share.percentage, share.reason);
        }
    }

    if let Some(path) = output {
        save_records(&path, query.records())?;
        println!("✓ Filtered records written to {}", path.display());
    }

    if let Some(path) = report_path {
        write_report_csv(&path, &report)?;
        println!("✓ Report written to {}", path.display());
    }

    Ok(())
}
