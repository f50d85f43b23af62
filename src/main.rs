//! curation-audit: audit curated genome annotations
//!
//! Usage: curation-audit <COMMAND> [OPTIONS]

use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use std::path::PathBuf;
use std::process;

use curation_audit::commands::{ErrorsCommand, SummaryCommand};
use curation_audit::config::{AuditConfig, ReportConfig, DEFAULT_GENETIC_CODE, DEFAULT_MODERATOR};
use curation_audit::organism::OrganismLookup;
use curation_audit::report::NO_ERRORS;
use curation_audit::Result;

#[derive(Parser)]
#[command(name = "curation-audit")]
#[command(version)]
#[command(about = "Structural and coding-sequence audit of curated genome annotations", long_about = None)]
struct Cli {
    /// Number of threads to use (default: number of CPUs)
    #[arg(long, short = 't', global = true)]
    threads: Option<usize>,

    /// Identity credited with features that carry no owner
    #[arg(long, global = true, default_value = DEFAULT_MODERATOR)]
    moderator: String,

    /// Two-column TSV mapping gene ids to organism names
    #[arg(long, global = true)]
    organisms: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check finished features and coding sequences, write per-curator error reports
    Errors {
        /// Feature listing (GFF3)
        #[arg(short, long)]
        gff: PathBuf,

        /// Coding sequences keyed by transcript id (FASTA, optionally gzipped)
        #[arg(short, long)]
        fasta: Option<PathBuf>,

        /// Directory receiving the report files
        #[arg(short, long)]
        out_dir: PathBuf,

        /// NCBI translation table used for codon checks
        #[arg(long, default_value_t = DEFAULT_GENETIC_CODE)]
        genetic_code: u32,

        /// Text appended to every error report
        #[arg(long)]
        error_footer: Option<PathBuf>,

        /// Also export findings and summaries as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Write per-curator production summaries and unfinished gene lists
    Summary {
        /// Feature listing (GFF3)
        #[arg(short, long)]
        gff: PathBuf,

        /// Directory receiving the report files
        #[arg(short, long)]
        out_dir: PathBuf,

        /// Text appended to every summary
        #[arg(long)]
        summary_footer: Option<PathBuf>,

        /// Also export summaries as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

fn load_organisms(path: Option<PathBuf>) -> Result<OrganismLookup> {
    match path {
        Some(p) => OrganismLookup::from_file(p),
        None => Ok(OrganismLookup::new()),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let workers = match cli.threads {
        Some(n) => {
            if let Err(e) = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build_global()
            {
                eprintln!("Error: failed to initialize thread pool: {}", e);
                process::exit(1);
            }
            n
        }
        None => rayon::current_num_threads(),
    };
    let config = AuditConfig::new()
        .with_moderator(cli.moderator)
        .with_workers(workers);

    let result = match cli.command {
        Commands::Errors {
            gff,
            fasta,
            out_dir,
            genetic_code,
            error_footer,
            json,
        } => run_errors(
            config.with_genetic_code(genetic_code),
            cli.organisms,
            gff,
            fasta,
            out_dir,
            error_footer,
            json,
        ),

        Commands::Summary {
            gff,
            out_dir,
            summary_footer,
            json,
        } => run_summary(config, cli.organisms, gff, out_dir, summary_footer, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_errors(
    config: AuditConfig,
    organisms: Option<PathBuf>,
    gff: PathBuf,
    fasta: Option<PathBuf>,
    out_dir: PathBuf,
    error_footer: Option<PathBuf>,
    json: Option<PathBuf>,
) -> Result<()> {
    let report = ReportConfig::new(out_dir, today()).with_error_footer(error_footer);
    let stats = ErrorsCommand::new(config)
        .with_organisms(load_organisms(organisms)?)
        .with_fasta(fasta)
        .with_json(json)
        .run(gff, report)?;

    if stats.is_clean() {
        println!("{}", NO_ERRORS);
    } else {
        for file in &stats.files {
            println!("{}", file.display());
        }
    }
    info!("{}", stats);
    Ok(())
}

fn run_summary(
    config: AuditConfig,
    organisms: Option<PathBuf>,
    gff: PathBuf,
    out_dir: PathBuf,
    summary_footer: Option<PathBuf>,
    json: Option<PathBuf>,
) -> Result<()> {
    let report = ReportConfig::new(out_dir, today()).with_summary_footer(summary_footer);
    let stats = SummaryCommand::new(config)
        .with_organisms(load_organisms(organisms)?)
        .with_json(json)
        .run(gff, report)?;

    for file in &stats.files {
        println!("{}", file.display());
    }
    info!("{}", stats);
    Ok(())
}
