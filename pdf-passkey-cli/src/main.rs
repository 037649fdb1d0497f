use anyhow::{bail, Context, Result};
use clap::Parser;
use pdf_passkey::batch::DEFAULT_OUTPUT_DIR;
use pdf_passkey::{
    load_mapping, BatchOptions, BatchProcessor, BatchSummary, EntryReport, StandardEncryptor,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status for problems that stop the run before any file is processed
const FATAL_EXIT_CODE: u8 = 2;

#[derive(Parser)]
#[command(
    name = "pdfpasskey",
    about = "Password-protect the PDFs in the current directory using a spreadsheet of filenames and passwords",
    version,
    author
)]
struct Cli {
    /// Spreadsheet with one (filename, password) pair per row
    #[arg(long)]
    excel: PathBuf,

    /// Sheet to read (defaults to the first sheet)
    #[arg(long)]
    sheet: Option<String>,

    /// Directory for the encrypted copies, relative to the current directory
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    outdir: PathBuf,

    /// Overwrite the original files instead of writing to --outdir
    #[arg(long)]
    inplace: bool,

    /// Owner password for every file (defaults to each file's own password)
    #[arg(long)]
    owner: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(summary) => {
            println!();
            print!("{summary}");
            ExitCode::from(summary.exit_code())
        }
        Err(e) => {
            eprintln!("[ERROR] {e:#}");
            ExitCode::from(FATAL_EXIT_CODE)
        }
    }
}

fn run(cli: &Cli) -> Result<BatchSummary> {
    let mapping = load_mapping(&cli.excel, cli.sheet.as_deref())
        .with_context(|| format!("could not load {}", cli.excel.display()))?;
    if mapping.is_empty() {
        bail!(
            "no valid (filename, password) rows in {}",
            cli.excel.display()
        );
    }
    debug!(entries = mapping.len(), "Loaded password mapping");

    let working_dir = std::env::current_dir().context("could not determine current directory")?;
    let mut options = BatchOptions::new(working_dir).with_owner_password(cli.owner.clone());
    options = if cli.inplace {
        options.in_place()
    } else {
        options.with_output_dir(&cli.outdir)
    };

    let processor = BatchProcessor::new(options, StandardEncryptor);
    let summary = processor
        .execute(&mapping, |report: &EntryReport| {
            if report.outcome.is_failed() {
                eprintln!("{report}");
            } else {
                println!("{report}");
            }
        })
        .context("could not prepare output directory")?;

    Ok(summary)
}
