//! Command-line entry point.
//!
//! With no arguments the converter reads `references/ar_m3.xls` and writes
//! `data/arabic_from_csv.csv`, the paths the word list has always lived at:
//!
//! ```bash
//! kelly-xls
//! kelly-xls convert --encoding cp1256 --output /tmp/arabic.csv
//! kelly-xls inspect --rows 5
//! ```

use std::error::Error as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kelly_xls::config::{self, DEFAULT_ENCODING, DEFAULT_INPUT, DEFAULT_OUTPUT};
use kelly_xls::ole::xls::XlsWorkbook;
use kelly_xls::{Config, Error, Result, inspect, pipeline};

#[derive(Parser)]
#[command(
    name = "kelly-xls",
    version,
    about = "Convert the Kelly Arabic word list from .xls to CSV"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Convert the first sheet to CSV (the default)
    Convert(ConvertArgs),
    /// Print the sheet's dimensions, header and first rows
    Inspect {
        #[arg(short, long, default_value = DEFAULT_INPUT)]
        input: PathBuf,

        /// Legacy encoding for 8-bit strings (cp1252, windows-1256, ...)
        #[arg(short, long, default_value = DEFAULT_ENCODING)]
        encoding: String,

        /// Number of data rows to show
        #[arg(short, long, default_value_t = 10)]
        rows: usize,
    },
}

#[derive(Args)]
struct ConvertArgs {
    #[arg(short, long, default_value = DEFAULT_INPUT)]
    input: PathBuf,

    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Legacy encoding for 8-bit strings (cp1252, windows-1256, ...)
    #[arg(short, long, default_value = DEFAULT_ENCODING)]
    encoding: String,
}

impl Default for ConvertArgs {
    fn default() -> Self {
        ConvertArgs {
            input: PathBuf::from(DEFAULT_INPUT),
            output: PathBuf::from(DEFAULT_OUTPUT),
            encoding: DEFAULT_ENCODING.to_string(),
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_convert(args: ConvertArgs) -> Result<()> {
    let config = Config::new(args.input, args.output, &args.encoding)?;
    let summary = pipeline::run(&config)?;

    println!("Rows: {}, Cols: {}", summary.rows, summary.columns);
    println!("Written {}", summary.output.display());
    println!("File size: {} bytes", summary.bytes);
    println!(
        "Records: {} kept, {} blank rows and {} rows without a word skipped",
        summary.kept, summary.blank, summary.missing_word
    );
    Ok(())
}

fn run_inspect(input: PathBuf, encoding: &str, rows: usize) -> Result<()> {
    let workbook = XlsWorkbook::open(&input, config::resolve_encoding(encoding)?)?;
    let sheet = workbook
        .worksheet(0)
        .map_err(|source| Error::Format { path: input, source })?;
    print!("{}", inspect::describe(&sheet, rows));
    Ok(())
}

fn report(err: &Error) {
    eprintln!("error: {err}");
    // Lower layers already fold their own causes into their messages
    if let Some(cause) = err.source() {
        eprintln!("  caused by: {cause}");
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        None => run_convert(ConvertArgs::default()),
        Some(Command::Convert(args)) => run_convert(args),
        Some(Command::Inspect {
            input,
            encoding,
            rows,
        }) => run_inspect(input, &encoding, rows),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::from(err.exit_code())
        },
    }
}
