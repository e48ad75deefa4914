use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use imehistory::config::{resolve_input_path, resolve_time_zone, OutputFormat, ReportOptions};
use imehistory::processor::{process_path, SourceReport};
use imehistory::report::{render_failure, render_json, render_text, summarize_sources};
use imehistory::Result;

/// Dump the conversion history kept by the Japanese IME (JpnIHDS.dat).
#[derive(Parser)]
#[command(name = "imehistory")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// History file or ZIP archive; defaults to
    /// %APPDATA%\Microsoft\InputMethod\Shared\JpnIHDS.dat
    path: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Show timestamps in UTC instead of the system time zone
    #[arg(long)]
    utc: bool,

    /// Show timestamps in this IANA time zone
    #[arg(long, conflicts_with = "utc")]
    tz: Option<String>,

    /// Print nothing from a file that fails to decode completely
    #[arg(long)]
    strict: bool,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print a per-file summary to stderr
    #[arg(short, long)]
    summary: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(cli.verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match run(&cli) {
        Ok(reports) => {
            let mut failed = false;
            for report in reports.iter() {
                if let Some(fault) = &report.fault {
                    failed = true;
                    eprintln!(
                        "{}",
                        render_failure(Some(&report.name), &fault.error, fault.context.as_deref())
                    );
                }
            }
            if failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("{}", render_failure(None, &e, None));
            ExitCode::FAILURE
        }
    }
}

/// Log level used when `RUST_LOG` is not set.
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

fn run(cli: &Cli) -> Result<Vec<SourceReport>> {
    let options = ReportOptions {
        format: cli.format,
        time_zone: resolve_time_zone(cli.utc, cli.tz.as_deref())?,
        strict: cli.strict,
    };

    let path = resolve_input_path(cli.path.as_deref())?;
    let reports = process_path(&path)?;

    let rendered = match options.format {
        OutputFormat::Text => render_text(&reports, &options),
        OutputFormat::Json => render_json(&reports, &options)?,
    };

    match &cli.output {
        Some(out_path) => fs::write(out_path, rendered.as_bytes())?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
        }
    }

    if cli.summary {
        eprint!("{}", summarize_sources(&reports));
    }

    Ok(reports)
}
