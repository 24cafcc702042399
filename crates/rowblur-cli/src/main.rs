//! rowblur - distributed row smoothing for 24-bit BMP images
//!
//! Splits the image's rows across `-n` ranks, runs the flattened averaging
//! window on each rank's share of every color plane and writes the gathered
//! result with the input's headers.

use anyhow::{Context, Result};
use clap::Parser;
use rowblur_compute::{JobConfig, smooth_file};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rowblur")]
#[command(author, version, about = "Distributed row smoothing for 24-bit BMP images")]
#[command(long_about = "
Smooths a 24-bit BMP by averaging each byte with its neighbours along the
flattened row-major color plane. The rows are split evenly across a group
of ranks; rows that do not divide evenly are left unfiltered.

Examples:
  rowblur in.bmp out.bmp 2              # one rank, kernel size 2
  rowblur in.bmp out.bmp 4 -n 8         # eight ranks
  ROWBLUR_WORKERS=4 rowblur in.bmp out.bmp 1 -vv
")]
struct Cli {
    /// Input BMP image
    input: PathBuf,

    /// Output BMP image
    output: PathBuf,

    /// Kernel size k; the window spans 2*(k+1)+1 bytes
    kernel_size: u32,

    /// Number of ranks (coordinator included)
    #[arg(short = 'n', long, env = "ROWBLUR_WORKERS", default_value_t = 1)]
    workers: usize,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Write log output to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version are not failures.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    let _guard = match init_logging(cli.verbose, cli.log_file.as_ref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    debug!(?cli, "parsed arguments");
    let config = JobConfig::new(cli.kernel_size, cli.workers).context("Invalid job settings")?;

    smooth_file(&cli.input, &cli.output, &config).with_context(|| {
        format!(
            "Failed to smooth {} into {}",
            cli.input.display(),
            cli.output.display()
        )
    })?;

    info!(output = %cli.output.display(), "done");
    Ok(())
}

fn default_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over `-v`.
///
/// The returned guard flushes the file writer on drop and must outlive
/// every log call.
fn init_logging(verbose: u8, log_file: Option<&PathBuf>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose)));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_thread_names(true);

    match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            builder
                .with_writer(writer)
                .with_ansi(false)
                .try_init()
                .map_err(|e| anyhow::anyhow!("{}", e))
                .context("Failed to install logger")?;
            Ok(Some(guard))
        }
        None => {
            builder
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!("{}", e))
                .context("Failed to install logger")?;
            Ok(None)
        }
    }
}
