use anyhow::Context;
use clap::Parser;
use compute::PurchaseOrders;
use date::DateNormalizer;
use logging::{init_logging, LogConfig};
use read::read_rows;
use std::{
    fs::File,
    path::{Path, PathBuf},
    process::ExitCode,
};
use tracing::info;
use write::write_iif;

mod compute;
mod data;
mod date;
mod logging;
mod read;
mod write;

const USAGE: &str = "Usage: csv2iif input.csv output.iif";

/// Convert a purchase-order CSV export into an IIF file.
///
/// Exactly two arguments, both taken as paths: no flags, no `--`.
#[derive(Parser, Debug)]
#[command(disable_help_flag = true, disable_version_flag = true)]
struct Cli {
    /// CSV file, one purchase-order line per row.
    #[arg(allow_hyphen_values = true)]
    input: PathBuf,
    /// IIF file to write; replaced if it exists.
    #[arg(allow_hyphen_values = true)]
    output: PathBuf,
}

impl Cli {
    fn parse_exact() -> Option<Self> {
        // clap would swallow a `--` separator, so count the raw arguments first
        if std::env::args_os().len() != 3 {
            return None;
        }
        Self::try_parse().ok()
    }
}

fn main() -> ExitCode {
    if let Err(error) = init_logging(&LogConfig::from_env()) {
        eprintln!("error: failed to initialize logging: {error}");
    }
    let Some(cli) = Cli::parse_exact() else {
        println!("{USAGE}");
        return ExitCode::FAILURE;
    };
    match convert(&cli.input, &cli.output) {
        Ok(()) => {
            println!(
                "Successfully converted {} to {}",
                cli.input.display(),
                cli.output.display()
            );
            ExitCode::SUCCESS
        }
        Err(error) => {
            println!("Error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

/// All of the input is consumed before the output file is even created, so a
/// bad input never leaves a truncated IIF file behind.
fn convert(input: &Path, output: &Path) -> anyhow::Result<()> {
    let mut orders = PurchaseOrders::new(DateNormalizer::new());
    let file = File::open(input).with_context(|| format!("cannot open {}", input.display()))?;
    read_rows(file, &mut orders).with_context(|| format!("cannot read {}", input.display()))?;
    info!(
        orders = orders.orders().len(),
        dropped = orders.dropped(),
        "grouped purchase orders"
    );

    let file =
        File::create(output).with_context(|| format!("cannot create {}", output.display()))?;
    write_iif(file, orders.orders())
        .with_context(|| format!("cannot write {}", output.display()))?;
    Ok(())
}
