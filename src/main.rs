//! pminmax - process-parallel min/max reduction

use std::io::{IsTerminal, Write};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::{OwoColorize, Stream::Stderr};

use pminmax::cli::Cli;
use pminmax::coordinator::Coordinator;
use pminmax::logging::{self, LogConfig};
use pminmax::output::{self, OutputFormat};
use pminmax::theme;

/// Parse arguments, run the reduction and print the report.
///
/// Argument errors and setup failures exit with status 1. A run that hit
/// its deadline still exits 0 and reports what was collected.
fn main() {
    let program_start = Instant::now();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    if cli.no_color || !std::io::stdout().is_terminal() {
        theme::disable_colors();
    }

    init_logging(&cli);

    if let Err(e) = run(&cli, program_start) {
        eprintln!(
            "{}: {}",
            "error"
                .if_supports_color(Stderr, |text| text.red())
                .if_supports_color(Stderr, |text| text.bold()),
            e
        );
        for cause in e.chain().skip(1) {
            eprintln!(
                "  {}: {}",
                "caused by".if_supports_color(Stderr, |text| text.yellow()),
                cause
            );
        }
        std::process::exit(1);
    }
}

/// CLI flags win over environment variables.
fn init_logging(cli: &Cli) {
    let verbosity = cli.verbosity();
    let mut config = LogConfig::new().with_level(verbosity.level());
    if verbosity.is_explicit() {
        config = config.with_filter(verbosity.level().to_string().to_lowercase());
    }
    config = config.with_env_overrides();
    if let Some(format) = cli.log_format {
        config = config.with_format(format);
    }
    logging::init(config);
}

fn run(cli: &Cli, program_start: Instant) -> Result<()> {
    let format = OutputFormat::from(cli.format);

    let coordinator = Coordinator::with_program_start(cli.to_run_config(), program_start)?;
    let prepared = coordinator
        .prepare()
        .context("failed to prepare the array")?;

    output::print_preparation(&prepared.preparation(), format);
    // Buffered output must be out before the workers are forked.
    std::io::stdout().flush()?;

    let report = prepared.execute().context("failed to run workers")?;
    output::print_report(&report, format).context("failed to print the report")?;
    Ok(())
}
