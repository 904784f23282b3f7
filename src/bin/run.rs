// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Conformance testsuite runner CLI

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use testsuite_runner::suite::ValidatorKind;
use testsuite_runner::{LogContext, LogLevel, RunConfig, Selection};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "testsuite-runner")]
#[command(about = "Execute a conformance testsuite against a validation processor", long_about = None)]
struct Cli {
    /// Main testsuite index file
    #[arg(value_name = "INDEX")]
    index: String,

    /// Log output file
    #[arg(short, long = "log", value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Log level of the log file
    #[arg(long, value_enum, ignore_case = true, default_value = "INFO")]
    log_level: LogLevel,

    /// Write testsuite results to csv
    #[arg(long = "csv-report", value_name = "CSV_FILE")]
    csv_file: Option<PathBuf>,

    /// Write testsuite results to xml
    #[arg(long = "xml-report", value_name = "XML_FILE")]
    xml_file: Option<PathBuf>,

    /// Write testcase uris relative to testsuite index file
    #[arg(long)]
    relative_uris: bool,

    /// Limit execution to only these testcase numbers
    #[arg(short = 't', long = "testcase", value_name = "TESTCASE_NUMBER", num_args = 0..)]
    testcase_numbers: Vec<String>,

    /// Limit execution to only these variation ids
    #[arg(short = 'v', long = "variation", value_name = "VARIATION_ID", num_args = 0..)]
    variation_ids: Vec<String>,

    /// Limit number of workers (default: host core count)
    #[arg(short, long, value_name = "MAX_WORKERS")]
    workers: Option<usize>,

    /// Configuration file (default: testsuite.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// External validation processor to run for each variation
    #[arg(long, value_name = "PROGRAM")]
    validator_command: Option<String>,

    /// Show a progress bar
    #[arg(long)]
    progress: bool,

    /// Exit with status 2 on aborted runs and 1 on failed variations
    #[arg(long)]
    exit_code: bool,
}

impl Cli {
    fn run_config(&self) -> Result<RunConfig> {
        let mut config = RunConfig::load(self.config.as_deref())?;
        if self.workers.is_some() {
            config.workers = self.workers;
        }
        if self.csv_file.is_some() {
            config.csv_report = self.csv_file.clone();
        }
        if self.xml_file.is_some() {
            config.xml_report = self.xml_file.clone();
        }
        if let Some(program) = &self.validator_command {
            config.validator.kind = ValidatorKind::Command;
            config.validator.program = Some(program.clone());
        }
        config.relative_uris |= self.relative_uris;
        config.progress |= self.progress;
        config.exit_code |= self.exit_code;
        Ok(config)
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let start = Instant::now();

    let context = LogContext::new(cli.log_file.as_deref(), cli.log_level)?;
    let code = context.scope(|| {
        let code = run_testsuite(&cli);
        info!(
            "Finished testsuite run in {:.6}s",
            start.elapsed().as_secs_f64()
        );
        code
    });

    Ok(code)
}

fn run_testsuite(cli: &Cli) -> ExitCode {
    let config = match cli.run_config() {
        Ok(config) => config,
        Err(e) => return aborted(e, cli.exit_code),
    };

    let selection = Selection::new(cli.testcase_numbers.clone(), cli.variation_ids.clone());
    let outcome = config.validator.build().and_then(|validator| {
        testsuite_runner::run(&cli.index, &config, &selection, validator.as_ref())
    });

    match outcome {
        Ok(outcome) if config.exit_code && outcome.summary.has_failures() => ExitCode::from(1),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => aborted(e, config.exit_code),
    }
}

fn aborted(e: anyhow::Error, exit_code: bool) -> ExitCode {
    error!("Testsuite run aborted with exception: {:#}", e);
    if exit_code {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}
