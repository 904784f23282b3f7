// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Conformance testsuite runner
//!
//! Loads a testsuite index with its testcase documents, runs every variation
//! against a validation processor on a worker pool and reports conformance as
//! console summary, CSV or XML.

pub mod logging;
pub mod suite;

pub use logging::{LogContext, LogLevel};
pub use suite::{
    load_testsuite, ReportWriter, ResultSet, RunConfig, RunSummary, Selection, SuiteCoordinator,
    Testsuite, Validator,
};

use anyhow::{anyhow, Context, Result};
use tracing::{error, info};

/// Everything produced by a completed run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub testsuite: Testsuite,
    pub results: ResultSet,
    pub summary: RunSummary,
}

/// Load the testsuite at `index`, execute the selected variations and write the
/// configured reports.
///
/// Loading failures abort before anything is executed. Report files are
/// written independently; if any of them fails the error lists every failed
/// report after the others have been written.
pub fn run(
    index: &str,
    config: &RunConfig,
    selection: &Selection,
    validator: &dyn Validator,
) -> Result<RunOutcome> {
    let index_uri = suite::resolve_location(index)?;
    let testsuite = load_testsuite(&index_uri)
        .with_context(|| format!("Failed to load testsuite {}", index_uri))?;

    let coordinator = SuiteCoordinator::new(config.worker_count()).with_progress(config.progress);
    let results = coordinator.execute(&testsuite, selection, validator)?;
    let summary = RunSummary::summarize(&results);

    info!("Start generating testsuite report");
    let processor = config
        .processor
        .clone()
        .unwrap_or_else(|| validator.name().to_string());
    let writer = ReportWriter::new(&testsuite, &results, summary)
        .relative_uris(config.relative_uris)
        .processor(processor);

    let mut failures = Vec::new();
    if let Some(path) = &config.csv_report {
        if let Err(e) = writer.write_csv(path) {
            error!("{:#}", anyhow!(e));
            failures.push(path.display().to_string());
        }
    }
    if let Some(path) = &config.xml_report {
        if let Err(e) = writer.write_xml(path) {
            error!("{:#}", anyhow!(e));
            failures.push(path.display().to_string());
        }
    }
    if config.wants_console() {
        writer.print_console();
    }
    info!("Finished generating testsuite report");

    if !failures.is_empty() {
        return Err(anyhow!("Failed to write reports: {}", failures.join(", ")));
    }

    Ok(RunOutcome {
        testsuite,
        results,
        summary,
    })
}
