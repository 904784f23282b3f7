// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Suite coordinator - executes selected variations on a bounded worker pool

use dashmap::DashMap;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, error, info};

use super::config::{default_workers, Selection};
use super::error::{ScheduleError, ValidatorError};
use super::types::{
    Outcome, ResultSet, Testcase, Testsuite, Variation, VariationKey, VariationResult,
};
use super::validator::Validator;

/// Executes testsuite variations against a validator
pub struct SuiteCoordinator {
    workers: usize,
    progress: bool,
}

impl SuiteCoordinator {
    /// Create a coordinator with the given pool size (0 means host core count)
    pub fn new(workers: usize) -> Self {
        Self {
            workers: if workers == 0 { default_workers() } else { workers },
            progress: false,
        }
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every selected variation once and collect its result.
    ///
    /// Each variation is an independent task; a failing or panicking validation
    /// only affects its own result. The caller's tracing dispatcher is installed
    /// on every worker thread.
    pub fn execute(
        &self,
        testsuite: &Testsuite,
        selection: &Selection,
        validator: &dyn Validator,
    ) -> Result<ResultSet, ScheduleError> {
        let tasks = select_variations(testsuite, selection);
        info!(
            "Start executing {} variations in {} testcases",
            tasks.len(),
            testsuite.testcases.len()
        );
        let start = Instant::now();

        let pool = self.build_pool()?;
        let results: DashMap<VariationKey, VariationResult> = DashMap::with_capacity(tasks.len());
        let pb = self.progress_bar(tasks.len());

        pool.install(|| {
            tasks.par_iter().for_each(|(key, testcase, variation)| {
                let result = execute_variation(testcase, variation, validator);
                results.insert(key.clone(), result);
                if let Some(ref p) = pb {
                    p.inc(1);
                }
            });
        });

        if let Some(p) = pb {
            p.finish_and_clear();
        }

        let runtime = start.elapsed();
        info!(
            "Finished executing testcase variations in {:.6}s",
            runtime.as_secs_f64()
        );
        Ok(ResultSet::new(results.into_iter().collect(), runtime))
    }

    fn build_pool(&self) -> Result<rayon::ThreadPool, ScheduleError> {
        let dispatch = tracing::dispatcher::get_default(|current| current.clone());
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|index| format!("testsuite-worker-{}", index))
            .spawn_handler(move |thread| {
                let dispatch = dispatch.clone();
                let mut builder = std::thread::Builder::new();
                if let Some(name) = thread.name() {
                    builder = builder.name(name.to_owned());
                }
                if let Some(stack_size) = thread.stack_size() {
                    builder = builder.stack_size(stack_size);
                }
                builder.spawn(move || {
                    tracing::dispatcher::with_default(&dispatch, || thread.run())
                })?;
                Ok(())
            })
            .build()
            .map_err(|source| ScheduleError::Pool {
                workers: self.workers,
                source,
            })
    }

    fn progress_bar(&self, len: usize) -> Option<ProgressBar> {
        if !self.progress {
            return None;
        }
        let p = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        {
            p.set_style(style.progress_chars("#>-"));
        }
        Some(p)
    }
}

impl Default for SuiteCoordinator {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Selected (key, testcase, variation) triples in document order
pub fn select_variations<'a>(
    testsuite: &'a Testsuite,
    selection: &Selection,
) -> Vec<(VariationKey, &'a Testcase, &'a Variation)> {
    testsuite
        .testcases
        .iter()
        .filter(|testcase| selection.matches_testcase(testcase))
        .flat_map(|testcase| {
            testcase
                .keyed_variations()
                .filter(|(_, variation)| selection.matches_variation(variation))
                .map(move |(key, variation)| (key, testcase, variation))
        })
        .collect()
}

/// Validate a single variation and classify the outcome.
///
/// Validator errors and panics are recorded as `EXCEPTION` with an invalid actual outcome.
pub fn execute_variation(
    testcase: &Testcase,
    variation: &Variation,
    validator: &dyn Validator,
) -> VariationResult {
    info!(
        "[{}, {} ({})] Start executing variation",
        testcase.name, variation.name, variation.id
    );

    let outcome = match &variation.data {
        Some(data) => {
            info!(
                "[{}, {} ({})] Validating {} {}",
                testcase.name,
                variation.name,
                variation.id,
                data.kind(),
                data.url()
            );
            catch_unwind(AssertUnwindSafe(|| validator.validate(data.url(), data.mode())))
                .unwrap_or_else(|payload| Err(ValidatorError::Panicked(panic_message(&*payload))))
        }
        None => Err(ValidatorError::MissingEntryPoint),
    };

    let log = match outcome {
        Ok(log) => log,
        Err(e) => {
            error!(
                "[{}, {} ({})] Exception raised during variation execution: {}",
                testcase.name, variation.name, variation.id, e
            );
            return VariationResult::exception();
        }
    };

    if log.has_errors() && tracing::enabled!(tracing::Level::DEBUG) {
        let messages: Vec<_> = log.errors().map(|d| d.message.as_str()).collect();
        debug!(
            "[{}, {} ({})] Error log:\n{}",
            testcase.name,
            variation.name,
            variation.id,
            messages.join("\n")
        );
    }

    let actual = if log.has_errors() {
        Outcome::Invalid
    } else {
        Outcome::Valid
    };
    let result = VariationResult::classify(actual, variation.expected);
    info!(
        "[{}, {} ({})] Finished executing variation: {} ({} == {})",
        testcase.name, variation.name, variation.id, result.status, actual, variation.expected
    );
    result
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
