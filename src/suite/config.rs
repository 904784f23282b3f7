// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Run configuration and variation selection

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::types::{Testcase, Variation};
use super::validator::{CommandValidator, Validator, WellFormedValidator};

/// Default config file picked up from the working directory
pub const DEFAULT_CONFIG_FILE: &str = "testsuite.toml";

/// Which validation processor to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidatorKind {
    WellFormed,
    Command,
}

/// Validation processor settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub kind: ValidatorKind,
    /// Program to execute for `command` validators
    pub program: Option<String>,
    /// Arguments placed before the mode and URL
    pub args: Vec<String>,
    /// Extra flag for processors that only report inconsistencies when asked.
    /// Warning output counts as an error either way.
    pub strict_flag: Option<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            kind: ValidatorKind::WellFormed,
            program: None,
            args: Vec::new(),
            strict_flag: None,
        }
    }
}

impl ValidatorConfig {
    pub fn build(&self) -> Result<Box<dyn Validator>> {
        match self.kind {
            ValidatorKind::WellFormed => Ok(Box::new(WellFormedValidator)),
            ValidatorKind::Command => {
                let Some(program) = &self.program else {
                    bail!("command validator requires a program");
                };
                Ok(Box::new(
                    CommandValidator::new(program.clone())
                        .with_args(self.args.clone())
                        .with_strict_flag(self.strict_flag.clone()),
                ))
            }
        }
    }
}

/// Testsuite run configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Worker pool size, host core count when unset
    pub workers: Option<usize>,
    /// Write CSV report to this file
    pub csv_report: Option<PathBuf>,
    /// Write XML report to this file
    pub xml_report: Option<PathBuf>,
    /// Write testcase and data URIs relative to the index directory
    pub relative_uris: bool,
    /// Show a progress bar while variations execute
    pub progress: bool,
    /// Processor name for the XML report, defaults to the validator name
    pub processor: Option<String>,
    /// Exit with a non-zero status on aborted runs or failed variations
    pub exit_code: bool,
    pub validator: ValidatorConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: None, // Auto-detect
            csv_report: None,
            xml_report: None,
            relative_uris: false,
            progress: false,
            processor: None,
            exit_code: false,
            validator: ValidatorConfig::default(),
        }
    }
}

impl RunConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: RunConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    ///
    /// An explicit `path` must exist; otherwise `testsuite.toml` is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => Self::default(),
        };

        if let Ok(workers) = std::env::var("TESTSUITE_WORKERS") {
            config.workers = workers.parse().ok().filter(|n| *n > 0);
        }

        if let Ok(program) = std::env::var("TESTSUITE_VALIDATOR") {
            config.validator.kind = ValidatorKind::Command;
            config.validator.program = Some(program);
        }

        if let Ok(processor) = std::env::var("TESTSUITE_PROCESSOR") {
            config.processor = Some(processor);
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Effective worker pool size
    pub fn worker_count(&self) -> usize {
        self.workers.filter(|n| *n > 0).unwrap_or_else(default_workers)
    }

    /// Console summary is printed when no report file is requested
    pub fn wants_console(&self) -> bool {
        self.csv_report.is_none() && self.xml_report.is_none()
    }
}

/// Host core count
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Restricts a run to some testcases and/or variation ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub testcases: HashSet<String>,
    pub variations: HashSet<String>,
}

impl Selection {
    pub fn new<T, V>(testcases: T, variations: V) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        Self {
            testcases: testcases.into_iter().map(Into::into).collect(),
            variations: variations.into_iter().map(Into::into).collect(),
        }
    }

    /// Testcases match by number or exact name
    pub fn matches_testcase(&self, testcase: &Testcase) -> bool {
        self.testcases.is_empty()
            || self.testcases.contains(&testcase.number)
            || self.testcases.contains(&testcase.name)
    }

    pub fn matches_variation(&self, variation: &Variation) -> bool {
        self.variations.is_empty() || self.variations.contains(&variation.id)
    }

    pub fn is_empty(&self) -> bool {
        self.testcases.is_empty() && self.variations.is_empty()
    }
}
