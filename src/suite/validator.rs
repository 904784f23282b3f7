// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Validation processors that variations are executed against

use std::fmt;
use std::process::Command;
use url::Url;

use super::document::XmlDocument;
use super::error::{LoadError, ValidatorError};

/// What kind of document a variation entry point is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationMode {
    Instance,
    Taxonomy,
}

impl ValidationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationMode::Instance => "instance",
            ValidationMode::Taxonomy => "taxonomy",
        }
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// Diagnostics produced by one validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorLog {
    diagnostics: Vec<Diagnostic>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, severity: Severity, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            message: message.into(),
        });
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Severity::Error, message);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// External validation capability.
///
/// Implementations must treat inconsistencies as errors: anything that would
/// make a document non-conformant has to show up as an error diagnostic.
pub trait Validator: Send + Sync {
    /// Processor name written into reports
    fn name(&self) -> &str;

    fn validate(&self, url: &Url, mode: ValidationMode) -> Result<ErrorLog, ValidatorError>;
}

/// Runs an external processor once per variation
///
/// The command line is `<program> <args...> [strict_flag] <mode> <url>`. A
/// non-zero exit status or any output line starting with `error`, `warning` or
/// `inconsistency` counts as an error diagnostic, so processors that only
/// report inconsistencies as warnings still fail the variation. The optional
/// strict flag is passed through for processors that need it to report them
/// at all.
#[derive(Debug, Clone)]
pub struct CommandValidator {
    program: String,
    args: Vec<String>,
    strict_flag: Option<String>,
}

impl CommandValidator {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            strict_flag: None,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_strict_flag(mut self, flag: Option<String>) -> Self {
        self.strict_flag = flag;
        self
    }

    fn build_command(&self, url: &Url, mode: ValidationMode) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(flag) = &self.strict_flag {
            command.arg(flag);
        }
        command.arg(mode.as_str()).arg(url.as_str());
        command
    }
}

impl Validator for CommandValidator {
    fn name(&self) -> &str {
        &self.program
    }

    fn validate(&self, url: &Url, mode: ValidationMode) -> Result<ErrorLog, ValidatorError> {
        let output = self
            .build_command(url, mode)
            .output()
            .map_err(|source| ValidatorError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let mut log = ErrorLog::new();
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stdout.lines().chain(stderr.lines()) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            log.push(line_severity(line), line);
        }

        if !output.status.success() && !log.has_errors() {
            log.error(format!("{} exited with {}", self.program, output.status));
        }
        Ok(log)
    }
}

/// Severity of one processor output line with warnings treated as errors
fn line_severity(line: &str) -> Severity {
    let lower = line.to_lowercase();
    if ["error", "warning", "inconsisten"]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
    {
        Severity::Error
    } else {
        Severity::Info
    }
}

/// Built-in fallback: checks that the entry point is a well-formed XML document
#[derive(Debug, Clone, Copy, Default)]
pub struct WellFormedValidator;

impl Validator for WellFormedValidator {
    fn name(&self) -> &str {
        "well-formed"
    }

    fn validate(&self, url: &Url, _mode: ValidationMode) -> Result<ErrorLog, ValidatorError> {
        let mut log = ErrorLog::new();
        match XmlDocument::load(url) {
            Ok(_) => {}
            Err(e @ (LoadError::Parse { .. } | LoadError::Malformed { .. })) => {
                log.error(e.to_string());
            }
            Err(e) => {
                return Err(ValidatorError::Access {
                    uri: url.to_string(),
                    reason: e.to_string(),
                })
            }
        }
        Ok(log)
    }
}
