// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Conformance testsuite loading, execution and reporting

pub mod config;
pub mod coordinator;
pub mod document;
pub mod error;
pub mod loader;
pub mod reporter;
pub mod types;
pub mod validator;

pub use config::{RunConfig, Selection, ValidatorConfig, ValidatorKind};
pub use coordinator::{execute_variation, select_variations, SuiteCoordinator};
pub use document::{Element, Node, XmlDocument};
pub use error::{LoadError, ReportError, ScheduleError, ValidatorError};
pub use loader::{load_testcase, load_testsuite, resolve_location};
pub use reporter::{relativize, ReportWriter};
pub use types::{
    Outcome, ResultSet, RunSummary, Status, Testcase, Testsuite, Variation, VariationData,
    VariationKey, VariationResult,
};
pub use validator::{
    CommandValidator, Diagnostic, ErrorLog, Severity, ValidationMode, Validator,
    WellFormedValidator,
};
