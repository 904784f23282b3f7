// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error taxonomy for testsuite runs

use std::path::PathBuf;
use thiserror::Error;

/// Fatal failure while loading the testsuite index or one of its testcases.
///
/// Any of these aborts the run before a single variation is scheduled.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid testsuite location `{location}`: {reason}")]
    InvalidLocation { location: String, reason: String },

    #[error("unsupported URI scheme `{scheme}` for {uri}")]
    UnsupportedScheme { scheme: String, uri: String },

    #[error("failed to read {uri}")]
    Read {
        uri: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {uri} at byte {position}")]
    Parse {
        uri: String,
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("malformed document {uri}: {reason}")]
    Malformed { uri: String, reason: String },

    #[error("{uri}: <{element}> is missing required attribute `{attribute}`")]
    MissingAttribute {
        uri: String,
        element: String,
        attribute: String,
    },

    #[error("{uri}: cannot resolve `{reference}`: {source}")]
    Resolve {
        uri: String,
        reference: String,
        #[source]
        source: url::ParseError,
    },
}

/// Failure raised by a [`Validator`](super::validator::Validator) for a single
/// variation. Never escapes the scheduler; it turns into an `EXCEPTION` result.
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("failed to launch validation processor `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot access {uri}: {reason}")]
    Access { uri: String, reason: String },

    #[error("variation has no read-me-first entry point")]
    MissingEntryPoint,

    #[error("validator panicked: {0}")]
    Panicked(String),
}

/// Failure while writing a CSV or XML report file.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize XML report: {0}")]
    Xml(String),
}

/// Failure to set up the worker pool.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("failed to build worker pool with {workers} workers")]
    Pool {
        workers: usize,
        #[source]
        source: rayon::ThreadPoolBuildError,
    },
}
