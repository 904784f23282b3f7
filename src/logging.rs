// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Per-run logging context
//!
//! The binary builds one [`LogContext`] and runs the whole testsuite inside
//! [`LogContext::scope`]; nothing installs a process-wide subscriber.

use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::Dispatch;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Verbosity of the log file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum LogLevel {
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    fn directive(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

pub struct LogContext {
    dispatch: Dispatch,
}

impl LogContext {
    /// Warnings and errors always go to stderr; with `log_file` everything at
    /// `level` (or `TESTSUITE_LOG` if set) is also written to that file.
    pub fn new(log_file: Option<&Path>, level: LogLevel) -> Result<Self> {
        let console = fmt::layer()
            .with_writer(std::io::stderr)
            .without_time()
            .with_target(false)
            .with_filter(LevelFilter::WARN);

        let file = match log_file {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create log file: {:?}", path))?;
                let filter = EnvFilter::try_from_env("TESTSUITE_LOG")
                    .unwrap_or_else(|_| EnvFilter::new(level.directive()));
                Some(
                    fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false)
                        .with_target(false)
                        .with_filter(filter),
                )
            }
            None => None,
        };

        let subscriber = tracing_subscriber::registry().with(file).with(console);
        Ok(Self {
            dispatch: Dispatch::new(subscriber),
        })
    }

    /// Context that discards everything
    pub fn disabled() -> Self {
        Self {
            dispatch: Dispatch::none(),
        }
    }

    /// Run `f` with this context as the current dispatcher
    pub fn scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }
}
