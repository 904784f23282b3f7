// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Console, CSV and XML reports of a testsuite run
//!
//! Every report walks the testsuite in document order and only includes
//! variations that have a result.

use chrono::{DateTime, Local};
use colored::Colorize;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use super::error::ReportError;
use super::types::{
    ResultSet, RunSummary, Status, Testcase, Testsuite, Variation, VariationResult,
};

/// XML namespace of the results document
pub const RESULTS_NAMESPACE: &str = "http://www.altova.com/testsuite/results";

pub const CSV_HEADER: &str =
    "Date,Total,Failed,Conformance,Runtime,Testsuite,Testcase,Variation,ReadMeFirst,Status,Actual,Expected";

/// Renders a finished run
pub struct ReportWriter<'a> {
    testsuite: &'a Testsuite,
    results: &'a ResultSet,
    summary: RunSummary,
    relative_uris: bool,
    processor: String,
    execution_date: DateTime<Local>,
}

impl<'a> ReportWriter<'a> {
    pub fn new(testsuite: &'a Testsuite, results: &'a ResultSet, summary: RunSummary) -> Self {
        Self {
            testsuite,
            results,
            summary,
            relative_uris: false,
            processor: String::new(),
            execution_date: Local::now(),
        }
    }

    pub fn relative_uris(mut self, relative: bool) -> Self {
        self.relative_uris = relative;
        self
    }

    pub fn processor(mut self, processor: impl Into<String>) -> Self {
        self.processor = processor.into();
        self
    }

    pub fn execution_date(mut self, date: DateTime<Local>) -> Self {
        self.execution_date = date;
        self
    }

    /// Directory of the index document, without trailing slash
    fn index_dir(&self) -> &str {
        let uri = self.testsuite.uri.as_str();
        uri.rsplit_once('/').map(|(dir, _)| dir).unwrap_or(uri)
    }

    fn index_file(&self) -> &str {
        let uri = self.testsuite.uri.as_str();
        uri.rsplit_once('/').map(|(_, file)| file).unwrap_or(uri)
    }

    fn display_uri(&self, uri: &str) -> String {
        if self.relative_uris {
            relativize(uri, self.index_dir())
        } else {
            uri.to_string()
        }
    }

    /// Variations of one testcase that have a result, in document order
    fn testcase_rows(
        &self,
        testcase: &'a Testcase,
    ) -> impl Iterator<Item = (&'a Variation, VariationResult)> + '_ {
        testcase
            .keyed_variations()
            .filter_map(move |(key, variation)| {
                self.results.get(&key).map(|result| (variation, *result))
            })
    }

    /// Console lines: one per failed variation, then the conformance line
    pub fn console_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for testcase in &self.testsuite.testcases {
            for (variation, result) in self.testcase_rows(testcase) {
                if result.status == Status::Pass {
                    continue;
                }
                lines.push(format!(
                    "ERROR: Testcase {}, variation {} ({}) FAILED; actual [{}]; expected [{}]",
                    testcase.name, variation.name, variation.id, result.actual, variation.expected
                ));
            }
        }
        lines.push(self.conformance_line());
        lines
    }

    fn conformance_line(&self) -> String {
        let percent = match self.summary.conformance {
            Some(_) => format!("{}%", self.summary.conformance_display()),
            None => self.summary.conformance_display(),
        };
        format!(
            "Conformance: {} ({} failed testcase variations out of {})",
            percent, self.summary.failed, self.summary.total
        )
    }

    /// Print the console summary to stdout
    pub fn print_console(&self) {
        let lines = self.console_lines();
        if let Some((conformance, failures)) = lines.split_last() {
            for line in failures {
                println!("{}", line.red());
            }
            if self.summary.has_failures() {
                println!("{}", conformance.yellow());
            } else {
                println!("{}", conformance.green());
            }
        }
    }

    pub fn render_csv(&self) -> String {
        let mut csv = String::new();
        csv.push_str(CSV_HEADER);
        csv.push('\n');
        csv.push_str(&format!(
            "\"{}\",{},{},{},{:.1},{}\n",
            self.execution_date.format("%Y-%m-%d %H:%M:%S"),
            self.summary.total,
            self.summary.failed,
            self.summary.conformance_display(),
            self.summary.runtime.as_secs_f64(),
            csv_field(self.testsuite.uri.as_str())
        ));

        for testcase in &self.testsuite.testcases {
            csv.push_str(&format!(",,,,,,{}\n", csv_field(&testcase.name)));
            for (variation, result) in self.testcase_rows(testcase) {
                let data_uri = variation
                    .data
                    .as_ref()
                    .map(|data| self.display_uri(data.url().as_str()))
                    .unwrap_or_default();
                csv.push_str(&format!(
                    ",,,,,,,{},{},{},{},{}\n",
                    csv_field(&format!("{} ({})", variation.name, variation.id)),
                    csv_field(&data_uri),
                    result.status,
                    result.actual,
                    variation.expected
                ));
            }
        }
        csv
    }

    pub fn render_xml(&self) -> Result<String, ReportError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b'\t', 1);

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_error)?;

        let runtime = format!("{:.3}", self.summary.runtime.as_secs_f64());
        let total = self.summary.total.to_string();
        let failed = self.summary.failed.to_string();
        let conformance = self.summary.conformance_display();
        let date = self.execution_date.format("%Y-%m-%dT%H:%M:%S").to_string();
        let base = format!("{}/", self.index_dir());

        let mut root = BytesStart::new("testsuite");
        root.push_attribute(("xmlns", RESULTS_NAMESPACE));
        if self.relative_uris {
            root.push_attribute(("xml:base", base.as_str()));
            root.push_attribute(("uri", self.index_file()));
        } else {
            root.push_attribute(("uri", self.testsuite.uri.as_str()));
        }
        root.push_attribute(("name", self.testsuite.name.as_deref().unwrap_or_default()));
        root.push_attribute(("total", total.as_str()));
        root.push_attribute(("failed", failed.as_str()));
        root.push_attribute(("conformance", conformance.as_str()));
        root.push_attribute(("runtime", runtime.as_str()));
        root.push_attribute(("execution-date", date.as_str()));
        root.push_attribute(("processor", self.processor.as_str()));
        writer.write_event(Event::Start(root)).map_err(xml_error)?;

        for testcase in &self.testsuite.testcases {
            let uri = self.display_uri(testcase.uri.as_str());
            let mut elem = BytesStart::new("testcase");
            elem.push_attribute(("uri", uri.as_str()));
            elem.push_attribute(("name", testcase.name.as_str()));
            writer.write_event(Event::Start(elem)).map_err(xml_error)?;

            for (variation, result) in self.testcase_rows(testcase) {
                let mut elem = BytesStart::new("variation");
                elem.push_attribute(("id", variation.id.as_str()));
                elem.push_attribute(("name", variation.name.as_str()));
                if let Some(data) = &variation.data {
                    let data_uri = self.display_uri(data.url().as_str());
                    elem.push_attribute((data.kind(), data_uri.as_str()));
                }
                writer.write_event(Event::Start(elem)).map_err(xml_error)?;

                let mut res = BytesStart::new("result");
                res.push_attribute(("status", result.status.as_str()));
                res.push_attribute(("actual", result.actual.as_str()));
                res.push_attribute(("expected", variation.expected.as_str()));
                writer.write_event(Event::Empty(res)).map_err(xml_error)?;

                writer
                    .write_event(Event::End(BytesEnd::new("variation")))
                    .map_err(xml_error)?;
            }

            writer
                .write_event(Event::End(BytesEnd::new("testcase")))
                .map_err(xml_error)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("testsuite")))
            .map_err(xml_error)?;

        let mut bytes = writer.into_inner().into_inner();
        bytes.push(b'\n');
        String::from_utf8(bytes).map_err(xml_error)
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        write_file(path.as_ref(), &self.render_csv())
    }

    pub fn write_xml(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        let xml = self.render_xml()?;
        write_file(path.as_ref(), &xml)
    }
}

fn xml_error(e: impl std::fmt::Display) -> ReportError {
    ReportError::Xml(e.to_string())
}

fn write_file(path: &Path, content: &str) -> Result<(), ReportError> {
    fs::write(path, content).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Strip the index directory prefix; URIs outside of it stay absolute
pub fn relativize(uri: &str, index_dir: &str) -> String {
    uri.strip_prefix(index_dir)
        .and_then(|rest| rest.strip_prefix('/'))
        .map(str::to_string)
        .unwrap_or_else(|| uri.to_string())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
