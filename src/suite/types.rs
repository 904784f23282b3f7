// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Testsuite model, per-variation results and run summary

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use url::Url;

use super::validator::ValidationMode;

/// Expected or actual outcome of validating a variation's entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Valid,
    Invalid,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Valid => "valid",
            Outcome::Invalid => "invalid",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "valid" => Some(Outcome::Valid),
            "invalid" => Some(Outcome::Invalid),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of an executed variation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Pass,
    Fail,
    Exception,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
            Status::Exception => "EXCEPTION",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single read-me-first entry point of a variation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariationData {
    Instance(Url),
    TaxonomySchema(Url),
    Linkbase(Url),
}

impl VariationData {
    pub fn url(&self) -> &Url {
        match self {
            VariationData::Instance(url)
            | VariationData::TaxonomySchema(url)
            | VariationData::Linkbase(url) => url,
        }
    }

    /// Element name of the data kind inside `<data>`, reused as the report attribute name
    pub fn kind(&self) -> &'static str {
        match self {
            VariationData::Instance(_) => "instance",
            VariationData::TaxonomySchema(_) => "xsd",
            VariationData::Linkbase(_) => "linkbase",
        }
    }

    pub fn mode(&self) -> ValidationMode {
        match self {
            VariationData::Instance(_) => ValidationMode::Instance,
            VariationData::TaxonomySchema(_) | VariationData::Linkbase(_) => {
                ValidationMode::Taxonomy
            }
        }
    }
}

/// One (input document, expected outcome) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variation {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// `None` when no data child was flagged read-me-first
    pub data: Option<VariationData>,
    pub expected: Outcome,
}

/// A testcase document and its variations in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Testcase {
    pub uri: Url,
    pub name: String,
    pub description: Option<String>,
    pub owner: Option<String>,
    /// Leading number token of the testcase file name, used for selection
    pub number: String,
    pub variations: Vec<Variation>,
}

impl Testcase {
    /// Variations paired with their result keys, in document order.
    ///
    /// Repeated ids get increasing ordinals so each occurrence keeps its own key.
    pub fn keyed_variations(&self) -> impl Iterator<Item = (VariationKey, &Variation)> + '_ {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        self.variations.iter().map(move |variation| {
            let ordinal = seen.entry(variation.id.as_str()).or_insert(0);
            let key = VariationKey {
                testcase_uri: self.uri.clone(),
                variation_id: variation.id.clone(),
                ordinal: *ordinal,
            };
            *ordinal += 1;
            (key, variation)
        })
    }
}

/// Testsuite index and all of its testcases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Testsuite {
    pub uri: Url,
    pub name: Option<String>,
    pub date: Option<String>,
    pub testcases: Vec<Testcase>,
}

impl Testsuite {
    pub fn variation_count(&self) -> usize {
        self.testcases.iter().map(|t| t.variations.len()).sum()
    }
}

/// Identity of a variation result: (testcase uri, variation id, occurrence of that id)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariationKey {
    pub testcase_uri: Url,
    pub variation_id: String,
    pub ordinal: usize,
}

impl VariationKey {
    pub fn new(testcase_uri: Url, variation_id: impl Into<String>) -> Self {
        Self {
            testcase_uri,
            variation_id: variation_id.into(),
            ordinal: 0,
        }
    }
}

/// Outcome of executing one variation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariationResult {
    pub status: Status,
    pub actual: Outcome,
}

impl VariationResult {
    /// Classify an actual outcome against the expectation
    pub fn classify(actual: Outcome, expected: Outcome) -> Self {
        let status = if actual == expected {
            Status::Pass
        } else {
            Status::Fail
        };
        Self { status, actual }
    }

    /// Result recorded when validation could not complete
    pub fn exception() -> Self {
        Self {
            status: Status::Exception,
            actual: Outcome::Invalid,
        }
    }
}

/// Frozen results of a scheduler run
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    results: HashMap<VariationKey, VariationResult>,
    runtime: Duration,
}

impl ResultSet {
    pub fn new(results: HashMap<VariationKey, VariationResult>, runtime: Duration) -> Self {
        Self { results, runtime }
    }

    pub fn get(&self, key: &VariationKey) -> Option<&VariationResult> {
        self.results.get(key)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VariationKey, &VariationResult)> {
        self.results.iter()
    }

    pub fn runtime(&self) -> Duration {
        self.runtime
    }
}

/// Conformance statistics derived from a [`ResultSet`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub total: usize,
    pub failed: usize,
    /// `None` when nothing was executed
    pub conformance: Option<f64>,
    pub runtime: Duration,
}

impl RunSummary {
    pub fn summarize(results: &ResultSet) -> Self {
        let total = results.len();
        let failed = results
            .iter()
            .filter(|(_, r)| r.status != Status::Pass)
            .count();
        let conformance = if total == 0 {
            None
        } else {
            Some((total - failed) as f64 * 100.0 / total as f64)
        };
        Self {
            total,
            failed,
            conformance,
            runtime: results.runtime(),
        }
    }

    /// Conformance with two decimals, or `n/a` for an empty run
    pub fn conformance_display(&self) -> String {
        match self.conformance {
            Some(percent) => format!("{:.2}", percent),
            None => "n/a".to_string(),
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn variation(id: &str) -> Variation {
        Variation {
            id: id.to_string(),
            name: format!("name {}", id),
            description: None,
            data: Some(VariationData::Instance(url("file:///suite/a.xml"))),
            expected: Outcome::Valid,
        }
    }

    #[test]
    fn test_classify() {
        let pass = VariationResult::classify(Outcome::Invalid, Outcome::Invalid);
        assert_eq!(pass.status, Status::Pass);
        let fail = VariationResult::classify(Outcome::Valid, Outcome::Invalid);
        assert_eq!(fail.status, Status::Fail);
        assert_eq!(fail.actual, Outcome::Valid);
        let exception = VariationResult::exception();
        assert_eq!(exception.status, Status::Exception);
        assert_eq!(exception.actual, Outcome::Invalid);
    }

    #[test]
    fn test_duplicate_ids_get_distinct_keys() {
        let testcase = Testcase {
            uri: url("file:///suite/100-test.xml"),
            name: "100".to_string(),
            description: None,
            owner: None,
            number: "100".to_string(),
            variations: vec![variation("V1"), variation("V2"), variation("V1")],
        };
        let keys: Vec<_> = testcase.keyed_variations().map(|(k, _)| k).collect();
        assert_eq!(keys[0].ordinal, 0);
        assert_eq!(keys[1].ordinal, 0);
        assert_eq!(keys[2].ordinal, 1);
        assert_ne!(keys[0], keys[2]);
        assert_eq!(keys[0], VariationKey::new(testcase.uri.clone(), "V1"));
    }

    #[test]
    fn test_summary() {
        let tc = url("file:///suite/100.xml");
        let mut results = HashMap::new();
        results.insert(
            VariationKey::new(tc.clone(), "V1"),
            VariationResult::classify(Outcome::Valid, Outcome::Valid),
        );
        results.insert(
            VariationKey::new(tc.clone(), "V2"),
            VariationResult::classify(Outcome::Valid, Outcome::Invalid),
        );
        results.insert(VariationKey::new(tc.clone(), "V3"), VariationResult::exception());
        results.insert(
            VariationKey::new(tc, "V4"),
            VariationResult::classify(Outcome::Invalid, Outcome::Invalid),
        );
        let summary = RunSummary::summarize(&ResultSet::new(results, Duration::from_secs(2)));
        assert_eq!(summary.total, 4);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.conformance, Some(50.0));
        assert_eq!(summary.conformance_display(), "50.00");
        assert_eq!(summary.runtime, Duration::from_secs(2));
    }

    #[test]
    fn test_summary_empty_run() {
        let summary = RunSummary::summarize(&ResultSet::default());
        assert_eq!(summary.total, 0);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.conformance, None);
        assert_eq!(summary.conformance_display(), "n/a");
    }

    #[test]
    fn test_data_kind_and_mode() {
        let schema = VariationData::TaxonomySchema(url("file:///s/a.xsd"));
        assert_eq!(schema.kind(), "xsd");
        assert_eq!(schema.mode(), ValidationMode::Taxonomy);
        let linkbase = VariationData::Linkbase(url("file:///s/a-lab.xml"));
        assert_eq!(linkbase.mode(), ValidationMode::Taxonomy);
        assert_eq!(Outcome::from_str(" Invalid "), Some(Outcome::Invalid));
        assert_eq!(Outcome::from_str("maybe"), None);
    }
}
