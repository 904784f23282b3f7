// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Testsuite index and testcase document loading

use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};
use url::Url;

use super::document::{Element, XmlDocument};
use super::error::LoadError;
use super::types::{Outcome, Testcase, Testsuite, Variation, VariationData};

/// Turn a command line argument into an absolute URI.
///
/// Anything that already parses as an absolute URL is taken verbatim (a single
/// letter scheme is treated as a Windows drive); everything else is a path
/// relative to the current directory.
pub fn resolve_location(location: &str) -> Result<Url, LoadError> {
    if let Ok(url) = Url::parse(location) {
        if url.scheme().len() > 1 {
            return Ok(url);
        }
    }
    let path = Path::new(location);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| LoadError::InvalidLocation {
                location: location.to_string(),
                reason: e.to_string(),
            })?
            .join(path)
    };
    Url::from_file_path(&absolute).map_err(|_| LoadError::InvalidLocation {
        location: location.to_string(),
        reason: "cannot be expressed as a file URI".to_string(),
    })
}

/// Load the testsuite index and every testcase it references.
///
/// Each testcase document is loaded once even if the index lists it again.
/// Fails as a whole if any document cannot be read or parsed.
pub fn load_testsuite(index_uri: &Url) -> Result<Testsuite, LoadError> {
    info!("Loading testsuite index {}", index_uri);
    let document = XmlDocument::load(index_uri)?;
    let root = &document.root;

    let mut testcases = Vec::new();
    let mut testcase_uris = HashSet::new();
    for elem in root.element_children() {
        if elem.local_name() != "testcase" {
            warn!(
                "Testsuite index {} contains unknown <{}> child element <{}>",
                document.uri,
                root.local_name(),
                elem.local_name()
            );
            continue;
        }
        let reference = elem.attr("uri").ok_or_else(|| LoadError::MissingAttribute {
            uri: document.uri.to_string(),
            element: elem.name.clone(),
            attribute: "uri".to_string(),
        })?;
        let testcase_uri = elem
            .base
            .join(reference.trim())
            .map_err(|source| LoadError::Resolve {
                uri: document.uri.to_string(),
                reference: reference.to_string(),
                source,
            })?;
        if !testcase_uris.insert(testcase_uri.clone()) {
            warn!(
                "Testsuite index {} references testcase {} more than once; skipping repeated reference",
                document.uri, testcase_uri
            );
            continue;
        }
        testcases.push(load_testcase(&testcase_uri)?);
    }

    Ok(Testsuite {
        uri: document.uri.clone(),
        name: root.attr("name").map(str::to_string),
        date: root.attr("date").map(str::to_string),
        testcases,
    })
}

/// Load a single testcase document
pub fn load_testcase(testcase_uri: &Url) -> Result<Testcase, LoadError> {
    info!("Loading testcase {}", testcase_uri);
    let document = XmlDocument::load(testcase_uri)?;
    let root = &document.root;

    let mut variations = Vec::new();
    let mut variation_ids = HashSet::new();
    for elem in root.element_children() {
        if elem.local_name() != "variation" {
            warn!(
                "Testcase file {} contains unknown <testcase> child element <{}>",
                document.uri,
                elem.local_name()
            );
            continue;
        }
        let variation = parse_variation(elem, &document.uri);
        if !variation_ids.insert(variation.id.clone()) {
            warn!(
                "Testcase file {} contains variations with duplicate id {}",
                document.uri, variation.id
            );
        }
        variations.push(variation);
    }

    Ok(Testcase {
        uri: document.uri.clone(),
        name: root.attr("name").unwrap_or_default().to_string(),
        description: root.attr("description").map(str::to_string),
        owner: root.attr("owner").map(str::to_string),
        number: testcase_number(&document.uri),
        variations,
    })
}

fn parse_variation(elem: &Element, doc_uri: &Url) -> Variation {
    let id = elem.attr("id").unwrap_or_default().to_string();
    let mut variation = Variation {
        name: elem.attr("name").unwrap_or_default().to_string(),
        description: None,
        data: None,
        expected: Outcome::Valid,
        id,
    };
    let mut has_result = false;

    for child in elem.element_children() {
        match child.local_name() {
            "description" => variation.description = Some(child.inner_xml().trim().to_string()),
            "data" => variation.data = parse_data(child, doc_uri, &variation.id),
            "result" => {
                has_result = true;
                variation.expected = expected_outcome(child, doc_uri, &variation.id);
            }
            other => warn!(
                "Testcase file {} contains unknown <variation> child element <{}>",
                doc_uri, other
            ),
        }
    }

    if !has_result {
        warn!(
            "Testcase file {} variation {} has no <result>, expecting valid",
            doc_uri, variation.id
        );
    }
    variation
}

/// Pick the read-me-first entry point among the `<data>` children
fn parse_data(data: &Element, doc_uri: &Url, variation_id: &str) -> Option<VariationData> {
    let mut entry_point: Option<VariationData> = None;

    for child in data.element_children() {
        let make: fn(Url) -> VariationData = match child.local_name() {
            "instance" => VariationData::Instance,
            "xsd" => VariationData::TaxonomySchema,
            "linkbase" => VariationData::Linkbase,
            other => {
                warn!(
                    "Testcase file {} contains unknown <data> child element <{}>",
                    doc_uri, other
                );
                continue;
            }
        };
        if child.attr_bool("readMeFirst") != Some(true) {
            continue;
        }

        let reference = child.text();
        let url = match child.base.join(&reference) {
            Ok(url) => url,
            Err(e) => {
                warn!(
                    "Testcase file {} variation {} has unresolvable <{}> `{}`: {}",
                    doc_uri,
                    variation_id,
                    child.local_name(),
                    reference,
                    e
                );
                continue;
            }
        };

        match &entry_point {
            None => entry_point = Some(make(url)),
            Some(first) => warn!(
                "Testcase file {} variation {} has more than one read-me-first entry point; keeping {} and ignoring {}",
                doc_uri,
                variation_id,
                first.url(),
                url
            ),
        }
    }

    if entry_point.is_none() {
        debug!(
            "Testcase file {} variation {} has no read-me-first entry point",
            doc_uri, variation_id
        );
    }
    entry_point
}

/// Explicit `expected` attribute, otherwise invalid iff an `<error>` child is present
fn expected_outcome(result: &Element, doc_uri: &Url, variation_id: &str) -> Outcome {
    if let Some(value) = result.attr("expected") {
        match Outcome::from_str(value) {
            Some(outcome) => return outcome,
            None => warn!(
                "Testcase file {} variation {} has unknown expected result `{}`",
                doc_uri, variation_id, value
            ),
        }
    }
    if result.find_child("error").is_some() {
        Outcome::Invalid
    } else {
        Outcome::Valid
    }
}

/// Leading token of the file name: `100-xbrl-instance.xml` becomes `100`
pub fn testcase_number(uri: &Url) -> String {
    let file_name = uri
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    file_name
        .split(['-', '_', '.'])
        .next()
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> XmlDocument {
        XmlDocument::parse(Url::parse("file:///suite/100-case.xml").unwrap(), text).unwrap()
    }

    #[test]
    fn test_parse_variation_with_instance() {
        let doc = parse(
            r#"<testcase name="Instance tests">
                <variation id="V1" name="Missing context">
                    <description>Context is <b>missing</b></description>
                    <data>
                        <xsd readMeFirst="false">schema.xsd</xsd>
                        <instance readMeFirst="true">sub/inst.xml</instance>
                    </data>
                    <result expected="invalid"/>
                </variation>
            </testcase>"#,
        );
        let elem = doc.root.find_child("variation").unwrap();
        let variation = parse_variation(elem, &doc.uri);
        assert_eq!(variation.id, "V1");
        assert_eq!(variation.name, "Missing context");
        assert_eq!(variation.description.as_deref(), Some("Context is <b>missing</b>"));
        assert_eq!(variation.expected, Outcome::Invalid);
        assert_eq!(
            variation.data,
            Some(VariationData::Instance(Url::parse("file:///suite/sub/inst.xml").unwrap()))
        );
    }

    #[test]
    fn test_expected_inferred_from_error_child() {
        let doc = parse(
            r#"<testcase>
                <variation id="V1"><result><error>xbrl.4.9</error></result></variation>
                <variation id="V2"><result><file>out.xml</file></result></variation>
                <variation id="V3"><result expected="valid"><error/></result></variation>
            </testcase>"#,
        );
        let outcomes: Vec<_> = doc
            .root
            .element_children()
            .map(|e| parse_variation(e, &doc.uri).expected)
            .collect();
        assert_eq!(outcomes, vec![Outcome::Invalid, Outcome::Valid, Outcome::Valid]);
    }

    #[test]
    fn test_first_read_me_first_wins() {
        let doc = parse(
            r#"<variation id="V1"><data>
                <linkbase readMeFirst="1">a-lab.xml</linkbase>
                <instance readMeFirst="true">b.xml</instance>
                <schema readMeFirst="true">ignored.xsd</schema>
            </data></variation>"#,
        );
        let variation = parse_variation(&doc.root, &doc.uri);
        assert_eq!(
            variation.data,
            Some(VariationData::Linkbase(Url::parse("file:///suite/a-lab.xml").unwrap()))
        );
    }

    #[test]
    fn test_no_read_me_first_leaves_data_empty() {
        let doc = parse(r#"<variation id="V1"><data><instance>a.xml</instance></data><result/></variation>"#);
        let variation = parse_variation(&doc.root, &doc.uri);
        assert_eq!(variation.data, None);
        assert_eq!(variation.expected, Outcome::Valid);
    }

    #[test]
    fn test_data_respects_xml_base() {
        let doc = parse(
            r#"<variation id="V1"><data xml:base="../other/"><xsd readMeFirst="true">s.xsd</xsd></data></variation>"#,
        );
        let variation = parse_variation(&doc.root, &doc.uri);
        assert_eq!(
            variation.data.unwrap().url().as_str(),
            "file:///other/s.xsd"
        );
    }

    #[test]
    fn test_testcase_number() {
        let uri = |s: &str| Url::parse(s).unwrap();
        assert_eq!(testcase_number(&uri("file:///s/Common/100-schema/104-Contexts.xml")), "104");
        assert_eq!(testcase_number(&uri("file:///s/DQC_0004.xml")), "DQC");
        assert_eq!(testcase_number(&uri("file:///s/index.xml")), "index");
    }

    #[test]
    fn test_resolve_location() {
        let url = resolve_location("file:///suite/xbrl.xml").unwrap();
        assert_eq!(url.as_str(), "file:///suite/xbrl.xml");
        let relative = resolve_location("xbrl.xml").unwrap();
        assert_eq!(relative.scheme(), "file");
        assert!(relative.path().ends_with("/xbrl.xml"));
    }
}
