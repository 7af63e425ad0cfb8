use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use super::types::UnitFailure;

/// Marker for resource identifiers inside backend error text.
fn resource_urn_regex() -> &'static Regex {
    static URN_REGEX: OnceLock<Regex> = OnceLock::new();
    URN_REGEX.get_or_init(|| {
        Regex::new(r#"urn:pulumi:[^\s"'`,;()\[\]]+"#).expect("URN_REGEX is valid")
    })
}

/// Resource identifiers that need manual cleanup after a failed teardown.
///
/// Uses the identifiers the runner attached to the error when there are any,
/// otherwise scans the error text. Sorted and de-duplicated.
pub fn remediation_targets(failures: &[UnitFailure]) -> Vec<String> {
    let mut targets = BTreeSet::new();
    for failure in failures {
        let structured = failure.error.resources();
        if structured.is_empty() {
            targets.extend(scan_resource_ids(&failure.error.to_string()));
        } else {
            targets.extend(structured.iter().cloned());
        }
    }
    targets.into_iter().collect()
}

pub fn scan_resource_ids(text: &str) -> Vec<String> {
    resource_urn_regex()
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ':']).to_string())
        .collect()
}
