//! Closing-keyword parsing for issues linked from a pull request body.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

static CLOSING_REFERENCE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:close[sd]?|fix(?:e[sd])?|resolve[sd]?)\s*:?\s+#(\d+)\b").ok()
});

/// Extracts issue numbers referenced with GitHub's closing keywords.
///
/// Only same-repository references (`fixes #12`) are recognised. Numbers are
/// deduplicated and returned in ascending order.
///
/// ```
/// use prharvest::github::models::linked_issue_numbers;
///
/// let body = "Fixes #12, closes #3 and mentions #99.\nResolved: #12";
/// assert_eq!(linked_issue_numbers(body), vec![3, 12]);
/// ```
#[must_use]
pub fn linked_issue_numbers(body: &str) -> Vec<u64> {
    let Some(pattern) = CLOSING_REFERENCE.as_ref() else {
        return Vec::new();
    };

    pattern
        .captures_iter(body)
        .filter_map(|captures| captures.get(1))
        .filter_map(|number| number.as_str().parse::<u64>().ok())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
