//! Selection parser: free-form router output to a bounded list of specialist ids.
//!
//! Three passes, each only reached when the previous one found nothing:
//!
//! 1. Normalized match: every known id is tested against the whole output in
//!    several spellings (`roger_martin`, `roger martin`, `rogermartin`,
//!    `Roger Martin`), case-insensitively.
//! 2. Labeled list: the text after the first `Selected...:`, `Experts:`,
//!    `Recommend...:` or `Relevant...:` label is normalized and matched again.
//! 3. Default: the configured default selection, flagged as degraded.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_SPECIALISTS;
use crate::utilities::string_utils::{collapse_separators, title_case};

/// Label patterns, in priority order. Only the first one that matches is used.
static LABELED_LISTS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)selected[^:]*:\s*([^.]+)",
        r"(?i)experts?[^:]*:\s*([^.]+)",
        r"(?i)recommend[^:]*:\s*([^.]+)",
        r"(?i)relevant[^:]*:\s*([^.]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Ordered, duplicate-free, bounded list of known specialist ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionResult(Vec<String>);

impl SelectionResult {
    /// Keep the ids present in `known_ids`, drop repeats, and stop at
    /// `max_count`. Caller order is preserved.
    pub fn from_ids<I, S>(ids: I, known_ids: &[String], max_count: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selected: Vec<String> = Vec::new();
        for id in ids {
            let id = id.as_ref().trim();
            if selected.len() == max_count {
                break;
            }
            if !known_ids.iter().any(|k| k == id) {
                log::debug!("Dropping unknown specialist id '{}'", id);
                continue;
            }
            if !selected.iter().any(|s| s == id) {
                selected.push(id.to_string());
            }
        }
        Self(selected)
    }

    pub fn ids(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|s| s == id)
    }
}

impl std::fmt::Display for SelectionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// Parser result. `degraded` is set when neither matching pass found anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSelection {
    pub selection: SelectionResult,
    pub degraded: bool,
}

/// Turns router output into a [`SelectionResult`].
#[derive(Debug, Clone)]
pub struct SelectionParser {
    default_ids: Vec<String>,
}

impl Default for SelectionParser {
    fn default() -> Self {
        Self::new(DEFAULT_SPECIALISTS.iter().map(|s| s.to_string()).collect())
    }
}

impl SelectionParser {
    pub fn new(default_ids: Vec<String>) -> Self {
        Self { default_ids }
    }

    /// Parse `router_output` against `known_ids` (registry order).
    pub fn parse(&self, router_output: &str, known_ids: &[String], max_count: usize) -> ParsedSelection {
        let matched = match_known(router_output, known_ids);
        if !matched.is_empty() {
            return ParsedSelection {
                selection: SelectionResult::from_ids(matched, known_ids, max_count),
                degraded: false,
            };
        }

        if let Some(list) = labeled_list(router_output) {
            let matched = match_known(&collapse_separators(&list), known_ids);
            if !matched.is_empty() {
                log::debug!("Selection recovered from labeled list: {:?}", list.trim());
                return ParsedSelection {
                    selection: SelectionResult::from_ids(matched, known_ids, max_count),
                    degraded: false,
                };
            }
        }

        ParsedSelection {
            selection: self.default_selection(known_ids, max_count),
            degraded: true,
        }
    }

    /// Configured default ids filtered to the registry, or the first
    /// `max_count` registry ids when none of them is known.
    pub fn default_selection(&self, known_ids: &[String], max_count: usize) -> SelectionResult {
        let selection = SelectionResult::from_ids(&self.default_ids, known_ids, max_count);
        if selection.is_empty() {
            SelectionResult::from_ids(known_ids, known_ids, max_count)
        } else {
            selection
        }
    }
}

/// Known ids with at least one spelling present in `text`, in registry order.
fn match_known<'a>(text: &str, known_ids: &'a [String]) -> Vec<&'a str> {
    let haystack = text.to_lowercase();
    known_ids
        .iter()
        .filter(|id| spellings(id).iter().any(|v| haystack.contains(v.as_str())))
        .map(|id| id.as_str())
        .collect()
}

/// Lowercased spellings of an id.
fn spellings(id: &str) -> Vec<String> {
    let lower = id.to_lowercase();
    let spaced = lower.replace('_', " ");
    let joined = lower.replace(['_', ' '], "");
    let titled = title_case(&lower).to_lowercase();

    let mut out = vec![lower];
    for v in [spaced, joined, titled] {
        if !v.is_empty() && !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

fn labeled_list(text: &str) -> Option<String> {
    LABELED_LISTS
        .iter()
        .find_map(|re| re.captures(text).map(|cap| cap[1].to_string()))
}
