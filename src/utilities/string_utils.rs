//! String helpers shared by prompt rendering and selection parsing.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static VARIABLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_\-]*)\}").unwrap());
static SEPARATOR_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\-/]+").unwrap());

/// Placeholders found in `template`, in order of first appearance.
pub fn template_variables(template: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for cap in VARIABLE_PATTERN.captures_iter(template) {
        let name = cap[1].to_string();
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

/// Interpolate `{name}` placeholders in a single pass.
///
/// Values are inserted verbatim and never re-scanned, so a message that
/// itself contains braces cannot trigger further substitution.
///
/// # Errors
/// Returns the name of the first placeholder missing from `inputs`.
pub fn interpolate(template: &str, inputs: &HashMap<&str, &str>) -> Result<String, String> {
    if let Some(missing) = template_variables(template)
        .into_iter()
        .find(|v| !inputs.contains_key(v.as_str()))
    {
        return Err(missing);
    }

    Ok(VARIABLE_PATTERN
        .replace_all(template, |cap: &Captures| {
            inputs.get(&cap[1]).copied().unwrap_or_default().to_string()
        })
        .into_owned())
}

/// `simon_sinek` -> `Simon Sinek`.
pub fn title_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse hyphens, slashes and whitespace runs into single spaces.
pub fn collapse_separators(text: &str) -> String {
    SEPARATOR_RUN.replace_all(text, " ").into_owned()
}
