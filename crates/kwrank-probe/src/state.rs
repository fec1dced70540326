//! Embedded client-state extraction from a search results page.
//!
//! Result pages ship their data as a script assignment of the form
//! `window.__APOLLO_STATE__ = { ... };`. The object literal is pulled out with
//! a balanced-delimiter scan rather than a regex capture: a lazy `{.+?};`
//! stops at the first `};` inside a nested string or object and corrupts the
//! payload.

use regex::Regex;
use serde_json::Value;

use crate::error::ProbeError;

pub const DEFAULT_STATE_MARKER: &str = "window.__APOLLO_STATE__";
pub const DEFAULT_LIST_PREFIX: &str = "restaurantList(";

/// Locates and parses the embedded state object.
#[derive(Debug, Clone)]
pub struct StateExtractor {
    assignment: Regex,
}

impl StateExtractor {
    /// Builds an extractor for `marker`, matched literally and followed by `=`.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::InvalidMarker`] if `marker` is blank or the
    /// assignment pattern cannot be compiled.
    pub fn new(marker: &str) -> Result<Self, ProbeError> {
        if marker.trim().is_empty() {
            return Err(ProbeError::InvalidMarker {
                marker: marker.to_owned(),
                reason: "marker must not be empty".to_owned(),
            });
        }
        let pattern = format!(r"{}\s*=\s*", regex::escape(marker));
        let assignment = Regex::new(&pattern).map_err(|e| ProbeError::InvalidMarker {
            marker: marker.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(Self { assignment })
    }

    /// Extracts and parses the state object from `body`.
    ///
    /// `url` is only used to label errors.
    ///
    /// # Errors
    ///
    /// - [`ProbeError::StateMarkerMissing`]: no `marker =` assignment in `body`.
    /// - [`ProbeError::UnbalancedState`]: the assignment is not followed by a
    ///   complete `{...}` object.
    /// - [`ProbeError::Deserialize`]: the object is not valid JSON.
    pub fn extract(&self, body: &str, url: &str) -> Result<Value, ProbeError> {
        let found = self
            .assignment
            .find(body)
            .ok_or_else(|| ProbeError::StateMarkerMissing {
                url: url.to_owned(),
            })?;

        let literal = extract_balanced_object(&body[found.end()..]).ok_or_else(|| {
            ProbeError::UnbalancedState {
                url: url.to_owned(),
            }
        })?;

        serde_json::from_str(literal).map_err(|source| ProbeError::Deserialize {
            context: format!("embedded state from {url}"),
            source,
        })
    }
}

/// Returns the shortest prefix of `s` that forms a complete `{...}` object.
///
/// Tracks nesting depth across both `{}` and `[]`, skipping over string
/// literals and their escape sequences. Returns `None` when `s` does not start
/// with `{` or the object is never closed. Only a `}` at depth 0 ends the
/// scan, so `{"a": [1}` is never accepted.
#[must_use]
pub fn extract_balanced_object(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escape = false;
    for (i, c) in s.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        if in_string {
            match c {
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            ']' => depth -= 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
        if depth < 0 {
            return None;
        }
    }
    None
}

/// Zero-based position of `target_id` in the result list of `state`.
///
/// The list lives under `ROOT_QUERY` at the first key starting with
/// `list_prefix`. Its `items` are either `{"__ref": key}` pointers into the
/// top-level state or inline objects; both carry an `id` that may be a string
/// or a number. Returns `None` when the list is absent or the id is not on it.
#[must_use]
pub fn find_rank_in_state(state: &Value, target_id: &str, list_prefix: &str) -> Option<usize> {
    result_items(state, list_prefix)?.iter().position(|item| {
        let entry = match item.get("__ref").and_then(Value::as_str) {
            Some(key) => state.get(key),
            None => Some(item),
        };
        entry
            .and_then(|e| e.get("id"))
            .is_some_and(|id| id_matches(id, target_id))
    })
}

/// Number of entries in the result list, or 0 when there is none.
#[must_use]
pub fn result_count(state: &Value, list_prefix: &str) -> usize {
    result_items(state, list_prefix).map_or(0, Vec::len)
}

fn result_items<'a>(state: &'a Value, list_prefix: &str) -> Option<&'a Vec<Value>> {
    state
        .get("ROOT_QUERY")?
        .as_object()?
        .iter()
        .find(|(key, _)| key.starts_with(list_prefix))?
        .1
        .get("items")?
        .as_array()
}

fn id_matches(id: &Value, target_id: &str) -> bool {
    match id {
        Value::String(s) => s == target_id,
        Value::Number(n) => n.to_string() == target_id,
        _ => false,
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
