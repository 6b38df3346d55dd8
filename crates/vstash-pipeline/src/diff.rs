//! Value comparison and unified diff rendering
//!
//! With JSON formatting on, both sides are canonicalised (pretty-printed,
//! keys sorted) before comparing. If only one side is valid JSON the raw
//! text is compared instead and a warning names the other side. An empty
//! side (nothing on the remote, or a staged delete) is not JSON, so creating
//! or deleting a JSON value also warns.

use crate::warning::{Side, Warning};
use serde::Serialize;
use similar::TextDiff;

/// Lines of context around each hunk
pub const CONTEXT_LINES: usize = 3;

/// Canonical JSON form of `text`, if it parses
#[must_use]
pub fn canonicalize_json(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    serde_json::to_string_pretty(&value).ok()
}

/// Both sides as they will be compared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    /// Old side
    pub old: String,
    /// New side
    pub new: String,
    /// Raised when JSON formatting had to fall back to raw text
    pub warning: Option<Warning>,
}

impl Comparison {
    /// Prepare `old` and `new` of resource `name` for comparison
    #[must_use]
    pub fn prepare(name: &str, old: &str, new: &str, json: bool, sides: (Side, Side)) -> Self {
        let raw = |warning| Self {
            old: old.to_string(),
            new: new.to_string(),
            warning,
        };
        if !json {
            return raw(None);
        }

        match (canonicalize_json(old), canonicalize_json(new)) {
            (Some(old), Some(new)) => Self {
                old,
                new,
                warning: None,
            },
            (None, Some(_)) => raw(Some(
                Warning::JsonFallback {
                    name: name.to_string(),
                    side: sides.0,
                }
                .raise(),
            )),
            (Some(_), None) => raw(Some(
                Warning::JsonFallback {
                    name: name.to_string(),
                    side: sides.1,
                }
                .raise(),
            )),
            (None, None) => raw(None),
        }
    }

    /// Whether both sides are the same
    #[inline]
    #[must_use]
    pub fn is_identical(&self) -> bool {
        self.old == self.new
    }

    /// Unified diff of the two sides under the given headers
    #[must_use]
    pub fn render(&self, old_label: &str, new_label: &str) -> String {
        unified_diff(&self.old, &self.new, old_label, new_label)
    }
}

/// Unified diff text; empty when both sides are equal
#[must_use]
pub fn unified_diff(old: &str, new: &str, old_label: &str, new_label: &str) -> String {
    if old == new {
        return String::new();
    }
    let old = terminated(old);
    let new = terminated(new);
    TextDiff::from_lines(old.as_str(), new.as_str())
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .header(old_label, new_label)
        .to_string()
}

fn terminated(text: &str) -> String {
    if text.is_empty() || text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{text}\n")
    }
}

/// Rendered difference between two labelled values
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedDiff {
    /// Header of the old side
    pub old_label: String,
    /// Header of the new side
    pub new_label: String,
    /// Unified diff text
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SIDES: (Side, Side) = (Side::Remote, Side::Staged);

    #[test]
    fn canonical_json_sorts_keys() {
        assert_eq!(
            canonicalize_json(r#"{"b":1,"a":[1,2]}"#).unwrap(),
            "{\n  \"a\": [\n    1,\n    2\n  ],\n  \"b\": 1\n}"
        );
        assert!(canonicalize_json("not json").is_none());
    }

    #[test]
    fn json_formatting_hides_layout_changes() {
        let cmp = Comparison::prepare("/a", r#"{"a":1,"b":2}"#, "{ \"b\": 2, \"a\": 1 }", true, SIDES);
        assert!(cmp.is_identical());
        assert!(cmp.warning.is_none());
    }

    #[test]
    fn one_sided_json_falls_back_with_warning() {
        let cmp = Comparison::prepare("/a", "plain", r#"{"a":1}"#, true, SIDES);
        assert_eq!(cmp.old, "plain");
        assert_eq!(cmp.new, r#"{"a":1}"#);
        assert_eq!(
            cmp.warning,
            Some(Warning::JsonFallback {
                name: "/a".into(),
                side: Side::Remote
            })
        );
    }

    #[test]
    fn neither_json_compares_raw_silently() {
        let cmp = Comparison::prepare("/a", "x", "y", true, SIDES);
        assert!(cmp.warning.is_none());
        assert!(!cmp.is_identical());
    }

    #[test]
    fn deleting_json_warns_about_the_empty_side() {
        let cmp = Comparison::prepare("/a", r#"{"a":1}"#, "", true, SIDES);
        assert_eq!(cmp.old, r#"{"a":1}"#);
        assert_eq!(cmp.new, "");
        assert_eq!(
            cmp.warning,
            Some(Warning::JsonFallback {
                name: "/a".into(),
                side: Side::Staged
            })
        );
    }

    #[test]
    fn both_sides_empty_is_silent() {
        let cmp = Comparison::prepare("/a", "", "", true, SIDES);
        assert!(cmp.warning.is_none());
        assert!(cmp.is_identical());
    }

    #[test]
    fn unified_diff_shows_both_lines() {
        let text = unified_diff("v1", "v2", "/a/b#1", "/a/b (staged)");
        assert_eq!(text, "--- /a/b#1\n+++ /a/b (staged)\n@@ -1 +1 @@\n-v1\n+v2\n");
    }

    #[test]
    fn identical_values_render_nothing() {
        assert!(unified_diff("same", "same", "a", "b").is_empty());
    }
}
