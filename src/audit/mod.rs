//! Tag key classification.
//!
//! Buckets every `k` seen on `tag` children into lower-case keys, keys with
//! a single colon, keys containing characters that are awkward as document
//! field names, and everything else. Patterns are anchored with `\z`, so a
//! key with a trailing newline is never `lower` or `lower_colon`.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::element::RawElement;

static LOWER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A([a-z]|_)*\z").expect("valid lower pattern"));
static LOWER_COLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A([a-z]|_)*:([a-z]|_)*\z").expect("valid lower_colon pattern"));
static PROBLEM_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[=+/&<>;'"?%#$@,. \t\r\n]"#).expect("valid problemchars pattern")
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyClass {
    Lower,
    LowerColon,
    ProblemChars,
    Other,
}

pub fn classify_key(key: &str) -> KeyClass {
    if LOWER.is_match(key) {
        KeyClass::Lower
    } else if LOWER_COLON.is_match(key) {
        KeyClass::LowerColon
    } else if PROBLEM_CHARS.is_match(key) {
        KeyClass::ProblemChars
    } else {
        KeyClass::Other
    }
}

#[derive(Debug, Default, Serialize)]
pub struct KeyAudit {
    pub lower: u64,
    pub lower_colon: u64,
    pub problemchars: u64,
    pub other: u64,
    pub problem_keys: BTreeSet<String>,
}

impl KeyAudit {
    pub fn record_key(&mut self, key: &str) {
        match classify_key(key) {
            KeyClass::Lower => self.lower += 1,
            KeyClass::LowerColon => self.lower_colon += 1,
            KeyClass::ProblemChars => {
                self.problemchars += 1;
                self.problem_keys.insert(key.to_string());
            }
            KeyClass::Other => self.other += 1,
        }
    }

    /// Tally the keys of all `tag` children of `element`.
    pub fn record_element(&mut self, element: &RawElement) {
        for child in element.children.iter().filter(|c| c.tag == "tag") {
            if let Some(key) = child.attr("k") {
                self.record_key(key);
            }
        }
    }

    pub fn total(&self) -> u64 {
        self.lower + self.lower_colon + self.problemchars + self.other
    }
}
