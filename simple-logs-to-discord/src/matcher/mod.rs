//! First-match selection of log lines against an ordered pattern list.

mod template;

pub use template::expand_template;

use std::fmt;

use regex::Regex;

/// A compiled pattern together with the text it was compiled from.
#[derive(Clone)]
pub struct Pattern {
    regex: Regex,
}

impl Pattern {
    pub fn new(pattern: &str) -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    /// The pattern as originally written.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.as_str()).finish()
    }
}

/// A line that matched, the pattern that won, and its named captures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    /// The trimmed line.
    pub line: String,
    /// Text of the winning pattern.
    pub pattern: String,
    /// Every named group of the winning pattern, in definition order.
    /// Groups that did not take part in the match are `None`.
    pub groups: Vec<(String, Option<String>)>,
}

impl MatchResult {
    /// Look up a named capture. Returns `None` for unknown names and for
    /// groups that did not participate.
    pub fn group(&self, name: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_deref())
    }
}

/// Test `line` against `patterns` in order and return the first match.
///
/// The line is trimmed first; a blank line never matches. Patterns are
/// searched anywhere in the line, not anchored.
pub fn match_line(line: &str, patterns: &[Pattern]) -> Option<MatchResult> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    patterns.iter().find_map(|pattern| {
        let caps = pattern.regex.captures(line)?;
        let groups = pattern
            .regex
            .capture_names()
            .flatten()
            .map(|name| {
                let value = caps.name(name).map(|m| m.as_str().to_string());
                (name.to_string(), value)
            })
            .collect();

        Some(MatchResult {
            line: line.to_string(),
            pattern: pattern.as_str().to_string(),
            groups,
        })
    })
}
