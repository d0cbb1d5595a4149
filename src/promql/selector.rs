//! Label selectors.
//!
//! Dashboard definitions pass selectors around as loose string fragments
//! (`job="api"`, `code=~"5.."`). Fragments from different sources are merged
//! with [`merge_selectors`] and parsed into [`LabelMatcher`]s before they are
//! attached to a vector selector, so a typo in a definition fails at
//! generation time instead of producing a broken panel.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::error::{DashgenError, Result};

static MATCHER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^([a-zA-Z_][a-zA-Z0-9_]*)\s*(=~|!~|!=|=)\s*"((?:\\.|[^"\\])*)""#)
        .expect("label matcher regex is valid")
});

/// Label matching operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOp {
    Equal,
    NotEqual,
    RegexMatch,
    RegexNotMatch,
}

impl MatchOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchOp::Equal => "=",
            MatchOp::NotEqual => "!=",
            MatchOp::RegexMatch => "=~",
            MatchOp::RegexNotMatch => "!~",
        }
    }

    fn parse(op: &str) -> Option<Self> {
        match op {
            "=" => Some(MatchOp::Equal),
            "!=" => Some(MatchOp::NotEqual),
            "=~" => Some(MatchOp::RegexMatch),
            "!~" => Some(MatchOp::RegexNotMatch),
            _ => None,
        }
    }
}

/// A single `name<op>"value"` matcher.
///
/// `value` holds the text between the quotes exactly as written, escape
/// sequences included, so rendering reproduces the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMatcher {
    pub name: String,
    pub op: MatchOp,
    pub value: String,
}

impl LabelMatcher {
    pub fn new(name: impl Into<String>, op: MatchOp, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, MatchOp::Equal, value)
    }
}

impl fmt::Display for LabelMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}\"{}\"", self.name, self.op.as_str(), self.value)
    }
}

/// Merge selector fragments into one comma separated selector string.
///
/// Empty and whitespace-only fragments are dropped (a blank fragment would
/// otherwise fail [`parse_selectors`]) and order is preserved.
pub fn merge_selectors<I, S>(fragments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fragments
        .into_iter()
        .filter(|s| !s.as_ref().trim().is_empty())
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a comma separated selector string into matchers.
///
/// Every fragment must match the `label<op>"value"` grammar; the first one
/// that does not is reported together with the full input.
pub fn parse_selectors(input: &str) -> Result<Vec<LabelMatcher>> {
    let mut matchers = Vec::new();
    let mut rest = input;

    loop {
        let fragment = rest.trim_start();
        if fragment.is_empty() {
            break;
        }

        let caps = MATCHER_RE
            .captures(fragment)
            .ok_or_else(|| invalid_fragment(fragment, input))?;
        let op = MatchOp::parse(&caps[2]).ok_or_else(|| invalid_fragment(fragment, input))?;
        matchers.push(LabelMatcher::new(&caps[1], op, &caps[3]));

        let matched_len = caps.get(0).map(|m| m.end()).unwrap_or(fragment.len());
        let after = fragment[matched_len..].trim_start();
        if after.is_empty() {
            break;
        }
        match after.strip_prefix(',') {
            Some(next) => rest = next,
            None => return Err(invalid_fragment(after, input)),
        }
    }

    Ok(matchers)
}

fn invalid_fragment(fragment: &str, input: &str) -> DashgenError {
    let fragment = fragment.split(',').next().unwrap_or(fragment).trim();
    DashgenError::Selector {
        fragment: fragment.to_string(),
        input: input.to_string(),
    }
}
