//! Domain label handling.
//!
//! A [`LabelSequence`] is the dot-split form of a domain with the most
//! specific label first. Shortening always returns a new sequence.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalize a raw domain string.
///
/// This function:
/// - Converts to lowercase
/// - Trims surrounding whitespace
/// - Removes a single trailing dot (fully-qualified names)
///
/// A leading `www` label is handled by [`LabelSequence::normalize`], not here,
/// so that suffix matching sees the same text the caller typed.
pub fn normalize_domain(domain: &str) -> String {
    let domain = domain.to_lowercase();
    let domain = domain.trim();
    domain.strip_suffix('.').unwrap_or(domain).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelSequence(Vec<String>);

impl LabelSequence {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(labels.into_iter().map(Into::into).collect())
    }

    /// Split a raw domain into labels, dropping a leading `www`.
    pub fn normalize(domain: &str) -> Self {
        let domain = normalize_domain(domain);
        let mut labels: Vec<String> = domain.split('.').map(str::to_string).collect();
        if labels.first().is_some_and(|l| l == "www") {
            labels.remove(0);
        }
        Self(labels)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A single bare token (no dot) is never a queryable domain.
    pub fn is_queryable(&self) -> bool {
        self.0.len() >= 2
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }

    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// A new sequence with the left-most label removed.
    pub fn without_first(&self) -> Self {
        Self(self.0.iter().skip(1).cloned().collect())
    }

    /// A new sequence with every label passed through `f`.
    pub fn map_labels<F>(&self, f: F) -> Self
    where
        F: FnMut(&String) -> String,
    {
        Self(self.0.iter().map(f).collect())
    }

    pub fn to_domain(&self) -> String {
        self.0.join(".")
    }
}

impl fmt::Display for LabelSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_domain())
    }
}
