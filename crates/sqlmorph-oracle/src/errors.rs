//! Allow-listed execution errors.

use tracing::trace;

/// How an execution failure affects the current check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Benign, known failure: abandon the check without a report.
    Inconclusive,
    /// Anything else: surface it with the offending query.
    Fatal,
}

/// The set of error-message substrings an oracle tolerates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpectedErrors {
    substrings: Vec<String>,
}

impl ExpectedErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_slices(lists: &[&[&str]]) -> Self {
        let mut errors = Self::new();
        for list in lists {
            errors.add_all(list);
        }
        errors
    }

    pub fn add(&mut self, substring: impl Into<String>) {
        let substring = substring.into();
        if !substring.is_empty() && !self.substrings.contains(&substring) {
            self.substrings.push(substring);
        }
    }

    pub fn add_all(&mut self, substrings: &[&str]) {
        for s in substrings {
            self.add(*s);
        }
    }

    pub fn is_expected(&self, message: &str) -> bool {
        self.substrings.iter().any(|s| message.contains(s.as_str()))
    }

    pub fn classify(&self, message: &str) -> ErrorClass {
        classify(message, self)
    }

    pub fn len(&self) -> usize {
        self.substrings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.substrings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.substrings.iter().map(String::as_str)
    }
}

/// Substring match of `message` against `allow_list`.
pub fn classify(message: &str, allow_list: &ExpectedErrors) -> ErrorClass {
    let class = if allow_list.is_expected(message) {
        ErrorClass::Inconclusive
    } else {
        ErrorClass::Fatal
    };
    trace!(message, ?class, "classified execution error");
    class
}
