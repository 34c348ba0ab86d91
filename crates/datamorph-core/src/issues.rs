//! # Issues
//!
//! The diagnostics sink. Passes report recoverable problems here and keep
//! going; callers decide whether accumulated errors abort.
//!
//! Every warning is mirrored to `tracing` so a CLI run shows them in the log
//! even when the caller discards the list.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How bad an issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

/// What kind of problem an issue describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IssueCode {
    MalformedNotation,
    AmbiguousEdgeType,
    AmbiguousReverseThrough,
    AmbiguousValueType,
    PlatformValueTypeOverridden,
    EdgeClassNotParticipating,
    DuplicateDefinition,
    UndefinedReference,
    CyclicInheritance,
    InvalidCardinality,
    StorageConflict,
    ContainerLimit,
    MissingLink,
}

/// One structured diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub code: IssueCode,
    /// The element the issue is about, in notation form.
    pub subject: Option<String>,
    pub message: String,
}

impl Issue {
    #[must_use]
    pub fn warning(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            subject: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            subject: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn about(mut self, subject: impl fmt::Display) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        match &self.subject {
            Some(subject) => write!(f, "{} [{:?}] {}: {}", level, self.code, subject, self.message),
            None => write!(f, "{} [{:?}] {}", level, self.code, self.message),
        }
    }
}

/// Append-only collector of issues.
pub trait IssueSink {
    fn report(&mut self, issue: Issue);
}

/// The default sink: an ordered list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueList {
    issues: Vec<Issue>,
}

impl IssueList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| !i.is_error())
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.is_error())
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(Issue::is_error)
    }

    /// Whether any issue carries `code`.
    #[must_use]
    pub fn contains(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = Issue>) {
        for issue in issues {
            self.report(issue);
        }
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Issue> {
        self.issues
    }
}

impl IssueSink for IssueList {
    fn report(&mut self, issue: Issue) {
        match issue.severity {
            Severity::Warning => tracing::warn!(code = ?issue.code, "{}", issue.message),
            Severity::Error => tracing::debug!(code = ?issue.code, "{}", issue.message),
        }
        self.issues.push(issue);
    }
}

impl<'a> IntoIterator for &'a IssueList {
    type Item = &'a Issue;
    type IntoIter = std::slice::Iter<'a, Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.issues.iter()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_separates_warnings_and_errors() {
        let mut issues = IssueList::new();
        issues.report(Issue::warning(IssueCode::AmbiguousEdgeType, "picked first"));
        issues.report(Issue::error(IssueCode::UndefinedReference, "missing").about("sp:Pump"));

        assert_eq!(issues.len(), 2);
        assert_eq!(issues.warnings().count(), 1);
        assert_eq!(issues.errors().count(), 1);
        assert!(issues.has_errors());
        assert!(issues.contains(IssueCode::UndefinedReference));
        assert!(!issues.contains(IssueCode::MissingLink));
    }

    #[test]
    fn display_includes_subject() {
        let issue = Issue::error(IssueCode::MissingLink, "no view").about("sp:Pump");
        assert_eq!(issue.to_string(), "error [MissingLink] sp:Pump: no view");
    }

    #[test]
    fn warnings_alone_are_not_errors() {
        let mut issues = IssueList::new();
        issues.extend([Issue::warning(IssueCode::ContainerLimit, "split")]);
        assert!(!issues.has_errors());
        assert!(!issues.is_empty());
    }
}
