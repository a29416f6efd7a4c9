//! Failure Classifier
//!
//! Decides whether an execution failure means the query text itself is
//! broken (and worth replacing with a simpler query) or something else went
//! wrong.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution failure taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureClass {
    SyntaxError,
    BinderError,
    GroupByMismatch,
    UnresolvedReference,
    /// Data, permission, transport or any other non-structural failure
    Other(String),
}

impl FailureClass {
    /// Structural failures are the ones a fallback query can recover from
    pub fn is_structural(&self) -> bool {
        !matches!(self, FailureClass::Other(_))
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureClass::SyntaxError => write!(f, "SyntaxError"),
            FailureClass::BinderError => write!(f, "BinderError"),
            FailureClass::GroupByMismatch => write!(f, "GroupByMismatch"),
            FailureClass::UnresolvedReference => write!(f, "UnresolvedReference"),
            FailureClass::Other(msg) => write!(f, "Other({})", msg),
        }
    }
}

pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, error: &EngineError) -> FailureClass {
        self.classify_message(&error.message())
    }

    /// Classify a raw backend message. Matching is on the exact substrings
    /// the SQL engine emits.
    pub fn classify_message(&self, message: &str) -> FailureClass {
        if message.contains("syntax error") {
            return FailureClass::SyntaxError;
        }

        if message.contains("Binder Error") {
            return FailureClass::BinderError;
        }

        if message.contains("GROUP BY") {
            return FailureClass::GroupByMismatch;
        }

        if message.contains("not found in FROM clause") {
            return FailureClass::UnresolvedReference;
        }

        FailureClass::Other(message.to_string())
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_binder_error() {
        let classifier = ErrorClassifier::new();
        let error = EngineError::Backend(
            "Binder Error: Referenced column \"revnue\" not found in FROM clause!".to_string(),
        );
        assert_eq!(classifier.classify(&error), FailureClass::BinderError);
    }

    #[test]
    fn test_classify_group_by_and_syntax() {
        let classifier = ErrorClassifier::new();
        assert_eq!(
            classifier.classify_message(
                "column \"month\" must appear in the GROUP BY clause or must be part of an aggregate function"
            ),
            FailureClass::GroupByMismatch
        );
        assert_eq!(
            classifier.classify_message("Parser Error: syntax error at or near \"SELEC\""),
            FailureClass::SyntaxError
        );
        assert_eq!(
            classifier.classify_message("Referenced table \"x\" not found in FROM clause"),
            FailureClass::UnresolvedReference
        );
    }

    #[test]
    fn test_other_failures_are_not_structural() {
        let classifier = ErrorClassifier::new();
        let class = classifier.classify_message("Out of Memory Error: failed to allocate");
        assert!(!class.is_structural());
        assert!(FailureClass::BinderError.is_structural());
    }
}
