//! Retryable vs. fatal classification of unit-of-work failures.
//!
//! The executor never matches on concrete error types. It asks the error for
//! an optional store condition code plus its message text, and hands both to
//! an [`ErrorClassifier`]. Swapping the classifier is how another storage
//! backend plugs in its own conflict codes.

use std::borrow::Cow;
use std::fmt::Display;

/// SQLSTATE codes that signal a conflict between concurrent transactions.
///
/// - `40001`: serialization_failure
/// - `40P01`: deadlock_detected
pub const RETRYABLE_CONDITION_CODES: &[&str] = &["40001", "40P01"];

/// Lower-case message fragments that mark an error as a transaction conflict.
pub const RETRYABLE_MESSAGE_FRAGMENTS: &[&str] =
    &["deadlock", "serialization failure", "could not serialize"];

/// Outcome of classifying one failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Conflict with another transaction; re-running the unit of work may succeed.
    Retryable,
    /// Anything else. Propagated on first occurrence.
    Fatal,
}

impl ErrorClass {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorClass::Retryable)
    }
}

/// An error a unit of work (or the store) can fail with.
///
/// `Display` provides the message text the classifier inspects.
pub trait TransactionFailure: Display {
    /// Store-specific condition code (e.g. a PostgreSQL SQLSTATE), if any.
    fn condition_code(&self) -> Option<Cow<'_, str>> {
        None
    }
}

impl TransactionFailure for String {}

impl TransactionFailure for &'static str {}

/// Decides whether a failed attempt is worth retrying.
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, condition_code: Option<&str>, message: &str) -> ErrorClass;

    fn classify_error<E: TransactionFailure + ?Sized>(&self, error: &E) -> ErrorClass
    where
        Self: Sized,
    {
        let code = error.condition_code();
        self.classify(code.as_deref(), &error.to_string())
    }
}

/// Classifier for PostgreSQL-compatible stores.
///
/// Retryable iff the condition code is one of [`RETRYABLE_CONDITION_CODES`]
/// or the message contains one of [`RETRYABLE_MESSAGE_FRAGMENTS`]
/// (case-insensitive).
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresErrorClassifier;

impl ErrorClassifier for PostgresErrorClassifier {
    fn classify(&self, condition_code: Option<&str>, message: &str) -> ErrorClass {
        if let Some(code) = condition_code {
            if RETRYABLE_CONDITION_CODES
                .iter()
                .any(|retryable| code.eq_ignore_ascii_case(retryable))
            {
                return ErrorClass::Retryable;
            }
        }

        let message = message.to_lowercase();
        if RETRYABLE_MESSAGE_FRAGMENTS
            .iter()
            .any(|fragment| message.contains(fragment))
        {
            ErrorClass::Retryable
        } else {
            ErrorClass::Fatal
        }
    }
}

/// Classify with the default PostgreSQL rules.
pub fn classify<E: TransactionFailure + ?Sized>(error: &E) -> ErrorClass {
    PostgresErrorClassifier.classify_error(error)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CodedError {
        code: &'static str,
        message: &'static str,
    }

    impl Display for CodedError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.message)
        }
    }

    impl TransactionFailure for CodedError {
        fn condition_code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }
    }

    #[test]
    fn test_serialization_failure_code_is_retryable() {
        let err = CodedError {
            code: "40001",
            message: "conflict",
        };
        assert_eq!(classify(&err), ErrorClass::Retryable);
    }

    #[test]
    fn test_deadlock_code_is_retryable_regardless_of_case() {
        let err = CodedError {
            code: "40p01",
            message: "boom",
        };
        assert!(classify(&err).is_retryable());
    }

    #[test]
    fn test_constraint_violation_code_is_fatal() {
        let err = CodedError {
            code: "23505",
            message: "duplicate key value violates unique constraint \"tasks_pkey\"",
        };
        assert_eq!(classify(&err), ErrorClass::Fatal);
    }

    #[test]
    fn test_message_fragments_are_retryable() {
        let messages = [
            "ERROR: deadlock detected",
            "Serialization Failure while committing",
            "could not serialize access due to concurrent update",
            "DEADLOCK",
        ];
        for message in messages {
            assert_eq!(
                classify(&message.to_string()),
                ErrorClass::Retryable,
                "{message}"
            );
        }
    }

    #[test]
    fn test_application_errors_are_fatal() {
        assert_eq!(classify(&"task title must not be empty"), ErrorClass::Fatal);
        assert_eq!(classify(&String::new()), ErrorClass::Fatal);
    }

    #[test]
    fn test_message_wins_when_code_is_unrelated() {
        let err = CodedError {
            code: "XX000",
            message: "internal: deadlock while acquiring lock",
        };
        assert_eq!(classify(&err), ErrorClass::Retryable);
    }

    #[test]
    fn test_custom_classifier_can_replace_rules() {
        struct NeverRetry;
        impl ErrorClassifier for NeverRetry {
            fn classify(&self, _: Option<&str>, _: &str) -> ErrorClass {
                ErrorClass::Fatal
            }
        }

        assert_eq!(
            NeverRetry.classify_error(&"deadlock detected".to_string()),
            ErrorClass::Fatal
        );
    }
}
