// Copyright 2025 Stoolap Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types for textsql
//!
//! This module defines all error types raised while binding and executing
//! a query pipeline.

use thiserror::Error;

/// Result type alias for textsql operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for query binding and execution
///
/// Every error unwinds synchronously through the pipeline. The only
/// locally recoverable variant is [`Error::RowSkipped`], which stages
/// consume to drop the current row.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // =========================================================================
    // Conversion errors
    // =========================================================================
    /// A value could not be converted to the requested type
    #[error("cannot convert {from} value '{value}' to {to}")]
    Conversion {
        from: String,
        to: String,
        value: String,
    },

    /// Two values of incompatible types were compared
    #[error("cannot compare {left} with {right}")]
    IncomparableTypes { left: String, right: String },

    /// An operator or function was bound to operands of the wrong type
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    // =========================================================================
    // Evaluation errors
    // =========================================================================
    /// Generic expression evaluation failure
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Division by zero
    #[error("division by zero")]
    DivisionByZero,

    /// Integer arithmetic overflowed
    #[error("integer overflow")]
    IntegerOverflow,

    /// A regular expression had no match and no default was given
    #[error("pattern '{pattern}' does not match '{input}'")]
    RegexNoMatch { pattern: String, input: String },

    /// A variable was not bound at evaluation time
    #[error("variable '{0}' is not bound")]
    UnresolvedVariable(String),

    // =========================================================================
    // Group-by errors
    // =========================================================================
    /// A non-aggregated output expression changed value within a group
    #[error("expression '{expression}' not invariant during group by")]
    GroupInvariance { expression: String },

    // =========================================================================
    // Resolution errors
    // =========================================================================
    /// Column not found in any visible scope
    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    /// Unqualified column name matches more than one column
    #[error("column reference '{0}' is ambiguous")]
    AmbiguousColumn(String),

    /// Alias not defined by any visible scope
    #[error("alias '{0}' not found")]
    AliasNotFound(String),

    /// View not found in the view registry
    #[error("view '{0}' not found")]
    ViewNotFound(String),

    /// Variable not declared
    #[error("variable '{0}' not found")]
    VariableNotFound(String),

    /// Function not found in the function registry
    #[error("function '{0}' not found")]
    FunctionNotFound(String),

    /// Query shape rejected while binding
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Invalid function argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // =========================================================================
    // Execution errors
    // =========================================================================
    /// Execution was cancelled through the cancellation token
    #[error("query interrupted")]
    Interrupted,

    /// A leaf source failed to read its input
    #[error("I/O error on '{source_name}': {message}")]
    Io {
        source_name: String,
        message: String,
    },

    /// Row-level skip signal, consumed by the stage that evaluates the row
    #[error("row skipped")]
    RowSkipped,

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new Conversion error
    pub fn conversion(
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
        value: impl Into<String>,
    ) -> Self {
        Error::Conversion {
            from: from.to_string(),
            to: to.to_string(),
            value: value.into(),
        }
    }

    /// Create a new IncomparableTypes error
    pub fn incomparable(left: impl std::fmt::Display, right: impl std::fmt::Display) -> Self {
        Error::IncomparableTypes {
            left: left.to_string(),
            right: right.to_string(),
        }
    }

    /// Create a new TypeMismatch error
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Error::TypeMismatch(message.into())
    }

    /// Create a new Evaluation error
    pub fn evaluation(message: impl Into<String>) -> Self {
        Error::Evaluation(message.into())
    }

    /// Create a new InvalidQuery error
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Error::InvalidQuery(message.into())
    }

    /// Create a new InvalidArgument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// Create a new Io error for the named source
    pub fn io(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Io {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a new Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal(message.into())
    }

    /// Check if this is a conversion error
    pub fn is_conversion_error(&self) -> bool {
        matches!(
            self,
            Error::Conversion { .. } | Error::IncomparableTypes { .. } | Error::TypeMismatch(_)
        )
    }

    /// Check if this is an evaluation error
    pub fn is_evaluation_error(&self) -> bool {
        matches!(
            self,
            Error::Evaluation(_)
                | Error::DivisionByZero
                | Error::IntegerOverflow
                | Error::RegexNoMatch { .. }
                | Error::UnresolvedVariable(_)
        )
    }

    /// Check if this is a bind-time resolution error
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Error::ColumnNotFound(_)
                | Error::AmbiguousColumn(_)
                | Error::AliasNotFound(_)
                | Error::ViewNotFound(_)
                | Error::VariableNotFound(_)
                | Error::FunctionNotFound(_)
        )
    }

    /// Errors no warning policy may downgrade
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Interrupted | Error::Internal(_) | Error::GroupInvariance { .. }
        )
    }

    /// Check if this is the row-skip signal
    #[inline]
    pub fn is_row_skip(&self) -> bool {
        matches!(self, Error::RowSkipped)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::io("<unknown>", err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(Error::DivisionByZero.to_string(), "division by zero");
        assert_eq!(Error::Interrupted.to_string(), "query interrupted");
        assert_eq!(
            Error::ColumnNotFound("foo".to_string()).to_string(),
            "column 'foo' not found"
        );
        assert_eq!(
            Error::GroupInvariance {
                expression: "b".to_string()
            }
            .to_string(),
            "expression 'b' not invariant during group by"
        );
    }

    #[test]
    fn test_structured_error_display() {
        let err = Error::conversion("TEXT", "INTEGER", "abc");
        assert_eq!(err.to_string(), "cannot convert TEXT value 'abc' to INTEGER");

        let err = Error::io("access.log", "permission denied");
        assert_eq!(
            err.to_string(),
            "I/O error on 'access.log': permission denied"
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::conversion("TEXT", "FLOAT", "x").is_conversion_error());
        assert!(Error::DivisionByZero.is_evaluation_error());
        assert!(Error::UnresolvedVariable("v".to_string()).is_evaluation_error());
        assert!(Error::ViewNotFound("v".to_string()).is_resolution_error());
        assert!(!Error::Interrupted.is_resolution_error());
        assert!(Error::RowSkipped.is_row_skip());
        assert!(!Error::DivisionByZero.is_row_skip());
        assert!(Error::Interrupted.is_fatal());
        assert!(!Error::io("a", "b").is_fatal());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.to_string().contains("file not found"));
    }
}
