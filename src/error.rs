//! Error taxonomy and per-variable diagnostics.
//!
//! Two channels: `Error` for failures that stop a variable (or the whole
//! conversion), `Diagnostic` for findings that are reported but never
//! block output. Diagnostics carry the variable name and a human-readable
//! reason; they never expose AST internals.

use crate::defaults::Mismatch;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Malformed type expression. `snippet` is the offending substring.
    #[error("invalid type expression near `{snippet}`: {reason}")]
    TypeSyntax { snippet: String, reason: String },

    /// A constructor name the grammar does not know. Handling is a policy
    /// choice: fatal, or degrade the variable to the open `any` schema.
    #[error("unknown type constructor `{name}` near `{snippet}`")]
    UnknownTypeConstructor { name: String, snippet: String },

    /// Adversarially nested input exceeded the configured depth bound.
    #[error("type expression nests deeper than the configured limit of {limit}")]
    MaxNestingDepthExceeded { limit: usize },

    /// A schema with no inputs is meaningless; no partial document is built.
    #[error("no variables to convert")]
    EmptyVariableSet,

    /// A per-variable failure, tagged with the variable's name.
    #[error("variable `{name}`: {source}")]
    Variable {
        name: String,
        #[source]
        source: Box<Error>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A non-fatal finding attached to one variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub variable: String,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    /// A declared default that does not fit its declared type. The default
    /// is still carried into the schema; this only reports the mismatch.
    pub fn default_mismatch(variable: &str, m: &Mismatch) -> Self {
        Diagnostic {
            variable: variable.to_string(),
            severity: Severity::Warning,
            message: format!(
                "default value mismatch at `{}`: expected {}, found {}",
                m.path, m.expected, m.found
            ),
        }
    }

    /// Unknown constructor resolved by the fallback-to-`any` policy.
    pub fn degraded_unknown(variable: &str, ctor: &str) -> Self {
        Diagnostic {
            variable: variable.to_string(),
            severity: Severity::Warning,
            message: format!(
                "unknown type constructor `{ctor}`; schema degraded to the open `any` form"
            ),
        }
    }

    /// Lenient mode dropped this variable from the document.
    pub fn skipped(variable: &str, err: &Error) -> Self {
        Diagnostic {
            variable: variable.to_string(),
            severity: Severity::Error,
            message: format!("variable omitted from the document: {err}"),
        }
    }

    /// Lenient mode replaced this variable's schema with the open `any` form.
    pub fn degraded(variable: &str, err: &Error) -> Self {
        Diagnostic {
            variable: variable.to_string(),
            severity: Severity::Error,
            message: format!("schema degraded to the open `any` form: {err}"),
        }
    }
}
