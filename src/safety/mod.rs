//! Safety checks for generated SQL.
//!
//! Two independent concerns live here:
//! - classification rates parsed statements as safe, mutating or
//!   destructive, which approval strategies use to decide;
//! - access checking rejects statements that touch entities outside the
//!   visible set or that are not plain queries and DML.

mod access;
mod functions;
mod parser;

pub use access::{check_statement, returns_rows};
pub use functions::is_allowed_function;
pub use parser::{classify_sql, SqlClassifier};

use std::fmt;

use serde::Serialize;

/// Safety level of a statement, ordered from harmless to dangerous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLevel {
    /// Read-only queries.
    Safe,
    /// Data modification (INSERT, UPDATE).
    Mutating,
    /// Data loss or schema changes (DELETE, DROP, TRUNCATE, ALTER, ...).
    Destructive,
}

impl SafetyLevel {
    /// Returns true if a human should confirm before this runs.
    pub fn requires_confirmation(&self) -> bool {
        *self > Self::Safe
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => write!(f, "Safe"),
            Self::Mutating => write!(f, "Mutating"),
            Self::Destructive => write!(f, "Destructive"),
        }
    }
}

/// The kind of SQL statement that determined a classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementType {
    Select,
    Insert,
    Update,
    Delete,
    Drop,
    Truncate,
    Alter,
    Create,
    Grant,
    Revoke,
    Explain,
    Show,
    /// A query calling a function that is not known to be side-effect free.
    FunctionCall,
    /// Several statements; holds the kind of the most dangerous one.
    Multiple(Box<StatementType>),
    Unknown,
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select => write!(f, "SELECT"),
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
            Self::Drop => write!(f, "DROP"),
            Self::Truncate => write!(f, "TRUNCATE"),
            Self::Alter => write!(f, "ALTER"),
            Self::Create => write!(f, "CREATE"),
            Self::Grant => write!(f, "GRANT"),
            Self::Revoke => write!(f, "REVOKE"),
            Self::Explain => write!(f, "EXPLAIN"),
            Self::Show => write!(f, "SHOW"),
            Self::FunctionCall => write!(f, "FUNCTION CALL"),
            Self::Multiple(inner) => write!(f, "Multiple ({})", inner),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Result of classifying one piece of SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    pub level: SafetyLevel,
    pub statement_type: StatementType,
    /// Message worth showing next to the SQL, if any.
    pub warning: Option<String>,
}

impl ClassificationResult {
    pub fn new(level: SafetyLevel, statement_type: StatementType) -> Self {
        Self {
            level,
            statement_type,
            warning: None,
        }
    }

    pub fn with_warning(
        level: SafetyLevel,
        statement_type: StatementType,
        warning: impl Into<String>,
    ) -> Self {
        Self {
            level,
            statement_type,
            warning: Some(warning.into()),
        }
    }

    /// Returns true when nothing in the SQL can change data.
    pub fn is_read_only(&self) -> bool {
        self.level == SafetyLevel::Safe
    }

    pub fn requires_confirmation(&self) -> bool {
        self.level.requires_confirmation()
    }
}
