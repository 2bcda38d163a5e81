//! Generated actions.
//!
//! The raw code returned by the generator is never executed as text. It is
//! parsed into statements first, and only their normalized rendering runs.

use serde::Serialize;
use sqlparser::ast::Statement;
use sqlparser::parser::Parser;

use crate::db::DatabaseBackend;
use crate::error::{BoxcarError, Result};
use crate::safety::{returns_rows, ClassificationResult, SqlClassifier};

/// One parsed statement of an action, ready to execute.
#[derive(Debug, Clone)]
pub struct PlannedStatement {
    pub statement: Statement,
    /// Normalized SQL rendered from `statement`.
    pub sql: String,
    pub returns_rows: bool,
}

impl PlannedStatement {
    fn new(statement: Statement) -> Self {
        Self {
            sql: statement.to_string(),
            returns_rows: returns_rows(&statement),
            statement,
        }
    }
}

/// The code produced for one question, parsed and classified.
#[derive(Debug, Clone)]
pub struct GeneratedAction {
    question: String,
    code: String,
    statements: Vec<PlannedStatement>,
    classification: ClassificationResult,
}

impl GeneratedAction {
    /// Parses generated `code` with the dialect of `backend`.
    ///
    /// Code that does not parse, or holds no statement, is an execution error.
    pub fn parse(
        question: impl Into<String>,
        code: impl Into<String>,
        backend: DatabaseBackend,
    ) -> Result<Self> {
        let code = code.into();
        let dialect = backend.dialect();
        let statements = Parser::parse_sql(dialect.as_ref(), &code)
            .map_err(|e| BoxcarError::execution(format!("SQL parse error: {e}")))?;

        if statements.is_empty() {
            return Err(BoxcarError::execution("generated code holds no SQL statement"));
        }

        let classification = SqlClassifier::new(backend).classify_statements(&statements);

        Ok(Self {
            question: question.into(),
            code,
            statements: statements.into_iter().map(PlannedStatement::new).collect(),
            classification,
        })
    }

    /// The question this action answers.
    pub fn question(&self) -> &str {
        &self.question
    }

    /// The generated code, untouched.
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn statements(&self) -> &[PlannedStatement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn classification(&self) -> &ClassificationResult {
        &self.classification
    }

    pub fn is_read_only(&self) -> bool {
        self.classification.is_read_only()
    }

    /// The SQL that will run, one normalized statement per line.
    pub fn normalized_sql(&self) -> String {
        self.statements
            .iter()
            .map(|planned| format!("{};", planned.sql))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// What an approval prompt or a log line shows about an action.
#[derive(Debug, Serialize)]
pub struct ActionSummary<'a> {
    pub question: &'a str,
    pub sql: String,
    pub level: crate::safety::SafetyLevel,
    pub statements: usize,
}

impl<'a> From<&'a GeneratedAction> for ActionSummary<'a> {
    fn from(action: &'a GeneratedAction) -> Self {
        Self {
            question: action.question(),
            sql: action.normalized_sql(),
            level: action.classification().level,
            statements: action.len(),
        }
    }
}
