//! SQL parsing and classification logic.
//!
//! Parses SQL with the dialect of the target backend and rates every
//! statement, including statements nested in CTEs and subqueries. A call to
//! a function outside the backend's allow-list rates at least mutating.

use std::ops::ControlFlow;

use sqlparser::ast::{Expr, Statement, Visit, Visitor};
use sqlparser::parser::Parser;

use crate::db::DatabaseBackend;

use super::functions::is_allowed_function;
use super::{ClassificationResult, SafetyLevel, StatementType};

const DESTRUCTIVE_WARNING: &str = "This action cannot be undone.";

/// Classifies SQL for one database backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlClassifier {
    backend: DatabaseBackend,
}

impl SqlClassifier {
    pub fn new(backend: DatabaseBackend) -> Self {
        Self { backend }
    }

    /// Classifies a SQL string.
    ///
    /// SQL that cannot be parsed is treated as destructive.
    pub fn classify(&self, sql: &str) -> ClassificationResult {
        let dialect = self.backend.dialect();
        match Parser::parse_sql(dialect.as_ref(), sql) {
            Ok(statements) => self.classify_statements(&statements),
            Err(_) => ClassificationResult::with_warning(
                SafetyLevel::Destructive,
                StatementType::Unknown,
                "Could not parse SQL. Please review carefully.",
            ),
        }
    }

    /// Classifies already parsed statements by their most dangerous member.
    pub fn classify_statements(&self, statements: &[Statement]) -> ClassificationResult {
        let classify = |statement: &Statement| classify_statement(statement, self.backend);
        let (level, statement_type) = match statements {
            [] => {
                return ClassificationResult::with_warning(
                    SafetyLevel::Destructive,
                    StatementType::Unknown,
                    "Empty SQL statement",
                )
            }
            [single] => classify(single),
            many => {
                let (level, statement_type) = many
                    .iter()
                    .map(classify)
                    .fold((SafetyLevel::Safe, StatementType::Select), |max, next| {
                        if next.0 > max.0 {
                            next
                        } else {
                            max
                        }
                    });
                (level, StatementType::Multiple(Box::new(statement_type)))
            }
        };

        if level == SafetyLevel::Destructive {
            ClassificationResult::with_warning(level, statement_type, DESTRUCTIVE_WARNING)
        } else {
            ClassificationResult::new(level, statement_type)
        }
    }
}

/// Classifies SQL without keeping a classifier around.
pub fn classify_sql(sql: &str, backend: DatabaseBackend) -> ClassificationResult {
    SqlClassifier::new(backend).classify(sql)
}

/// Walks every statement node, the root included, keeping the worst rating.
struct Severity {
    backend: DatabaseBackend,
    level: SafetyLevel,
    statement_type: StatementType,
}

impl Severity {
    fn raise(&mut self, level: SafetyLevel, statement_type: StatementType) {
        if level > self.level {
            self.level = level;
            self.statement_type = statement_type;
        }
    }
}

impl Visitor for Severity {
    type Break = ();

    fn pre_visit_statement(&mut self, statement: &Statement) -> ControlFlow<()> {
        let (level, statement_type) = rate(statement);
        self.raise(level, statement_type);
        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<()> {
        if let Expr::Function(function) = expr {
            if !is_allowed_function(&function.name, self.backend) {
                self.raise(SafetyLevel::Mutating, StatementType::FunctionCall);
            }
        }
        ControlFlow::Continue(())
    }
}

fn classify_statement(
    statement: &Statement,
    backend: DatabaseBackend,
) -> (SafetyLevel, StatementType) {
    let (level, statement_type) = rate(statement);
    let mut severity = Severity {
        backend,
        level,
        statement_type,
    };
    let _ = statement.visit(&mut severity);
    (severity.level, severity.statement_type)
}

/// Rates a single statement node without looking inside it.
fn rate(statement: &Statement) -> (SafetyLevel, StatementType) {
    match statement {
        Statement::Query(_) => (SafetyLevel::Safe, StatementType::Select),
        Statement::Explain { .. } => (SafetyLevel::Safe, StatementType::Explain),
        Statement::ShowVariable { .. }
        | Statement::ShowTables { .. }
        | Statement::ShowColumns { .. } => (SafetyLevel::Safe, StatementType::Show),

        Statement::Insert(_) => (SafetyLevel::Mutating, StatementType::Insert),
        Statement::Update { .. } => (SafetyLevel::Mutating, StatementType::Update),

        Statement::Delete(_) => (SafetyLevel::Destructive, StatementType::Delete),
        Statement::Drop { .. } => (SafetyLevel::Destructive, StatementType::Drop),
        Statement::Truncate { .. } => (SafetyLevel::Destructive, StatementType::Truncate),
        Statement::AlterTable { .. } => (SafetyLevel::Destructive, StatementType::Alter),
        Statement::CreateTable { .. }
        | Statement::CreateIndex { .. }
        | Statement::CreateView { .. } => (SafetyLevel::Destructive, StatementType::Create),
        Statement::Grant { .. } => (SafetyLevel::Destructive, StatementType::Grant),
        Statement::Revoke { .. } => (SafetyLevel::Destructive, StatementType::Revoke),

        _ => (SafetyLevel::Destructive, StatementType::Unknown),
    }
}
