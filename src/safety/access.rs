//! Relation-level access checks.
//!
//! Every relation a statement reads or writes, however deeply nested, must
//! be in the visible set. Names bound by a `WITH` clause are allowed inside
//! the query that defines them. Function calls must be on the backend's
//! allow-list, since some functions run SQL text the relation walk never sees.

use std::ops::ControlFlow;

use sqlparser::ast::{
    visit_relations, Expr, ObjectName, Query, SetExpr, Statement, Visit, Visitor,
};

use super::functions::is_allowed_function;
use crate::db::DatabaseBackend;
use crate::error::{BoxcarError, Result};
use crate::policy::VisibleEntities;

/// Schema qualifiers that still address the default schema.
const DEFAULT_SCHEMAS: &[&str] = &["main", "public"];

/// Checks that `statement` is a permitted kind, touches only visible
/// entities and calls only allowed functions of `backend`. Fails with an
/// access violation otherwise.
pub fn check_statement(
    statement: &Statement,
    visible: &VisibleEntities,
    backend: DatabaseBackend,
) -> Result<()> {
    if !is_permitted(statement) {
        return Err(BoxcarError::access_violation(format!(
            "only queries, inserts, updates and deletes may run, got: {}",
            statement_head(statement)
        )));
    }

    let mut checker = RelationChecker {
        visible,
        backend,
        cte_scopes: Vec::new(),
    };

    let targets: &[ObjectName] = match statement {
        Statement::Insert(insert) => std::slice::from_ref(&insert.table_name),
        Statement::Delete(delete) => &delete.tables,
        _ => &[],
    };
    for target in targets {
        if let ControlFlow::Break(message) = checker.pre_visit_relation(target) {
            return Err(BoxcarError::access_violation(message));
        }
    }

    match statement.visit(&mut checker) {
        ControlFlow::Break(message) => Err(BoxcarError::access_violation(message)),
        ControlFlow::Continue(()) => Ok(()),
    }
}

/// Returns true if executing `statement` produces a row set.
pub fn returns_rows(statement: &Statement) -> bool {
    match statement {
        Statement::Query(_) => true,
        Statement::Insert(insert) => insert.returning.is_some(),
        Statement::Update { returning, .. } => returning.is_some(),
        Statement::Delete(delete) => delete.returning.is_some(),
        _ => false,
    }
}

fn is_permitted(statement: &Statement) -> bool {
    matches!(
        statement,
        Statement::Query(_) | Statement::Insert(_) | Statement::Update { .. } | Statement::Delete(_)
    )
}

fn statement_head(statement: &Statement) -> String {
    statement
        .to_string()
        .split_whitespace()
        .take(2)
        .collect::<Vec<_>>()
        .join(" ")
}

struct RelationChecker<'a> {
    visible: &'a VisibleEntities,
    backend: DatabaseBackend,
    /// CTE names bound by each enclosing query, innermost last.
    cte_scopes: Vec<Vec<String>>,
}

impl RelationChecker<'_> {
    fn is_cte(&self, name: &str) -> bool {
        self.cte_scopes
            .iter()
            .flatten()
            .any(|cte| cte.eq_ignore_ascii_case(name))
    }
}

impl Visitor for RelationChecker<'_> {
    type Break = String;

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<String> {
        if let SetExpr::Select(select) = query.body.as_ref() {
            if select.into.is_some() {
                return ControlFlow::Break("SELECT INTO creates a table".to_string());
            }
        }

        let Some(with) = &query.with else {
            self.cte_scopes.push(Vec::new());
            return ControlFlow::Continue(());
        };

        let names: Vec<String> = with
            .cte_tables
            .iter()
            .map(|cte| cte.alias.name.value.clone())
            .collect();

        // Without RECURSIVE a CTE body cannot see itself or later CTEs, so a
        // reference to one of those names would reach a real table instead.
        if !with.recursive {
            let visible = self.visible;
            for (i, cte) in with.cte_tables.iter().enumerate() {
                let later = &names[i..];
                let flow = visit_relations(cte.query.as_ref(), |relation| {
                    match last_ident(relation) {
                        Some(name)
                            if later.iter().any(|n| n.eq_ignore_ascii_case(name))
                                && !visible.contains(name) =>
                        {
                            ControlFlow::Break(format!(
                                "'{name}' is used inside the CTE that defines it"
                            ))
                        }
                        _ => ControlFlow::Continue(()),
                    }
                });
                if flow.is_break() {
                    return flow;
                }
            }
        }

        self.cte_scopes.push(names);
        ControlFlow::Continue(())
    }

    fn post_visit_query(&mut self, _query: &Query) -> ControlFlow<String> {
        self.cte_scopes.pop();
        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<String> {
        match expr {
            Expr::Function(function) if !is_allowed_function(&function.name, self.backend) => {
                ControlFlow::Break(format!("function '{}' is not allowed", function.name))
            }
            _ => ControlFlow::Continue(()),
        }
    }

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<String> {
        let parts = &relation.0;
        let Some(name) = last_ident(relation) else {
            return ControlFlow::Continue(());
        };

        if parts.len() == 1 && self.is_cte(name) {
            return ControlFlow::Continue(());
        }

        let qualifier_ok = match parts.len() {
            1 => true,
            2 => DEFAULT_SCHEMAS
                .iter()
                .any(|schema| parts[0].value.eq_ignore_ascii_case(schema)),
            _ => false,
        };

        if qualifier_ok && self.visible.contains(name) {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(format!("entity '{relation}' is not accessible"))
        }
    }
}

fn last_ident(relation: &ObjectName) -> Option<&str> {
    relation.0.last().map(|ident| ident.value.as_str())
}
