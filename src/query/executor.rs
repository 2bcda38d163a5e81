//! Transactional execution of generated actions.
//!
//! An action runs inside exactly one transaction. Each statement is checked
//! against the visible entities right before it executes; the first failure
//! of any kind rolls the whole transaction back and is returned to the
//! caller unchanged apart from its statement position.

use tracing::{debug, error, warn};

use crate::boxcar::{GeneratedAction, PlannedStatement};
use crate::db::{DatabaseClient, QueryResult, Transaction};
use crate::error::Result;
use crate::logging::{truncate_for_log, DIAGNOSTIC_MESSAGE_LEN};
use crate::policy::VisibleEntities;
use crate::safety::check_statement;

/// Owns one in-flight transaction.
///
/// Consumed by [`commit`](Self::commit) or [`rollback`](Self::rollback).
/// Dropping it unfinished drops the backend transaction, which aborts it.
pub struct TransactionScope {
    tx: Box<dyn Transaction>,
}

impl TransactionScope {
    pub async fn begin(db: &dyn DatabaseClient) -> Result<Self> {
        let tx = db.begin().await?;
        debug!("Transaction opened");
        Ok(Self { tx })
    }

    pub async fn execute(&mut self, planned: &PlannedStatement) -> Result<QueryResult> {
        self.tx.execute(&planned.sql, planned.returns_rows).await
    }

    pub async fn commit(mut self) -> Result<()> {
        self.tx.commit().await?;
        debug!("Transaction committed");
        Ok(())
    }

    pub async fn rollback(mut self) -> Result<()> {
        self.tx.rollback().await?;
        debug!("Transaction rolled back");
        Ok(())
    }
}

/// Runs generated actions against a database under an access policy.
pub struct TransactionalExecutor<'a> {
    db: &'a dyn DatabaseClient,
    visible: &'a VisibleEntities,
}

impl<'a> TransactionalExecutor<'a> {
    pub fn new(db: &'a dyn DatabaseClient, visible: &'a VisibleEntities) -> Self {
        Self { db, visible }
    }

    /// Executes every statement of `action` in one transaction.
    ///
    /// Returns one result per statement after a successful commit. On any
    /// error the transaction is rolled back before the error is returned.
    pub async fn execute(&self, action: &GeneratedAction) -> Result<Vec<QueryResult>> {
        let mut scope = TransactionScope::begin(self.db).await?;

        match self.run_statements(&mut scope, action).await {
            Ok(results) => {
                scope.commit().await?;
                Ok(results)
            }
            Err(err) => {
                error!(
                    "Rolling back: {}",
                    truncate_for_log(&err.to_string(), DIAGNOSTIC_MESSAGE_LEN)
                );
                if let Err(rollback_err) = scope.rollback().await {
                    warn!("Rollback failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }

    async fn run_statements(
        &self,
        scope: &mut TransactionScope,
        action: &GeneratedAction,
    ) -> Result<Vec<QueryResult>> {
        let mut results = Vec::with_capacity(action.len());

        for (position, planned) in action.statements().iter().enumerate() {
            let result = self.run_statement(scope, planned).await.map_err(|err| {
                if action.len() > 1 {
                    err.at_statement(position)
                } else {
                    err
                }
            })?;
            results.push(result);
        }

        Ok(results)
    }

    async fn run_statement(
        &self,
        scope: &mut TransactionScope,
        planned: &PlannedStatement,
    ) -> Result<QueryResult> {
        check_statement(&planned.statement, self.visible, self.db.backend())?;

        debug!("Executing: {}", planned.sql);
        let result = scope.execute(planned).await?;

        if let Some(warning) = result.truncation_warning() {
            warn!("{}", warning);
        }

        Ok(result)
    }
}
