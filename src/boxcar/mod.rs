//! The boxcar: answers a question by generating SQL and running it under an
//! access policy.
//!
//! A run goes through four steps. The prompt is built from the visible
//! entities and sent to the generator. The reply is parsed into a
//! [`GeneratedAction`]. The approval gate may veto it. Otherwise it executes
//! inside one transaction.

mod action;
mod approval;

pub use action::{ActionSummary, GeneratedAction, PlannedStatement};
pub use approval::{AlwaysApprove, ApprovalMode, ApprovalStrategy, ReadOnlyApproval, RejectAll};

use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::config::{BoxcarConfig, DEFAULT_BOXCAR_NAME};
use crate::db::{DatabaseBackend, DatabaseClient, Schema};
use crate::error::{BoxcarError, Result};
use crate::llm::{build_messages, describe_entities, extract_code, LlmClient, PromptContext};
use crate::policy::{AccessPolicy, DenyList, VisibleEntities};
use crate::query::{Output, TransactionalExecutor};

/// Returns the default description for a boxcar called `name`.
pub fn default_description(name: &str) -> String {
    format!("useful for when you need to query a database for an application named {name}.")
}

/// Builder for [`Boxcar`].
pub struct BoxcarBuilder {
    name: String,
    description: Option<String>,
    requested_entities: Option<Vec<String>>,
    except_entities: Vec<String>,
    system_deny_list: DenyList,
    code_only: bool,
    approval: Arc<dyn ApprovalStrategy>,
    log_generated: bool,
}

impl Default for BoxcarBuilder {
    fn default() -> Self {
        Self {
            name: DEFAULT_BOXCAR_NAME.to_string(),
            description: None,
            requested_entities: None,
            except_entities: Vec::new(),
            system_deny_list: DenyList::system(),
            code_only: false,
            approval: Arc::new(AlwaysApprove),
            log_generated: false,
        }
    }
}

impl fmt::Debug for BoxcarBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxcarBuilder")
            .field("name", &self.name)
            .field("requested_entities", &self.requested_entities)
            .field("except_entities", &self.except_entities)
            .field("system_deny_list", &self.system_deny_list)
            .field("code_only", &self.code_only)
            .field("log_generated", &self.log_generated)
            .finish_non_exhaustive()
    }
}

impl BoxcarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder settings from a configuration section.
    ///
    /// The `prompt` approval mode starts out vetoing every action. A front
    /// end that can ask a human replaces it through [`approval`](Self::approval).
    pub fn from_config(config: &BoxcarConfig) -> Self {
        let approval = config
            .approval
            .strategy()
            .unwrap_or_else(|| Arc::new(RejectAll));

        Self {
            name: config.name.clone(),
            description: config.description.clone(),
            requested_entities: config.tables.clone(),
            except_entities: config.except.clone(),
            system_deny_list: DenyList::new(&config.deny),
            code_only: config.code_only,
            approval,
            log_generated: config.log_generated,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Restricts the boxcar to these entities. Without it every entity in
    /// the catalog is requested.
    pub fn requested_entities<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requested_entities = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Entities removed from the visible set even when requested.
    pub fn except_entities<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.except_entities = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn system_deny_list(mut self, deny_list: DenyList) -> Self {
        self.system_deny_list = deny_list;
        self
    }

    pub fn code_only(mut self, code_only: bool) -> Self {
        self.code_only = code_only;
        self
    }

    pub fn approval(mut self, strategy: Arc<dyn ApprovalStrategy>) -> Self {
        self.approval = strategy;
        self
    }

    pub fn log_generated(mut self, log_generated: bool) -> Self {
        self.log_generated = log_generated;
        self
    }

    /// Validates the settings and creates the boxcar.
    ///
    /// An empty requested list or a blank entity name is a configuration
    /// error here. Requested names missing from the catalog are reported by
    /// the first run, which is when the catalog is read.
    pub fn build(
        self,
        db: Arc<dyn DatabaseClient>,
        llm: Arc<dyn LlmClient>,
    ) -> Result<Boxcar> {
        let policy = AccessPolicy::new(
            self.requested_entities,
            &self.except_entities,
            &self.system_deny_list,
        )?;
        let description = self
            .description
            .unwrap_or_else(|| default_description(&self.name));

        Ok(Boxcar {
            name: self.name,
            description,
            policy,
            code_only: self.code_only,
            approval: self.approval,
            log_generated: self.log_generated,
            db,
            llm,
            scope: OnceCell::new(),
            run_lock: Mutex::new(()),
        })
    }
}

/// What a boxcar may see, computed once.
#[derive(Debug)]
struct VisibleScope {
    backend: DatabaseBackend,
    visible: VisibleEntities,
    schema: Schema,
}

/// Answers questions against one database.
pub struct Boxcar {
    name: String,
    description: String,
    policy: AccessPolicy,
    code_only: bool,
    approval: Arc<dyn ApprovalStrategy>,
    log_generated: bool,
    db: Arc<dyn DatabaseClient>,
    llm: Arc<dyn LlmClient>,
    scope: OnceCell<VisibleScope>,
    /// Serializes runs so transaction scopes of one boxcar never overlap.
    run_lock: Mutex<()>,
}

impl fmt::Debug for Boxcar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Boxcar")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("code_only", &self.code_only)
            .finish_non_exhaustive()
    }
}

impl Boxcar {
    pub fn builder() -> BoxcarBuilder {
        BoxcarBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_code_only(&self) -> bool {
        self.code_only
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// The entities this boxcar may use. Read from the catalog on first call.
    pub async fn visible_entities(&self) -> Result<&VisibleEntities> {
        Ok(&self.scope().await?.visible)
    }

    /// The task sentence put in front of the generator.
    pub async fn task_prompt(&self) -> Result<String> {
        let visible = self.visible_entities().await?;
        Ok(format!(
            "I need a {} using {}.",
            self.name,
            describe_entities(visible)
        ))
    }

    /// Answers `question`.
    ///
    /// Returns the generated code in code-only mode, `Output::Nil` when the
    /// approval gate vetoes the action, and the formatted results after a
    /// commit otherwise. Any failure during execution is rolled back first.
    pub async fn run(&self, question: &str) -> Result<Output> {
        let _guard = self.run_lock.lock().await;
        let scope = self.scope().await?;

        let context = PromptContext {
            name: &self.name,
            description: &self.description,
            backend: scope.backend,
            visible: &scope.visible,
            schema: &scope.schema,
        };
        debug!("Generating code for: {}", question);
        let response = self.llm.complete(&build_messages(&context, question)).await?;
        let code = extract_code(&response);

        if self.log_generated {
            info!("Generated code:\n{}", code);
        }

        if self.code_only {
            debug!("Code-only mode, not executing");
            return Ok(Output::Code(code));
        }

        let action = GeneratedAction::parse(question, code, scope.backend)?;

        if !self.approval.decide(&action) {
            info!("Action vetoed: {}", action.normalized_sql());
            return Ok(Output::Nil);
        }

        let results = TransactionalExecutor::new(self.db.as_ref(), &scope.visible)
            .execute(&action)
            .await?;

        Ok(Output::from_results(results))
    }

    async fn scope(&self) -> Result<&VisibleScope> {
        self.scope
            .get_or_try_init(|| async {
                let catalog = Catalog::load(self.db.as_ref()).await?;
                let visible = self.policy.compute_visible(&catalog)?;
                debug!("Visible entities: {}", describe_entities(&visible));

                Ok::<_, BoxcarError>(VisibleScope {
                    backend: catalog.backend(),
                    schema: catalog.filter(&visible),
                    visible,
                })
            })
            .await
    }
}
