//! Approval gate.
//!
//! An [`ApprovalStrategy`] sees each generated action once, before any
//! transaction is opened, and may veto it.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::action::GeneratedAction;
use crate::error::BoxcarError;

/// Decides whether a generated action may run.
pub trait ApprovalStrategy: Send + Sync {
    fn decide(&self, action: &GeneratedAction) -> bool;
}

impl<F> ApprovalStrategy for F
where
    F: Fn(&GeneratedAction) -> bool + Send + Sync,
{
    fn decide(&self, action: &GeneratedAction) -> bool {
        self(action)
    }
}

/// Approves everything. Used when no strategy is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysApprove;

impl ApprovalStrategy for AlwaysApprove {
    fn decide(&self, _action: &GeneratedAction) -> bool {
        true
    }
}

/// Vetoes everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectAll;

impl ApprovalStrategy for RejectAll {
    fn decide(&self, _action: &GeneratedAction) -> bool {
        false
    }
}

/// Approves only actions that cannot change data.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOnlyApproval;

impl ApprovalStrategy for ReadOnlyApproval {
    fn decide(&self, action: &GeneratedAction) -> bool {
        action.is_read_only()
    }
}

/// Approval modes selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalMode {
    #[default]
    Always,
    Never,
    ReadOnly,
    /// Ask a human. Only a front end that can ask (the CLI) supports it.
    Prompt,
}

impl ApprovalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Never => "never",
            Self::ReadOnly => "read-only",
            Self::Prompt => "prompt",
        }
    }

    /// Returns the strategy for this mode, or `None` for `Prompt`, which the
    /// caller has to supply.
    pub fn strategy(&self) -> Option<Arc<dyn ApprovalStrategy>> {
        match self {
            Self::Always => Some(Arc::new(AlwaysApprove)),
            Self::Never => Some(Arc::new(RejectAll)),
            Self::ReadOnly => Some(Arc::new(ReadOnlyApproval)),
            Self::Prompt => None,
        }
    }
}

impl fmt::Display for ApprovalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ApprovalMode {
    type Err = BoxcarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "always" | "yes" => Ok(Self::Always),
            "never" | "no" => Ok(Self::Never),
            "read-only" | "readonly" | "read_only" => Ok(Self::ReadOnly),
            "prompt" | "ask" => Ok(Self::Prompt),
            other => Err(BoxcarError::config(format!(
                "Unknown approval mode '{other}'. Expected one of: always, never, read-only, prompt"
            ))),
        }
    }
}
