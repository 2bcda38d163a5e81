//! Mock LLM client for testing.
//!
//! Answers questions about the sample helpdesk application (users, tickets,
//! comments) with deterministic SQL.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{BoxcarError, Result};
use crate::llm::types::{Message, Role};
use crate::llm::LlmClient;

/// Helpdesk questions the mock understands. Every keyword of an entry must
/// appear in the question; the first matching entry wins.
const HELPDESK_ANSWERS: &[(&[&str], &str)] = &[
    (
        &["count", "comments", "first ticket"],
        "SELECT COUNT(*) FROM comments WHERE ticket_id = (SELECT MIN(id) FROM tickets)",
    ),
    (
        &["first comment", "first ticket"],
        "SELECT content FROM comments WHERE ticket_id = (SELECT MIN(id) FROM tickets) ORDER BY id LIMIT 1",
    ),
    (
        &["comments", "third ticket"],
        "SELECT content FROM comments WHERE ticket_id = (SELECT id FROM tickets ORDER BY id LIMIT 1 OFFSET 2) ORDER BY id",
    ),
    (
        &["open tickets", "closed"],
        "UPDATE tickets SET status = 'closed' WHERE status = 'open'",
    ),
    (
        &["add", "ticket"],
        "INSERT INTO tickets (title, user_id, status) VALUES ('New ticket', 1, 'open')",
    ),
    (&["delete", "comments"], "DELETE FROM comments"),
    (&["count", "tickets"], "SELECT COUNT(*) FROM tickets"),
    (&["count", "comments"], "SELECT COUNT(*) FROM comments"),
    (&["count", "users"], "SELECT COUNT(*) FROM users"),
    (
        &["open tickets"],
        "SELECT id, title FROM tickets WHERE status = 'open' ORDER BY id",
    ),
    (&["first ticket"], "SELECT title FROM tickets ORDER BY id LIMIT 1"),
    (&["all users"], "SELECT id, name FROM users ORDER BY id"),
];

const NOT_UNDERSTOOD: &str = "I don't understand that question. Could you please rephrase it?";

/// Mock LLM client that returns canned responses based on input patterns.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    /// Custom response mappings (pattern -> response), checked first.
    custom_responses: Vec<(String, String)>,
    error: Option<String>,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// When the question contains `pattern`, return `response` verbatim.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into().to_lowercase(), response.into()));
        self
    }

    /// Makes every completion fail with an LLM error.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    /// Every message list received so far, oldest first.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Vec<Message>>> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn mock_response(&self, input: &str) -> String {
        let input_lower = input.to_lowercase();

        for (pattern, response) in &self.custom_responses {
            if input_lower.contains(pattern) {
                return response.clone();
            }
        }

        let statements: Option<Vec<&str>> = input_lower
            .split(';')
            .map(str::trim)
            .filter(|question| !question.is_empty())
            .map(helpdesk_sql)
            .collect();

        match statements {
            Some(statements) if !statements.is_empty() => {
                format!("```sql\n{};\n```", statements.join(";\n"))
            }
            _ => NOT_UNDERSTOOD.to_string(),
        }
    }

    /// Extracts the last user message content from a message list.
    fn extract_user_input(messages: &[Message]) -> &str {
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

fn helpdesk_sql(question: &str) -> Option<&'static str> {
    HELPDESK_ANSWERS
        .iter()
        .find(|(keywords, _)| keywords.iter().all(|keyword| question.contains(keyword)))
        .map(|(_, sql)| *sql)
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        self.lock().push(messages.to_vec());

        if let Some(message) = &self.error {
            return Err(BoxcarError::llm(message.clone()));
        }

        Ok(self.mock_response(Self::extract_user_input(messages)))
    }
}
