//! Prompt construction for LLM requests.
//!
//! Builds the system prompt from the entities a boxcar may see. Hidden
//! entities never appear in it.

use crate::db::{DatabaseBackend, Schema};
use crate::llm::types::Message;
use crate::policy::VisibleEntities;

/// System prompt template for the SQL generator.
const SYSTEM_PROMPT_TEMPLATE: &str = r#"You are {name}, a SQL assistant for a {dialect} database. You are {description}

I need a {name} using {entities}.

DATABASE SCHEMA:
{schema}

INSTRUCTIONS:
- Generate only valid {dialect} SQL
- Use only the tables listed above; any other table is rejected
- Only SELECT, INSERT, UPDATE and DELETE statements are allowed
- Answer several questions separated by ';' with one statement each, in order
- Use appropriate JOINs based on foreign keys

OUTPUT FORMAT:
Return ONLY the SQL wrapped in a ```sql code block."#;

/// Everything the generator is told about a boxcar.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub backend: DatabaseBackend,
    pub visible: &'a VisibleEntities,
    /// Schema already restricted to `visible`.
    pub schema: &'a Schema,
}

/// Comma-joined names of the visible entities.
pub fn describe_entities(visible: &VisibleEntities) -> String {
    visible.iter().collect::<Vec<_>>().join(", ")
}

pub fn build_system_prompt(context: &PromptContext<'_>) -> String {
    let entities = describe_entities(context.visible);
    let schema = context.schema.format_for_llm();
    fill_template(SYSTEM_PROMPT_TEMPLATE, |key| match key {
        "name" => Some(context.name),
        "description" => Some(context.description),
        "dialect" => Some(context.backend.dialect_name()),
        "entities" => Some(entities.as_str()),
        "schema" => Some(schema.as_str()),
        _ => None,
    })
}

/// Replaces each `{key}` in `template` in a single pass, so substituted text
/// is never scanned again. Unknown keys are kept as written.
fn fill_template<'a>(template: &str, value: impl Fn(&str) -> Option<&'a str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}').and_then(|close| Some((close, value(&after[..close])?))) {
            Some((close, text)) => {
                out.push_str(text);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Builds the request for one question: the system prompt, then the
/// question as the user message.
pub fn build_messages(context: &PromptContext<'_>, question: &str) -> Vec<Message> {
    vec![
        Message::system(build_system_prompt(context)),
        Message::user(question),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::helpdesk_schema;
    use crate::llm::types::Role;

    fn tickets_and_comments() -> VisibleEntities {
        VisibleEntities::from_names(["tickets", "comments"])
    }

    #[test]
    fn test_describe_entities() {
        assert_eq!(describe_entities(&tickets_and_comments()), "tickets, comments");
        assert_eq!(describe_entities(&VisibleEntities::default()), "");
    }

    #[test]
    fn test_system_prompt_carries_context() {
        let visible = tickets_and_comments();
        let schema = helpdesk_schema().restrict(&visible);
        let context = PromptContext {
            name: "Helpdesk",
            description: "useful for helpdesk questions.",
            backend: DatabaseBackend::Sqlite,
            visible: &visible,
            schema: &schema,
        };

        let prompt = build_system_prompt(&context);

        assert!(prompt.contains("I need a Helpdesk using tickets, comments."));
        assert!(prompt.contains("useful for helpdesk questions."));
        assert!(prompt.contains("SQLite"));
        assert!(prompt.contains("Table: tickets"));
        assert!(prompt.contains("Table: comments"));
        assert!(!prompt.contains("Table: users"));
        assert!(!prompt.contains("{"));
    }

    #[test]
    fn test_build_messages() {
        let visible = tickets_and_comments();
        let schema = helpdesk_schema().restrict(&visible);
        let context = PromptContext {
            name: "Data",
            description: "",
            backend: DatabaseBackend::Postgres,
            visible: &visible,
            schema: &schema,
        };

        let messages = build_messages(&context, "count of tickets?");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("PostgreSQL"));
        assert_eq!(messages[1], Message::user("count of tickets?"));
    }

    #[test]
    fn test_placeholders_in_values_are_not_expanded() {
        let visible = tickets_and_comments();
        let schema = helpdesk_schema().restrict(&visible);
        let context = PromptContext {
            name: "{schema}",
            description: "about {entities} and {dialect}",
            backend: DatabaseBackend::Sqlite,
            visible: &visible,
            schema: &schema,
        };

        let prompt = build_system_prompt(&context);

        assert!(prompt.starts_with("You are {schema}, a SQL assistant"));
        assert!(prompt.contains("You are about {entities} and {dialect}"));
        assert_eq!(prompt.matches("Database Schema:").count(), 1);
    }

    #[test]
    fn test_fill_template_keeps_unknown_keys() {
        let filled = fill_template("{a} {b} {", |key| (key == "a").then_some("x"));
        assert_eq!(filled, "x {b} {");
    }
}
