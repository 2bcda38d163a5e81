//! Response parsing for LLM outputs.
//!
//! Extracts the generated code from a response that may wrap it in a
//! markdown code block.

/// Result of parsing an LLM response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    /// Any explanatory text around the code block.
    pub text: String,
    /// Contents of the code block, if one was found.
    pub sql: Option<String>,
}

impl ParsedResponse {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sql: None,
        }
    }

    pub fn with_sql(text: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sql: Some(sql.into()),
        }
    }

    /// The code to run: the code block if there was one, otherwise the
    /// whole response.
    pub fn into_code(self) -> String {
        self.sql.unwrap_or(self.text)
    }
}

/// A fenced block located in a response, as byte offsets.
struct Fence<'a> {
    lang: &'a str,
    start: usize,
    body: std::ops::Range<usize>,
    end: usize,
}

/// Parses an LLM response.
///
/// A ```sql block wins over a bare ``` block; among blocks of the same kind
/// the first is used. Blocks tagged with another language are ignored.
pub fn parse_llm_response(response: &str) -> ParsedResponse {
    let fences = find_fences(response);

    let chosen = fences
        .iter()
        .find(|fence| fence.lang.eq_ignore_ascii_case("sql"))
        .or_else(|| fences.iter().find(|fence| fence.lang.is_empty()));

    match chosen {
        Some(fence) => {
            let sql = response[fence.body.clone()].trim();
            let text = format!(
                "{}{}",
                response[..fence.start].trim_end(),
                response[fence.end..].trim_start()
            );
            ParsedResponse::with_sql(text.trim(), sql)
        }
        None => ParsedResponse::text_only(response.trim()),
    }
}

/// Extracts the code to run from a raw response.
pub fn extract_code(response: &str) -> String {
    parse_llm_response(response).into_code()
}

fn find_fences(text: &str) -> Vec<Fence<'_>> {
    let mut fences = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find("```") {
        let start = cursor + offset;
        let after_ticks = start + 3;
        let Some(newline) = text[after_ticks..].find('\n') else {
            break;
        };
        let body_start = after_ticks + newline + 1;
        let lang = text[after_ticks..after_ticks + newline].trim();

        let Some(close) = text[body_start..].find("```") else {
            break;
        };
        let body_end = body_start + close;
        let end = body_end + 3;

        fences.push(Fence {
            lang,
            start,
            body: body_start..body_end,
            end,
        });
        cursor = end;
    }

    fences
}
