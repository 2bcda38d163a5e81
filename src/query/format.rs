//! Result formatting.
//!
//! Turns the per-statement [`QueryResult`]s of an action into the
//! caller-facing [`Output`], and renders that as text or JSON.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::db::{QueryResult, Value};

/// One row as an ordered list of `(column, value)` fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new(fields: Vec<(String, Value)>) -> Self {
        Self { fields }
    }

    /// Returns the value of the first field named `column`.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, &value.to_json())?;
        }
        map.end()
    }
}

/// What `Boxcar::run` hands back.
///
/// The shape follows the result, not the query: any single-column result
/// holding exactly one row is a `Scalar`, so a listing that happens to match
/// one row comes back as a `Scalar` while the same listing matching two rows
/// comes back as `Rows`. Callers that always want records should run the
/// statement themselves or accept both shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// Nothing ran: the action was vetoed.
    Nil,
    /// Code-only mode: the generated code, unexecuted.
    Code(String),
    /// A single value, or the affected-row count of a DML statement.
    Scalar(Value),
    Rows(Vec<Record>),
    /// One output per statement, in statement order.
    Multi(Vec<Output>),
}

impl Output {
    /// Formats the result of one statement.
    ///
    /// A DML result without rows becomes its affected-row count, and a
    /// single row holding a single column becomes that value.
    pub fn from_result(result: QueryResult) -> Self {
        if result.columns.is_empty() {
            if let Some(affected) = result.rows_affected {
                return Self::Scalar(Value::Int(affected as i64));
            }
        }

        if result.columns.len() == 1 && result.rows.len() == 1 {
            if let Some(value) = result.rows.into_iter().next().and_then(|r| r.into_iter().next())
            {
                return Self::Scalar(value);
            }
            return Self::Scalar(Value::Null);
        }

        let names: Vec<String> = result.columns.into_iter().map(|c| c.name).collect();
        let records = result
            .rows
            .into_iter()
            .map(|row| Record::new(names.iter().cloned().zip(row).collect()))
            .collect();
        Self::Rows(records)
    }

    /// Formats the results of a whole action, keeping statement order.
    pub fn from_results(results: Vec<QueryResult>) -> Self {
        let mut outputs: Vec<Output> = results.into_iter().map(Self::from_result).collect();
        if outputs.len() == 1 {
            outputs.remove(0)
        } else {
            Self::Multi(outputs)
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// The scalar as an integer, if it is one.
    pub fn as_int(&self) -> Option<i64> {
        self.as_scalar().and_then(Value::as_int)
    }

    pub fn rows(&self) -> Option<&[Record]> {
        match self {
            Self::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// Renders for a terminal.
    pub fn to_text(&self) -> String {
        match self {
            Self::Nil => "nil".to_string(),
            Self::Code(code) => code.clone(),
            Self::Scalar(value) => value.to_display_string(),
            Self::Rows(records) => format_records(records),
            Self::Multi(outputs) => outputs
                .iter()
                .enumerate()
                .map(|(i, output)| format!("[{}] {}", i + 1, output.to_text()))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Nil => serde_json::Value::Null,
            Self::Code(code) => serde_json::Value::String(code.clone()),
            Self::Scalar(value) => value.to_json(),
            Self::Rows(records) => serde_json::Value::Array(
                records
                    .iter()
                    .map(|record| {
                        serde_json::Value::Object(
                            record
                                .fields
                                .iter()
                                .map(|(name, value)| (name.clone(), value.to_json()))
                                .collect(),
                        )
                    })
                    .collect(),
            ),
            Self::Multi(outputs) => {
                serde_json::Value::Array(outputs.iter().map(Output::to_json).collect())
            }
        }
    }
}

impl Serialize for Output {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Output format selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn render(&self, output: &Output) -> String {
        match self {
            Self::Text => output.to_text(),
            Self::Json => serde_json::to_string_pretty(output)
                .unwrap_or_else(|e| format!("{{\"error\": \"Failed to serialize: {}\"}}", e)),
        }
    }
}

fn format_records(records: &[Record]) -> String {
    let Some(first) = records.first() else {
        return "(no rows)".to_string();
    };

    let headers: Vec<&str> = first.columns().collect();
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|record| record.values().map(Value::to_display_string).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(render_line(headers.iter().copied(), &widths));
    lines.push(
        widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("─┼─"),
    );
    for row in &rows {
        lines.push(render_line(row.iter().map(String::as_str), &widths));
    }
    lines.join("\n")
}

fn render_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, width)| format!("{:width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join(" │ ")
        .trim_end()
        .to_string()
}
