//! Introspected database structure and its prompt rendering.

use std::fmt::Write;

use crate::policy::VisibleEntities;

/// Tables, views and foreign keys of a database.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub tables: Vec<Table>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the table with the given name (ASCII case-insensitive).
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|table| table.name.eq_ignore_ascii_case(name))
    }

    /// Returns a copy of the schema holding only the visible tables, and only
    /// the foreign keys whose both ends are visible.
    pub fn restrict(&self, visible: &VisibleEntities) -> Schema {
        let tables = visible
            .iter()
            .filter_map(|name| self.table(name).cloned())
            .collect();

        let foreign_keys = self
            .foreign_keys
            .iter()
            .filter(|fk| visible.contains(&fk.from_table) && visible.contains(&fk.to_table))
            .cloned()
            .collect();

        Schema {
            tables,
            foreign_keys,
        }
    }

    /// Renders the schema as the listing shown to the code generator.
    pub fn format_for_llm(&self) -> String {
        let mut out = String::from("Database Schema:\n\n");
        for table in &self.tables {
            let _ = writeln!(out, "Table: {}", table.name);
            for column in &table.columns {
                let _ = writeln!(out, "  - {}", describe_column(table, column));
            }
            out.push('\n');
        }

        if !self.foreign_keys.is_empty() {
            out.push_str("Foreign Keys:\n");
            for fk in &self.foreign_keys {
                let _ = writeln!(
                    out,
                    "  - {}.{} -> {}.{}",
                    fk.from_table,
                    fk.from_columns.join(", "),
                    fk.to_table,
                    fk.to_columns.join(", ")
                );
            }
        }
        out
    }
}

/// `name: TYPE`, followed by key, nullability and default notes when present.
fn describe_column(table: &Table, column: &Column) -> String {
    let data_type = match column.data_type.as_str() {
        "" => "ANY",
        declared => declared,
    };

    let notes: Vec<String> = [
        table.primary_key.contains(&column.name).then(|| "PK".to_string()),
        (!column.is_nullable).then(|| "NOT NULL".to_string()),
        column.default.as_ref().map(|d| format!("DEFAULT {d}")),
    ]
    .into_iter()
    .flatten()
    .collect();

    if notes.is_empty() {
        format!("{}: {}", column.name, data_type)
    } else {
        format!("{}: {} ({})", column.name, data_type, notes.join(", "))
    }
}

/// A table or view.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,

    /// Column names that form the primary key.
    pub primary_key: Vec<String>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Sets the primary key columns.
    pub fn with_primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Column {
    pub name: String,

    /// Declared data type (e.g., "INTEGER", "varchar(255)").
    pub data_type: String,

    pub is_nullable: bool,
    pub default: Option<String>,
}

impl Column {
    /// Creates a new column with the given name and data type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            default: None,
        }
    }

    pub fn nullable(self, nullable: bool) -> Self {
        Self {
            is_nullable: nullable,
            ..self
        }
    }

    pub fn with_default(self, default: impl Into<String>) -> Self {
        Self {
            default: Some(default.into()),
            ..self
        }
    }
}

/// A possibly composite foreign key.
#[derive(Debug, Clone, Default)]
pub struct ForeignKey {
    pub from_table: String,
    pub from_columns: Vec<String>,

    pub to_table: String,
    pub to_columns: Vec<String>,
}

impl ForeignKey {
    pub fn new(
        from_table: impl Into<String>,
        from_columns: Vec<String>,
        to_table: impl Into<String>,
        to_columns: Vec<String>,
    ) -> Self {
        Self {
            from_table: from_table.into(),
            from_columns,
            to_table: to_table.into(),
            to_columns,
        }
    }
}
