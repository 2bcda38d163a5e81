//! Entity catalog.
//!
//! A snapshot of the relational entities (tables and views) a connection
//! exposes, taken once through schema introspection.

use crate::db::{DatabaseBackend, DatabaseClient, Schema, Table};
use crate::error::Result;
use crate::policy::VisibleEntities;
use tracing::debug;

/// Immutable snapshot of the entities available on one connection.
#[derive(Debug, Clone)]
pub struct Catalog {
    backend: DatabaseBackend,
    schema: Schema,
}

impl Catalog {
    /// Introspects `db` and captures its entities.
    pub async fn load(db: &dyn DatabaseClient) -> Result<Self> {
        let schema = db.introspect_schema().await?;
        debug!(
            "Loaded catalog with {} entities from {}",
            schema.tables.len(),
            db.backend()
        );
        Ok(Self::from_schema(db.backend(), schema))
    }

    /// Builds a catalog from an already introspected schema.
    pub fn from_schema(backend: DatabaseBackend, schema: Schema) -> Self {
        Self { backend, schema }
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.backend
    }

    /// Entity names in catalog order.
    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.schema.tables.iter().map(|table| table.name.as_str())
    }

    /// Looks up an entity by name (ASCII case-insensitive).
    pub fn entity(&self, name: &str) -> Option<&Table> {
        self.schema.table(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entity(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.schema.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schema.tables.is_empty()
    }

    /// The full introspected schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The part of the schema covered by `visible`.
    pub fn filter(&self, visible: &VisibleEntities) -> Schema {
        self.schema.restrict(visible)
    }
}
