//! Catalog introspection and visibility over the SQLite helpdesk.

use pretty_assertions::assert_eq;

use sql_boxcar::catalog::Catalog;
use sql_boxcar::db::DatabaseBackend;
use sql_boxcar::error::BoxcarError;
use sql_boxcar::policy::{compute_visible, AccessPolicy, DenyList};

use super::common::helpdesk_db;

#[tokio::test]
async fn test_catalog_lists_helpdesk_entities() {
    let db = helpdesk_db().await;
    let catalog = Catalog::load(db.as_ref()).await.unwrap();

    assert_eq!(catalog.backend(), DatabaseBackend::Sqlite);
    assert_eq!(
        catalog.entity_names().collect::<Vec<_>>(),
        vec!["comments", "tickets", "users"]
    );

    let tickets = catalog.entity("TICKETS").unwrap();
    assert_eq!(tickets.primary_key, vec!["id".to_string()]);
    assert!(tickets.columns.iter().any(|c| c.name == "status"));
    assert_eq!(catalog.schema().foreign_keys.len(), 3);
}

#[tokio::test]
async fn test_visible_is_requested_minus_denied() {
    let db = helpdesk_db().await;
    let catalog = Catalog::load(db.as_ref()).await.unwrap();
    let requested = vec!["Users".to_string(), "tickets".to_string()];

    let visible = compute_visible(&catalog, Some(requested.as_slice()), &DenyList::new(["users"]))
        .unwrap();
    assert_eq!(visible.names(), ["tickets".to_string()]);

    let everything = compute_visible(&catalog, None, &DenyList::system()).unwrap();
    assert_eq!(everything.len(), 3);
}

#[tokio::test]
async fn test_policy_reports_unknown_entity() {
    let db = helpdesk_db().await;
    let catalog = Catalog::load(db.as_ref()).await.unwrap();
    let policy = AccessPolicy::new(
        Some(vec!["tickets".to_string(), "invoices".to_string()]),
        &[],
        &DenyList::system(),
    )
    .unwrap();

    let err = policy.compute_visible(&catalog).unwrap_err();

    assert!(matches!(err, BoxcarError::Config(_)));
}

#[tokio::test]
async fn test_filtered_schema_drops_foreign_keys_to_hidden_entities() {
    let db = helpdesk_db().await;
    let catalog = Catalog::load(db.as_ref()).await.unwrap();
    let policy = AccessPolicy::new(None, &["users".to_string()], &DenyList::system()).unwrap();

    let visible = policy.compute_visible(&catalog).unwrap();
    let schema = catalog.filter(&visible);

    assert_eq!(schema.tables.len(), 2);
    assert_eq!(schema.foreign_keys.len(), 1);
    assert_eq!(schema.foreign_keys[0].from_table, "comments");
    assert_eq!(schema.foreign_keys[0].to_table, "tickets");
}
