//! Integration tests for sql-boxcar.
//!
//! Everything runs against an in-memory SQLite helpdesk, except the
//! PostgreSQL smoke test, which needs TEST_POSTGRES_URL.

pub mod boxcar_test;
pub mod catalog_test;
pub mod common;
pub mod filtered_test;
pub mod postgres_test;
pub mod transaction_test;
