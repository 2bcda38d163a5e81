//! Query execution and result formatting for sql-boxcar.
//!
//! Runs generated actions inside a transaction and shapes their results
//! for the caller.

pub mod executor;
pub mod format;

pub use executor::{TransactionScope, TransactionalExecutor};
pub use format::{Output, OutputFormat, Record};
