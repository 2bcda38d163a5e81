//! sql-boxcar - natural-language questions answered by generated SQL.
//!
//! A [`Boxcar`](boxcar::Boxcar) sends a question to a generator along with
//! the entities it may see, then runs the returned SQL inside a transaction
//! that is rolled back on any failure.

pub mod boxcar;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod policy;
pub mod query;
pub mod safety;
