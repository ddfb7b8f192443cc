//! cypher-ogm - object-graph mapper over Cypher databases
//!
//! Declared node and relationship schemas become parameterized statements,
//! which run through a batching executor with classified retry; results are
//! rebuilt into model instances with dirty-tracking.

pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod graph;
pub mod manager;
pub mod models;

pub use error::AppError;
pub use execution::{Batch, BatchExecutor, ResultSet};
pub use manager::{Manager, OrderBy};
