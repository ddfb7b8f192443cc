//! Driver abstraction and statement plumbing.
//!
//! This module defines the seam between the mapper and whatever actually
//! talks to the database:
//!
//! - [`CypherDriver`] - Run one statement, return records or a classified error
//! - [`Statement`] - A batch entry (statement text + parameters)
//! - [`Query`] - Fluent builder executing a single statement through a
//!   [`BatchExecutor`](crate::execution::BatchExecutor)
//! - [`RecordSet`] / [`Row`] - Materialized results
//!
//! # Usage
//!
//! ```ignore
//! use cypher_ogm::execution::BatchExecutor;
//! use cypher_ogm::graph::backends::http::HttpDriver;
//!
//! let driver = HttpDriver::new(&config.connection)?;
//! let executor = BatchExecutor::new(driver, config.execution.clone());
//!
//! let rows = executor.query("MATCH (n:Session) RETURN n.key AS key")
//!     .fetch_all()
//!     .await?;
//! ```

mod macros;
mod query;
mod row;
mod traits;

pub mod backends;

pub use query::{Query, Statement};
pub use row::{Params, QueryStats, RecordSet, Row};
pub use traits::{CypherDriver, DriverError, QueryError, CONSTRAINT_VIOLATION_CODE};

// Re-export macro (defined at crate root via #[macro_export])
#[doc(inline)]
pub use crate::cypher;
