//! Driver implementations for different transports.
//!
//! Each backend implements [`CypherDriver`](crate::graph::CypherDriver).
//!
//! | Backend | Module | Status |
//! |---------|--------|--------|
//! | Transactional HTTP endpoint | [`http`] | Available |
//! | Bolt | `bolt` | Future |
//!
//! # Implementing a Backend
//!
//! 1. Create a driver struct owning the connection or client
//! 2. Implement `CypherDriver::run_statement`, executing one statement per
//!    transaction
//! 3. Map transport failures to `DriverError::Connection` and server-side
//!    rejections to `DriverError::Query` with the database error code

pub mod http;
