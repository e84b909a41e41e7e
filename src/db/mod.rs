//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Backend capability traits and the per-type adapter factory
//! - MySQL and PostgreSQL adapters, plus the disabled SQLite backend
//! - Row-to-JSON type mappings
//! - The connection registry

pub mod backend;
pub mod mysql;
pub mod postgres;
pub mod registry;
pub mod sqlite;
pub mod types;

pub use backend::{Backend, Backends, Session};
pub use registry::{ConnectionRegistry, ManagedConnection};
