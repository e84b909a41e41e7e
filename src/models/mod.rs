//! Data models for the QueryMind service.
//!
//! This module re-exports all model types used throughout the application.

pub mod assistant;
pub mod connection;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use assistant::{ConvertRequest, ConvertResponse, Optimization, OptimizeRequest, SuggestRequest};
pub use connection::{ConnectRequest, ConnectionConfig, ConnectionHandle, DatabaseType};
pub use query::{ConnectionRequest, ExecuteRequest, QueryResult, Row};
pub use schema::{ColumnDescriptor, KeyRole, SchemaDocument};
