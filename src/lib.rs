//! QueryMind Library
//!
//! Multi-backend database session layer (MySQL, PostgreSQL) with schema
//! introspection, a read-only SQL guard, a language-model SQL assistant and
//! the HTTP API that exposes them.

pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod http;
pub mod llm;
pub mod models;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use gateway::DatabaseGateway;
