//! Connection-related data models.
//!
//! This module defines types for database connection configuration and handles.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Supported database types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// Includes MariaDB
    MySQL,
    PostgreSQL,
    /// Reserved: accepted by the configuration surface, never connectable.
    SQLite,
}

impl DatabaseType {
    /// Wire identifier, also used as the handle prefix.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::MySQL => "mysql",
            Self::PostgreSQL => "postgresql",
            Self::SQLite => "sqlite",
        }
    }

    /// Get the display name for this database type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MySQL => "MySQL",
            Self::PostgreSQL => "PostgreSQL",
            Self::SQLite => "SQLite",
        }
    }

    /// Get the default port for this database type.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::MySQL => Some(3306),
            Self::PostgreSQL => Some(5432),
            Self::SQLite => None,
        }
    }

    /// Whether the backend is reached over the network (needs host and user).
    pub fn is_networked(&self) -> bool {
        !matches!(self, Self::SQLite)
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for DatabaseType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::MySQL),
            "postgresql" | "postgres" => Ok(Self::PostgreSQL),
            "sqlite" => Ok(Self::SQLite),
            other => Err(AppError::unsupported_type(
                other,
                "supported types are mysql, postgresql and sqlite",
            )),
        }
    }
}

/// Accepted connection parameters. Immutable once built.
#[derive(Clone)]
pub struct ConnectionConfig {
    pub db_type: DatabaseType,
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Contains sensitive data - never log
    pub password: String,
    pub database: String,
    /// File backend only.
    pub filename: Option<String>,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("db_type", &self.db_type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"****")
            .field("database", &self.database)
            .field("filename", &self.filename)
            .finish()
    }
}

impl ConnectionConfig {
    /// Build a configuration from a `mysql://` / `postgres://` / `sqlite:` URL.
    pub fn from_url(raw: &str) -> AppResult<Self> {
        let url = Url::parse(raw).map_err(|e| AppError::validation(format!("Invalid URL: {}", e)))?;
        let db_type: DatabaseType = url.scheme().parse()?;

        if !db_type.is_networked() {
            let filename = url.path().to_string();
            return Ok(Self {
                db_type,
                host: String::new(),
                port: 0,
                user: String::new(),
                password: String::new(),
                database: filename.clone(),
                filename: Some(filename),
            });
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| AppError::validation("URL has no host"))?
            .to_string();
        let port = url
            .port()
            .or_else(|| db_type.default_port())
            .unwrap_or_default();
        let database = url.path().trim_start_matches('/').to_string();
        if database.is_empty() {
            return Err(AppError::validation("URL has no database name"));
        }

        Ok(Self {
            db_type,
            host,
            port,
            user: decode(url.username()),
            password: url.password().map(decode).unwrap_or_default(),
            database,
            filename: None,
        })
    }

    /// `host:port/database` for log lines. Never includes credentials.
    pub fn target(&self) -> String {
        match &self.filename {
            Some(file) => file.clone(),
            None => format!("{}:{}/{}", self.host, self.port, self.database),
        }
    }
}

/// Percent-decode a URL userinfo component.
fn decode(component: &str) -> String {
    percent_decode_str(component).decode_utf8_lossy().into_owned()
}

/// Request body for opening a connection.
#[derive(Debug, Deserialize, Validate)]
pub struct ConnectRequest {
    #[serde(rename = "type")]
    #[validate(length(min = 1, message = "type is required"))]
    pub db_type: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[validate(length(min = 1, message = "database is required"))]
    pub database: String,
    pub filename: Option<String>,
}

impl ConnectRequest {
    /// Converts the request into a ConnectionConfig, enforcing per-type requirements.
    pub fn into_config(self) -> AppResult<ConnectionConfig> {
        let db_type: DatabaseType = self.db_type.parse()?;

        let host = non_empty(self.host);
        let user = non_empty(self.user);
        let filename = non_empty(self.filename);

        if db_type.is_networked() {
            if host.is_none() {
                return Err(AppError::validation(format!(
                    "host is required for {}",
                    db_type.tag()
                )));
            }
            if user.is_none() {
                return Err(AppError::validation(format!(
                    "user is required for {}",
                    db_type.tag()
                )));
            }
        } else if filename.is_none() {
            return Err(AppError::validation(format!(
                "filename is required for {}",
                db_type.tag()
            )));
        }

        Ok(ConnectionConfig {
            db_type,
            host: host.unwrap_or_default(),
            port: self
                .port
                .or_else(|| db_type.default_port())
                .unwrap_or_default(),
            user: user.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
            database: self.database,
            filename,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Opaque token identifying one live managed connection.
///
/// Format is `<type tag>_<uuid simple>`; callers must not parse it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionHandle(String);

impl ConnectionHandle {
    /// Mint a fresh handle for a backend type.
    pub fn generate(db_type: DatabaseType) -> Self {
        Self(format!("{}_{}", db_type.tag(), Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ConnectionHandle {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ConnectionHandle {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Borrow<str> for ConnectionHandle {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
