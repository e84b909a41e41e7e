//! Configuration handling for the QueryMind service.
//!
//! This module provides configuration management via CLI arguments and environment variables.

use axum::http::HeaderValue;
use clap::Parser;
use std::time::Duration;
use url::Url;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 5000;
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

// Rate limiting defaults
pub const DEFAULT_RATE_LIMIT_MAX: u32 = 100;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 15 * 60;
pub const DEFAULT_QUERY_RATE_LIMIT_MAX: u32 = 10;
pub const DEFAULT_QUERY_RATE_LIMIT_WINDOW_SECS: u64 = 60;

// Language model defaults
pub const DEFAULT_OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_TRANSLATE_MODEL: &str = "openai/gpt-4-turbo";
pub const DEFAULT_SUGGEST_MODEL: &str = "openai/gpt-3.5-turbo";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

/// Configuration for the QueryMind service.
#[derive(Clone, Parser)]
#[command(
    name = "querymind",
    about = "Natural-language SQL service - connect to MySQL/PostgreSQL, run queries and translate questions to SQL",
    version,
    author
)]
pub struct Config {
    /// HTTP host to bind to
    #[arg(long, default_value = DEFAULT_HTTP_HOST, env = "HOST")]
    pub host: String,

    /// HTTP port to bind to
    #[arg(long, default_value_t = DEFAULT_HTTP_PORT, env = "PORT")]
    pub port: u16,

    /// Origins allowed by CORS (credentials are allowed for these).
    /// Can be specified multiple times or as comma-separated values.
    #[arg(
        long = "allowed-origins",
        value_name = "ORIGIN",
        default_value = DEFAULT_ALLOWED_ORIGIN,
        env = "ALLOWED_ORIGINS",
        value_delimiter = ','
    )]
    pub allowed_origins: Vec<String>,

    /// Connect, acquire and idle timeout for database sessions, in seconds
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS, env = "CONNECT_TIMEOUT")]
    pub connect_timeout: u64,

    /// Allow statements other than SELECT/SHOW/EXPLAIN on the execute endpoint
    #[arg(long, env = "ALLOW_WRITES")]
    pub allow_writes: bool,

    /// Requests per client per global window
    #[arg(long, default_value_t = DEFAULT_RATE_LIMIT_MAX, env = "RATE_LIMIT_MAX")]
    pub rate_limit_max: u32,

    /// Global rate limit window in seconds
    #[arg(long, default_value_t = DEFAULT_RATE_LIMIT_WINDOW_SECS, env = "RATE_LIMIT_WINDOW")]
    pub rate_limit_window: u64,

    /// Requests per client per window on /api/query/*
    #[arg(long, default_value_t = DEFAULT_QUERY_RATE_LIMIT_MAX, env = "QUERY_RATE_LIMIT_MAX")]
    pub query_rate_limit_max: u32,

    /// Query endpoint rate limit window in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_QUERY_RATE_LIMIT_WINDOW_SECS,
        env = "QUERY_RATE_LIMIT_WINDOW"
    )]
    pub query_rate_limit_window: u64,

    /// OpenRouter API key. Contains sensitive data - never log
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    pub openrouter_api_key: Option<String>,

    /// OpenRouter chat completions endpoint
    #[arg(long = "openrouter-url", default_value = DEFAULT_OPENROUTER_URL, env = "OPENROUTER_API_URL")]
    pub openrouter_url: String,

    /// Model used to translate and optimize queries
    #[arg(long, default_value = DEFAULT_TRANSLATE_MODEL, env = "TRANSLATE_MODEL")]
    pub translate_model: String,

    /// Model used for improvement suggestions
    #[arg(long, default_value = DEFAULT_SUGGEST_MODEL, env = "SUGGEST_MODEL")]
    pub suggest_model: String,

    /// Language model request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_LLM_TIMEOUT_SECS, env = "LLM_TIMEOUT")]
    pub llm_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            host: DEFAULT_HTTP_HOST.to_string(),
            port: DEFAULT_HTTP_PORT,
            allowed_origins: vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            allow_writes: false,
            rate_limit_max: DEFAULT_RATE_LIMIT_MAX,
            rate_limit_window: DEFAULT_RATE_LIMIT_WINDOW_SECS,
            query_rate_limit_max: DEFAULT_QUERY_RATE_LIMIT_MAX,
            query_rate_limit_window: DEFAULT_QUERY_RATE_LIMIT_WINDOW_SECS,
            openrouter_api_key: None,
            openrouter_url: DEFAULT_OPENROUTER_URL.to_string(),
            translate_model: DEFAULT_TRANSLATE_MODEL.to_string(),
            suggest_model: DEFAULT_SUGGEST_MODEL.to_string(),
            llm_timeout: DEFAULT_LLM_TIMEOUT_SECS,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Check values clap cannot check on its own.
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("port must be greater than 0".to_string());
        }
        if self.connect_timeout == 0 {
            return Err("connect-timeout must be greater than 0".to_string());
        }
        if self.rate_limit_max == 0 || self.query_rate_limit_max == 0 {
            return Err("rate limit maxima must be greater than 0".to_string());
        }
        if self.rate_limit_window == 0 || self.query_rate_limit_window == 0 {
            return Err("rate limit windows must be greater than 0".to_string());
        }
        if self.llm_timeout == 0 {
            return Err("llm-timeout must be greater than 0".to_string());
        }
        Url::parse(&self.openrouter_url)
            .map_err(|e| format!("invalid openrouter-url '{}': {}", self.openrouter_url, e))?;
        self.cors_origins()?;
        Ok(())
    }

    /// Parsed CORS allow-list.
    pub fn cors_origins(&self) -> Result<Vec<HeaderValue>, String> {
        self.allowed_origins
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .map_err(|e| format!("invalid allowed origin '{}': {}", origin, e))
            })
            .collect()
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the connection timeout as a Duration.
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn rate_limit_window_duration(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window)
    }

    pub fn query_rate_limit_window_duration(&self) -> Duration {
        Duration::from_secs(self.query_rate_limit_window)
    }

    pub fn llm_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.llm_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("allowed_origins", &self.allowed_origins)
            .field("connect_timeout", &self.connect_timeout)
            .field("allow_writes", &self.allow_writes)
            .field("rate_limit_max", &self.rate_limit_max)
            .field("rate_limit_window", &self.rate_limit_window)
            .field("query_rate_limit_max", &self.query_rate_limit_max)
            .field("query_rate_limit_window", &self.query_rate_limit_window)
            .field(
                "openrouter_api_key",
                &self.openrouter_api_key.as_ref().map(|_| "****"),
            )
            .field("openrouter_url", &self.openrouter_url)
            .field("translate_model", &self.translate_model)
            .field("suggest_model", &self.suggest_model)
            .field("llm_timeout", &self.llm_timeout)
            .field("log_level", &self.log_level)
            .field("json_logs", &self.json_logs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.host, DEFAULT_HTTP_HOST);
        assert_eq!(config.port, DEFAULT_HTTP_PORT);
        assert!(!config.allow_writes);
        assert_eq!(config.rate_limit_max, 100);
        assert_eq!(config.rate_limit_window, 900);
        assert_eq!(config.query_rate_limit_max, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_from_args() {
        let config = Config::try_parse_from([
            "querymind",
            "--port",
            "8081",
            "--allowed-origins",
            "http://a.test,http://b.test",
            "--allow-writes",
        ])
        .unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.allowed_origins.len(), 2);
        assert!(config.allow_writes);
    }

    #[test]
    fn test_http_bind_addr() {
        let config = Config {
            host: "0.0.0.0".to_string(),
            port: 3000,
            ..Config::default()
        };
        assert_eq!(config.http_bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_timeout_durations() {
        let config = Config {
            connect_timeout: 15,
            rate_limit_window: 30,
            llm_timeout: 5,
            ..Config::default()
        };
        assert_eq!(config.connect_timeout_duration(), Duration::from_secs(15));
        assert_eq!(config.rate_limit_window_duration(), Duration::from_secs(30));
        assert_eq!(config.llm_timeout_duration(), Duration::from_secs(5));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = Config {
            rate_limit_max: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            query_rate_limit_window: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            connect_timeout: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_origin_and_url() {
        let config = Config {
            allowed_origins: vec!["http://ok.test".to_string(), "bad\norigin".to_string()],
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            openrouter_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_masks_api_key() {
        let config = Config {
            openrouter_api_key: Some("sk-secret".to_string()),
            ..Config::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
    }
}
