//! Query-related data models.
//!
//! This module defines types for SQL execution requests and results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use validator::Validate;

/// One result row: column name to decoded value.
pub type Row = Map<String, JsonValue>;

/// Result of executing a statement. Transient, never retained.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub row_count: usize,
}

impl QueryResult {
    /// Build a result; the row count is always the length of `rows`.
    pub fn new(rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        Self { rows, row_count }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Request body for executing SQL against an open connection.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    #[validate(length(min = 1, message = "connectionId is required"))]
    pub connection_id: String,
    #[validate(length(min = 1, message = "query is required"))]
    pub query: String,
}

/// Request body addressing an open connection (disconnect, schema analysis).
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    #[validate(length(min = 1, message = "connectionId is required"))]
    pub connection_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_count_matches_rows() {
        let mut row = Row::new();
        row.insert("id".to_string(), json!(1));
        let result = QueryResult::new(vec![row.clone(), row]);
        assert_eq!(result.row_count, 2);
        assert!(!result.is_empty());
        assert!(QueryResult::new(vec![]).is_empty());
    }

    #[test]
    fn test_query_result_serialization() {
        let mut row = Row::new();
        row.insert("name".to_string(), json!("alice"));
        let value = serde_json::to_value(QueryResult::new(vec![row])).unwrap();
        assert_eq!(value, json!({"rows": [{"name": "alice"}], "rowCount": 1}));
    }

    #[test]
    fn test_execute_request_camel_case() {
        let req: ExecuteRequest =
            serde_json::from_value(json!({"connectionId": "mysql_1", "query": "SELECT 1"}))
                .unwrap();
        assert_eq!(req.connection_id, "mysql_1");
        assert!(req.validate().is_ok());

        let empty: ExecuteRequest =
            serde_json::from_value(json!({"connectionId": "", "query": "SELECT 1"})).unwrap();
        assert!(empty.validate().is_err());
    }
}
