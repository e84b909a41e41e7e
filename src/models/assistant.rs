//! Request and response models for the SQL assistant endpoints.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::schema::SchemaDocument;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRequest {
    #[validate(length(min = 1, message = "naturalLanguage is required"))]
    pub natural_language: String,
    pub schema: Option<SchemaDocument>,
    #[validate(length(min = 1, message = "dbType is required"))]
    pub db_type: String,
    /// Locale hint for the input text (`en`, `hi`, `es`, ...)
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "en".to_string()
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeRequest {
    #[validate(length(min = 1, message = "sqlQuery is required"))]
    pub sql_query: String,
    #[validate(length(min = 1, message = "dbType is required"))]
    pub db_type: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SuggestRequest {
    #[validate(length(min = 1, message = "sqlQuery is required"))]
    pub sql_query: String,
    pub schema: Option<SchemaDocument>,
    #[validate(length(min = 1, message = "dbType is required"))]
    pub db_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub sql_query: String,
    pub natural_language: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Structured result of a query optimization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Optimization {
    pub optimized_query: String,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub estimated_performance_gain: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_convert_request_defaults_language() {
        let req: ConvertRequest = serde_json::from_value(json!({
            "naturalLanguage": "show all users",
            "schema": {"users": [{"name": "id", "dataType": "int", "nullable": false}]},
            "dbType": "mysql"
        }))
        .unwrap();
        assert_eq!(req.language, "en");
        assert_eq!(req.schema.unwrap().len(), 1);
    }

    #[test]
    fn test_optimization_tolerates_missing_fields() {
        let opt: Optimization =
            serde_json::from_value(json!({"optimizedQuery": "SELECT id FROM t"})).unwrap();
        assert!(opt.improvements.is_empty());
        assert_eq!(opt.estimated_performance_gain, "");
    }
}
