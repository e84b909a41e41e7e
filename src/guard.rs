//! Read-only SQL guard.
//!
//! When writes are disabled, every statement submitted for execution must be a
//! query, `EXPLAIN` of a query, or a `SHOW` command. Parsing uses the dialect
//! of the connection's backend so vendor syntax is classified correctly.

use sqlparser::ast::Statement;
use sqlparser::dialect::{Dialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

use crate::error::{AppError, AppResult};
use crate::models::DatabaseType;

const READ_ONLY_REASON: &str =
    "only SELECT, SHOW and EXPLAIN statements are allowed while writes are disabled";

/// Get the appropriate SQL dialect for the given database type.
fn get_dialect(db_type: DatabaseType) -> Box<dyn Dialect> {
    match db_type {
        DatabaseType::PostgreSQL => Box::new(PostgreSqlDialect {}),
        DatabaseType::MySQL => Box::new(MySqlDialect {}),
        DatabaseType::SQLite => Box::new(SQLiteDialect {}),
    }
}

/// Reject blank SQL text. Applies regardless of write policy.
pub fn ensure_not_empty(sql: &str) -> AppResult<()> {
    let stripped = sql.trim().trim_end_matches(';').trim();
    if stripped.is_empty() {
        return Err(AppError::validation("Empty SQL statement"));
    }
    Ok(())
}

/// Validate that `sql` only reads.
///
/// Unparseable SQL is a validation error; any write statement is a
/// permission error naming the offending operation.
pub fn validate_readonly(sql: &str, db_type: DatabaseType) -> AppResult<()> {
    ensure_not_empty(sql)?;

    let dialect = get_dialect(db_type);
    let statements = Parser::parse_sql(dialect.as_ref(), sql)
        .map_err(|e| AppError::validation(format!("Failed to parse SQL statement: {}", e)))?;

    if statements.is_empty() {
        return Err(AppError::validation("Empty SQL statement"));
    }

    for stmt in &statements {
        if !is_readonly_statement(stmt) {
            return Err(AppError::permission(operation_name(stmt), READ_ONLY_REASON));
        }
    }

    Ok(())
}

fn is_readonly_statement(stmt: &Statement) -> bool {
    match stmt {
        // EXPLAIN ANALYZE executes its statement, so look through it
        Statement::Explain { statement, .. } => is_readonly_statement(statement),
        _ => matches!(
            stmt,
            Statement::Query(_)
                | Statement::ExplainTable { .. }
                | Statement::ShowCreate { .. }
                | Statement::ShowTables { .. }
                | Statement::ShowColumns { .. }
                | Statement::ShowDatabases { .. }
                | Statement::ShowSchemas { .. }
                | Statement::ShowFunctions { .. }
                | Statement::ShowVariable { .. }
                | Statement::ShowVariables { .. }
                | Statement::ShowStatus { .. }
                | Statement::ShowCollation { .. }
        ),
    }
}

/// Short operation label for permission errors.
fn operation_name(stmt: &Statement) -> &'static str {
    match stmt {
        Statement::Explain { statement, .. } => operation_name(statement),
        Statement::Insert(_) => "INSERT",
        Statement::Update { .. } => "UPDATE",
        Statement::Delete(_) => "DELETE",
        Statement::Merge { .. } => "MERGE",
        Statement::Copy { .. } => "COPY",
        Statement::CreateTable { .. } => "CREATE TABLE",
        Statement::CreateView { .. } => "CREATE VIEW",
        Statement::CreateIndex(_) => "CREATE INDEX",
        Statement::CreateSchema { .. } => "CREATE SCHEMA",
        Statement::CreateDatabase { .. } => "CREATE DATABASE",
        Statement::CreateFunction { .. } => "CREATE FUNCTION",
        Statement::CreateProcedure { .. } => "CREATE PROCEDURE",
        Statement::CreateTrigger { .. } => "CREATE TRIGGER",
        Statement::AlterTable { .. } => "ALTER TABLE",
        Statement::AlterView { .. } => "ALTER VIEW",
        Statement::AlterIndex { .. } => "ALTER INDEX",
        Statement::Drop { .. } => "DROP",
        Statement::DropFunction { .. } => "DROP FUNCTION",
        Statement::DropProcedure { .. } => "DROP PROCEDURE",
        Statement::Truncate { .. } => "TRUNCATE",
        Statement::StartTransaction { .. } => "BEGIN",
        Statement::Commit { .. } => "COMMIT",
        Statement::Rollback { .. } => "ROLLBACK",
        Statement::Call { .. } => "CALL",
        Statement::Execute { .. } => "EXECUTE",
        Statement::Grant { .. } => "GRANT",
        Statement::Revoke { .. } => "REVOKE",
        Statement::Set(_) => "SET",
        Statement::Use(_) => "USE",
        Statement::LockTables { .. } => "LOCK",
        _ => "statement",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PG: DatabaseType = DatabaseType::PostgreSQL;
    const MY: DatabaseType = DatabaseType::MySQL;

    #[test]
    fn test_select_allowed() {
        assert!(validate_readonly("SELECT * FROM users", PG).is_ok());
        assert!(validate_readonly("SELECT `id` FROM `users` LIMIT 5", MY).is_ok());
        assert!(
            validate_readonly(
                "WITH recent AS (SELECT * FROM orders) SELECT count(*) FROM recent",
                PG
            )
            .is_ok()
        );
    }

    #[test]
    fn test_show_and_explain_allowed() {
        assert!(validate_readonly("SHOW TABLES", MY).is_ok());
        assert!(validate_readonly("EXPLAIN SELECT * FROM users", PG).is_ok());
    }

    #[test]
    fn test_writes_rejected() {
        for sql in [
            "INSERT INTO users VALUES (1)",
            "UPDATE users SET name = 'x'",
            "DELETE FROM users",
            "DROP TABLE users",
            "TRUNCATE TABLE users",
            "ALTER TABLE users ADD COLUMN age INT",
            "CREATE TABLE t (id INT)",
        ] {
            let err = validate_readonly(sql, PG).unwrap_err();
            assert!(
                matches!(err, AppError::Permission { .. }),
                "{} should be rejected, got {:?}",
                sql,
                err
            );
        }
    }

    #[test]
    fn test_explain_of_write_rejected() {
        let err = validate_readonly("EXPLAIN DELETE FROM users", PG).unwrap_err();
        match err {
            AppError::Permission { operation, .. } => assert_eq!(operation, "DELETE"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_multi_statement_with_write_rejected() {
        let err = validate_readonly("SELECT 1; DROP TABLE users", MY).unwrap_err();
        assert!(matches!(err, AppError::Permission { .. }));
    }

    #[test]
    fn test_empty_and_garbage() {
        assert!(matches!(
            validate_readonly("   ", PG),
            Err(AppError::Validation { .. })
        ));
        assert!(matches!(
            validate_readonly(" ; ", PG),
            Err(AppError::Validation { .. })
        ));
        assert!(matches!(
            validate_readonly("SELEC * FORM users", PG),
            Err(AppError::Validation { .. })
        ));
    }
}
