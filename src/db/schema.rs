//! Schema introspection.
//!
//! Reads `information_schema` through the regular execution path, so
//! introspection queries are logged like any other statement. Metadata is
//! always filtered by the literal database name, which can differ from the
//! app name the pool connects with.

use crate::db::executor::{ExecuteOptions, QueryExecutor};
use crate::error::DbResult;
use crate::models::{ColumnInfo, FormattedQuery, QueryParam, Row, TableDescription};
use serde_json::Value as JsonValue;
use tracing::debug;

mod queries {
    pub const DESCRIBE_COLUMNS: &str = r#"
        SELECT
            CONVERT(TABLE_NAME USING utf8mb4) AS table_name,
            CONVERT(COLUMN_NAME USING utf8mb4) AS column_name,
            CONVERT(COLUMN_TYPE USING utf8mb4) AS column_type,
            CONVERT(IS_NULLABLE USING utf8mb4) AS is_nullable,
            CONVERT(COLUMN_DEFAULT USING utf8mb4) AS column_default,
            CONVERT(COLUMN_KEY USING utf8mb4) AS column_key,
            CONVERT(EXTRA USING utf8mb4) AS extra,
            CONVERT(COLUMN_COMMENT USING utf8mb4) AS column_comment,
            DATETIME_PRECISION AS datetime_precision
        FROM information_schema.columns
        WHERE table_schema = ? AND table_name IN (?)
        ORDER BY table_name, ordinal_position
        "#;

    pub const LIST_TABLES: &str = r#"
        SELECT CONVERT(TABLE_NAME USING utf8mb4) AS table_name
        FROM information_schema.tables
        WHERE table_schema = ? AND table_type = 'BASE TABLE'
        ORDER BY table_name
        "#;
}

/// Schema inspector for database introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// The column metadata query for `tables` of `database`.
    pub fn columns_query(database: &str, tables: &[&str]) -> FormattedQuery {
        FormattedQuery::new(
            queries::DESCRIBE_COLUMNS.trim(),
            vec![
                QueryParam::from(database),
                QueryParam::List(tables.iter().copied().map(QueryParam::from).collect()),
            ],
        )
    }

    /// Describe `tables`, in the order given. Tables that do not exist are
    /// left out.
    pub async fn query_schema_info(
        executor: &QueryExecutor,
        database: &str,
        tables: &[&str],
    ) -> DbResult<Vec<TableDescription>> {
        if tables.is_empty() {
            return Ok(Vec::new());
        }
        let query = Self::columns_query(database, tables);
        let result = executor
            .execute(&query.sql, &query.values, ExecuteOptions::new())
            .await?;
        let described = describe_from_rows(tables, result.rows());
        debug!(
            database = %database,
            requested = tables.len(),
            found = described.len(),
            "Described tables"
        );
        Ok(described)
    }

    /// List the base tables of `database`.
    pub async fn list_tables(executor: &QueryExecutor, database: &str) -> DbResult<Vec<String>> {
        let result = executor
            .execute(
                queries::LIST_TABLES.trim(),
                &[QueryParam::from(database)],
                ExecuteOptions::new(),
            )
            .await?;
        Ok(result
            .rows()
            .iter()
            .filter_map(|row| get_string(row, "table_name"))
            .collect())
    }
}

/// Group column rows by table, keeping the requested table order and the
/// rows' ordinal order.
fn describe_from_rows(tables: &[&str], rows: &[Row]) -> Vec<TableDescription> {
    tables
        .iter()
        .filter_map(|&table| {
            let columns: Vec<ColumnInfo> = rows
                .iter()
                .filter(|row| get_string(row, "table_name").as_deref() == Some(table))
                .map(column_from_row)
                .collect();
            if columns.is_empty() {
                None
            } else {
                Some(TableDescription {
                    table_name: table.to_string(),
                    columns,
                })
            }
        })
        .collect()
}

fn column_from_row(row: &Row) -> ColumnInfo {
    let name = get_string(row, "column_name").unwrap_or_default();
    let column_type = get_string(row, "column_type").unwrap_or_default();
    let nullable = get_string(row, "is_nullable").as_deref() == Some("YES");
    let column_key = get_string(row, "column_key").unwrap_or_default();
    let extra = get_string(row, "extra").unwrap_or_default();

    let mut col = ColumnInfo::new(name, column_type, nullable)
        .with_primary_key(column_key == "PRI")
        .with_unique(column_key == "UNI")
        .with_auto_increment(extra.to_lowercase().contains("auto_increment"));

    if let Some(default) = get_string(row, "column_default") {
        col = col.with_default(default);
    }
    if let Some(comment) = get_string(row, "column_comment").filter(|c| !c.is_empty()) {
        col = col.with_comment(comment);
    }
    if let Some(precision) = row
        .get("datetime_precision")
        .and_then(JsonValue::as_u64)
        .and_then(|p| u8::try_from(p).ok())
    {
        col = col.with_datetime_precision(precision);
    }
    col
}

/// Read a text cell. Numbers are rendered as text; NULL is `None`.
fn get_string(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::data_types::DataType;
    use serde_json::json;

    fn row(value: JsonValue) -> Row {
        match value {
            JsonValue::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn test_columns_query_filters_by_database() {
        let query = SchemaInspector::columns_query("B", &["posts", "users"]);
        assert!(query.sql.contains("table_schema = ?"));
        assert!(query.sql.contains("table_name IN (?)"));
        assert_eq!(
            query.values,
            vec![
                QueryParam::from("B"),
                QueryParam::List(vec!["posts".into(), "users".into()]),
            ]
        );
    }

    #[test]
    fn test_describe_from_rows() {
        let rows = vec![
            row(json!({
                "table_name": "posts", "column_name": "id", "column_type": "bigint(20) unsigned",
                "is_nullable": "NO", "column_default": null, "column_key": "PRI",
                "extra": "auto_increment", "column_comment": "", "datetime_precision": null
            })),
            row(json!({
                "table_name": "posts", "column_name": "created_at", "column_type": "datetime(3)",
                "is_nullable": "YES", "column_default": "CURRENT_TIMESTAMP(3)", "column_key": "",
                "extra": "", "column_comment": "creation time", "datetime_precision": 3
            })),
            row(json!({
                "table_name": "users", "column_name": "email", "column_type": "varchar(255)",
                "is_nullable": "NO", "column_default": null, "column_key": "UNI",
                "extra": "", "column_comment": "", "datetime_precision": null
            })),
        ];

        let described = describe_from_rows(&["users", "missing", "posts"], &rows);
        assert_eq!(described.len(), 2);
        assert_eq!(described[0].table_name, "users");
        assert_eq!(described[1].table_name, "posts");

        let email = described[0].column("email").unwrap();
        assert!(email.unique);
        assert!(!email.nullable);

        let posts = &described[1];
        assert_eq!(posts.primary_key(), vec!["id"]);
        let id = posts.column("id").unwrap();
        assert!(id.auto_increment);
        assert!(id.comment.is_none());
        assert_eq!(
            id.logical_type,
            Some(DataType::BigInt {
                length: Some(20),
                unsigned: true
            })
        );

        let created_at = posts.column("created_at").unwrap();
        assert!(created_at.nullable);
        assert_eq!(created_at.default_value.as_deref(), Some("CURRENT_TIMESTAMP(3)"));
        assert_eq!(created_at.comment.as_deref(), Some("creation time"));
        assert_eq!(created_at.datetime_precision, Some(3));
        assert_eq!(created_at.data_type, "datetime");
    }
}
