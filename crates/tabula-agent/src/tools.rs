//! Schema-inspection tools exposed to the model.
//!
//! Each tool wraps one `SchemaInspector` call and returns its result as a
//! JSON string. Everything here is read-only; writes are rejected below
//! the tool layer.

use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::debug;

use tabula_core::error::{Result, TabulaError};
use tabula_core::traits::Tool;
use tabula_core::types::ToolResult;
use tabula_db::SchemaInspector;

const DEFAULT_UNIQUES_LIMIT: i64 = 10;

fn to_json_string(value: &serde_json::Value) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(TabulaError::from)
}

#[derive(Deserialize)]
struct TableInput {
    table_name: String,
}

#[derive(Deserialize)]
struct TableLimitInput {
    table_name: String,
    #[serde(default)]
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct QueryInput {
    #[serde(alias = "sql")]
    query: String,
}

fn parse_input<T: serde::de::DeserializeOwned>(input: serde_json::Value) -> Result<T> {
    serde_json::from_value(input).map_err(|e| TabulaError::ToolValidation(e.to_string()))
}

/// Lists the user tables in the public schema.
pub struct GetTableList {
    inspector: SchemaInspector,
}

impl GetTableList {
    pub fn new(inspector: SchemaInspector) -> Self {
        Self { inspector }
    }
}

impl Tool for GetTableList {
    fn name(&self) -> &str {
        "get_table_list"
    }

    fn description(&self) -> &str {
        "List the names of all tables in the database."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    fn execute(&self, _input: serde_json::Value) -> BoxFuture<'_, Result<ToolResult>> {
        Box::pin(async move {
            let tables = self.inspector.tables().await?;
            Ok(ToolResult::success(to_json_string(&serde_json::json!({
                "tables": tables
            }))?))
        })
    }
}

/// Full schema dump: columns, primary keys, foreign keys per table.
pub struct GetDatabaseSchema {
    inspector: SchemaInspector,
}

impl GetDatabaseSchema {
    pub fn new(inspector: SchemaInspector) -> Self {
        Self { inspector }
    }
}

impl Tool for GetDatabaseSchema {
    fn name(&self) -> &str {
        "get_database_schema"
    }

    fn description(&self) -> &str {
        "Get the full database schema: every table with its columns, types, primary keys, and foreign keys."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    fn execute(&self, _input: serde_json::Value) -> BoxFuture<'_, Result<ToolResult>> {
        Box::pin(async move {
            let schema = self.inspector.schema().await?;
            Ok(ToolResult::success(to_json_string(&schema)?))
        })
    }
}

/// A handful of real rows from one table.
pub struct GetTableSample {
    inspector: SchemaInspector,
    default_limit: i64,
}

impl GetTableSample {
    pub fn new(inspector: SchemaInspector, default_limit: i64) -> Self {
        Self {
            inspector,
            default_limit,
        }
    }
}

impl Tool for GetTableSample {
    fn name(&self) -> &str {
        "get_table_sample"
    }

    fn description(&self) -> &str {
        "Fetch a few sample rows from a table to see what the data looks like. Limit defaults to 5, capped at 100."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "table_name": {
                    "type": "string",
                    "description": "Table to sample"
                },
                "limit": {
                    "type": "integer",
                    "description": "Number of rows to return (default 5)"
                }
            },
            "required": ["table_name"]
        })
    }

    fn execute(&self, input: serde_json::Value) -> BoxFuture<'_, Result<ToolResult>> {
        Box::pin(async move {
            let params: TableLimitInput = parse_input(input)?;
            let limit = params.limit.unwrap_or(self.default_limit);
            debug!(table = %params.table_name, limit, "sampling rows");
            let rows = self.inspector.sample(&params.table_name, limit).await?;
            Ok(ToolResult::success(to_json_string(&serde_json::json!({
                "rows": rows
            }))?))
        })
    }
}

/// Per-column statistics for one table.
pub struct GetTableSummary {
    inspector: SchemaInspector,
}

impl GetTableSummary {
    pub fn new(inspector: SchemaInspector) -> Self {
        Self { inspector }
    }
}

impl Tool for GetTableSummary {
    fn name(&self) -> &str {
        "get_table_summary"
    }

    fn description(&self) -> &str {
        "Summarize a table: row count plus per-column statistics (count, mean, stddev, min, max for numeric columns; count and distinct count otherwise)."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "table_name": {
                    "type": "string",
                    "description": "Table to summarize"
                }
            },
            "required": ["table_name"]
        })
    }

    fn execute(&self, input: serde_json::Value) -> BoxFuture<'_, Result<ToolResult>> {
        Box::pin(async move {
            let params: TableInput = parse_input(input)?;
            let summary = self.inspector.summary(&params.table_name).await?;
            Ok(ToolResult::success(to_json_string(&summary)?))
        })
    }
}

/// Distinct values per column of one table.
pub struct GetTableUniques {
    inspector: SchemaInspector,
}

impl GetTableUniques {
    pub fn new(inspector: SchemaInspector) -> Self {
        Self { inspector }
    }
}

impl Tool for GetTableUniques {
    fn name(&self) -> &str {
        "get_table_uniques"
    }

    fn description(&self) -> &str {
        "List the distinct values of each column in a table, up to a per-column limit."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "table_name": {
                    "type": "string",
                    "description": "Table to inspect"
                },
                "limit": {
                    "type": "integer",
                    "description": "Max distinct values per column (default 10)"
                }
            },
            "required": ["table_name"]
        })
    }

    fn execute(&self, input: serde_json::Value) -> BoxFuture<'_, Result<ToolResult>> {
        Box::pin(async move {
            let params: TableLimitInput = parse_input(input)?;
            let limit = params.limit.unwrap_or(DEFAULT_UNIQUES_LIMIT);
            let uniques = self.inspector.uniques(&params.table_name, limit).await?;
            Ok(ToolResult::success(to_json_string(&uniques)?))
        })
    }
}

/// Executes a read-only SQL query written by the model.
pub struct RunCustomQuery {
    inspector: SchemaInspector,
}

impl RunCustomQuery {
    pub fn new(inspector: SchemaInspector) -> Self {
        Self { inspector }
    }
}

impl Tool for RunCustomQuery {
    fn name(&self) -> &str {
        "run_custom_query"
    }

    fn description(&self) -> &str {
        "Run a read-only SQL query against the database and return the rows as JSON. INSERT, UPDATE, DELETE, DROP, ALTER, and TRUNCATE are rejected."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "A single SELECT statement"
                }
            },
            "required": ["query"]
        })
    }

    fn execute(&self, input: serde_json::Value) -> BoxFuture<'_, Result<ToolResult>> {
        Box::pin(async move {
            let params: QueryInput = parse_input(input)?;
            debug!(query = %params.query, "running model-written query");
            let rows = self.inspector.run_query(&params.query).await?;
            Ok(ToolResult::success(to_json_string(&serde_json::json!({
                "rows": rows,
                "row_count": rows.len()
            }))?))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_parsing() {
        let ok: TableLimitInput =
            parse_input(serde_json::json!({"table_name": "users", "limit": 3})).unwrap();
        assert_eq!(ok.table_name, "users");
        assert_eq!(ok.limit, Some(3));

        let err = parse_input::<QueryInput>(serde_json::json!({"q": "select 1"})).unwrap_err();
        assert!(matches!(err, TabulaError::ToolValidation(_)));
    }
}
