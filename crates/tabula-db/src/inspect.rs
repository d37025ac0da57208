use serde_json::{json, Map, Value};
use sqlx::postgres::PgRow;
use sqlx::{Column, PgPool, Row, TypeInfo};
use tracing::{debug, info};

use tabula_core::error::{Result, TabulaError};

use crate::guard::{ensure_read_only, quote_ident};

/// Hard ceiling on sample / distinct-value fetches, whatever the caller asks for.
const MAX_ROW_LIMIT: i64 = 100;

/// Read-only schema and data inspection over a Postgres pool.
///
/// Everything here runs against `information_schema` or through the
/// read-only guard; sample requests are bounded by the requested count.
#[derive(Clone)]
pub struct SchemaInspector {
    pool: PgPool,
}

impl SchemaInspector {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List the tables in the public schema.
    pub async fn tables(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = 'public' AND table_type = 'BASE TABLE' \
             ORDER BY table_name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TabulaError::Database(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|r| r.get::<String, _>("table_name"))
            .collect())
    }

    /// Full schema: columns, primary keys, and foreign keys per table.
    pub async fn schema(&self) -> Result<Value> {
        let columns = sqlx::query(
            "SELECT table_name, column_name, data_type, is_nullable, column_default \
             FROM information_schema.columns \
             WHERE table_schema = 'public' \
             ORDER BY table_name, ordinal_position",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TabulaError::Database(e.to_string()))?;

        let pks = sqlx::query(
            "SELECT tc.table_name, kcu.column_name \
             FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
               ON tc.constraint_name = kcu.constraint_name \
              AND tc.table_schema = kcu.table_schema \
             WHERE tc.constraint_type = 'PRIMARY KEY' AND tc.table_schema = 'public'",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TabulaError::Database(e.to_string()))?;

        let fks = sqlx::query(
            "SELECT tc.table_name, kcu.column_name, \
                    ccu.table_name AS foreign_table, ccu.column_name AS foreign_column \
             FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
               ON tc.constraint_name = kcu.constraint_name \
              AND tc.table_schema = kcu.table_schema \
             JOIN information_schema.constraint_column_usage ccu \
               ON tc.constraint_name = ccu.constraint_name \
              AND tc.table_schema = ccu.table_schema \
             WHERE tc.constraint_type = 'FOREIGN KEY' AND tc.table_schema = 'public'",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TabulaError::Database(e.to_string()))?;

        let mut out: Map<String, Value> = Map::new();

        for row in &columns {
            let table: String = row.get("table_name");
            let entry = out.entry(table).or_insert_with(|| {
                json!({ "columns": [], "primary_keys": [], "foreign_keys": [] })
            });
            let nullable: String = row.get("is_nullable");
            let default: Option<String> = row.try_get("column_default").ok().flatten();
            entry["columns"].as_array_mut().expect("columns array").push(json!({
                "name": row.get::<String, _>("column_name"),
                "type": row.get::<String, _>("data_type"),
                "nullable": nullable == "YES",
                "default": default,
            }));
        }

        for row in &pks {
            let table: String = row.get("table_name");
            if let Some(entry) = out.get_mut(&table) {
                entry["primary_keys"]
                    .as_array_mut()
                    .expect("primary_keys array")
                    .push(Value::String(row.get::<String, _>("column_name")));
            }
        }

        for row in &fks {
            let table: String = row.get("table_name");
            if let Some(entry) = out.get_mut(&table) {
                entry["foreign_keys"]
                    .as_array_mut()
                    .expect("foreign_keys array")
                    .push(json!({
                        "column": row.get::<String, _>("column_name"),
                        "references_table": row.get::<String, _>("foreign_table"),
                        "references_column": row.get::<String, _>("foreign_column"),
                    }));
            }
        }

        Ok(Value::Object(out))
    }

    /// Fetch up to `limit` sample rows from a table. Never returns more
    /// rows than requested.
    pub async fn sample(&self, table: &str, limit: i64) -> Result<Vec<Value>> {
        self.ensure_table(table).await?;
        let limit = effective_limit(limit);

        let sql = format!("SELECT * FROM {} LIMIT {}", quote_ident(table), limit);
        debug!(table, limit, "Fetching sample rows");

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TabulaError::Database(e.to_string()))?;

        Ok(rows.iter().map(row_to_json).collect())
    }

    /// Per-column summary statistics for a table: count/mean/stddev/min/max
    /// for numeric columns, count + distinct count otherwise.
    pub async fn summary(&self, table: &str) -> Result<Value> {
        self.ensure_table(table).await?;
        let quoted = quote_ident(table);

        let total_rows: i64 = sqlx::query_scalar(&format!("SELECT count(*) FROM {}", quoted))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| TabulaError::Database(e.to_string()))?;

        let columns = sqlx::query(
            "SELECT column_name, data_type FROM information_schema.columns \
             WHERE table_schema = 'public' AND table_name = $1 \
             ORDER BY ordinal_position",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TabulaError::Database(e.to_string()))?;

        let mut per_column: Map<String, Value> = Map::new();

        for col in &columns {
            let name: String = col.get("column_name");
            let data_type: String = col.get("data_type");
            let quoted_col = quote_ident(&name);

            if is_numeric_type(&data_type) {
                let sql = format!(
                    "SELECT count({c})::int8 AS count, avg({c}::float8) AS mean, \
                            stddev_pop({c}::float8) AS stddev, \
                            min({c}::float8) AS min, max({c}::float8) AS max \
                     FROM {t}",
                    c = quoted_col,
                    t = quoted
                );
                let row = sqlx::query(&sql)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| TabulaError::Database(e.to_string()))?;

                per_column.insert(
                    name,
                    json!({
                        "type": data_type,
                        "count": row.get::<i64, _>("count"),
                        "mean": row.try_get::<Option<f64>, _>("mean").ok().flatten().unwrap_or(0.0),
                        "stddev": row.try_get::<Option<f64>, _>("stddev").ok().flatten().unwrap_or(0.0),
                        "min": row.try_get::<Option<f64>, _>("min").ok().flatten(),
                        "max": row.try_get::<Option<f64>, _>("max").ok().flatten(),
                    }),
                );
            } else {
                let sql = format!(
                    "SELECT count({c})::int8 AS count, count(DISTINCT {c})::int8 AS distinct_count \
                     FROM {t}",
                    c = quoted_col,
                    t = quoted
                );
                let row = sqlx::query(&sql)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| TabulaError::Database(e.to_string()))?;

                per_column.insert(
                    name,
                    json!({
                        "type": data_type,
                        "count": row.get::<i64, _>("count"),
                        "distinct": row.get::<i64, _>("distinct_count"),
                    }),
                );
            }
        }

        Ok(json!({
            "total_rows": total_rows,
            "columns": per_column,
        }))
    }

    /// Up to `limit` distinct values per column, rendered as text.
    pub async fn uniques(&self, table: &str, limit: i64) -> Result<Value> {
        self.ensure_table(table).await?;
        let limit = effective_limit(limit);
        let quoted = quote_ident(table);

        let columns = sqlx::query(
            "SELECT column_name FROM information_schema.columns \
             WHERE table_schema = 'public' AND table_name = $1 \
             ORDER BY ordinal_position",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TabulaError::Database(e.to_string()))?;

        let mut out: Map<String, Value> = Map::new();
        for col in &columns {
            let name: String = col.get("column_name");
            let quoted_col = quote_ident(&name);
            let sql = format!(
                "SELECT DISTINCT {c}::text AS value FROM {t} \
                 WHERE {c} IS NOT NULL ORDER BY value LIMIT {l}",
                c = quoted_col,
                t = quoted,
                l = limit
            );
            let rows = sqlx::query(&sql)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| TabulaError::Database(e.to_string()))?;
            let values: Vec<Value> = rows
                .iter()
                .map(|r| Value::String(r.get::<String, _>("value")))
                .collect();
            out.insert(name, Value::Array(values));
        }

        Ok(Value::Object(out))
    }

    /// Run an ad-hoc query through the read-only guard.
    pub async fn run_query(&self, query: &str) -> Result<Vec<Value>> {
        ensure_read_only(query)?;
        info!(query = %query.trim(), "Running custom query");

        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TabulaError::Database(e.to_string()))?;

        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn ensure_table(&self, table: &str) -> Result<()> {
        let tables = self.tables().await?;
        if tables.iter().any(|t| t == table) {
            Ok(())
        } else {
            Err(TabulaError::UnknownTable(table.to_string()))
        }
    }
}

/// Row limit actually sent to the database: at least one row, never more
/// than `MAX_ROW_LIMIT`.
fn effective_limit(requested: i64) -> i64 {
    requested.clamp(1, MAX_ROW_LIMIT)
}

fn is_numeric_type(data_type: &str) -> bool {
    matches!(
        data_type,
        "smallint" | "integer" | "bigint" | "numeric" | "real" | "double precision"
    )
}

/// Decode a dynamically-typed Postgres row into a JSON object.
fn row_to_json(row: &PgRow) -> Value {
    let mut obj = Map::new();
    for (i, col) in row.columns().iter().enumerate() {
        let value = match col.type_info().name() {
            "BOOL" => row
                .try_get::<Option<bool>, _>(i)
                .ok()
                .flatten()
                .map(Value::Bool),
            "INT2" => row
                .try_get::<Option<i16>, _>(i)
                .ok()
                .flatten()
                .map(|v| json!(v)),
            "INT4" => row
                .try_get::<Option<i32>, _>(i)
                .ok()
                .flatten()
                .map(|v| json!(v)),
            "INT8" => row
                .try_get::<Option<i64>, _>(i)
                .ok()
                .flatten()
                .map(|v| json!(v)),
            "FLOAT4" => row
                .try_get::<Option<f32>, _>(i)
                .ok()
                .flatten()
                .map(|v| json!(v)),
            "FLOAT8" => row
                .try_get::<Option<f64>, _>(i)
                .ok()
                .flatten()
                .map(|v| json!(v)),
            "NUMERIC" => row
                .try_get::<Option<sqlx::types::Decimal>, _>(i)
                .ok()
                .flatten()
                .and_then(|d| d.to_string().parse::<f64>().ok())
                .map(|v| json!(v)),
            "DATE" => row
                .try_get::<Option<chrono::NaiveDate>, _>(i)
                .ok()
                .flatten()
                .map(|d| Value::String(d.to_string())),
            "TIMESTAMP" => row
                .try_get::<Option<chrono::NaiveDateTime>, _>(i)
                .ok()
                .flatten()
                .map(|d| Value::String(d.to_string())),
            "TIMESTAMPTZ" => row
                .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(i)
                .ok()
                .flatten()
                .map(|d| Value::String(d.to_rfc3339())),
            _ => row
                .try_get::<Option<String>, _>(i)
                .ok()
                .flatten()
                .map(Value::String),
        };
        obj.insert(col.name().to_string(), value.unwrap_or(Value::Null));
    }
    Value::Object(obj)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_limit_clamps_both_ends() {
        assert_eq!(effective_limit(0), 1);
        assert_eq!(effective_limit(-5), 1);
        assert_eq!(effective_limit(5), 5);
        assert_eq!(effective_limit(100), 100);
        assert_eq!(effective_limit(101), 100);
    }

    #[test]
    fn test_numeric_type_detection() {
        assert!(is_numeric_type("integer"));
        assert!(is_numeric_type("double precision"));
        assert!(!is_numeric_type("text"));
        assert!(!is_numeric_type("character varying"));
    }
}
