//! `sqlite_query` tool — run SQL against a SQLite database file.

use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::base::{require_string, Tool, ToolOutput};

/// Query a SQLite database. Row-returning statements yield JSON objects.
pub struct SqliteQueryTool {
    row_limit: usize,
}

impl SqliteQueryTool {
    pub fn new(row_limit: usize) -> Self {
        Self { row_limit }
    }
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => json!(i),
        ValueRef::Real(f) => json!(f),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<blob {} bytes>", bytes.len())),
    }
}

/// Blocking part of the tool; runs on the blocking pool.
fn run_query(db_path: &str, sql: &str, row_limit: usize) -> anyhow::Result<ToolOutput> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database {db_path}"))?;
    let mut stmt = conn.prepare(sql)?;

    // Statements without result columns (INSERT, UPDATE, DDL, ...) report affected rows.
    if stmt.column_count() == 0 {
        let affected = stmt.execute([])?;
        return Ok(ToolOutput::Text(format!("OK, {affected} rows affected")));
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        if out.len() >= row_limit {
            break;
        }
        let mut obj = Map::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            obj.insert(name.clone(), to_json(row.get_ref(i)?));
        }
        out.push(Value::Object(obj));
    }
    Ok(ToolOutput::Json(Value::Array(out)))
}

#[async_trait]
impl Tool for SqliteQueryTool {
    fn name(&self) -> &str {
        "sqlite_query"
    }

    fn description(&self) -> &str {
        "Execute a SQL query on a SQLite database file. Returns results as JSON."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "db_path": { "type": "string", "description": "Path to SQLite database file" },
                "sql": { "type": "string", "description": "SQL query to execute" }
            },
            "required": ["db_path", "sql"]
        })
    }

    fn dangerous(&self) -> bool {
        true
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<ToolOutput> {
        let db_path = require_string(&params, "db_path")?;
        let sql = require_string(&params, "sql")?;
        let row_limit = self.row_limit;
        debug!(db = %db_path, "sqlite query");

        tokio::task::spawn_blocking(move || run_query(&db_path, &sql, row_limit))
            .await
            .context("SQLite task panicked")?
    }
}
