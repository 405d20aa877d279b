//! Thin async wrapper around a single local libsql connection.
//!
//! Statements take positional JSON parameters and query rows come back as
//! JSON objects keyed by column name, so repositories stay free of driver
//! types.

use libsql::params::Params;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub rows: Vec<Value>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteResult {
    pub rows_affected: u64,
}

/// A statement plus its positional parameters, used for batches
#[derive(Debug, Clone)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

struct Connected {
    // Keeps the database handle alive for as long as the connection
    _db: libsql::Database,
    conn: libsql::Connection,
}

pub struct Database {
    path: PathBuf,
    inner: Mutex<Option<Connected>>,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inner: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the connection; a no-op when already connected.
    pub async fn connect(&self) -> Result<(), String> {
        let mut guard = self.inner.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let db = libsql::Builder::new_local(&self.path)
            .build()
            .await
            .map_err(|e| format!("Failed to open database {}: {}", self.path.display(), e))?;
        let conn = db
            .connect()
            .map_err(|e| format!("Failed to connect to {}: {}", self.path.display(), e))?;

        log::debug!("[Database] Connected to {}", self.path.display());
        *guard = Some(Connected { _db: db, conn });
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.lock().await.is_some()
    }

    async fn connection(&self) -> Result<libsql::Connection, String> {
        self.inner
            .lock()
            .await
            .as_ref()
            .map(|c| c.conn.clone())
            .ok_or_else(|| format!("Database {} is not connected", self.path.display()))
    }

    /// Run one or more parameterless statements (pragmas, DDL).
    pub async fn execute_batch(&self, sql: &str) -> Result<(), String> {
        let conn = self.connection().await?;
        conn.execute_batch(sql)
            .await
            .map_err(|e| format!("Batch execution failed: {}", e))?;
        Ok(())
    }

    pub async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<ExecuteResult, String> {
        let conn = self.connection().await?;
        let rows_affected = conn
            .execute(sql, to_params(params)?)
            .await
            .map_err(|e| format!("Execute failed: {}", e))?;
        Ok(ExecuteResult { rows_affected })
    }

    pub async fn query(&self, sql: &str, params: Vec<Value>) -> Result<QueryResult, String> {
        let conn = self.connection().await?;
        let mut rows = conn
            .query(sql, to_params(params)?)
            .await
            .map_err(|e| format!("Query failed: {}", e))?;

        let column_count = rows.column_count();
        let columns: Vec<String> = (0..column_count)
            .map(|i| rows.column_name(i).unwrap_or_default().to_string())
            .collect();

        let mut result = QueryResult::default();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| format!("Failed to read row: {}", e))?
        {
            let mut object = serde_json::Map::with_capacity(columns.len());
            for (idx, name) in columns.iter().enumerate() {
                let value = row
                    .get_value(idx as i32)
                    .map_err(|e| format!("Failed to read column {}: {}", name, e))?;
                object.insert(name.clone(), from_sql_value(value));
            }
            result.rows.push(Value::Object(object));
        }

        Ok(result)
    }

    /// Execute every statement inside one transaction. The first failure rolls
    /// the whole batch back.
    pub async fn batch(&self, statements: Vec<Statement>) -> Result<Vec<ExecuteResult>, String> {
        let conn = self.connection().await?;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| format!("Failed to begin transaction: {}", e))?;

        let mut results = Vec::with_capacity(statements.len());
        for statement in statements {
            let params = match to_params(statement.params) {
                Ok(params) => params,
                Err(e) => {
                    rollback(tx).await;
                    return Err(e);
                }
            };
            match tx.execute(&statement.sql, params).await {
                Ok(rows_affected) => results.push(ExecuteResult { rows_affected }),
                Err(e) => {
                    rollback(tx).await;
                    return Err(format!("Batch statement failed: {}", e));
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| format!("Failed to commit transaction: {}", e))?;
        Ok(results)
    }

    /// Drop the connection and release the file handles.
    pub async fn close(&self) {
        if self.inner.lock().await.take().is_some() {
            log::info!("[Database] Closed {}", self.path.display());
        }
    }
}

async fn rollback(tx: libsql::Transaction) {
    if let Err(e) = tx.rollback().await {
        log::error!("[Database] Rollback failed: {}", e);
    }
}

fn to_params(values: Vec<Value>) -> Result<Params, String> {
    let values = values
        .into_iter()
        .map(to_sql_value)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Params::Positional(values))
}

fn to_sql_value(value: Value) -> Result<libsql::Value, String> {
    Ok(match value {
        Value::Null => libsql::Value::Null,
        Value::Bool(b) => libsql::Value::Integer(i64::from(b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                libsql::Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                libsql::Value::Real(f)
            } else {
                return Err(format!("Unsupported numeric parameter: {}", n));
            }
        }
        Value::String(s) => libsql::Value::Text(s),
        other => libsql::Value::Text(other.to_string()),
    })
}

fn from_sql_value(value: libsql::Value) -> Value {
    match value {
        libsql::Value::Null => Value::Null,
        libsql::Value::Integer(i) => Value::from(i),
        libsql::Value::Real(f) => Value::from(f),
        libsql::Value::Text(s) => Value::String(s),
        libsql::Value::Blob(bytes) => Value::Array(bytes.into_iter().map(Value::from).collect()),
    }
}
