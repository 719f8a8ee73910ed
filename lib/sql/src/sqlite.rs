use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use crate::error::SQLError;
use crate::traits::{Row, SQLStore, SqlExec, TxnFn, Value};

/// SqliteStore is a SQLStore implementation backed by rusqlite (bundled
/// SQLite). A single mutex-guarded connection serializes all access, so
/// `transact` closures observe serializable isolation: no other statement
/// runs between their first read and their commit.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self, SQLError> {
        let conn = Connection::open(path).map_err(|e| SQLError::Connection(e.to_string()))?;

        // WAL mode for better concurrent read performance; foreign keys are
        // enforced in the schema layer, not here.
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite database (useful for tests).
    pub fn open_in_memory() -> Result<Self, SQLError> {
        let conn =
            Connection::open_in_memory().map_err(|e| SQLError::Connection(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// Convert our Value enum to rusqlite's ToSql.
fn bind_params(params: &[Value]) -> Vec<Box<dyn rusqlite::types::ToSql + '_>> {
    params
        .iter()
        .map(|v| -> Box<dyn rusqlite::types::ToSql + '_> {
            match v {
                Value::Null => Box::new(rusqlite::types::Null),
                Value::Integer(i) => Box::new(*i),
                Value::Real(f) => Box::new(*f),
                Value::Text(s) => Box::new(s.as_str()),
                Value::Blob(b) => Box::new(b.as_slice()),
            }
        })
        .collect()
}

fn run_query(conn: &Connection, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
    let bound = bind_params(params);
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = bound.iter().map(|b| b.as_ref()).collect();

    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| SQLError::Query(e.to_string()))?;

    let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            let mut columns = Vec::new();
            for (i, name) in column_names.iter().enumerate() {
                let val = row_value_at(row, i);
                columns.push((name.clone(), val));
            }
            Ok(Row { columns })
        })
        .map_err(|e| SQLError::Query(e.to_string()))?;

    let mut result = Vec::new();
    for row in rows {
        result.push(row.map_err(|e| SQLError::Query(e.to_string()))?);
    }
    Ok(result)
}

fn run_exec(conn: &Connection, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
    let bound = bind_params(params);
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = bound.iter().map(|b| b.as_ref()).collect();

    let affected = conn
        .execute(sql, param_refs.as_slice())
        .map_err(|e| SQLError::Execution(e.to_string()))?;

    Ok(affected as u64)
}

impl SqlExec for SqliteStore {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Query(e.to_string()))?;
        run_query(&conn, sql, params)
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Execution(e.to_string()))?;
        run_exec(&conn, sql, params)
    }
}

/// Statement surface handed to `transact` closures. Borrows the open
/// transaction, so statements issued through it join the transaction.
struct TxnExec<'a> {
    conn: &'a Connection,
}

impl SqlExec for TxnExec<'_> {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
        run_query(self.conn, sql, params)
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
        run_exec(self.conn, sql, params)
    }
}

impl SQLStore for SqliteStore {
    fn transact(&self, f: &mut TxnFn) -> Result<(), SQLError> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Transaction(e.to_string()))?;

        let tx = conn
            .transaction()
            .map_err(|e| SQLError::Transaction(e.to_string()))?;

        let result = f(&TxnExec { conn: &tx });

        match result {
            Ok(()) => tx.commit().map_err(|e| SQLError::Transaction(e.to_string())),
            Err(e) => {
                // Explicit rollback; Drop would roll back too, but we want
                // rollback failures to stay silent in favour of the original
                // error.
                let _ = tx.rollback();
                Err(e)
            }
        }
    }
}

/// Extract a Value from a rusqlite row at a given column index.
fn row_value_at(row: &rusqlite::Row, idx: usize) -> Value {
    // Try integer first, then real, then text, then blob, then null.
    if let Ok(i) = row.get::<_, i64>(idx) {
        return Value::Integer(i);
    }
    if let Ok(f) = row.get::<_, f64>(idx) {
        return Value::Real(f);
    }
    if let Ok(s) = row.get::<_, String>(idx) {
        return Value::Text(s);
    }
    if let Ok(b) = row.get::<_, Vec<u8>>(idx) {
        return Value::Blob(b);
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_table() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .exec(
                "CREATE TABLE items (id TEXT PRIMARY KEY, qty INTEGER NOT NULL)",
                &[],
            )
            .unwrap();
        store
    }

    #[test]
    fn exec_and_query() {
        let store = store_with_table();
        store
            .exec(
                "INSERT INTO items (id, qty) VALUES (?1, ?2)",
                &[Value::Text("a".into()), Value::Integer(5)],
            )
            .unwrap();

        let rows = store
            .query("SELECT qty FROM items WHERE id = ?1", &[Value::Text("a".into())])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_i64("qty"), Some(5));
    }

    #[test]
    fn transact_commits_on_ok() {
        let store = store_with_table();
        store
            .transact(&mut |tx| {
                tx.exec(
                    "INSERT INTO items (id, qty) VALUES (?1, ?2)",
                    &[Value::Text("a".into()), Value::Integer(1)],
                )?;
                tx.exec(
                    "INSERT INTO items (id, qty) VALUES (?1, ?2)",
                    &[Value::Text("b".into()), Value::Integer(2)],
                )?;
                Ok(())
            })
            .unwrap();

        let rows = store.query("SELECT id FROM items", &[]).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn transact_rolls_back_on_err() {
        let store = store_with_table();
        let result = store.transact(&mut |tx| {
            tx.exec(
                "INSERT INTO items (id, qty) VALUES (?1, ?2)",
                &[Value::Text("a".into()), Value::Integer(1)],
            )?;
            Err(SQLError::Aborted)
        });
        assert!(result.is_err());

        // The insert must not have survived the rollback.
        let rows = store.query("SELECT id FROM items", &[]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn transact_reads_own_writes() {
        let store = store_with_table();
        store
            .transact(&mut |tx| {
                tx.exec(
                    "INSERT INTO items (id, qty) VALUES (?1, ?2)",
                    &[Value::Text("a".into()), Value::Integer(7)],
                )?;
                let rows = tx.query(
                    "SELECT qty FROM items WHERE id = ?1",
                    &[Value::Text("a".into())],
                )?;
                assert_eq!(rows[0].get_i64("qty"), Some(7));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("test.sqlite")).unwrap();
        store
            .exec("CREATE TABLE t (id TEXT PRIMARY KEY)", &[])
            .unwrap();
        store
            .exec("INSERT INTO t (id) VALUES (?1)", &[Value::Text("x".into())])
            .unwrap();
        let rows = store.query("SELECT id FROM t", &[]).unwrap();
        assert_eq!(rows.len(), 1);
    }
}
