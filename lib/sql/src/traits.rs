use crate::error::SQLError;

/// A dynamically-typed SQL parameter value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// A row returned from a SQL query — column name to value.
#[derive(Debug, Clone)]
pub struct Row {
    pub columns: Vec<(String, Value)>,
}

impl Row {
    /// Get a column value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Get a text column value by name.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(Value::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get an integer column value by name.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(Value::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    /// Get a real column value by name.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.get(name) {
            Some(Value::Real(f)) => Some(*f),
            Some(Value::Integer(i)) => Some(*i as f64),
            _ => None,
        }
    }
}

/// Statement execution surface, shared by the plain store and open
/// transactions. Code written against `SqlExec` runs unchanged inside or
/// outside a transaction.
pub trait SqlExec {
    /// Execute a query and return rows.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError>;

    /// Execute a statement (INSERT/UPDATE/DELETE) and return affected row count.
    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError>;
}

/// Closure type run inside [`SQLStore::transact`].
pub type TxnFn<'a> = dyn FnMut(&dyn SqlExec) -> Result<(), SQLError> + 'a;

/// SQLStore provides SQL execution backed by an embedded database, plus an
/// all-or-nothing transaction entry point.
pub trait SQLStore: SqlExec + Send + Sync {
    /// Run `f` inside a single transaction. Every statement issued through
    /// the provided `SqlExec` commits together when `f` returns `Ok`, and is
    /// rolled back when `f` returns `Err`. The implementation must not
    /// interleave statements from other callers into the transaction.
    fn transact(&self, f: &mut TxnFn) -> Result<(), SQLError>;
}
