pub mod error;
pub mod sqlite;
pub mod traits;

pub use error::SQLError;
pub use sqlite::SqliteStore;
pub use traits::{Row, SQLStore, SqlExec, TxnFn, Value};
