use thiserror::Error;

#[derive(Error, Debug)]
pub enum SQLError {
    #[error("query error: {0}")]
    Query(String),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    /// The transaction closure asked for a rollback. The domain-level cause
    /// is carried out of band by the caller; this variant only signals abort.
    #[error("transaction aborted")]
    Aborted,
}
