//! Generic record helpers over the JSON-document tables.
//!
//! Every table stores the full record as JSON in a `data` column with
//! indexed columns extracted for filtering and uniqueness. The helpers take
//! a [`SqlExec`] so the same code runs directly against the store or inside
//! an open transaction.

use serde::Serialize;
use serde::de::DeserializeOwned;

use stitcherp_core::{ListResult, ServiceError};
use stitcherp_sql::{SqlExec, Value};

/// Insert a record as JSON into a table with indexed columns.
pub(crate) fn insert_record<T: Serialize>(
    tx: &dyn SqlExec,
    table: &str,
    id: &str,
    record: &T,
    indexes: &[(&str, Value)],
) -> Result<(), ServiceError> {
    let json = serde_json::to_string(record).map_err(|e| ServiceError::Internal(e.to_string()))?;

    let mut cols = vec!["id", "data"];
    let mut placeholders = vec!["?1".to_string(), "?2".to_string()];
    let mut params = vec![Value::Text(id.to_string()), Value::Text(json)];

    for (i, (col, val)) in indexes.iter().enumerate() {
        let idx = i + 3;
        cols.push(col);
        placeholders.push(format!("?{}", idx));
        params.push(val.clone());
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        cols.join(", "),
        placeholders.join(", "),
    );

    tx.exec(&sql, &params).map_err(|e| {
        let msg = e.to_string();
        if msg.contains("UNIQUE constraint") {
            ServiceError::Conflict(msg)
        } else {
            ServiceError::Storage(msg)
        }
    })?;

    Ok(())
}

/// Get a record by id, deserializing the JSON `data` column.
pub(crate) fn get_record<T: DeserializeOwned>(
    tx: &dyn SqlExec,
    table: &str,
    id: &str,
) -> Result<T, ServiceError> {
    try_get_record(tx, table, id)?
        .ok_or_else(|| ServiceError::NotFound(format!("{}/{}", table, id)))
}

/// Get a record by id, returning `None` when absent.
pub(crate) fn try_get_record<T: DeserializeOwned>(
    tx: &dyn SqlExec,
    table: &str,
    id: &str,
) -> Result<Option<T>, ServiceError> {
    let sql = format!("SELECT data FROM {} WHERE id = ?1", table);
    let rows = tx
        .query(&sql, &[Value::Text(id.to_string())])
        .map_err(|e| ServiceError::Storage(e.to_string()))?;

    let Some(row) = rows.first() else {
        return Ok(None);
    };
    let data = row
        .get_str("data")
        .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
    let record =
        serde_json::from_str(data).map_err(|e| ServiceError::Internal(e.to_string()))?;
    Ok(Some(record))
}

/// Update a record's JSON data and indexed columns.
pub(crate) fn update_record<T: Serialize>(
    tx: &dyn SqlExec,
    table: &str,
    id: &str,
    record: &T,
    indexes: &[(&str, Value)],
) -> Result<(), ServiceError> {
    let affected = update_record_where(tx, table, id, record, indexes, None)?;
    if affected == 0 {
        return Err(ServiceError::NotFound(format!("{}/{}", table, id)));
    }
    Ok(())
}

/// Update a record with an extra compare-and-swap guard column.
///
/// Returns `false` when the guard did not match (no rows affected) — the
/// record moved under the caller, who must reload and re-check. This is the
/// CAS that keeps two concurrent status mutations from both succeeding.
pub(crate) fn update_record_guarded<T: Serialize>(
    tx: &dyn SqlExec,
    table: &str,
    id: &str,
    record: &T,
    indexes: &[(&str, Value)],
    guard: (&str, Value),
) -> Result<bool, ServiceError> {
    let affected = update_record_where(tx, table, id, record, indexes, Some(guard))?;
    Ok(affected > 0)
}

fn update_record_where<T: Serialize>(
    tx: &dyn SqlExec,
    table: &str,
    id: &str,
    record: &T,
    indexes: &[(&str, Value)],
    guard: Option<(&str, Value)>,
) -> Result<u64, ServiceError> {
    let json = serde_json::to_string(record).map_err(|e| ServiceError::Internal(e.to_string()))?;

    let mut sets = vec!["data = ?1".to_string()];
    let mut params: Vec<Value> = vec![Value::Text(json)];

    for (i, (col, val)) in indexes.iter().enumerate() {
        let idx = i + 2;
        sets.push(format!("{} = ?{}", col, idx));
        params.push(val.clone());
    }

    let id_idx = params.len() + 1;
    params.push(Value::Text(id.to_string()));

    let mut sql = format!("UPDATE {} SET {} WHERE id = ?{}", table, sets.join(", "), id_idx);

    if let Some((guard_col, guard_val)) = guard {
        let guard_idx = params.len() + 1;
        sql.push_str(&format!(" AND {} = ?{}", guard_col, guard_idx));
        params.push(guard_val);
    }

    tx.exec(&sql, &params)
        .map_err(|e| ServiceError::Storage(e.to_string()))
}

/// Delete a record by id.
pub(crate) fn delete_record(tx: &dyn SqlExec, table: &str, id: &str) -> Result<(), ServiceError> {
    let sql = format!("DELETE FROM {} WHERE id = ?1", table);
    let affected = tx
        .exec(&sql, &[Value::Text(id.to_string())])
        .map_err(|e| ServiceError::Storage(e.to_string()))?;
    if affected == 0 {
        return Err(ServiceError::NotFound(format!("{}/{}", table, id)));
    }
    Ok(())
}

/// Delete all records matching a filter column (children of a parent).
pub(crate) fn delete_records_by(
    tx: &dyn SqlExec,
    table: &str,
    col: &str,
    val: &str,
) -> Result<u64, ServiceError> {
    let sql = format!("DELETE FROM {} WHERE {} = ?1", table, col);
    tx.exec(&sql, &[Value::Text(val.to_string())])
        .map_err(|e| ServiceError::Storage(e.to_string()))
}

/// Fetch all records matching equality filters, ordered by `create_at`.
pub(crate) fn list_records_by<T: DeserializeOwned>(
    tx: &dyn SqlExec,
    table: &str,
    filters: &[(&str, Value)],
) -> Result<Vec<T>, ServiceError> {
    let mut where_clauses = Vec::new();
    let mut params = Vec::new();
    for (i, (col, val)) in filters.iter().enumerate() {
        where_clauses.push(format!("{} = ?{}", col, i + 1));
        params.push(val.clone());
    }

    let where_sql = if where_clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_clauses.join(" AND "))
    };

    let sql = format!(
        "SELECT data FROM {}{} ORDER BY create_at ASC, id ASC",
        table, where_sql
    );
    let rows = tx
        .query(&sql, &params)
        .map_err(|e| ServiceError::Storage(e.to_string()))?;

    rows.iter()
        .map(|row| {
            let data = row
                .get_str("data")
                .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
            serde_json::from_str(data).map_err(|e| ServiceError::Internal(e.to_string()))
        })
        .collect()
}

/// List records with filters, pagination, and total count, newest first.
pub(crate) fn list_records_paginated<T: DeserializeOwned + Serialize>(
    tx: &dyn SqlExec,
    table: &str,
    filters: &[(&str, Value)],
    limit: usize,
    offset: usize,
) -> Result<ListResult<T>, ServiceError> {
    let mut where_clauses = Vec::new();
    let mut params = Vec::new();
    for (i, (col, val)) in filters.iter().enumerate() {
        where_clauses.push(format!("{} = ?{}", col, i + 1));
        params.push(val.clone());
    }

    let where_sql = if where_clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_clauses.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) as cnt FROM {}{}", table, where_sql);
    let rows = tx
        .query(&count_sql, &params)
        .map_err(|e| ServiceError::Storage(e.to_string()))?;
    let total = rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0) as usize;

    let limit_idx = params.len() + 1;
    let offset_idx = params.len() + 2;
    params.push(Value::Integer(limit as i64));
    params.push(Value::Integer(offset as i64));

    let sql = format!(
        "SELECT data FROM {}{} ORDER BY create_at DESC LIMIT ?{} OFFSET ?{}",
        table, where_sql, limit_idx, offset_idx,
    );
    let rows = tx
        .query(&sql, &params)
        .map_err(|e| ServiceError::Storage(e.to_string()))?;

    let mut items = Vec::new();
    for row in &rows {
        let data = row
            .get_str("data")
            .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
        let item: T =
            serde_json::from_str(data).map_err(|e| ServiceError::Internal(e.to_string()))?;
        items.push(item);
    }

    Ok(ListResult { items, total })
}
