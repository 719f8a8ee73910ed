use stitcherp_core::ServiceError;
use stitcherp_sql::SQLStore;

/// SQL DDL for the manufacturing module.
///
/// Each table stores the full JSON document in a `data` TEXT column, with
/// indexed columns extracted for filtering and uniqueness.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS products (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        name TEXT,
        create_at TEXT,
        update_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS material_variants (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        material_name TEXT,
        color TEXT,
        stock REAL,
        create_at TEXT,
        update_at TEXT,
        UNIQUE(material_name, color)
    )",
    "CREATE TABLE IF NOT EXISTS stock_transactions (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        variant_id TEXT,
        txn_type TEXT,
        create_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS batches (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        sku TEXT UNIQUE,
        product_id TEXT,
        status TEXT,
        create_at TEXT,
        update_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS material_allocations (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        batch_id TEXT,
        variant_id TEXT,
        confirmed INTEGER,
        create_at TEXT,
        update_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS stage_tasks (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        batch_id TEXT,
        stage TEXT,
        status TEXT,
        assigned_to TEXT,
        create_at TEXT,
        update_at TEXT,
        UNIQUE(batch_id, stage)
    )",
    "CREATE TABLE IF NOT EXISTS cutting_results (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        batch_id TEXT,
        product_size TEXT,
        color TEXT,
        confirmed INTEGER,
        create_at TEXT,
        update_at TEXT,
        UNIQUE(batch_id, product_size, color)
    )",
    "CREATE TABLE IF NOT EXISTS sub_batches (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        batch_id TEXT,
        sku TEXT UNIQUE,
        status TEXT,
        create_at TEXT,
        update_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS timeline_events (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        batch_id TEXT,
        event TEXT,
        create_at TEXT
    )",
    // Indexes
    "CREATE INDEX IF NOT EXISTS idx_batch_status ON batches(status)",
    "CREATE INDEX IF NOT EXISTS idx_batch_product ON batches(product_id)",
    "CREATE INDEX IF NOT EXISTS idx_alloc_batch ON material_allocations(batch_id)",
    "CREATE INDEX IF NOT EXISTS idx_alloc_variant ON material_allocations(variant_id)",
    "CREATE INDEX IF NOT EXISTS idx_task_batch ON stage_tasks(batch_id)",
    "CREATE INDEX IF NOT EXISTS idx_task_status ON stage_tasks(status)",
    "CREATE INDEX IF NOT EXISTS idx_cutres_batch ON cutting_results(batch_id)",
    "CREATE INDEX IF NOT EXISTS idx_sub_batch ON sub_batches(batch_id)",
    "CREATE INDEX IF NOT EXISTS idx_sub_status ON sub_batches(status)",
    "CREATE INDEX IF NOT EXISTS idx_stocktxn_variant ON stock_transactions(variant_id)",
    "CREATE INDEX IF NOT EXISTS idx_timeline_batch ON timeline_events(batch_id)",
];

pub fn init_schema(sql: &dyn SQLStore) -> Result<(), ServiceError> {
    for stmt in SCHEMA {
        sql.exec(stmt, &[])
            .map_err(|e| ServiceError::Storage(format!("schema init failed: {}", e)))?;
    }
    Ok(())
}
