//! StockLedger — material stock levels and their movement history.
//!
//! Guarantees: stock never goes negative, and every stock mutation is paired
//! with exactly one ledger row.

use stitcherp_core::{ServiceError, new_id, now_rfc3339};
use stitcherp_sql::{SqlExec, Value};

use super::MfgService;
use crate::model::{MaterialVariant, StockTransaction, StockTxnType};
use crate::store;

/// Apply one stock movement and write its ledger row.
///
/// IN and RETURN add `qty` (which must be non-negative); OUT and ADJUSTMENT
/// apply `qty` as a signed delta. Fails with `InsufficientStock` when the
/// movement would drive stock below zero. Runs inside the caller's
/// transaction.
pub(crate) fn apply_stock_txn(
    tx: &dyn SqlExec,
    variant_id: &str,
    txn_type: StockTxnType,
    qty: f64,
    reference: Option<String>,
    note: Option<String>,
) -> Result<StockTransaction, ServiceError> {
    let mut variant: MaterialVariant = store::get_record(tx, "material_variants", variant_id)?;

    let delta = match txn_type {
        StockTxnType::In | StockTxnType::Return => {
            if qty < 0.0 {
                return Err(ServiceError::Validation(format!(
                    "{} quantity must be non-negative, got {}",
                    txn_type, qty
                )));
            }
            qty
        }
        StockTxnType::Out | StockTxnType::Adjustment => qty,
    };

    let new_stock = variant.stock + delta;
    if new_stock < 0.0 {
        return Err(ServiceError::InsufficientStock(format!(
            "variant {} ({} {}): stock {} cannot absorb movement {}",
            variant.id, variant.material_name, variant.color, variant.stock, delta
        )));
    }

    variant.stock = new_stock;
    variant.update_at = now_rfc3339();
    store::update_record(
        tx,
        "material_variants",
        &variant.id,
        &variant,
        &[
            ("stock", Value::Real(variant.stock)),
            ("update_at", Value::Text(variant.update_at.clone())),
        ],
    )?;

    let txn = StockTransaction {
        id: new_id(),
        variant_id: variant.id.clone(),
        txn_type,
        qty,
        stock_after: new_stock,
        reference,
        note,
        create_at: now_rfc3339(),
    };
    store::insert_record(
        tx,
        "stock_transactions",
        &txn.id,
        &txn,
        &[
            ("variant_id", Value::Text(txn.variant_id.clone())),
            ("txn_type", Value::Text(txn.txn_type.as_str().to_string())),
            ("create_at", Value::Text(txn.create_at.clone())),
        ],
    )?;

    Ok(txn)
}

/// Deduct a confirmed allocation from stock: an OUT movement of `qty`.
/// `qty` is the positive amount to remove.
pub(crate) fn confirm_deduction(
    tx: &dyn SqlExec,
    variant_id: &str,
    qty: f64,
    reference: Option<String>,
) -> Result<StockTransaction, ServiceError> {
    if qty < 0.0 {
        return Err(ServiceError::Validation(format!(
            "deduction quantity must be non-negative, got {}",
            qty
        )));
    }
    apply_stock_txn(tx, variant_id, StockTxnType::Out, -qty, reference, None)
}

impl MfgService {
    /// Advisory sufficiency check used while building allocations. Does not
    /// deduct anything — confirmation happens at the material-allocation
    /// transition.
    pub fn reserve(&self, variant_id: &str, qty: f64) -> Result<(), ServiceError> {
        let variant: MaterialVariant = store::get_record(self.db(), "material_variants", variant_id)?;
        if variant.stock < qty {
            return Err(ServiceError::InsufficientStock(format!(
                "variant {} ({} {}): requested {}, available {}",
                variant.id, variant.material_name, variant.color, qty, variant.stock
            )));
        }
        Ok(())
    }

    /// Record a standalone stock movement (goods-in, manual adjustment,
    /// material return).
    pub fn record_transaction(
        &self,
        variant_id: &str,
        txn_type: StockTxnType,
        qty: f64,
        reference: Option<String>,
        note: Option<String>,
    ) -> Result<StockTransaction, ServiceError> {
        self.in_txn(|tx| apply_stock_txn(tx, variant_id, txn_type, qty, reference, note))
    }

    /// Movement history for one variant, oldest first.
    pub fn list_transactions(
        &self,
        variant_id: &str,
    ) -> Result<Vec<StockTransaction>, ServiceError> {
        let _: MaterialVariant = store::get_record(self.db(), "material_variants", variant_id)?;
        store::list_records_by(
            self.db(),
            "stock_transactions",
            &[("variant_id", Value::Text(variant_id.to_string()))],
        )
    }
}
