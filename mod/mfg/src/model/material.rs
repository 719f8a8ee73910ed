use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// MaterialVariant
// ---------------------------------------------------------------------------

/// One material + color variant with its current stock level.
///
/// Stock is quoted in meters (or whatever unit the material is purchased
/// in); rolls are tracked separately as whole units. Stock never goes
/// negative — every mutation goes through the stock ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialVariant {
    pub id: String,

    /// Material name, e.g. "Cotton combed 30s".
    pub material_name: String,

    pub color: String,

    /// Unit of measure for `stock` (e.g. "m", "kg").
    #[serde(default = "default_unit")]
    pub unit: String,

    /// Current stock in `unit`.
    #[serde(default)]
    pub stock: f64,

    /// Whole rolls currently on hand.
    #[serde(default)]
    pub roll_quantity: i64,

    pub create_at: String,
    pub update_at: String,
}

fn default_unit() -> String {
    "m".to_string()
}

// ---------------------------------------------------------------------------
// MaterialColorAllocation
// ---------------------------------------------------------------------------

/// Reservation of a material variant for a batch.
///
/// Created when the batch's material requirements are computed; confirmed
/// (stock actually deducted) exactly once, at the material-allocation
/// transition. On confirmation the pre-deduction stock level is frozen into
/// the `*_at_allocation` snapshots for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialColorAllocation {
    pub id: String,
    pub batch_id: String,
    pub variant_id: String,

    /// Rolls reserved for the batch.
    #[serde(default)]
    pub roll_quantity: i64,

    /// Quantity to deduct, in the variant's unit.
    pub allocated_qty: f64,

    /// Meters per roll at planning time.
    #[serde(default)]
    pub meter_per_roll: f64,

    /// Variant stock immediately before deduction; frozen at confirmation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_at_allocation: Option<f64>,

    /// Variant roll count immediately before deduction; frozen at confirmation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll_quantity_at_allocation: Option<i64>,

    /// Whether stock has been deducted for this line.
    #[serde(default)]
    pub confirmed: bool,

    pub create_at: String,
    pub update_at: String,
}

// ---------------------------------------------------------------------------
// Stock ledger
// ---------------------------------------------------------------------------

/// Kind of stock movement.
///
/// IN and RETURN add the given (non-negative) quantity; OUT and ADJUSTMENT
/// apply the quantity as a signed delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockTxnType {
    In,
    Out,
    Adjustment,
    Return,
}

impl StockTxnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
            Self::Adjustment => "ADJUSTMENT",
            Self::Return => "RETURN",
        }
    }
}

impl std::fmt::Display for StockTxnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable ledger row. Every stock mutation is paired with exactly one
/// of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockTransaction {
    pub id: String,
    pub variant_id: String,
    pub txn_type: StockTxnType,

    /// The movement amount as supplied by the caller (signed for
    /// OUT/ADJUSTMENT).
    pub qty: f64,

    /// Stock level after this movement was applied.
    pub stock_after: f64,

    /// Free-form reference, e.g. a batch SKU.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    pub create_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn txn_type_serde() {
        assert_eq!(serde_json::to_string(&StockTxnType::In).unwrap(), "\"IN\"");
        assert_eq!(
            serde_json::to_string(&StockTxnType::Adjustment).unwrap(),
            "\"ADJUSTMENT\""
        );
        let back: StockTxnType = serde_json::from_str("\"RETURN\"").unwrap();
        assert_eq!(back, StockTxnType::Return);
    }

    #[test]
    fn allocation_snapshots_absent_until_confirmed() {
        let alloc = MaterialColorAllocation {
            id: "a1".into(),
            batch_id: "b1".into(),
            variant_id: "v1".into(),
            roll_quantity: 2,
            allocated_qty: 50.0,
            meter_per_roll: 25.0,
            stock_at_allocation: None,
            roll_quantity_at_allocation: None,
            confirmed: false,
            create_at: "2026-02-01T00:00:00Z".into(),
            update_at: "2026-02-01T00:00:00Z".into(),
        };
        let json = serde_json::to_string(&alloc).unwrap();
        assert!(!json.contains("stockAtAllocation"));
        let back: MaterialColorAllocation = serde_json::from_str(&json).unwrap();
        assert!(!back.confirmed);
    }
}
