//! Shared fixtures for service tests: an in-memory service and batches
//! advanced to the pipeline stage a test needs.

use std::sync::Arc;

use stitcherp_core::Actor;
use stitcherp_sql::SqliteStore;

use super::MfgService;
use super::catalog::{CreateProductInput, CreateVariantInput};
use super::workflow::{AllocationInput, CreateBatchInput, CuttingResultInput, VerifyDecision};
use crate::model::{MaterialVariant, ProductionBatch, SizeColorRequest, StageTask};

pub(crate) fn svc() -> MfgService {
    let db = Arc::new(SqliteStore::open_in_memory().unwrap());
    MfgService::new(db).unwrap()
}

pub(crate) fn actor() -> Actor {
    Actor {
        name: "Dewi".into(),
        role: "production_chief".into(),
    }
}

pub(crate) fn variant_with_stock(
    svc: &MfgService,
    name: &str,
    color: &str,
    stock: f64,
) -> MaterialVariant {
    svc.create_material_variant(CreateVariantInput {
        material_name: name.into(),
        color: color.into(),
        unit: None,
        initial_stock: stock,
        roll_quantity: 4,
    })
    .unwrap()
}

/// A PENDING batch with the given size/color requests and one allocation per
/// (variant, qty) pair.
pub(crate) fn pending_batch(
    svc: &MfgService,
    sku: &str,
    requests: &[(&str, &str, i64)],
    allocations: &[(&str, f64)],
) -> ProductionBatch {
    let product = svc
        .create_product(CreateProductInput {
            name: format!("Product for {}", sku),
            description: None,
        })
        .unwrap();

    svc.create_batch(
        CreateBatchInput {
            sku: sku.into(),
            product_id: product.id,
            target_quantity: None,
            size_color_requests: requests
                .iter()
                .map(|(size, color, pieces)| SizeColorRequest {
                    product_size: (*size).into(),
                    color: (*color).into(),
                    requested_pieces: *pieces,
                })
                .collect(),
            allocations: allocations
                .iter()
                .map(|(variant_id, qty)| AllocationInput {
                    variant_id: (*variant_id).into(),
                    roll_quantity: 2,
                    meter_per_roll: 25.0,
                    allocated_qty: *qty,
                })
                .collect(),
            notes: None,
        },
        &actor(),
    )
    .unwrap()
}

/// A batch advanced to ASSIGNED_TO_CUTTER with `pieces` requested on a
/// single (M, Red) line and materials already allocated.
pub(crate) fn batch_assigned_to_cutter(
    svc: &MfgService,
    pieces: i64,
) -> (ProductionBatch, StageTask) {
    let v = variant_with_stock(svc, "Cotton combed 30s", "Red", 500.0);
    let batch = pending_batch(svc, "TSH-001", &[("M", "Red", pieces)], &[(&v.id, 50.0)]);
    svc.confirm_materials(&batch.id, &actor()).unwrap();
    let task = svc.assign_cutter(&batch.id, "Ujang", &actor()).unwrap();
    (svc.get_batch(&batch.id).unwrap(), task)
}

/// A batch advanced to CUTTING_VERIFIED with the given result rows cut and
/// approved (requests mirror the rows).
pub(crate) fn batch_cutting_verified(
    svc: &MfgService,
    sku: &str,
    rows: &[(&str, &str, i64)],
) -> ProductionBatch {
    let v = variant_with_stock(svc, "Cotton combed 30s", "White", 1000.0);
    let batch = pending_batch(svc, sku, rows, &[(&v.id, 100.0)]);
    svc.confirm_materials(&batch.id, &actor()).unwrap();
    svc.assign_cutter(&batch.id, "Ujang", &actor()).unwrap();
    svc.input_cutting_results(
        &batch.id,
        rows.iter()
            .map(|(size, color, pieces)| CuttingResultInput {
                product_size: (*size).into(),
                color: (*color).into(),
                actual_pieces: *pieces,
            })
            .collect(),
        &actor(),
    )
    .unwrap();
    svc.verify_cutting(&batch.id, VerifyDecision::Approve, "", &actor())
        .unwrap()
}
