//! Products and material variants — the minimal administrative face the
//! workflow needs to exist against.

use stitcherp_core::{ListParams, ListResult, ServiceError, new_id, now_rfc3339};
use stitcherp_sql::Value;

use super::MfgService;
use super::stock;
use crate::model::{MaterialVariant, Product, StockTxnType};
use crate::store;

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVariantInput {
    pub material_name: String,
    pub color: String,
    pub unit: Option<String>,
    /// Opening stock; recorded as an IN ledger row so the history starts at
    /// the true opening balance.
    #[serde(default)]
    pub initial_stock: f64,
    #[serde(default)]
    pub roll_quantity: i64,
}

impl MfgService {
    // ── Products ──

    pub fn create_product(&self, input: CreateProductInput) -> Result<Product, ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::Validation("product name is required".into()));
        }
        let now = now_rfc3339();
        let product = Product {
            id: new_id(),
            name: input.name,
            description: input.description,
            create_at: now.clone(),
            update_at: now.clone(),
        };
        store::insert_record(
            self.db(),
            "products",
            &product.id,
            &product,
            &[
                ("name", Value::Text(product.name.clone())),
                ("create_at", Value::Text(now.clone())),
                ("update_at", Value::Text(now)),
            ],
        )?;
        Ok(product)
    }

    pub fn get_product(&self, id: &str) -> Result<Product, ServiceError> {
        store::get_record(self.db(), "products", id)
    }

    pub fn list_products(&self, params: &ListParams) -> Result<ListResult<Product>, ServiceError> {
        store::list_records_paginated(self.db(), "products", &[], params.limit.min(500), params.offset)
    }

    // ── Material variants ──

    pub fn create_material_variant(
        &self,
        input: CreateVariantInput,
    ) -> Result<MaterialVariant, ServiceError> {
        if input.material_name.trim().is_empty() || input.color.trim().is_empty() {
            return Err(ServiceError::Validation(
                "material name and color are required".into(),
            ));
        }
        if input.initial_stock < 0.0 || input.roll_quantity < 0 {
            return Err(ServiceError::Validation(
                "initial stock and roll quantity must be non-negative".into(),
            ));
        }

        let now = now_rfc3339();
        let variant = MaterialVariant {
            id: new_id(),
            material_name: input.material_name,
            color: input.color,
            unit: input.unit.unwrap_or_else(|| "m".to_string()),
            stock: 0.0,
            roll_quantity: input.roll_quantity,
            create_at: now.clone(),
            update_at: now.clone(),
        };

        self.in_txn(|tx| {
            store::insert_record(
                tx,
                "material_variants",
                &variant.id,
                &variant,
                &[
                    ("material_name", Value::Text(variant.material_name.clone())),
                    ("color", Value::Text(variant.color.clone())),
                    ("stock", Value::Real(0.0)),
                    ("create_at", Value::Text(now.clone())),
                    ("update_at", Value::Text(now.clone())),
                ],
            )?;
            if input.initial_stock > 0.0 {
                stock::apply_stock_txn(
                    tx,
                    &variant.id,
                    StockTxnType::In,
                    input.initial_stock,
                    None,
                    Some("opening stock".into()),
                )?;
            }
            store::get_record(tx, "material_variants", &variant.id)
        })
    }

    pub fn get_variant(&self, id: &str) -> Result<MaterialVariant, ServiceError> {
        store::get_record(self.db(), "material_variants", id)
    }

    pub fn list_variants(
        &self,
        params: &ListParams,
    ) -> Result<ListResult<MaterialVariant>, ServiceError> {
        store::list_records_paginated(
            self.db(),
            "material_variants",
            &[],
            params.limit.min(500),
            params.offset,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::svc;
    use super::*;

    #[test]
    fn create_variant_with_opening_stock() {
        let svc = svc();
        let v = svc
            .create_material_variant(CreateVariantInput {
                material_name: "Cotton combed 30s".into(),
                color: "Black".into(),
                unit: None,
                initial_stock: 120.0,
                roll_quantity: 4,
            })
            .unwrap();
        assert_eq!(v.stock, 120.0);
        assert_eq!(v.unit, "m");

        let txns = svc.list_transactions(&v.id).unwrap();
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].stock_after, 120.0);
    }

    #[test]
    fn duplicate_variant_conflicts() {
        let svc = svc();
        let input = || CreateVariantInput {
            material_name: "Cotton".into(),
            color: "Red".into(),
            unit: None,
            initial_stock: 0.0,
            roll_quantity: 0,
        };
        svc.create_material_variant(input()).unwrap();
        assert!(matches!(
            svc.create_material_variant(input()),
            Err(ServiceError::Conflict(_))
        ));
    }

    #[test]
    fn product_crud() {
        let svc = svc();
        let p = svc
            .create_product(CreateProductInput {
                name: "Basic Tee".into(),
                description: None,
            })
            .unwrap();
        let got = svc.get_product(&p.id).unwrap();
        assert_eq!(got.name, "Basic Tee");

        let listed = svc.list_products(&ListParams::default()).unwrap();
        assert_eq!(listed.total, 1);
    }

    #[test]
    fn empty_product_name_rejected() {
        let svc = svc();
        assert!(matches!(
            svc.create_product(CreateProductInput {
                name: "  ".into(),
                description: None
            }),
            Err(ServiceError::Validation(_))
        ));
    }
}
