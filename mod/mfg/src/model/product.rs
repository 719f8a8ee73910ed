use serde::{Deserialize, Serialize};

/// A sellable garment design. Batches reference products; product management
/// beyond this minimal record lives outside this module.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,

    /// Product name, e.g. "Basic Tee".
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub create_at: String,
    pub update_at: String,
}
