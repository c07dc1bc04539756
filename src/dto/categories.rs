use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub slug: String,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub is_active: Option<bool>,
}

/// Storefront category listing entry: active categories plus how many
/// products each one carries.
#[derive(Debug, Serialize, ToSchema)]
pub struct CategorySummary {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub is_active: bool,
    pub product_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryList {
    pub items: Vec<CategorySummary>,
}
