use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Product, StockLevel, StockStatus};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub category_id: Option<i64>,
    pub price_cents: i64,
    pub description: String,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    /// At most five image references; extras are rejected.
    pub images: Vec<String>,
    pub latest_arrival: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub category_id: Option<i64>,
    pub price_cents: Option<i64>,
    pub description: Option<String>,
    pub colors: Option<Vec<String>>,
    pub sizes: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub latest_arrival: Option<bool>,
}

#[derive(Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}

/// Quick-view payload: the product plus its per-variant stock rows.
#[derive(Serialize, ToSchema)]
pub struct ProductDetail {
    pub product: Product,
    pub stock: Vec<StockLevel>,
}

/// Back-office inventory view: rows, their sum and the derived status.
#[derive(Serialize, ToSchema)]
pub struct StockView {
    pub product_id: i64,
    pub total: i64,
    pub stock_status: StockStatus,
    pub rows: Vec<StockLevel>,
}
