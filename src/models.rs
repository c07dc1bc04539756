use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Derived from the sum of a product's stock rows; never edited directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    OutOfStock,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::OutOfStock => "out_of_stock",
        }
    }

    pub fn from_total(total: i64) -> Self {
        if total <= 0 {
            StockStatus::OutOfStock
        } else {
            StockStatus::InStock
        }
    }

    pub fn parse(s: &str) -> Self {
        if s == "in_stock" {
            StockStatus::InStock
        } else {
            StockStatus::OutOfStock
        }
    }
}

/// Fulfillment status, advanced only by an explicit admin action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Placed,
    Confirmed,
    Rejected,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "PLACED",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PLACED" => Some(OrderStatus::Placed),
            "CONFIRMED" => Some(OrderStatus::Confirmed),
            "REJECTED" => Some(OrderStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category_id: Option<i64>,
    pub price_cents: i64,
    pub description: String,
    /// Variant axes offered for this product.
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    /// Up to five image references.
    pub images: Vec<String>,
    pub latest_arrival: bool,
    pub stock_status: StockStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StockLevel {
    pub id: i64,
    pub product_id: i64,
    pub size: String,
    pub color: String,
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ShippingOption {
    pub id: i64,
    pub name: String,
    pub cost_cents: i64,
    pub is_active: bool,
    pub sort_order: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub order_id: i64,
    /// Cart snapshot in the external wire shape (code -> 6-tuple).
    pub items_json: String,
    pub amount_cents: i64,
    pub name: String,
    pub email: String,
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub phone: String,
    pub shipping_method: String,
    pub shipping_cost_cents: i64,
    /// Provider-assigned transaction id, empty until a payment is recorded.
    pub oid: String,
    pub amount_paid_cents: Option<i64>,
    /// Free-text payment label: "", "PayID", "Paid" or "Success".
    pub payment_status: String,
    pub payid_proof: Option<String>,
    pub user_id: Option<Uuid>,
    pub is_guest: bool,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
