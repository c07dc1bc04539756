use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{line_items::ItemsMap, models::Order};

/// Cart snapshot plus customer/shipping details, submitted once at
/// checkout. `items` arrives in the external wire shape (line-item code
/// mapped to a positional 6-tuple) and is typed at this boundary.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    #[schema(value_type = Object)]
    pub items: ItemsMap,
    /// Total including shipping; recomputed and verified server-side.
    pub amount_cents: i64,
    pub name: String,
    pub email: String,
    pub address1: String,
    #[serde(default)]
    pub address2: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub shipping_method: String,
    #[serde(default)]
    pub shipping_cost_cents: i64,
    pub payment_method: String,
    /// Reference to an already-uploaded proof image (PayID path only).
    pub payid_proof: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub order: Order,
    /// Present on the hosted-payment path; the caller redirects here.
    pub approval_url: Option<String>,
}

/// Query parameters the provider appends when redirecting back.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ExecutePaymentRequest {
    pub payment_id: String,
    pub payer_id: String,
}

/// Transaction details posted directly by the provider instead of the
/// redirect query. Applied in place to the order created at checkout.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DirectCaptureRequest {
    pub transaction_id: String,
    /// Amount reported by the provider, e.g. "42.50".
    pub amount_paid: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetail {
    pub order: Order,
    /// Parsed snapshot, or None when the stored payload is unreadable.
    #[schema(value_type = Object)]
    pub items: Option<ItemsMap>,
    /// Rendering used by detail views; falls back to the
    /// "Invalid items format" placeholder instead of failing.
    pub items_html: String,
}
