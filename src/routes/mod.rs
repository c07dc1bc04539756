use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod categories;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod products;
pub mod shipping;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/categories", categories::router())
        .nest("/products", products::router())
        .nest("/shipping-options", shipping::router())
        .nest("/orders", orders::router())
        .nest("/admin", admin::router())
}
