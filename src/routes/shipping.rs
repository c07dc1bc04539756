use axum::{Json, Router, extract::State, routing::get};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    entity::shipping_options::{Column, Entity as ShippingOptions},
    error::AppResult,
    models::ShippingOption,
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct ShippingOptionList {
    pub items: Vec<ShippingOption>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_shipping_options))
}

#[utoipa::path(
    get,
    path = "/api/shipping-options",
    responses(
        (status = 200, description = "Active shipping options", body = ApiResponse<ShippingOptionList>)
    ),
    tag = "Catalog"
)]
pub async fn list_shipping_options(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<ShippingOptionList>>> {
    let items = ShippingOptions::find()
        .filter(Column::IsActive.eq(true))
        .order_by_asc(Column::SortOrder)
        .order_by_asc(Column::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|model| ShippingOption {
            id: model.id,
            name: model.name,
            cost_cents: model.cost_cents,
            is_active: model.is_active,
            sort_order: model.sort_order,
        })
        .collect();

    Ok(Json(ApiResponse::success(
        "Shipping options",
        ShippingOptionList { items },
        Some(Meta::empty()),
    )))
}
