use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};

use crate::{
    dto::orders::{
        CheckoutRequest, CheckoutResponse, DirectCaptureRequest, ExecutePaymentRequest,
        OrderDetail, OrderList,
    },
    error::AppResult,
    middleware::auth::{AuthUser, OptionalAuthUser},
    models::Order,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/checkout", post(checkout))
        .route("/{id}", get(get_order))
        .route("/{id}/payment/execute", post(execute_payment))
        .route("/{id}/payment/capture", post(capture_payment))
        .route("/{id}/payment/cancel", post(cancel_payment))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("sort_order" = Option<String>, Query, description = "asc, desc")
    ),
    responses(
        (status = 200, description = "Own orders", body = ApiResponse<OrderList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Order created; PayID orders are complete, hosted payments return an approval URL", body = ApiResponse<CheckoutResponse>),
        (status = 400, description = "Invalid cart, mismatched total or unsupported payment method"),
        (status = 502, description = "Payment initiation failed"),
    ),
    tag = "Orders"
)]
pub async fn checkout(
    State(state): State<AppState>,
    OptionalAuthUser(user): OptionalAuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<CheckoutResponse>>> {
    let resp = order_service::checkout(&state, user.as_ref(), payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(
        ("id" = i64, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Own order with parsed items", body = ApiResponse<OrderDetail>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<OrderDetail>>> {
    let resp = order_service::get_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/payment/execute",
    params(
        ("id" = i64, Path, description = "Order ID")
    ),
    request_body = ExecutePaymentRequest,
    responses(
        (status = 200, description = "Payment captured and recorded", body = ApiResponse<Order>),
        (status = 400, description = "Payment already recorded"),
        (status = 404, description = "Not Found"),
        (status = 502, description = "Provider capture failed; order unchanged"),
    ),
    tag = "Orders"
)]
pub async fn execute_payment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<ExecutePaymentRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_service::execute_provider_payment(&state, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/payment/capture",
    params(
        ("id" = i64, Path, description = "Order ID")
    ),
    request_body = DirectCaptureRequest,
    responses(
        (status = 200, description = "Provider-posted transaction recorded in place", body = ApiResponse<Order>),
        (status = 400, description = "Payment already recorded or unparseable amount"),
        (status = 404, description = "Not Found"),
    ),
    tag = "Orders"
)]
pub async fn capture_payment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<DirectCaptureRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_service::record_direct_capture(&state, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/payment/cancel",
    params(
        ("id" = i64, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Acknowledged; order unchanged"),
        (status = 404, description = "Not Found"),
    ),
    tag = "Orders"
)]
pub async fn cancel_payment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = order_service::cancel_payment(&state, id).await?;
    Ok(Json(resp))
}
