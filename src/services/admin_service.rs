use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

use crate::{
    audit::log_audit,
    dto::orders::{OrderDetail, OrderList},
    entity::orders::{Column as OrderCol, Entity as Orders},
    error::{AppError, AppResult},
    mail::{send_or_log, status_update_email},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderStatus},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::order_service::{order_detail_from_entity, order_from_entity},
    state::AppState,
};

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let mut finder = Orders::find().filter(condition);

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    let order_list = OrderList { items: orders };

    Ok(ApiResponse::success("Orders", order_list, Some(meta)))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: i64,
) -> AppResult<ApiResponse<OrderDetail>> {
    ensure_admin(user)?;
    let order = Orders::find_by_id(id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    Ok(ApiResponse::success(
        "Order found",
        order_detail_from_entity(order),
        Some(Meta::empty()),
    ))
}

pub async fn confirm_order(
    state: &AppState,
    user: &AuthUser,
    id: i64,
) -> AppResult<ApiResponse<Order>> {
    transition_order(state, user, id, OrderStatus::Confirmed, "order_confirm").await
}

pub async fn reject_order(
    state: &AppState,
    user: &AuthUser,
    id: i64,
) -> AppResult<ApiResponse<Order>> {
    transition_order(state, user, id, OrderStatus::Rejected, "order_reject").await
}

/// PLACED -> CONFIRMED / PLACED -> REJECTED, as a compare-and-set so two
/// racing operators cannot both win. Exactly one status email goes out
/// per successful transition; a repeat call is a no-op with zero emails.
async fn transition_order(
    state: &AppState,
    user: &AuthUser,
    id: i64,
    target: OrderStatus,
    action: &str,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;

    let result = Orders::update_many()
        .col_expr(OrderCol::Status, Expr::value(target.as_str()))
        .col_expr(OrderCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(
            Condition::all()
                .add(OrderCol::OrderId.eq(id))
                .add(OrderCol::Status.eq(OrderStatus::Placed.as_str())),
        )
        .exec(&state.orm)
        .await?;

    let order = Orders::find_by_id(id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    if result.rows_affected == 0 {
        return Ok(ApiResponse::success(
            format!("Order already {}", order.status.to_lowercase()),
            order_from_entity(order),
            Some(Meta::empty()),
        ));
    }

    send_or_log(state.mailer.as_ref(), status_update_email(&order, target)).await;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        action,
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.order_id, "status": order.status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let message = match target {
        OrderStatus::Confirmed => "Order confirmed",
        OrderStatus::Rejected => "Order rejected",
        OrderStatus::Placed => "Order updated",
    };
    Ok(ApiResponse::success(
        message,
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}
