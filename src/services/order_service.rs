use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::{
    audit::log_audit,
    dto::orders::{
        CheckoutRequest, CheckoutResponse, DirectCaptureRequest, ExecutePaymentRequest,
        OrderDetail, OrderList,
    },
    entity::orders::{
        ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
    },
    error::{AppError, AppResult},
    line_items::{format_cents, items_total_cents, parse_items, render_items_html, to_items_json, parse_cents},
    mail::{admin_order_email, order_placed_email, send_or_log},
    middleware::auth::AuthUser,
    models::{Order, OrderStatus},
    payments::CreatePayment,
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

const PAYMENT_PENDING: &str = "";
const PAYMENT_PAYID: &str = "PayID";
const PAYMENT_PAID: &str = "Paid";
const PAYMENT_SUCCESS: &str = "Success";

/// Turn a submitted cart into an order and dispatch to a payment path.
/// The order row is created before any payment is confirmed on both
/// paths; it represents an intent to purchase, not a sale. Inventory is
/// never touched here: stock only moves through the admin ledger.
pub async fn checkout(
    state: &AppState,
    user: Option<&AuthUser>,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    let payment_method = payload.payment_method.clone();
    match payment_method.as_str() {
        "paypal" | "payid" => {}
        other => {
            return Err(AppError::BadRequest(format!(
                "unsupported payment method {other:?}"
            )));
        }
    }

    if payload.items.is_empty() {
        return Err(AppError::BadRequest("cart is empty".into()));
    }
    let items_json =
        to_items_json(&payload.items).map_err(|e| AppError::BadRequest(e.to_string()))?;

    if payload.shipping_cost_cents < 0 {
        return Err(AppError::BadRequest("invalid shipping cost".into()));
    }
    let items_total = items_total_cents(&payload.items)
        .ok_or_else(|| AppError::BadRequest("cart contains an invalid quantity or price".into()))?;
    let expected = items_total + payload.shipping_cost_cents;
    if expected != payload.amount_cents {
        return Err(AppError::BadRequest(format!(
            "submitted total {} does not match computed total {}",
            format_cents(payload.amount_cents),
            format_cents(expected)
        )));
    }

    let order = OrderActive {
        order_id: NotSet,
        items_json: Set(items_json),
        amount_cents: Set(payload.amount_cents),
        name: Set(payload.name),
        email: Set(payload.email),
        address1: Set(payload.address1),
        address2: Set(payload.address2),
        city: Set(payload.city),
        state: Set(payload.state),
        zip_code: Set(payload.zip_code),
        phone: Set(payload.phone),
        shipping_method: Set(payload.shipping_method),
        shipping_cost_cents: Set(payload.shipping_cost_cents),
        oid: Set(String::new()),
        amount_paid_cents: Set(None),
        payment_status: Set(PAYMENT_PENDING.to_string()),
        payid_proof: Set(None),
        user_id: Set(user.map(|u| u.user_id)),
        is_guest: Set(user.is_none()),
        status: Set(OrderStatus::Placed.as_str().to_string()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        user.map(|u| u.user_id),
        "checkout",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": order.order_id,
            "payment_method": payment_method,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    if payload.payment_method == "paypal" {
        let request = CreatePayment {
            amount_cents: order.amount_cents,
            currency: state.config.currency.clone(),
            description: format!("Order #{}", order.order_id),
            return_url: state.config.payment_return_url(),
            cancel_url: state.config.payment_cancel_url(),
        };
        let initiated = match state.payments.create_payment(request).await {
            Ok(initiated) => initiated,
            Err(err) => {
                // The PLACED order stays behind with no payment reference.
                tracing::warn!(error = %err, order_id = order.order_id, "payment initiation failed");
                return Err(AppError::Payment(err.to_string()));
            }
        };

        return Ok(ApiResponse::success(
            "Approve the payment to finish your order",
            CheckoutResponse {
                order: order_from_entity(order),
                approval_url: Some(initiated.approval_url),
            },
            Some(Meta::empty()),
        ));
    }

    // PayID: the customer pays externally and uploads proof; an admin
    // reviews it later. No automatic progression from here.
    let mut active: OrderActive = order.into();
    active.payment_status = Set(PAYMENT_PAYID.to_string());
    active.payid_proof = Set(payload.payid_proof);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    send_or_log(state.mailer.as_ref(), order_placed_email(&order)).await;
    send_or_log(
        state.mailer.as_ref(),
        admin_order_email(&order, &state.config.admin_email, &state.config.public_base_url),
    )
    .await;

    Ok(ApiResponse::success(
        "Your order has been placed. We'll review your payment proof shortly.",
        CheckoutResponse {
            order: order_from_entity(order),
            approval_url: None,
        },
        Some(Meta::empty()),
    ))
}

/// Provider callback path: capture the approved payment, then record it
/// on the pending order. The payment fields are filled at most once; a
/// lost compare-and-set reports a duplicate instead of double-recording.
pub async fn execute_provider_payment(
    state: &AppState,
    order_id: i64,
    payload: ExecutePaymentRequest,
) -> AppResult<ApiResponse<Order>> {
    let order = Orders::find_by_id(order_id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };
    if order.payment_status != PAYMENT_PENDING {
        return Err(AppError::BadRequest(
            "payment already recorded for this order".into(),
        ));
    }

    let captured = state
        .payments
        .execute_payment(&payload.payment_id, &payload.payer_id)
        .await
        .map_err(|err| {
            tracing::warn!(error = %err, order_id, "payment execution failed");
            AppError::Payment(err.to_string())
        })?;

    let result = Orders::update_many()
        .col_expr(OrderCol::PaymentStatus, Expr::value(PAYMENT_PAID))
        .col_expr(OrderCol::Oid, Expr::value(captured.payment_id.clone()))
        .col_expr(OrderCol::AmountPaidCents, Expr::value(order.amount_cents))
        .col_expr(OrderCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(
            Condition::all()
                .add(OrderCol::OrderId.eq(order_id))
                .add(OrderCol::PaymentStatus.eq(PAYMENT_PENDING)),
        )
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::BadRequest(
            "payment already recorded for this order".into(),
        ));
    }

    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    send_or_log(state.mailer.as_ref(), order_placed_email(&order)).await;
    send_or_log(
        state.mailer.as_ref(),
        admin_order_email(&order, &state.config.admin_email, &state.config.public_base_url),
    )
    .await;

    if let Err(err) = log_audit(
        &state.pool,
        order.user_id,
        "payment_captured",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.order_id, "oid": order.oid })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Payment recorded",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

/// Direct form-post path: the provider posts transaction details instead
/// of redirect query parameters. Applied in place to the order created at
/// checkout; no second order row is ever written.
pub async fn record_direct_capture(
    state: &AppState,
    order_id: i64,
    payload: DirectCaptureRequest,
) -> AppResult<ApiResponse<Order>> {
    if payload.transaction_id.is_empty() {
        return Err(AppError::BadRequest("missing transaction id".into()));
    }
    let amount_paid_cents = parse_cents(&payload.amount_paid)
        .ok_or_else(|| AppError::BadRequest("unparseable amount_paid".into()))?;

    if Orders::find_by_id(order_id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let result = Orders::update_many()
        .col_expr(OrderCol::PaymentStatus, Expr::value(PAYMENT_SUCCESS))
        .col_expr(OrderCol::Oid, Expr::value(payload.transaction_id.clone()))
        .col_expr(OrderCol::AmountPaidCents, Expr::value(amount_paid_cents))
        .col_expr(OrderCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(
            Condition::all()
                .add(OrderCol::OrderId.eq(order_id))
                .add(OrderCol::PaymentStatus.eq(PAYMENT_PENDING)),
        )
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::BadRequest(
            "payment already recorded for this order".into(),
        ));
    }

    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    send_or_log(state.mailer.as_ref(), order_placed_email(&order)).await;
    send_or_log(
        state.mailer.as_ref(),
        admin_order_email(&order, &state.config.admin_email, &state.config.public_base_url),
    )
    .await;

    if let Err(err) = log_audit(
        &state.pool,
        order.user_id,
        "payment_recorded",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.order_id, "oid": order.oid })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Payment recorded",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

/// Cancel acknowledgement only; the order keeps its last good state.
pub async fn cancel_payment(
    state: &AppState,
    order_id: i64,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if Orders::find_by_id(order_id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound);
    }
    Ok(ApiResponse::acknowledge(
        "Payment cancelled. Your order has not been paid.",
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
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
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: i64,
) -> AppResult<ApiResponse<OrderDetail>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::OrderId.eq(id)),
        )
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    Ok(ApiResponse::success(
        "OK",
        order_detail_from_entity(order),
        Some(Meta::empty()),
    ))
}

pub(crate) fn order_detail_from_entity(model: OrderModel) -> OrderDetail {
    // A snapshot that fails to parse renders the placeholder rather than
    // failing the whole detail view.
    let items = parse_items(&model.items_json).ok();
    let items_html = render_items_html(&model.items_json);
    OrderDetail {
        order: order_from_entity(model),
        items,
        items_html,
    }
}

pub(crate) fn order_from_entity(model: OrderModel) -> Order {
    Order {
        order_id: model.order_id,
        items_json: model.items_json,
        amount_cents: model.amount_cents,
        name: model.name,
        email: model.email,
        address1: model.address1,
        address2: model.address2,
        city: model.city,
        state: model.state,
        zip_code: model.zip_code,
        phone: model.phone,
        shipping_method: model.shipping_method,
        shipping_cost_cents: model.shipping_cost_cents,
        oid: model.oid,
        amount_paid_cents: model.amount_paid_cents,
        payment_status: model.payment_status,
        payid_proof: model.payid_proof,
        user_id: model.user_id,
        is_guest: model.is_guest,
        status: OrderStatus::parse(&model.status).unwrap_or(OrderStatus::Placed),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
