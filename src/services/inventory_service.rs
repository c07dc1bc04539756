use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::{
    audit::log_audit,
    dto::products::StockView,
    entity::{
        product_stock::{
            ActiveModel as StockActive, Column as StockCol, Entity as ProductStock,
            Model as StockModel,
        },
        products::{ActiveModel as ProductActive, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{StockLevel, StockStatus},
    response::{ApiResponse, Meta},
    routes::admin::SetStockRequest,
    state::AppState,
};

/// Create or update the unique (product, size, color) row and refresh the
/// parent's derived stock status in the same transaction. The product row
/// is locked first so concurrent writes to different variants of the same
/// product serialize and the recomputation always sees the final sums.
pub async fn set_stock(
    state: &AppState,
    user: &AuthUser,
    product_id: i64,
    payload: SetStockRequest,
) -> AppResult<ApiResponse<StockView>> {
    ensure_admin(user)?;
    let quantity = payload.quantity.max(0);

    let txn = state.orm.begin().await?;

    let product = Products::find_by_id(product_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let existing = ProductStock::find()
        .filter(
            Condition::all()
                .add(StockCol::ProductId.eq(product_id))
                .add(StockCol::Size.eq(payload.size.clone()))
                .add(StockCol::Color.eq(payload.color.clone())),
        )
        .one(&txn)
        .await?;

    match existing {
        Some(row) => {
            if row.quantity != quantity {
                let mut active: StockActive = row.into();
                active.quantity = Set(quantity);
                active.update(&txn).await?;
            }
        }
        None => {
            StockActive {
                id: NotSet,
                product_id: Set(product_id),
                size: Set(payload.size.clone()),
                color: Set(payload.color.clone()),
                quantity: Set(quantity),
            }
            .insert(&txn)
            .await?;
        }
    }

    let rows = stock_rows(&txn, product_id).await?;
    let total = rows.iter().map(|r| r.quantity as i64).sum::<i64>();
    let status = StockStatus::from_total(total);

    // Write the derived field only when it actually changed.
    if product.stock_status != status.as_str() {
        let mut active: ProductActive = product.into();
        active.stock_status = Set(status.as_str().to_string());
        active.update(&txn).await?;
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "stock_set",
        Some("product_stock"),
        Some(serde_json::json!({
            "product_id": product_id,
            "size": payload.size,
            "color": payload.color,
            "quantity": quantity,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Stock updated",
        StockView {
            product_id,
            total,
            stock_status: status,
            rows: rows.into_iter().map(stock_level_from_entity).collect(),
        },
        Some(Meta::empty()),
    ))
}

pub async fn get_stock(
    state: &AppState,
    user: &AuthUser,
    product_id: i64,
) -> AppResult<ApiResponse<StockView>> {
    ensure_admin(user)?;

    if Products::find_by_id(product_id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let rows = stock_rows(&state.orm, product_id).await?;
    let total = rows.iter().map(|r| r.quantity as i64).sum::<i64>();

    Ok(ApiResponse::success(
        "Stock",
        StockView {
            product_id,
            total,
            stock_status: StockStatus::from_total(total),
            rows: rows.into_iter().map(stock_level_from_entity).collect(),
        },
        Some(Meta::empty()),
    ))
}

/// Sum of all variant rows for a product; no rows means zero.
pub async fn total_stock<C: ConnectionTrait>(conn: &C, product_id: i64) -> AppResult<i64> {
    let rows = stock_rows(conn, product_id).await?;
    Ok(rows.iter().map(|r| r.quantity as i64).sum())
}

async fn stock_rows<C: ConnectionTrait>(conn: &C, product_id: i64) -> AppResult<Vec<StockModel>> {
    let rows = ProductStock::find()
        .filter(StockCol::ProductId.eq(product_id))
        .order_by_asc(StockCol::Size)
        .order_by_asc(StockCol::Color)
        .all(conn)
        .await?;
    Ok(rows)
}

fn stock_level_from_entity(model: StockModel) -> StockLevel {
    StockLevel {
        id: model.id,
        product_id: model.product_id,
        size: model.size,
        color: model.color,
        quantity: model.quantity,
    }
}
