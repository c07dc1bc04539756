use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::{
    audit::log_audit,
    dto::products::{CreateProductRequest, ProductDetail, ProductList, UpdateProductRequest},
    entity::{
        categories::{Column as CatCol, Entity as Categories},
        orders::{Column as OrderCol, Entity as Orders},
        product_stock::{Column as StockCol, Entity as ProductStock},
        products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    line_items::{ItemsMap, parse_items, product_id_from_code},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Product, StockLevel, StockStatus},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

pub const TRENDING_LIMIT: usize = 6;

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();

    if let Some(slug) = query.category.as_ref().filter(|s| !s.is_empty()) {
        let category = Categories::find()
            .filter(
                Condition::all()
                    .add(CatCol::Slug.eq(slug.clone()))
                    .add(CatCol::IsActive.eq(true)),
            )
            .one(&state.orm)
            .await?;
        let category = match category {
            Some(c) => c,
            None => return Err(AppError::NotFound),
        };
        condition = condition.add(Column::CategoryId.eq(category.id));
    }

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    if query.latest == Some(true) {
        condition = condition.add(Column::LatestArrival.eq(true));
    }

    if let Some(min_price) = query.min_price_cents {
        condition = condition.add(Column::PriceCents.gte(min_price));
    }

    if let Some(max_price) = query.max_price_cents {
        condition = condition.add(Column::PriceCents.lte(max_price));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::PriceCents,
        ProductSortBy::Name => Column::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    let data = ProductList { items };
    Ok(ApiResponse::success("Products", data, Some(meta)))
}

pub async fn get_product(state: &AppState, id: i64) -> AppResult<ApiResponse<ProductDetail>> {
    let product = Products::find_by_id(id).one(&state.orm).await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let stock = ProductStock::find()
        .filter(StockCol::ProductId.eq(id))
        .order_by_asc(StockCol::Size)
        .order_by_asc(StockCol::Color)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|row| StockLevel {
            id: row.id,
            product_id: row.product_id,
            size: row.size,
            color: row.color,
            quantity: row.quantity,
        })
        .collect();

    Ok(ApiResponse::success(
        "Product",
        ProductDetail {
            product: product_from_entity(product),
            stock,
        },
        None,
    ))
}

/// Rank product ids by total quantity across order snapshots: highest
/// total first, equal totals fall back to ascending product id, capped at
/// [`TRENDING_LIMIT`]. Codes that do not embed a product id are skipped,
/// as are products whose accumulated quantity is not positive.
pub fn rank_trending<I>(item_maps: I) -> Vec<i64>
where
    I: IntoIterator<Item = ItemsMap>,
{
    let mut totals: HashMap<i64, i64> = HashMap::new();
    for items in item_maps {
        for (code, item) in &items {
            let Some(product_id) = product_id_from_code(code) else {
                continue;
            };
            *totals.entry(product_id).or_insert(0) += item.quantity;
        }
    }

    let mut ranked: Vec<(i64, i64)> = totals.into_iter().filter(|(_, qty)| *qty > 0).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(TRENDING_LIMIT)
        .map(|(id, _)| id)
        .collect()
}

pub async fn trending_products(state: &AppState) -> AppResult<ApiResponse<ProductList>> {
    let payloads: Vec<String> = Orders::find()
        .select_only()
        .column(OrderCol::ItemsJson)
        .into_tuple()
        .all(&state.orm)
        .await?;

    // Snapshots that fail to parse are skipped, never fatal.
    let ranked = rank_trending(payloads.iter().filter_map(|json| parse_items(json).ok()));

    let found = Products::find()
        .filter(Column::Id.is_in(ranked.clone()))
        .all(&state.orm)
        .await?;
    let mut by_id: HashMap<i64, ProductModel> = found.into_iter().map(|p| (p.id, p)).collect();

    // Explicit order-by-rank-position; ids of deleted products drop out.
    let items = ranked
        .iter()
        .filter_map(|id| by_id.remove(id))
        .map(product_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Trending",
        ProductList { items },
        Some(Meta::empty()),
    ))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    if payload.images.len() > 5 {
        return Err(AppError::BadRequest("at most 5 images are allowed".into()));
    }
    if let Some(category_id) = payload.category_id {
        if Categories::find_by_id(category_id)
            .one(&state.orm)
            .await?
            .is_none()
        {
            return Err(AppError::BadRequest("unknown category".into()));
        }
    }

    let mut images = payload.images.into_iter();
    let active = ActiveModel {
        id: NotSet,
        name: Set(payload.name),
        category_id: Set(payload.category_id),
        price_cents: Set(payload.price_cents),
        description: Set(payload.description),
        colors: Set(join_csv(&payload.colors)),
        sizes: Set(join_csv(&payload.sizes)),
        image_1: Set(images.next()),
        image_2: Set(images.next()),
        image_3: Set(images.next()),
        image_4: Set(images.next()),
        image_5: Set(images.next()),
        latest_arrival: Set(payload.latest_arrival.unwrap_or(false)),
        // Derived field: a new product has no stock rows yet.
        stock_status: Set(StockStatus::OutOfStock.as_str().to_string()),
        created_at: NotSet,
    };
    let product = active.insert(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: i64,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(category_id) = payload.category_id {
        if Categories::find_by_id(category_id)
            .one(&state.orm)
            .await?
            .is_none()
        {
            return Err(AppError::BadRequest("unknown category".into()));
        }
        active.category_id = Set(Some(category_id));
    }
    if let Some(price_cents) = payload.price_cents {
        active.price_cents = Set(price_cents);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(colors) = payload.colors {
        active.colors = Set(join_csv(&colors));
    }
    if let Some(sizes) = payload.sizes {
        active.sizes = Set(join_csv(&sizes));
    }
    if let Some(images) = payload.images {
        if images.len() > 5 {
            return Err(AppError::BadRequest("at most 5 images are allowed".into()));
        }
        let mut images = images.into_iter();
        active.image_1 = Set(images.next());
        active.image_2 = Set(images.next());
        active.image_3 = Set(images.next());
        active.image_4 = Set(images.next());
        active.image_5 = Set(images.next());
    }
    if let Some(latest_arrival) = payload.latest_arrival {
        active.latest_arrival = Set(latest_arrival);
    }

    let product = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Updated",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: i64,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Products::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(String::from)
        .collect()
}

fn join_csv(parts: &[String]) -> String {
    parts
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

fn product_from_entity(model: ProductModel) -> Product {
    let images = [
        model.image_1,
        model.image_2,
        model.image_3,
        model.image_4,
        model.image_5,
    ]
    .into_iter()
    .flatten()
    .collect();

    Product {
        id: model.id,
        name: model.name,
        category_id: model.category_id,
        price_cents: model.price_cents,
        description: model.description,
        colors: split_csv(&model.colors),
        sizes: split_csv(&model.sizes),
        images,
        latest_arrival: model.latest_arrival,
        stock_status: StockStatus::parse(&model.stock_status),
        created_at: model.created_at.with_timezone(&Utc),
    }
}
