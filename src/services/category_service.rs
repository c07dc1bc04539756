use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::{
    audit::log_audit,
    dto::categories::{
        CategoryList, CategorySummary, CreateCategoryRequest, UpdateCategoryRequest,
    },
    entity::{
        categories::{ActiveModel, Column, Entity as Categories, Model as CategoryModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Category,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Storefront listing: active categories by name, each with its product
/// count. Disabled categories disappear from here but keep their rows.
pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let categories = Categories::find()
        .filter(Column::IsActive.eq(true))
        .order_by_asc(Column::Name)
        .all(&state.orm)
        .await?;

    let mut items = Vec::with_capacity(categories.len());
    for category in categories {
        let product_count = Products::find()
            .filter(ProdCol::CategoryId.eq(category.id))
            .count(&state.orm)
            .await? as i64;
        items.push(CategorySummary {
            id: category.id,
            name: category.name,
            slug: category.slug,
            is_active: category.is_active,
            product_count,
        });
    }

    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(Meta::empty()),
    ))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;

    let exists = Categories::find()
        .filter(
            Condition::any()
                .add(Column::Name.eq(payload.name.clone()))
                .add(Column::Slug.eq(payload.slug.clone())),
        )
        .one(&state.orm)
        .await?;
    if exists.is_some() {
        return Err(AppError::BadRequest(
            "category name or slug already in use".into(),
        ));
    }

    let category = ActiveModel {
        id: NotSet,
        name: Set(payload.name),
        slug: Set(payload.slug),
        is_active: Set(payload.is_active.unwrap_or(true)),
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "category_create",
        Some("categories"),
        Some(serde_json::json!({ "category_id": category.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Category created",
        category_from_entity(category),
        Some(Meta::empty()),
    ))
}

pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    id: i64,
    payload: UpdateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;
    let existing = Categories::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(slug) = payload.slug {
        active.slug = Set(slug);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    let category = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "category_update",
        Some("categories"),
        Some(serde_json::json!({ "category_id": category.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Updated",
        category_from_entity(category),
        Some(Meta::empty()),
    ))
}

/// Deletion is blocked while products still reference the category;
/// operators deactivate instead. Orphaning products is never an option.
pub async fn delete_category(
    state: &AppState,
    user: &AuthUser,
    id: i64,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let product_count = Products::find()
        .filter(ProdCol::CategoryId.eq(id))
        .count(&state.orm)
        .await?;
    if product_count > 0 {
        return Err(AppError::BadRequest(
            "category still has products; deactivate it instead".into(),
        ));
    }

    let result = Categories::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "category_delete",
        Some("categories"),
        Some(serde_json::json!({ "category_id": id })),
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

fn category_from_entity(model: CategoryModel) -> Category {
    Category {
        id: model.id,
        name: model.name,
        slug: model.slug,
        is_active: model.is_active,
    }
}
