use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use uuid::Uuid;

use storefront_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        categories::CreateCategoryRequest,
        orders::{CheckoutRequest, DirectCaptureRequest, ExecutePaymentRequest},
        products::CreateProductRequest,
    },
    entity::users::ActiveModel as UserActive,
    error::AppError,
    line_items::{INVALID_ITEMS_PLACEHOLDER, ItemsMap, LineItem},
    mail::RecordingMailer,
    middleware::auth::AuthUser,
    models::{OrderStatus, StockStatus},
    payments::StubGateway,
    routes::admin::SetStockRequest,
    services::{
        admin_service, category_service, inventory_service, order_service, product_service,
    },
    state::AppState,
};

// Integration flow: catalog setup -> inventory ledger -> guest checkout on
// both payment paths -> admin fulfillment -> trending. Runs everything in
// one test so table truncation cannot race between test threads.
#[tokio::test]
async fn checkout_payment_and_fulfillment_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let (state, mailer, gateway) = setup_state(&database_url).await?;

    let admin_id = create_user(&state, "admin", "admin@example.com").await?;
    let admin = AuthUser {
        user_id: admin_id,
        role: "admin".into(),
    };

    // Catalog
    let category = category_service::create_category(
        &state,
        &admin,
        CreateCategoryRequest {
            name: "Drop Shoulders".into(),
            slug: "drop-shoulders".into(),
            is_active: None,
        },
    )
    .await?
    .data
    .unwrap();

    let product = product_service::create_product(
        &state,
        &admin,
        CreateProductRequest {
            name: "Oversized Tee".into(),
            category_id: Some(category.id),
            price_cents: 3500,
            description: "Boxy fit".into(),
            colors: vec!["Red".into(), "Black".into()],
            sizes: vec!["M".into(), "L".into()],
            images: vec!["http://img.example/tee.jpg".into()],
            latest_arrival: Some(true),
        },
    )
    .await?
    .data
    .unwrap();
    // No stock rows yet, so the derived status starts out of stock.
    assert_eq!(product.stock_status, StockStatus::OutOfStock);

    // Inventory ledger: the derived status follows the sum of the rows.
    let view = inventory_service::set_stock(
        &state,
        &admin,
        product.id,
        SetStockRequest {
            size: "M".into(),
            color: "Red".into(),
            quantity: 3,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(view.total, 3);
    assert_eq!(view.stock_status, StockStatus::InStock);
    assert_eq!(view.rows.len(), 1);

    // Same call again: same row state, same status, no extra row.
    let view = inventory_service::set_stock(
        &state,
        &admin,
        product.id,
        SetStockRequest {
            size: "M".into(),
            color: "Red".into(),
            quantity: 3,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(view.total, 3);
    assert_eq!(view.stock_status, StockStatus::InStock);
    assert_eq!(view.rows.len(), 1);

    // Negative input clamps to zero and flips the status back.
    let view = inventory_service::set_stock(
        &state,
        &admin,
        product.id,
        SetStockRequest {
            size: "M".into(),
            color: "Red".into(),
            quantity: -2,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(view.total, 0);
    assert_eq!(view.stock_status, StockStatus::OutOfStock);
    assert_eq!(view.rows.len(), 1);
    assert_eq!(view.rows[0].quantity, 0);

    // A second variant gets its own unique row.
    let view = inventory_service::set_stock(
        &state,
        &admin,
        product.id,
        SetStockRequest {
            size: "L".into(),
            color: "Red".into(),
            quantity: 2,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(view.rows.len(), 2);
    assert_eq!(view.total, 2);
    assert_eq!(view.stock_status, StockStatus::InStock);
    assert_eq!(
        inventory_service::total_stock(&state.orm, product.id).await?,
        2
    );

    // Guest PayID checkout: order created before payment, both emails out.
    let code = format!("id{}_red_m", product.id);
    let items: ItemsMap = BTreeMap::from([(
        code,
        LineItem {
            quantity: 2,
            name: "Oversized Tee".into(),
            unit_price: "35.00".into(),
            color: "Red".into(),
            size: "M".into(),
            image_url: "http://img.example/tee.jpg".into(),
        },
    )]);
    let total_cents = 2 * 3500 + 995;

    let before = mailer.sent_count();
    let resp = order_service::checkout(
        &state,
        None,
        checkout_request(items.clone(), total_cents, "payid"),
    )
    .await?
    .data
    .unwrap();
    let payid_order = resp.order;
    assert!(resp.approval_url.is_none());
    assert_eq!(payid_order.payment_status, "PayID");
    assert_eq!(payid_order.payid_proof, None);
    assert_eq!(payid_order.status, OrderStatus::Placed);
    assert!(payid_order.is_guest);
    assert_eq!(mailer.sent_count(), before + 2);
    assert_eq!(mailer.sent_to("guest@example.com"), 1);
    assert_eq!(mailer.sent_to("ops@example.com"), 1);

    // Client totals are not trusted; a mismatch creates nothing.
    let before = mailer.sent_count();
    assert!(
        order_service::checkout(&state, None, checkout_request(items.clone(), 999, "payid"))
            .await
            .is_err()
    );
    assert_eq!(mailer.sent_count(), before);

    // Unknown payment methods are rejected before any order exists.
    assert!(
        order_service::checkout(
            &state,
            None,
            checkout_request(items.clone(), total_cents, "bank-transfer")
        )
        .await
        .is_err()
    );

    // Fulfillment: PLACED -> CONFIRMED sends exactly one email.
    let before = mailer.sent_count();
    let confirmed = admin_service::confirm_order(&state, &admin, payid_order.order_id)
        .await?
        .data
        .unwrap();
    assert_eq!(confirmed.status, OrderStatus::Confirmed);
    assert_eq!(mailer.sent_count(), before + 1);

    // Re-confirming is a no-op with zero emails, and a late reject loses.
    let before = mailer.sent_count();
    let repeat = admin_service::confirm_order(&state, &admin, payid_order.order_id)
        .await?
        .data
        .unwrap();
    assert_eq!(repeat.status, OrderStatus::Confirmed);
    let rejected = admin_service::reject_order(&state, &admin, payid_order.order_id)
        .await?
        .data
        .unwrap();
    assert_eq!(rejected.status, OrderStatus::Confirmed);
    assert_eq!(mailer.sent_count(), before);

    // Unknown order ids are reported, nothing changes.
    assert!(matches!(
        admin_service::confirm_order(&state, &admin, 999_999).await,
        Err(AppError::NotFound)
    ));

    // Hosted payment path: checkout hands back the provider approval URL.
    let resp = order_service::checkout(
        &state,
        None,
        checkout_request(items.clone(), total_cents, "paypal"),
    )
    .await?
    .data
    .unwrap();
    assert_eq!(
        resp.approval_url.as_deref(),
        Some("https://provider.example/approve")
    );
    assert_eq!(gateway.create_calls.load(Ordering::SeqCst), 1);
    let paypal_order = resp.order;
    assert_eq!(paypal_order.payment_status, "");

    // Provider callback: captured and recorded at most once.
    let before = mailer.sent_count();
    let paid = order_service::execute_provider_payment(
        &state,
        paypal_order.order_id,
        ExecutePaymentRequest {
            payment_id: "PAY-1".into(),
            payer_id: "PAYER-1".into(),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(paid.payment_status, "Paid");
    assert_eq!(paid.oid, "PAY-1");
    assert_eq!(paid.amount_paid_cents, Some(total_cents));
    assert_eq!(mailer.sent_count(), before + 2);
    assert_eq!(gateway.execute_calls.load(Ordering::SeqCst), 1);

    assert!(
        order_service::execute_provider_payment(
            &state,
            paypal_order.order_id,
            ExecutePaymentRequest {
                payment_id: "PAY-1".into(),
                payer_id: "PAYER-1".into(),
            },
        )
        .await
        .is_err()
    );

    // Direct form-post path: updates the checkout order in place.
    let resp = order_service::checkout(
        &state,
        None,
        checkout_request(items.clone(), total_cents, "paypal"),
    )
    .await?
    .data
    .unwrap();
    let direct = order_service::record_direct_capture(
        &state,
        resp.order.order_id,
        DirectCaptureRequest {
            transaction_id: "TX-9".into(),
            amount_paid: "79.95".into(),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(direct.order_id, resp.order.order_id);
    assert_eq!(direct.payment_status, "Success");
    assert_eq!(direct.oid, "TX-9");
    assert_eq!(direct.amount_paid_cents, Some(7995));

    // Cancel acknowledges without touching state.
    order_service::cancel_payment(&state, direct.order_id).await?;
    let detail = admin_service::get_order_admin(&state, &admin, direct.order_id)
        .await?
        .data
        .unwrap();
    assert_eq!(detail.order.payment_status, "Success");
    assert!(detail.items.is_some());

    // Trending: three orders of two units each put the product on top.
    let trending = product_service::trending_products(&state).await?.data.unwrap();
    assert_eq!(trending.items.first().map(|p| p.id), Some(product.id));

    // A stored snapshot that no longer parses degrades to the placeholder.
    let backend = state.orm.get_database_backend();
    state
        .orm
        .execute(Statement::from_string(
            backend,
            format!(
                "UPDATE orders SET items_json = '{{not json' WHERE order_id = {}",
                payid_order.order_id
            ),
        ))
        .await?;
    let detail = admin_service::get_order_admin(&state, &admin, payid_order.order_id)
        .await?
        .data
        .unwrap();
    assert!(detail.items.is_none());
    assert_eq!(detail.items_html, INVALID_ITEMS_PLACEHOLDER);

    Ok(())
}

fn checkout_request(items: ItemsMap, amount_cents: i64, payment_method: &str) -> CheckoutRequest {
    CheckoutRequest {
        items,
        amount_cents,
        name: "Guest Buyer".into(),
        email: "guest@example.com".into(),
        address1: "1 Main St".into(),
        address2: String::new(),
        city: "Sydney".into(),
        state: "NSW".into(),
        zip_code: "2000".into(),
        phone: "0400000000".into(),
        shipping_method: "Standard Post".into(),
        shipping_cost_cents: 995,
        payment_method: payment_method.into(),
        payid_proof: None,
    }
}

async fn setup_state(
    database_url: &str,
) -> anyhow::Result<(AppState, Arc<RecordingMailer>, Arc<StubGateway>)> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE orders, product_stock, products, categories, shipping_options, audit_logs, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    let mailer = Arc::new(RecordingMailer::default());
    let gateway = Arc::new(StubGateway::default());
    let config = AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".into(),
        port: 0,
        admin_email: "ops@example.com".into(),
        public_base_url: "http://localhost:3000".into(),
        currency: "USD".into(),
        smtp: None,
        paypal: None,
    };

    let state = AppState {
        pool,
        orm,
        config,
        mailer: mailer.clone(),
        payments: gateway.clone(),
    };
    Ok((state, mailer, gateway))
}

async fn create_user(state: &AppState, role: &str, email: &str) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        role: Set(role.into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}
