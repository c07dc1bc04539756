use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        categories::{CategoryList, CategorySummary, CreateCategoryRequest, UpdateCategoryRequest},
        orders::{
            CheckoutRequest, CheckoutResponse, DirectCaptureRequest, ExecutePaymentRequest,
            OrderDetail, OrderList,
        },
        products::{
            CreateProductRequest, ProductDetail, ProductList, StockView, UpdateProductRequest,
        },
    },
    models::{
        Category, Order, OrderStatus, Product, ShippingOption, StockLevel, StockStatus, User,
    },
    response::{ApiResponse, Meta},
    routes::{
        admin, auth, categories, health, orders, params, products as product_routes, shipping,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        categories::list_categories,
        product_routes::list_products,
        product_routes::trending_products,
        product_routes::get_product,
        shipping::list_shipping_options,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        orders::execute_payment,
        orders::capture_payment,
        orders::cancel_payment,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::confirm_order,
        admin::reject_order,
        admin::get_stock,
        admin::set_stock,
        admin::create_product,
        admin::update_product,
        admin::delete_product,
        admin::create_category,
        admin::update_category,
        admin::delete_category
    ),
    components(
        schemas(
            User,
            Category,
            Product,
            StockLevel,
            StockStatus,
            ShippingOption,
            Order,
            OrderStatus,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateCategoryRequest,
            UpdateCategoryRequest,
            CategorySummary,
            CategoryList,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            ProductDetail,
            StockView,
            CheckoutRequest,
            CheckoutResponse,
            ExecutePaymentRequest,
            DirectCaptureRequest,
            OrderList,
            OrderDetail,
            admin::SetStockRequest,
            shipping::ShippingOptionList,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<ProductDetail>,
            ApiResponse<OrderList>,
            ApiResponse<OrderDetail>,
            ApiResponse<CheckoutResponse>,
            ApiResponse<StockView>,
            ApiResponse<CategoryList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Catalog", description = "Categories, products and shipping options"),
        (name = "Orders", description = "Checkout and payment confirmation"),
        (name = "Admin", description = "Back-office endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
