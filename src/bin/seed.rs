use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use storefront_api::{config::AppConfig, db::create_pool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user_with_role(&pool, "admin@example.com", "admin123", "admin").await?;
    let user_id = ensure_user_with_role(&pool, "user@example.com", "user123", "user").await?;
    seed_shipping_options(&pool).await?;
    seed_catalog(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user_with_role(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_optional(pool)
    .await?;

    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_shipping_options(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let options = [
        ("Standard Post", 995_i64, 1),
        ("Express Post", 1495_i64, 2),
        ("Local Pickup", 0_i64, 3),
    ];
    for (name, cost_cents, sort_order) in options {
        sqlx::query(
            r#"
            INSERT INTO shipping_options (name, cost_cents, sort_order)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(name)
        .bind(cost_cents)
        .bind(sort_order)
        .execute(pool)
        .await?;
    }
    println!("Seeded shipping options");
    Ok(())
}

async fn seed_catalog(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let category_id = ensure_category(pool, "Drop Shoulders", "drop-shoulders").await?;

    let products = [
        ("Oversized Drop Tee", 3500_i64, "Black,White", "S,M,L,XL", 12),
        ("Heavyweight Drop Hoodie", 7900_i64, "Black,Sand", "M,L,XL", 8),
        ("Acid Wash Drop Tee", 4200_i64, "Grey", "S,M,L", 0),
    ];

    for (name, price_cents, colors, sizes, quantity) in products {
        let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM products WHERE name = $1")
            .bind(name)
            .fetch_optional(pool)
            .await?;
        let product_id = match existing {
            Some((id,)) => id,
            None => {
                let row: (i64,) = sqlx::query_as(
                    r#"
                    INSERT INTO products
                        (name, category_id, price_cents, description, colors, sizes, stock_status)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    RETURNING id
                    "#,
                )
                .bind(name)
                .bind(category_id)
                .bind(price_cents)
                .bind(format!("{name} from the seed catalog"))
                .bind(colors)
                .bind(sizes)
                .bind(if quantity > 0 { "in_stock" } else { "out_of_stock" })
                .fetch_one(pool)
                .await?;
                row.0
            }
        };

        // One row per variant, all at the same seeded quantity.
        for color in colors.split(',') {
            for size in sizes.split(',') {
                sqlx::query(
                    r#"
                    INSERT INTO product_stock (product_id, size, color, quantity)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (product_id, size, color) DO UPDATE SET quantity = EXCLUDED.quantity
                    "#,
                )
                .bind(product_id)
                .bind(size)
                .bind(color)
                .bind(quantity)
                .execute(pool)
                .await?;
            }
        }
    }

    println!("Seeded catalog");
    Ok(())
}

async fn ensure_category(pool: &sqlx::PgPool, name: &str, slug: &str) -> anyhow::Result<i64> {
    let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM categories WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = existing {
        return Ok(id);
    }
    let row: (i64,) =
        sqlx::query_as("INSERT INTO categories (name, slug) VALUES ($1, $2) RETURNING id")
            .bind(name)
            .bind(slug)
            .fetch_one(pool)
            .await?;
    Ok(row.0)
}
