use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use rust_decimal::Decimal;
use storefront_api::{config::AppConfig, db::create_pool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user(&pool, "Admin", "admin@example.com", "admin123", "admin").await?;
    let user_id = ensure_user(&pool, "Demo User", "user@example.com", "user123", "user").await?;
    seed_products(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    name: &str,
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

    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = row {
        return Ok(id);
    }

    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, cart_data, role) VALUES ($1, $2, $3, $4, '{}'::jsonb, $5)",
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .execute(pool)
    .await?;

    Ok(id)
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let count: (i64,) = sqlx::query_as("SELECT count(*) FROM products")
        .fetch_one(pool)
        .await?;
    if count.0 > 0 {
        return Ok(());
    }

    let products: [(&str, &str, Decimal, Decimal); 4] = [
        (
            "Striped Flutter Sleeve Blouse",
            "women",
            Decimal::new(5000, 2),
            Decimal::new(8050, 2),
        ),
        (
            "Men Green Bomber Jacket",
            "men",
            Decimal::new(8500, 2),
            Decimal::new(12050, 2),
        ),
        (
            "Kids Orange Colourblocked Hoodie",
            "kids",
            Decimal::new(6000, 2),
            Decimal::new(10050, 2),
        ),
        (
            "Sleeveless Maxi Dress",
            "women",
            Decimal::new(10000, 2),
            Decimal::new(15000, 2),
        ),
    ];

    for (name, category, new_price, old_price) in products {
        sqlx::query(
            "INSERT INTO products (name, category, new_price, old_price) VALUES ($1, $2, $3, $4)",
        )
        .bind(name)
        .bind(category)
        .bind(new_price)
        .bind(old_price)
        .execute(pool)
        .await?;
    }

    Ok(())
}
