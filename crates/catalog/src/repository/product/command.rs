use async_trait::async_trait;
use shared::config::ConnectionPool;
use shared::errors::RepositoryError;
use tracing::{error, info};
use uuid::Uuid;

use crate::abstract_trait::product::repository::ProductCommandRepositoryTrait;
use crate::model::{NewProduct, Product, ProductPatch};

pub struct ProductCommandRepository {
    db: ConnectionPool,
}

impl ProductCommandRepository {
    pub fn new(db: ConnectionPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductCommandRepositoryTrait for ProductCommandRepository {
    async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let created = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (id, name, description, price_amount, price_currency, category, stock_quantity)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_amount)
        .bind(&product.price_currency)
        .bind(&product.category)
        .bind(product.stock_quantity)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            error!("❌ Failed to create product '{}': {:?}", product.name, e);
            RepositoryError::from(e)
        })?;

        info!("✅ Product created | id={} name='{}'", created.id, created.name);
        Ok(created)
    }

    async fn update(&self, patch: &ProductPatch) -> Result<Product, RepositoryError> {
        let updated = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET name = $2,
                description = $3,
                price_amount = $4,
                price_currency = $5,
                category = $6,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(patch.id)
        .bind(&patch.name)
        .bind(&patch.description)
        .bind(patch.price_amount)
        .bind(&patch.price_currency)
        .bind(&patch.category)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| {
            error!("❌ Failed to update product {}: {:?}", patch.id, e);
            RepositoryError::from(e)
        })?
        .ok_or(RepositoryError::NotFound)?;

        info!("🔄 Product updated | id={}", updated.id);
        Ok(updated)
    }

    async fn update_stock(&self, product_id: Uuid, delta: i32) -> Result<i32, RepositoryError> {
        let new_quantity = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            RETURNING stock_quantity
            "#,
        )
        .bind(product_id)
        .bind(delta)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| {
            error!("❌ Failed to update stock for {}: {:?}", product_id, e);
            RepositoryError::from(e)
        })?
        .ok_or(RepositoryError::NotFound)?;

        info!(
            "📦 Stock updated | product={} delta={} new={}",
            product_id, delta, new_quantity
        );
        Ok(new_quantity)
    }
}
