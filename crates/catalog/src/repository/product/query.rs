use std::collections::HashMap;

use async_trait::async_trait;
use shared::config::ConnectionPool;
use shared::errors::RepositoryError;
use sqlx::QueryBuilder;
use tracing::error;
use uuid::Uuid;

use crate::abstract_trait::product::repository::{
    ListProductsQuery, ProductQueryRepositoryTrait,
};
use crate::model::Product;

pub struct ProductQueryRepository {
    db: ConnectionPool,
}

impl ProductQueryRepository {
    pub fn new(db: ConnectionPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductQueryRepositoryTrait for ProductQueryRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, RepositoryError> {
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| {
                error!("❌ Failed to fetch product {}: {:?}", id, e);
                RepositoryError::from(e)
            })
    }

    async fn list(&self, query: &ListProductsQuery) -> Result<Vec<Product>, RepositoryError> {
        let mut builder = QueryBuilder::new("SELECT * FROM products WHERE TRUE");

        if let Some(category) = &query.category {
            builder.push(" AND category = ");
            builder.push_bind(category);
        }

        if let Some(search) = &query.search {
            builder.push(" AND name ILIKE ");
            builder.push_bind(format!("%{search}%"));
        }

        if let Some(cursor) = query.cursor {
            builder.push(
                " AND (created_at, id) < (SELECT created_at, id FROM products WHERE id = ",
            );
            builder.push_bind(cursor);
            builder.push(")");
        }

        builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        builder.push_bind(query.limit + 1);

        builder
            .build_query_as::<Product>()
            .fetch_all(&self.db)
            .await
            .map_err(|e| {
                error!("❌ Failed to list products: {:?}", e);
                RepositoryError::from(e)
            })
    }

    async fn available_quantities(
        &self,
        product_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, i32>, RepositoryError> {
        let rows = sqlx::query_as::<_, (Uuid, i32)>(
            "SELECT id, stock_quantity FROM products WHERE id = ANY($1)",
        )
        .bind(product_ids)
        .fetch_all(&self.db)
        .await
        .map_err(|e| {
            error!("❌ Failed to check availability: {:?}", e);
            RepositoryError::from(e)
        })?;

        Ok(rows.into_iter().collect())
    }
}
