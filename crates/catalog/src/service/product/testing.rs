use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use shared::abstract_trait::CacheBackendTrait;
use shared::errors::{CacheError, RepositoryError};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::abstract_trait::product::repository::{
    ListProductsQuery, ProductCommandRepositoryTrait, ProductQueryRepositoryTrait,
};
use crate::model::{NewProduct, Product, ProductPatch};

#[derive(Default)]
pub(crate) struct FakeProductRepository {
    products: Mutex<Vec<Product>>,
    find_calls: AtomicU32,
    list_calls: AtomicU32,
}

impl FakeProductRepository {
    pub async fn seed(&self, name: &str, stock: i32) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.products.lock().await.push(Product {
            id,
            name: name.to_string(),
            description: String::new(),
            price_amount: 500,
            price_currency: "USD".to_string(),
            category: "misc".to_string(),
            stock_quantity: stock,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub async fn product_count(&self) -> usize {
        self.products.lock().await.len()
    }

    pub fn find_calls(&self) -> u32 {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> u32 {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductCommandRepositoryTrait for FakeProductRepository {
    async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let now = Utc::now();
        let created = Product {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            price_amount: product.price_amount,
            price_currency: product.price_currency.clone(),
            category: product.category.clone(),
            stock_quantity: product.stock_quantity,
            created_at: now,
            updated_at: now,
        };
        self.products.lock().await.push(created.clone());
        Ok(created)
    }

    async fn update(&self, patch: &ProductPatch) -> Result<Product, RepositoryError> {
        let mut products = self.products.lock().await;
        let product = products
            .iter_mut()
            .find(|p| p.id == patch.id)
            .ok_or(RepositoryError::NotFound)?;

        product.name = patch.name.clone();
        product.description = patch.description.clone();
        product.price_amount = patch.price_amount;
        product.price_currency = patch.price_currency.clone();
        product.category = patch.category.clone();
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn update_stock(&self, product_id: Uuid, delta: i32) -> Result<i32, RepositoryError> {
        let mut products = self.products.lock().await;
        let product = products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or(RepositoryError::NotFound)?;

        product.stock_quantity += delta;
        product.updated_at = Utc::now();
        Ok(product.stock_quantity)
    }
}

#[async_trait]
impl ProductQueryRepositoryTrait for FakeProductRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, RepositoryError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .products
            .lock()
            .await
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn list(&self, query: &ListProductsQuery) -> Result<Vec<Product>, RepositoryError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let mut products: Vec<Product> = self
            .products
            .lock()
            .await
            .iter()
            .filter(|p| {
                query
                    .category
                    .as_deref()
                    .is_none_or(|category| p.category == category)
            })
            .filter(|p| {
                query
                    .search
                    .as_deref()
                    .is_none_or(|search| p.name.to_lowercase().contains(&search.to_lowercase()))
            })
            .cloned()
            .collect();

        products.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        products.truncate((query.limit + 1) as usize);
        Ok(products)
    }

    async fn available_quantities(
        &self,
        product_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, i32>, RepositoryError> {
        Ok(self
            .products
            .lock()
            .await
            .iter()
            .filter(|p| product_ids.contains(&p.id))
            .map(|p| (p.id, p.stock_quantity))
            .collect())
    }
}

// Backend whose every call fails, for the fail-open paths.
pub(crate) struct FailingCacheBackend;

#[async_trait]
impl CacheBackendTrait for FailingCacheBackend {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Pool("cache down".into()))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Pool("cache down".into()))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Pool("cache down".into()))
    }

    async fn delete_by_prefix(&self, _prefix: &str) -> Result<u64, CacheError> {
        Err(CacheError::Pool("cache down".into()))
    }

    async fn set_nx(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<bool, CacheError> {
        Err(CacheError::Pool("cache down".into()))
    }
}
