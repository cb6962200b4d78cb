use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use shared::abstract_trait::KafkaTrait;
use shared::errors::{RepositoryError, ServiceError};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::abstract_trait::inventory::repository::{
    InventoryCommandRepositoryTrait, InventoryQueryRepositoryTrait,
};
use crate::model::{InventoryRow, Reservation, ReservationItem, ReservationStatus};

// In-memory double that mirrors the database contract: all-or-nothing
// reserves, version bumps, conservation of quantities.
#[derive(Default)]
pub(crate) struct FakeInventoryRepository {
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    rows: HashMap<String, InventoryRow>,
    reservations: Vec<Reservation>,
}

impl FakeInventoryRepository {
    pub async fn seed(&self, product_id: &str, quantity: i32) {
        self.state.lock().await.rows.insert(
            product_id.to_string(),
            InventoryRow {
                product_id: product_id.to_string(),
                available_quantity: quantity,
                reserved_quantity: 0,
                total_quantity: quantity,
                version: 1,
                updated_at: Utc::now(),
            },
        );
    }

    pub async fn row(&self, product_id: &str) -> InventoryRow {
        self.state
            .lock()
            .await
            .rows
            .get(product_id)
            .cloned()
            .expect("product seeded")
    }

    pub async fn reservation_status(
        &self,
        reservation_id: &str,
        product_id: &str,
    ) -> Option<ReservationStatus> {
        self.state
            .lock()
            .await
            .reservations
            .iter()
            .find(|r| r.reservation_id == reservation_id && r.product_id == product_id)
            .map(|r| r.status)
    }

    pub async fn expire_all(&self) {
        let mut state = self.state.lock().await;
        for reservation in state.reservations.iter_mut() {
            reservation.expires_at = Utc::now() - Duration::seconds(1);
        }
    }

    pub async fn total_active_reserved(&self, product_id: &str) -> i32 {
        self.state
            .lock()
            .await
            .reservations
            .iter()
            .filter(|r| r.product_id == product_id && r.status == ReservationStatus::Active)
            .map(|r| r.quantity)
            .sum()
    }

    pub async fn assert_conserved(&self) {
        let state = self.state.lock().await;
        for row in state.rows.values() {
            assert!(row.available_quantity >= 0, "{}: available < 0", row.product_id);
            assert!(row.reserved_quantity >= 0, "{}: reserved < 0", row.product_id);
            assert_eq!(
                row.available_quantity + row.reserved_quantity,
                row.total_quantity,
                "{}: available + reserved != total",
                row.product_id
            );
        }
    }

    fn finalize(
        state: &mut FakeState,
        reservation_id: &str,
        status: ReservationStatus,
    ) -> Result<Vec<ReservationItem>, RepositoryError> {
        let active: Vec<usize> = state
            .reservations
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                r.reservation_id == reservation_id && r.status == ReservationStatus::Active
            })
            .map(|(i, _)| i)
            .collect();

        if active.is_empty() {
            return Err(RepositoryError::NotFound);
        }

        let mut items = Vec::new();
        for index in active {
            let (product_id, quantity) = {
                let reservation = &mut state.reservations[index];
                reservation.status = status;
                reservation.updated_at = Utc::now();
                (reservation.product_id.clone(), reservation.quantity)
            };

            let row = state.rows.get_mut(&product_id).expect("row exists");
            row.reserved_quantity -= quantity;
            if status == ReservationStatus::Released {
                row.available_quantity += quantity;
            } else {
                row.total_quantity -= quantity;
            }
            row.version += 1;
            row.updated_at = Utc::now();

            items.push(ReservationItem {
                product_id,
                quantity,
            });
        }

        Ok(items)
    }
}

#[async_trait]
impl InventoryCommandRepositoryTrait for FakeInventoryRepository {
    async fn reserve(
        &self,
        reservation_id: &str,
        items: &[ReservationItem],
        ttl_seconds: i64,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;

        for item in items {
            let duplicate = state.reservations.iter().any(|r| {
                r.reservation_id == reservation_id && r.product_id == item.product_id
            });
            if duplicate {
                return Err(RepositoryError::AlreadyExists(format!(
                    "reservation {} already holds product {}",
                    reservation_id, item.product_id
                )));
            }
        }

        // All-or-nothing: verify every line before mutating anything.
        for item in items {
            let row = state.rows.get(&item.product_id).ok_or_else(|| {
                RepositoryError::Custom(format!(
                    "product {} not found in inventory",
                    item.product_id
                ))
            })?;
            if row.available_quantity < item.quantity {
                return Err(RepositoryError::InsufficientStock {
                    product_id: item.product_id.clone(),
                    available: row.available_quantity,
                    requested: item.quantity,
                });
            }
        }

        let expires_at = Utc::now() + Duration::seconds(ttl_seconds);
        for item in items {
            let row = state.rows.get_mut(&item.product_id).expect("checked above");
            row.available_quantity -= item.quantity;
            row.reserved_quantity += item.quantity;
            row.version += 1;
            row.updated_at = Utc::now();

            state.reservations.push(Reservation {
                id: Uuid::new_v4(),
                reservation_id: reservation_id.to_string(),
                product_id: item.product_id.clone(),
                quantity: item.quantity,
                status: ReservationStatus::Active,
                expires_at,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            });
        }

        Ok(())
    }

    async fn commit(&self, reservation_id: &str) -> Result<Vec<ReservationItem>, RepositoryError> {
        let mut state = self.state.lock().await;
        Self::finalize(&mut state, reservation_id, ReservationStatus::Committed)
    }

    async fn release(&self, reservation_id: &str) -> Result<Vec<ReservationItem>, RepositoryError> {
        let mut state = self.state.lock().await;
        Self::finalize(&mut state, reservation_id, ReservationStatus::Released)
    }

    async fn adjust(&self, product_id: &str, delta: i32) -> Result<InventoryRow, RepositoryError> {
        let mut state = self.state.lock().await;
        let row = state
            .rows
            .entry(product_id.to_string())
            .and_modify(|row| {
                row.available_quantity += delta;
                row.total_quantity += delta;
                row.version += 1;
                row.updated_at = Utc::now();
            })
            .or_insert_with(|| InventoryRow {
                product_id: product_id.to_string(),
                available_quantity: delta,
                reserved_quantity: 0,
                total_quantity: delta,
                version: 1,
                updated_at: Utc::now(),
            });
        Ok(row.clone())
    }

    async fn reap_expired(&self) -> Result<i64, RepositoryError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        let expired: Vec<String> = state
            .reservations
            .iter()
            .filter(|r| r.status == ReservationStatus::Active && r.expires_at < now)
            .map(|r| r.reservation_id.clone())
            .collect();

        let mut released: i64 = 0;
        for reservation_id in expired {
            if let Ok(items) =
                Self::finalize(&mut state, &reservation_id, ReservationStatus::Released)
            {
                released += items.len() as i64;
            }
        }
        Ok(released)
    }
}

#[async_trait]
impl InventoryQueryRepositoryTrait for FakeInventoryRepository {
    async fn find_by_product(
        &self,
        product_id: &str,
    ) -> Result<Option<InventoryRow>, RepositoryError> {
        Ok(self.state.lock().await.rows.get(product_id).cloned())
    }

    async fn find_reservations(
        &self,
        reservation_id: &str,
    ) -> Result<Vec<Reservation>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .await
            .reservations
            .iter()
            .filter(|r| r.reservation_id == reservation_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(crate) struct FakeKafka {
    published: Mutex<Vec<String>>,
}

impl FakeKafka {
    pub async fn topics(&self) -> Vec<String> {
        self.published.lock().await.clone()
    }
}

#[async_trait]
impl KafkaTrait for FakeKafka {
    async fn publish(&self, topic: &str, _key: &str, _value: &[u8]) -> Result<(), ServiceError> {
        self.published.lock().await.push(topic.to_string());
        Ok(())
    }

    async fn publish_with_headers(
        &self,
        topic: &str,
        key: &str,
        value: &[u8],
        _headers: &[(&str, String)],
    ) -> Result<(), ServiceError> {
        self.publish(topic, key, value).await
    }
}
