use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{InventoryRow, Reservation};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryResponse {
    pub product_id: String,
    pub available_quantity: i32,
    pub reserved_quantity: i32,
    pub total_quantity: i32,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl From<InventoryRow> for InventoryResponse {
    fn from(row: InventoryRow) -> Self {
        Self {
            product_id: row.product_id,
            available_quantity: row.available_quantity,
            reserved_quantity: row.reserved_quantity,
            total_quantity: row.total_quantity,
            version: row.version,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationResponse {
    pub id: Uuid,
    pub reservation_id: String,
    pub product_id: String,
    pub quantity: i32,
    pub status: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationResponse {
    fn from(reservation: Reservation) -> Self {
        Self {
            id: reservation.id,
            reservation_id: reservation.reservation_id,
            product_id: reservation.product_id,
            quantity: reservation.quantity,
            status: match reservation.status {
                crate::model::ReservationStatus::Active => "active",
                crate::model::ReservationStatus::Committed => "committed",
                crate::model::ReservationStatus::Released => "released",
            }
            .to_string(),
            expires_at: reservation.expires_at,
            created_at: reservation.created_at,
        }
    }
}
