use serde::{Deserialize, Serialize};

use crate::model::ReservationItem;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveStockRequest {
    pub reservation_id: String,
    pub items: Vec<ReservationItem>,
    pub ttl_seconds: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustInventoryRequest {
    pub product_id: String,
    pub delta: i32,
    pub reason: String,
}
