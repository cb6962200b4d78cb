mod inventory;

pub use self::inventory::{InventoryRow, Reservation, ReservationItem, ReservationStatus};
