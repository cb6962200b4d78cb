mod order;

pub use self::order::{OrderItemResponse, OrderPageResponse, OrderResponse};
