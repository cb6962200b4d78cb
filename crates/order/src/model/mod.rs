mod order;
mod order_item;

pub use self::order::{NewOrder, Order, OrderStatus};
pub use self::order_item::{NewOrderItem, OrderItem};
