mod order;

pub use self::order::{
    CancelOrderRequest, CreateOrderRequest, ListOrdersRequest, Money, OrderItemDraft,
    ShippingAddress, UpdateOrderStatusRequest,
};
