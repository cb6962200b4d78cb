mod payment;

pub use self::payment::{NewPayment, Payment, PaymentStatus};
