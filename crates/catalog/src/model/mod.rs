mod product;

pub use self::product::{NewProduct, Product, ProductPatch, UnavailableItem};
