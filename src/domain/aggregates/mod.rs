//! Aggregates module
pub mod cart;
pub mod custom_order;
pub mod order;
pub mod product;

pub use cart::{Cart, CartLine, SHIPPING_FEE};
pub use custom_order::{CustomOrder, CustomOrderStatus};
pub use order::{CustomerContact, Order, OrderStatus};
pub use product::Category;
