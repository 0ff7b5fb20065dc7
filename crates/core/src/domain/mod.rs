pub mod cart;
pub mod chat;
pub mod order;
pub mod product;
