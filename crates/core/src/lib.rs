pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod nlu;

pub use catalog::Catalog;
pub use domain::cart::{Cart, CartItem, CartSummary};
pub use domain::chat::{ChatMessage, ChatTranscript, Sender};
pub use domain::order::{Order, OrderId, OrderLine, OrderStatus};
pub use domain::product::{Category, Product, ProductId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use nlu::query::{filter_products, parse_query, SearchCriteria};
pub use nlu::responder::{
    OrderStatusLookup, Reply, ReplyKind, Responder, ResponderContext, QUICK_REPLIES,
};
