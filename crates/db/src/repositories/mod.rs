use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use storefront_core::domain::cart::CartItem;
use storefront_core::domain::order::{Order, OrderId, OrderLine, OrderStatus};
use storefront_core::domain::product::{Product, ProductId};
use storefront_core::errors::{ApplicationError, DomainError};
use storefront_core::nlu::responder::OrderStatusLookup;

pub mod cart;
pub mod memory;
pub mod order;
pub mod product;

pub use cart::SqlCartRepository;
pub use memory::{InMemoryCartRepository, InMemoryOrderRepository, InMemoryProductRepository};
pub use order::SqlOrderRepository;
pub use product::SqlProductRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Domain(domain) => ApplicationError::Domain(domain),
            other => ApplicationError::Persistence(other.to_string()),
        }
    }
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// All products ordered by short id.
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError>;
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;
    async fn find_by_short_id(&self, short_id: u32) -> Result<Option<Product>, RepositoryError>;
    async fn save(&self, product: Product) -> Result<(), RepositoryError>;
}

/// Carts are keyed by an opaque owner string: a chat id for the bot, the
/// configured guest name for the app.
#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn add_item(&self, owner: &str, product: &Product) -> Result<(), RepositoryError>;
    async fn items(&self, owner: &str) -> Result<Vec<CartItem>, RepositoryError>;
    async fn clear(&self, owner: &str) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Stores a new order in `Received` state and returns it with its
    /// store-assigned id.
    async fn place_order(
        &self,
        owner: &str,
        lines: Vec<OrderLine>,
    ) -> Result<Order, RepositoryError>;
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;
    /// Returns `false` when no order has that id.
    async fn set_status(&self, id: &OrderId, status: OrderStatus) -> Result<bool, RepositoryError>;
}

pub(crate) fn ensure_lines(lines: &[OrderLine]) -> Result<(), RepositoryError> {
    if lines.is_empty() {
        return Err(DomainError::InvariantViolation(
            "an order needs at least one line".to_string(),
        )
        .into());
    }
    Ok(())
}

/// Adapts an order store to the responder's status lookup.
#[derive(Clone)]
pub struct RepositoryStatusLookup {
    orders: Arc<dyn OrderRepository>,
}

impl RepositoryStatusLookup {
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        Self { orders }
    }
}

#[async_trait]
impl OrderStatusLookup for RepositoryStatusLookup {
    async fn lookup_order_status(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<OrderStatus>, ApplicationError> {
        let order = self.orders.find_by_id(order_id).await?;
        Ok(order.map(|order| order.status))
    }
}
