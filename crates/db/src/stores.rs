use std::sync::Arc;

use crate::repositories::{
    CartRepository, InMemoryCartRepository, InMemoryOrderRepository, InMemoryProductRepository,
    OrderRepository, ProductRepository, RepositoryStatusLookup, SqlCartRepository,
    SqlOrderRepository, SqlProductRepository,
};
use crate::DbPool;

/// The three stores a session or bot needs, behind trait objects so callers
/// do not care whether they are backed by SQLite or memory.
#[derive(Clone)]
pub struct Stores {
    pub products: Arc<dyn ProductRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub orders: Arc<dyn OrderRepository>,
}

impl Stores {
    pub fn sqlite(pool: DbPool) -> Self {
        Self {
            products: Arc::new(SqlProductRepository::new(pool.clone())),
            carts: Arc::new(SqlCartRepository::new(pool.clone())),
            orders: Arc::new(SqlOrderRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            products: Arc::new(InMemoryProductRepository::default()),
            carts: Arc::new(InMemoryCartRepository::default()),
            orders: Arc::new(InMemoryOrderRepository::default()),
        }
    }

    pub fn status_lookup(&self) -> RepositoryStatusLookup {
        RepositoryStatusLookup::new(self.orders.clone())
    }
}
