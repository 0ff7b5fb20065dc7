use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use storefront_core::domain::cart::CartItem;
use storefront_core::domain::order::{Order, OrderId, OrderLine, OrderStatus};
use storefront_core::domain::product::{Product, ProductId};

use super::{ensure_lines, CartRepository, OrderRepository, ProductRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<HashMap<String, Product>>,
}

impl InMemoryProductRepository {
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let products =
            products.into_iter().map(|product| (product.id.0.clone(), product)).collect();
        Self { products: RwLock::new(products) }
    }
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        let mut listed = products.values().cloned().collect::<Vec<_>>();
        listed.sort_by_key(|product| product.short_id);
        Ok(listed)
    }

    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.get(&id.0).cloned())
    }

    async fn find_by_short_id(&self, short_id: u32) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.values().find(|product| product.short_id == short_id).cloned())
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        product.validate()?;
        let mut products = self.products.write().await;
        let taken = products
            .values()
            .any(|existing| existing.short_id == product.short_id && existing.id != product.id);
        if taken {
            return Err(RepositoryError::Decode(format!(
                "short id {} is already assigned to another product",
                product.short_id
            )));
        }
        products.insert(product.id.0.clone(), product);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCartRepository {
    carts: RwLock<HashMap<String, Vec<CartItem>>>,
}

#[async_trait::async_trait]
impl CartRepository for InMemoryCartRepository {
    async fn add_item(&self, owner: &str, product: &Product) -> Result<(), RepositoryError> {
        let mut carts = self.carts.write().await;
        carts.entry(owner.to_string()).or_default().push(CartItem::single(product.clone()));
        Ok(())
    }

    async fn items(&self, owner: &str) -> Result<Vec<CartItem>, RepositoryError> {
        let carts = self.carts.read().await;
        Ok(carts.get(owner).cloned().unwrap_or_default())
    }

    async fn clear(&self, owner: &str) -> Result<(), RepositoryError> {
        let mut carts = self.carts.write().await;
        carts.remove(owner);
        Ok(())
    }
}

/// Ids are assigned sequentially from 1, like the SQLite store.
#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<Vec<Order>>,
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn place_order(
        &self,
        owner: &str,
        lines: Vec<OrderLine>,
    ) -> Result<Order, RepositoryError> {
        ensure_lines(&lines)?;
        let mut orders = self.orders.write().await;
        let order = Order {
            id: OrderId((orders.len() + 1).to_string()),
            owner: owner.to_string(),
            total: Order::total_of(&lines),
            lines,
            status: OrderStatus::Received,
            created_at: Utc::now(),
        };
        orders.push(order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders.iter().find(|order| order.id == *id).cloned())
    }

    async fn set_status(&self, id: &OrderId, status: OrderStatus) -> Result<bool, RepositoryError> {
        let mut orders = self.orders.write().await;
        match orders.iter_mut().find(|order| order.id == *id) {
            Some(order) => {
                order.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use storefront_core::domain::order::{OrderId, OrderLine, OrderStatus};
    use storefront_core::domain::product::{Category, Product, ProductId};

    use crate::repositories::{
        CartRepository, InMemoryCartRepository, InMemoryOrderRepository,
        InMemoryProductRepository, OrderRepository, ProductRepository, RepositoryError,
    };

    fn product(id: &str, short_id: u32, price: i64) -> Product {
        Product {
            id: ProductId(id.to_string()),
            short_id,
            name: id.to_string(),
            category: Some(Category::Breakfast),
            price: Decimal::new(price, 0),
        }
    }

    #[tokio::test]
    async fn products_list_in_short_id_order_and_resolve_short_ids() {
        let repo = InMemoryProductRepository::with_products([
            product("poha", 3, 40),
            product("idli", 1, 50),
            product("dosa", 2, 70),
        ]);

        let listed = repo.list_products().await.expect("list");
        assert_eq!(listed.iter().map(|p| p.short_id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(
            repo.find_by_short_id(2).await.expect("find").map(|p| p.id),
            Some(ProductId("dosa".to_string()))
        );
        assert_eq!(repo.find_by_short_id(9).await.expect("find"), None);
    }

    #[tokio::test]
    async fn saving_a_duplicate_short_id_is_rejected() {
        let repo = InMemoryProductRepository::default();
        repo.save(product("idli", 1, 50)).await.expect("save idli");

        let result = repo.save(product("dosa", 1, 70)).await;
        assert!(matches!(result, Err(RepositoryError::Decode(_))));
        repo.save(product("idli", 1, 55)).await.expect("re-saving same product is an update");
    }

    #[tokio::test]
    async fn carts_are_isolated_per_owner() {
        let repo = InMemoryCartRepository::default();
        let idli = product("idli", 1, 50);

        repo.add_item("chat-1", &idli).await.expect("add");
        repo.add_item("chat-1", &idli).await.expect("add again");
        repo.add_item("chat-2", &idli).await.expect("add other owner");

        assert_eq!(repo.items("chat-1").await.expect("items").len(), 2);
        repo.clear("chat-1").await.expect("clear");
        assert!(repo.items("chat-1").await.expect("items").is_empty());
        assert_eq!(repo.items("chat-2").await.expect("items").len(), 1);
    }

    #[tokio::test]
    async fn orders_get_sequential_ids_and_status_updates() {
        let repo = InMemoryOrderRepository::default();
        let lines = vec![line()];

        let first = repo.place_order("guest", lines.clone()).await.expect("place");
        let second = repo.place_order("guest", lines).await.expect("place");
        assert_eq!(first.id, OrderId("1".to_string()));
        assert_eq!(second.id, OrderId("2".to_string()));
        assert_eq!(first.total, Decimal::new(100, 0));

        assert!(repo.set_status(&first.id, OrderStatus::OutForDelivery).await.expect("set"));
        let missing = OrderId("7".to_string());
        assert!(!repo.set_status(&missing, OrderStatus::Delivered).await.expect("set"));
        assert_eq!(
            repo.find_by_id(&first.id).await.expect("find").map(|o| o.status),
            Some(OrderStatus::OutForDelivery)
        );
    }

    #[tokio::test]
    async fn empty_orders_are_rejected() {
        let repo = InMemoryOrderRepository::default();
        let result = repo.place_order("guest", Vec::new()).await;
        assert!(matches!(result, Err(RepositoryError::Domain(_))));
    }

    fn line() -> OrderLine {
        OrderLine {
            product_id: ProductId("idli".to_string()),
            short_id: 1,
            name: "Idli".to_string(),
            unit_price: Decimal::new(50, 0),
            quantity: 2,
        }
    }
}
