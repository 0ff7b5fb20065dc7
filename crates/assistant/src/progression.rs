use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use storefront_core::config::StorefrontConfig;
use storefront_core::domain::order::{OrderId, OrderStatus};
use storefront_core::errors::DomainError;
use storefront_db::repositories::{OrderRepository, RepositoryError};

use crate::scheduler::{ScheduledTask, TaskScheduler};

#[derive(Debug, Error)]
pub enum ProgressionError {
    #[error("order `{0}` no longer exists")]
    OrderNotFound(OrderId),
    #[error(transparent)]
    Transition(#[from] DomainError),
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

/// Moves a freshly placed order through delivery. Both steps run inside one
/// task, so "out for delivery" is always written before "delivered".
#[derive(Clone)]
pub struct OrderProgression {
    orders: Arc<dyn OrderRepository>,
    out_for_delivery_after: Duration,
    delivered_after: Duration,
}

impl OrderProgression {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        out_for_delivery_after: Duration,
        delivered_after: Duration,
    ) -> Self {
        Self { orders, out_for_delivery_after, delivered_after }
    }

    pub fn from_config(orders: Arc<dyn OrderRepository>, config: &StorefrontConfig) -> Self {
        Self::new(orders, config.out_for_delivery_after(), config.delivered_after())
    }

    pub fn schedule(
        &self,
        scheduler: &TaskScheduler,
        order_id: OrderId,
    ) -> ScheduledTask<Result<OrderStatus, ProgressionError>> {
        let progression = self.clone();
        scheduler.schedule("order.progression", async move { progression.run(order_id).await })
    }

    /// Returns the final status reached.
    pub async fn run(&self, order_id: OrderId) -> Result<OrderStatus, ProgressionError> {
        let steps = [
            (self.out_for_delivery_after, OrderStatus::OutForDelivery),
            (self.delivered_after, OrderStatus::Delivered),
        ];

        let mut reached = OrderStatus::Received;
        for (delay, next) in steps {
            tokio::time::sleep(delay).await;
            if let Err(error) = self.advance(&order_id, next).await {
                warn!(
                    event_name = "order.progression.failed",
                    order_id = %order_id,
                    target_status = next.as_str(),
                    error = %error,
                    "order progression stopped"
                );
                return Err(error);
            }
            reached = next;
        }

        Ok(reached)
    }

    async fn advance(&self, order_id: &OrderId, next: OrderStatus) -> Result<(), ProgressionError> {
        let Some(mut order) = self.orders.find_by_id(order_id).await? else {
            return Err(ProgressionError::OrderNotFound(order_id.clone()));
        };
        let previous = order.status;
        order.transition_to(next)?;

        if !self.orders.set_status(order_id, next).await? {
            return Err(ProgressionError::OrderNotFound(order_id.clone()));
        }

        info!(
            event_name = "order.progression.advanced",
            order_id = %order_id,
            from = previous.as_str(),
            to = next.as_str(),
            "order status advanced"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use rust_decimal::Decimal;
    use storefront_core::domain::order::{OrderId, OrderLine, OrderStatus};
    use storefront_core::domain::product::ProductId;
    use storefront_db::repositories::{InMemoryOrderRepository, OrderRepository};

    use super::{OrderProgression, ProgressionError};
    use crate::scheduler::TaskScheduler;

    async fn placed(orders: &InMemoryOrderRepository) -> OrderId {
        orders
            .place_order(
                "guest",
                vec![OrderLine {
                    product_id: ProductId("idli".to_string()),
                    short_id: 1,
                    name: "Idli".to_string(),
                    unit_price: Decimal::new(50, 0),
                    quantity: 1,
                }],
            )
            .await
            .expect("place order")
            .id
    }

    async fn status(orders: &InMemoryOrderRepository, id: &OrderId) -> Option<OrderStatus> {
        orders.find_by_id(id).await.expect("find").map(|order| order.status)
    }

    #[tokio::test(start_paused = true)]
    async fn statuses_advance_in_order_on_schedule() {
        let orders = Arc::new(InMemoryOrderRepository::default());
        let id = placed(&orders).await;
        let scheduler = TaskScheduler::new();
        let progression =
            OrderProgression::new(orders.clone(), Duration::from_secs(10), Duration::from_secs(10));

        let task = progression.schedule(&scheduler, id.clone());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(status(&orders, &id).await, Some(OrderStatus::Received));

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(status(&orders, &id).await, Some(OrderStatus::OutForDelivery));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(status(&orders, &id).await, Some(OrderStatus::Delivered));

        let outcome = task.wait().await.expect("task completed");
        assert!(matches!(outcome, Ok(OrderStatus::Delivered)));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_delays_still_apply_out_for_delivery_first() {
        let orders = Arc::new(InMemoryOrderRepository::default());
        let id = placed(&orders).await;
        let progression = OrderProgression::new(orders.clone(), Duration::ZERO, Duration::ZERO);

        let reached = progression.run(id.clone()).await.expect("progression");

        assert_eq!(reached, OrderStatus::Delivered);
        assert_eq!(status(&orders, &id).await, Some(OrderStatus::Delivered));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_stops_further_updates() {
        let orders = Arc::new(InMemoryOrderRepository::default());
        let id = placed(&orders).await;
        let scheduler = TaskScheduler::new();
        let progression =
            OrderProgression::new(orders.clone(), Duration::from_secs(10), Duration::from_secs(10));
        let _task = progression.schedule(&scheduler, id.clone());

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(scheduler.cancel_all(), 1);
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(status(&orders, &id).await, Some(OrderStatus::OutForDelivery));
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_band_status_change_is_rejected_as_invalid_transition() {
        let orders = Arc::new(InMemoryOrderRepository::default());
        let id = placed(&orders).await;
        orders.set_status(&id, OrderStatus::Delivered).await.expect("set");
        let progression = OrderProgression::new(orders.clone(), Duration::ZERO, Duration::ZERO);

        let result = progression.run(id).await;
        assert!(matches!(result, Err(ProgressionError::Transition(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_order_ends_progression() {
        let orders = Arc::new(InMemoryOrderRepository::default());
        let progression = OrderProgression::new(orders, Duration::ZERO, Duration::ZERO);

        let result = progression.run(OrderId("404".to_string())).await;
        assert!(matches!(result, Err(ProgressionError::OrderNotFound(_))));
    }
}
