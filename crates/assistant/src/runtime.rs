use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use storefront_core::config::{AppConfig, StorefrontConfig};
use storefront_core::domain::cart::{Cart, CartSummary};
use storefront_core::domain::chat::{ChatMessage, ChatTranscript};
use storefront_core::domain::order::OrderId;
use storefront_core::domain::product::{Product, ProductId};
use storefront_core::nlu::query::SearchCriteria;
use storefront_core::nlu::responder::{Reply, Responder, ResponderContext};
use storefront_core::Catalog;
use storefront_db::repositories::{OrderRepository, ProductRepository, RepositoryStatusLookup};

use crate::progression::OrderProgression;
use crate::scheduler::{ScheduledTask, TaskScheduler};
use crate::voice::SimulatedVoiceInput;

const EMPTY_CART: &str = "Your cart is empty.";
const ORDER_FAILED: &str = "Could not place order.";

#[derive(Clone, Debug)]
pub struct SessionSettings {
    pub currency_symbol: String,
    pub owner: String,
    pub reply_delay: Duration,
    pub voice_listen: Duration,
    pub voice_transcript: String,
    pub out_for_delivery_after: Duration,
    pub delivered_after: Duration,
}

impl From<&StorefrontConfig> for SessionSettings {
    fn from(config: &StorefrontConfig) -> Self {
        Self {
            currency_symbol: config.currency_symbol.clone(),
            owner: config.guest_owner.clone(),
            reply_delay: config.reply_delay(),
            voice_listen: config.voice_listen(),
            voice_transcript: config.voice_transcript.clone(),
            out_for_delivery_after: config.out_for_delivery_after(),
            delivered_after: config.delivered_after(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default().storefront)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckoutOutcome {
    EmptyCart { message: String },
    Placed { order_id: OrderId, message: String },
    Failed { message: String },
}

impl CheckoutOutcome {
    pub fn message(&self) -> &str {
        match self {
            Self::EmptyCart { message } | Self::Placed { message, .. } | Self::Failed { message } => {
                message
            }
        }
    }
}

/// One shopper's interaction with the store: browsing, cart, chat and voice
/// search. Everything here is owned by the session; only orders live in the
/// shared store.
pub struct StorefrontSession {
    catalog: Catalog,
    query: String,
    criteria: SearchCriteria,
    results: Vec<Product>,
    cart: Cart,
    transcript: ChatTranscript,
    responder: Responder,
    orders: Arc<dyn OrderRepository>,
    status_lookup: RepositoryStatusLookup,
    progression: OrderProgression,
    scheduler: TaskScheduler,
    settings: SessionSettings,
    pending_voice: Option<ScheduledTask<String>>,
}

impl StorefrontSession {
    pub async fn start(
        products: &dyn ProductRepository,
        orders: Arc<dyn OrderRepository>,
        settings: SessionSettings,
    ) -> Self {
        let catalog = match products.list_products().await {
            Ok(products) => Catalog::new(products),
            Err(error) => {
                warn!(
                    event_name = "session.catalog.load_failed",
                    error = %error,
                    "catalog could not be loaded; starting with no products"
                );
                Catalog::default()
            }
        };
        info!(event_name = "session.started", products = catalog.len(), "storefront session started");

        let progression = OrderProgression::new(
            orders.clone(),
            settings.out_for_delivery_after,
            settings.delivered_after,
        );

        Self {
            results: catalog.products().to_vec(),
            catalog,
            query: String::new(),
            criteria: SearchCriteria::default(),
            cart: Cart::new(),
            transcript: ChatTranscript::default(),
            responder: Responder::new(settings.currency_symbol.clone()),
            status_lookup: RepositoryStatusLookup::new(orders.clone()),
            orders,
            progression,
            scheduler: TaskScheduler::new(),
            settings,
            pending_voice: None,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn criteria(&self) -> &SearchCriteria {
        &self.criteria
    }

    pub fn results(&self) -> &[Product] {
        &self.results
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn transcript(&self) -> &ChatTranscript {
        &self.transcript
    }

    pub fn search(&mut self, text: &str) -> &[Product] {
        let (criteria, results) = self.catalog.search(text);
        debug!(
            event_name = "session.search",
            query = text,
            category = criteria.category.map(|category| category.as_str()),
            matches = results.len(),
            "search applied"
        );
        self.query = text.to_string();
        self.criteria = criteria;
        self.results = results;
        &self.results
    }

    /// Returns the notice to show, or `None` when the product is not in the catalog.
    pub fn add_to_cart(&mut self, product_id: &ProductId) -> Option<String> {
        let product = self.catalog.find(product_id)?.clone();
        let notice = format!("{} added to cart", product.name);
        self.cart.add(product);
        Some(notice)
    }

    pub fn cart_summary(&self) -> CartSummary {
        self.cart.summary()
    }

    pub async fn checkout(&mut self) -> CheckoutOutcome {
        if self.cart.is_empty() {
            return CheckoutOutcome::EmptyCart { message: EMPTY_CART.to_string() };
        }

        match self.orders.place_order(&self.settings.owner, self.cart.order_lines()).await {
            Ok(order) => {
                info!(
                    event_name = "session.checkout.placed",
                    order_id = %order.id,
                    total = %order.total,
                    lines = order.lines.len(),
                    "order placed"
                );
                self.cart.clear();
                self.progression.schedule(&self.scheduler, order.id.clone());
                CheckoutOutcome::Placed {
                    message: format!("Order placed! Your Order ID: {}", order.id),
                    order_id: order.id,
                }
            }
            Err(error) => {
                warn!(event_name = "session.checkout.failed", error = %error, "order placement failed");
                CheckoutOutcome::Failed { message: ORDER_FAILED.to_string() }
            }
        }
    }

    /// Blank input is ignored and yields `None`.
    pub async fn send_chat_message(&mut self, text: &str) -> Option<Reply> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        self.transcript.push(ChatMessage::user(text));

        tokio::time::sleep(self.settings.reply_delay).await;

        let context =
            ResponderContext { cart: self.cart.summary(), orders: &self.status_lookup };
        let reply = self.responder.respond(&text.to_lowercase(), &context).await;
        debug!(event_name = "session.chat.replied", kind = ?reply.kind, "chat reply sent");
        self.transcript.push(ChatMessage::bot(reply.text.clone()));
        Some(reply)
    }

    /// Clears the current query and starts listening. A capture already in
    /// progress is replaced.
    pub fn start_voice_capture(&mut self) {
        if let Some(previous) = self.pending_voice.take() {
            previous.cancel();
        }
        self.search("");

        let voice =
            SimulatedVoiceInput::new(self.settings.voice_listen, self.settings.voice_transcript.clone());
        self.pending_voice = Some(self.scheduler.schedule("voice.capture", voice.capture()));
    }

    pub fn is_listening(&self) -> bool {
        self.pending_voice.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Waits for the current capture and searches what was heard. Returns
    /// `None` when nothing is being captured or the capture was cancelled.
    pub async fn voice_search(&mut self) -> Option<&[Product]> {
        let task = self.pending_voice.take()?;
        let transcript = task.wait().await?;
        Some(self.search(&transcript))
    }

    /// Cancels order progression and any voice capture still running.
    pub fn shutdown(&mut self) -> usize {
        self.pending_voice = None;
        let cancelled = self.scheduler.cancel_all();
        info!(event_name = "session.shutdown", cancelled, "storefront session closed");
        cancelled
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use tokio::time::Instant;

    use storefront_core::domain::chat::{Sender, OPENING_LINE};
    use storefront_core::domain::order::{Order, OrderId, OrderLine, OrderStatus};
    use storefront_core::domain::product::{Category, Product, ProductId};
    use storefront_core::nlu::responder::ReplyKind;
    use storefront_db::repositories::{
        InMemoryOrderRepository, InMemoryProductRepository, OrderRepository, ProductRepository,
        RepositoryError,
    };
    use storefront_db::DemoCatalog;

    use super::{CheckoutOutcome, SessionSettings, StorefrontSession};

    struct BrokenStore;

    #[async_trait]
    impl ProductRepository for BrokenStore {
        async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
            Err(RepositoryError::Decode("catalog offline".to_string()))
        }
        async fn find_by_id(&self, _: &ProductId) -> Result<Option<Product>, RepositoryError> {
            Ok(None)
        }
        async fn find_by_short_id(&self, _: u32) -> Result<Option<Product>, RepositoryError> {
            Ok(None)
        }
        async fn save(&self, _: Product) -> Result<(), RepositoryError> {
            Ok(())
        }
    }

    #[async_trait]
    impl OrderRepository for BrokenStore {
        async fn place_order(&self, _: &str, _: Vec<OrderLine>) -> Result<Order, RepositoryError> {
            Err(RepositoryError::Decode("orders offline".to_string()))
        }
        async fn find_by_id(&self, _: &OrderId) -> Result<Option<Order>, RepositoryError> {
            Err(RepositoryError::Decode("orders offline".to_string()))
        }
        async fn set_status(&self, _: &OrderId, _: OrderStatus) -> Result<bool, RepositoryError> {
            Ok(false)
        }
    }

    async fn session_with(orders: Arc<dyn OrderRepository>) -> StorefrontSession {
        let products = InMemoryProductRepository::with_products(DemoCatalog::products());
        StorefrontSession::start(&products, orders, SessionSettings::default()).await
    }

    async fn session() -> (StorefrontSession, Arc<InMemoryOrderRepository>) {
        let orders = Arc::new(InMemoryOrderRepository::default());
        (session_with(orders.clone()).await, orders)
    }

    fn id(raw: &str) -> ProductId {
        ProductId(raw.to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn start_shows_the_full_catalog_and_opening_line() {
        let (session, _) = session().await;

        assert_eq!(session.results().len(), DemoCatalog::products().len());
        assert_eq!(session.query(), "");
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.transcript().messages()[0].text, OPENING_LINE);
    }

    #[tokio::test(start_paused = true)]
    async fn catalog_load_failure_starts_an_empty_session() {
        let broken = BrokenStore;
        let session =
            StorefrontSession::start(&broken, Arc::new(BrokenStore), SessionSettings::default())
                .await;

        assert!(session.catalog().is_empty());
        assert!(session.results().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn search_narrows_to_cheap_breakfast() {
        let (mut session, _) = session().await;

        let names =
            session.search("Idli under 60").iter().map(|p| p.name.clone()).collect::<Vec<_>>();

        assert_eq!(names, vec!["Idli".to_string()]);
        assert_eq!(session.criteria().price_max, Some(Decimal::new(60, 0)));

        let breakfast = session.search("breakfast");
        assert!(breakfast.iter().all(|p| p.category == Some(Category::Breakfast)));
        assert_eq!(session.query(), "breakfast");
    }

    #[tokio::test(start_paused = true)]
    async fn add_to_cart_reports_the_product_and_ignores_unknown_ids() {
        let (mut session, _) = session().await;
        let idli = DemoCatalog::products()[0].clone();

        assert_eq!(session.add_to_cart(&idli.id), Some(format!("{} added to cart", idli.name)));
        assert_eq!(session.add_to_cart(&idli.id), Some(format!("{} added to cart", idli.name)));
        assert_eq!(session.add_to_cart(&id("pizza")), None);

        let summary = session.cart_summary();
        assert_eq!(summary.item_count, 2);
        assert_eq!(summary.total, idli.price * Decimal::from(2));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_checkout_places_nothing() {
        let (mut session, orders) = session().await;

        let outcome = session.checkout().await;

        assert_eq!(outcome, CheckoutOutcome::EmptyCart { message: "Your cart is empty.".to_string() });
        assert!(orders.find_by_id(&OrderId("1".to_string())).await.expect("find").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn checkout_clears_cart_and_progresses_order() {
        let (mut session, orders) = session().await;
        let idli = DemoCatalog::products()[0].clone();
        session.add_to_cart(&idli.id);

        let outcome = session.checkout().await;
        let CheckoutOutcome::Placed { order_id, message } = outcome else {
            panic!("expected a placed order, got {outcome:?}");
        };
        assert_eq!(message, format!("Order placed! Your Order ID: {order_id}"));
        assert!(session.cart().is_empty());

        tokio::time::sleep(Duration::from_secs(11)).await;
        let reply = session.send_chat_message(&format!("Track order {order_id}")).await;
        assert_eq!(
            reply.map(|reply| reply.text),
            Some(format!("📦 Order {order_id} status: Out for delivery"))
        );

        tokio::time::sleep(Duration::from_secs(10)).await;
        let order = orders.find_by_id(&order_id).await.expect("find").expect("order exists");
        assert_eq!(order.status, OrderStatus::Delivered);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_checkout_keeps_the_cart() {
        let mut session = session_with(Arc::new(BrokenStore)).await;
        let idli = DemoCatalog::products()[0].clone();
        session.add_to_cart(&idli.id);

        let outcome = session.checkout().await;

        assert_eq!(outcome.message(), "Could not place order.");
        assert_eq!(session.cart().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn chat_replies_after_the_delay_and_records_both_sides() {
        let (mut session, _) = session().await;
        let idli = DemoCatalog::products()[0].clone();
        session.add_to_cart(&idli.id);
        let started = Instant::now();

        let reply = session.send_chat_message("  View Cart  ").await.expect("reply");

        assert!(started.elapsed() >= Duration::from_millis(600));
        assert_eq!(reply.kind, ReplyKind::CartSummary);
        assert_eq!(reply.text, "You have 1 item(s) in your cart.");

        let messages = session.transcript().messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].sender, Sender::User);
        assert_eq!(messages[1].text, "View Cart");
        assert_eq!(messages[2].sender, Sender::Bot);
    }

    #[tokio::test(start_paused = true)]
    async fn blank_chat_input_is_ignored() {
        let (mut session, _) = session().await;

        assert_eq!(session.send_chat_message("   ").await, None);
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_failures_read_as_order_not_found() {
        let mut session = session_with(Arc::new(BrokenStore)).await;

        let reply = session.send_chat_message("track order 12").await.expect("reply");
        assert_eq!(reply.kind, ReplyKind::OrderNotFound);
    }

    #[tokio::test(start_paused = true)]
    async fn voice_capture_clears_the_query_then_searches_the_transcript() {
        let (mut session, _) = session().await;
        session.search("spices");
        let started = Instant::now();

        session.start_voice_capture();
        assert_eq!(session.query(), "");
        assert!(session.is_listening());

        let results = session.voice_search().await.expect("voice results").to_vec();

        assert!(started.elapsed() >= Duration::from_secs(2));
        assert_eq!(session.query(), "Show me breakfast under 200");
        assert!(!results.is_empty());
        assert!(results
            .iter()
            .all(|p| p.category == Some(Category::Breakfast) && p.price < Decimal::new(200, 0)));
        assert!(!session.is_listening());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_work() {
        let (mut session, orders) = session().await;
        session.add_to_cart(&DemoCatalog::products()[0].id);
        let CheckoutOutcome::Placed { order_id, .. } = session.checkout().await else {
            panic!("expected a placed order");
        };
        session.start_voice_capture();

        assert_eq!(session.shutdown(), 2);
        assert_eq!(session.voice_search().await, None);

        tokio::time::sleep(Duration::from_secs(30)).await;
        let order = orders.find_by_id(&order_id).await.expect("find").expect("order exists");
        assert_eq!(order.status, OrderStatus::Received);
    }
}
