use async_trait::async_trait;
use tracing::{info, warn};

use storefront_assistant::{OrderProgression, TaskScheduler};
use storefront_core::config::StorefrontConfig;
use storefront_core::domain::cart::{CartItem, CartSummary};
use storefront_core::domain::order::Order;
use storefront_core::nlu::responder::{Responder, ResponderContext};
use storefront_db::repositories::{CartRepository, OrderRepository, ProductRepository};
use storefront_db::Stores;

use crate::commands::{BotCommandService, ChatId, CommandEnvelope, CommandRouteError};
use crate::events::{EventContext, EventHandlerError, IncomingMessage, TextMessageService};
use crate::replies::{self, ReplyMessage};

/// Store-backed command and chat handling for every Telegram chat. Carts are
/// persisted per chat id; placed orders progress in the background.
pub struct StorefrontBotService {
    stores: Stores,
    responder: Responder,
    progression: OrderProgression,
    scheduler: TaskScheduler,
}

impl StorefrontBotService {
    pub fn new(stores: Stores, config: &StorefrontConfig) -> Self {
        Self {
            responder: Responder::new(config.currency_symbol.clone()),
            progression: OrderProgression::from_config(stores.orders.clone(), config),
            scheduler: TaskScheduler::new(),
            stores,
        }
    }

    fn currency(&self) -> &str {
        self.responder.currency_symbol()
    }

    /// Cancels background order progression.
    pub fn shutdown(&self) -> usize {
        self.scheduler.cancel_all()
    }

    async fn place_order(&self, owner: &str, items: &[CartItem]) -> Option<Order> {
        let lines = items.iter().map(CartItem::as_order_line).collect();
        match self.stores.orders.place_order(owner, lines).await {
            Ok(order) => Some(order),
            Err(error) => {
                warn!(event_name = "bot.checkout.failed", owner, error = %error, "order placement failed");
                None
            }
        }
    }
}

fn owner_key(chat_id: ChatId) -> String {
    chat_id.to_string()
}

#[async_trait]
impl BotCommandService for StorefrontBotService {
    async fn list_products(
        &self,
        envelope: &CommandEnvelope,
    ) -> Result<ReplyMessage, CommandRouteError> {
        match self.stores.products.list_products().await {
            Ok(products) => Ok(replies::product_list(&products, self.currency())),
            Err(error) => {
                warn!(
                    event_name = "bot.products.failed",
                    correlation_id = %envelope.request_id,
                    error = %error,
                    "listing products failed"
                );
                Ok(ReplyMessage::new(replies::PRODUCTS_UNAVAILABLE))
            }
        }
    }

    async fn add_to_cart(
        &self,
        short_id: u32,
        envelope: &CommandEnvelope,
    ) -> Result<ReplyMessage, CommandRouteError> {
        let product = match self.stores.products.find_by_short_id(short_id).await {
            Ok(Some(product)) => product,
            Ok(None) => return Ok(ReplyMessage::new(replies::PRODUCT_NOT_FOUND)),
            Err(error) => {
                warn!(
                    event_name = "bot.cart.lookup_failed",
                    short_id,
                    correlation_id = %envelope.request_id,
                    error = %error,
                    "product lookup failed"
                );
                return Ok(ReplyMessage::new(replies::PRODUCT_NOT_FOUND));
            }
        };

        let owner = owner_key(envelope.chat_id);
        if let Err(error) = self.stores.carts.add_item(&owner, &product).await {
            warn!(
                event_name = "bot.cart.add_failed",
                owner = %owner,
                product_id = %product.id,
                error = %error,
                "adding to cart failed"
            );
            return Ok(ReplyMessage::new(replies::ADD_TO_CART_FAILED));
        }

        info!(event_name = "bot.cart.added", owner = %owner, product_id = %product.id, "item added to cart");
        Ok(replies::added_to_cart(&product))
    }

    async fn checkout(
        &self,
        envelope: &CommandEnvelope,
    ) -> Result<ReplyMessage, CommandRouteError> {
        let owner = owner_key(envelope.chat_id);
        let items = match self.stores.carts.items(&owner).await {
            Ok(items) => items,
            Err(error) => {
                warn!(event_name = "bot.cart.read_failed", owner = %owner, error = %error, "reading cart failed");
                return Ok(ReplyMessage::new(replies::CART_UNAVAILABLE));
            }
        };
        if items.is_empty() {
            return Ok(ReplyMessage::new(replies::EMPTY_CART));
        }

        let Some(order) = self.place_order(&owner, &items).await else {
            return Ok(ReplyMessage::new(replies::ORDER_FAILED));
        };
        info!(
            event_name = "bot.checkout.placed",
            owner = %owner,
            order_id = %order.id,
            total = %order.total,
            "order placed"
        );

        if let Err(error) = self.stores.carts.clear(&owner).await {
            warn!(event_name = "bot.cart.clear_failed", owner = %owner, error = %error, "clearing cart failed");
        }
        self.progression.schedule(&self.scheduler, order.id.clone());

        Ok(replies::order_placed(&items, order.total, &order.id, self.currency()))
    }
}

#[async_trait]
impl TextMessageService for StorefrontBotService {
    async fn handle_text_message(
        &self,
        message: &IncomingMessage,
        ctx: &EventContext,
    ) -> Result<Option<ReplyMessage>, EventHandlerError> {
        if message.text.trim().is_empty() {
            return Ok(None);
        }

        let owner = owner_key(message.chat_id);
        let cart = match self.stores.carts.items(&owner).await {
            Ok(items) => CartSummary::of(&items),
            Err(error) => {
                warn!(
                    event_name = "bot.cart.read_failed",
                    owner = %owner,
                    correlation_id = %ctx.correlation_id,
                    error = %error,
                    "reading cart for chat reply failed; assuming empty cart"
                );
                CartSummary::default()
            }
        };

        let lookup = self.stores.status_lookup();
        let context = ResponderContext { cart, orders: &lookup };
        let reply = self.responder.respond(&message.text, &context).await;
        Ok(Some(reply.into()))
    }
}
