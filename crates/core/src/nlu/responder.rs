use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::cart::CartSummary;
use crate::domain::order::{OrderId, OrderStatus};
use crate::errors::ApplicationError;
use crate::nlu::normalize::normalize;

pub const QUICK_REPLIES: &[&str] = &["View Cart", "Checkout", "Offers", "Help"];
pub const DEFAULT_CURRENCY_SYMBOL: &str = "₹";

const GREETING: &str = "Hello! 👋 You can ask me about your cart, checkout, or offers.";
const OFFERS: &str = "🎉 Today’s offer: Get 10% off on orders above {currency}200!";
const HELP: &str = "You can try: 'View Cart', 'Checkout', 'Offers', or 'Track order <id>'.";
const MISSING_ORDER_ID: &str = "Please provide an Order ID (e.g., 'Track order <id>').";
const ORDER_NOT_FOUND: &str = "❌ Order not found. Please check the ID.";
const FALLBACK: &str = "Sorry, I didn’t understand that. Try options below 👇";

static ORDER_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"order\s+#?([a-z0-9-]+)").expect("order id pattern is valid")
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    Greeting,
    CartSummary,
    CheckoutTotal,
    Offers,
    Help,
    OrderStatus,
    OrderNotFound,
    MissingOrderId,
    Fallback,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub kind: ReplyKind,
    pub text: String,
}

impl Reply {
    fn new(kind: ReplyKind, text: impl Into<String>) -> Self {
        Self { kind, text: text.into() }
    }
}

#[async_trait]
pub trait OrderStatusLookup: Send + Sync {
    async fn lookup_order_status(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<OrderStatus>, ApplicationError>;
}

/// Read-only view of the session a reply is computed against.
pub struct ResponderContext<'a> {
    pub cart: CartSummary,
    pub orders: &'a dyn OrderStatusLookup,
}

enum Render {
    Fixed(&'static str),
    CartCount,
    CheckoutTotal,
    Offers,
    TrackOrder,
}

struct Rule {
    kind: ReplyKind,
    triggers: &'static [&'static str],
    render: Render,
}

/// First rule with a trigger contained in the lowercased message wins.
const RULES: &[Rule] = &[
    Rule { kind: ReplyKind::Greeting, triggers: &["hello", "hi"], render: Render::Fixed(GREETING) },
    Rule { kind: ReplyKind::CartSummary, triggers: &["cart"], render: Render::CartCount },
    Rule { kind: ReplyKind::CheckoutTotal, triggers: &["checkout"], render: Render::CheckoutTotal },
    Rule { kind: ReplyKind::Offers, triggers: &["offer"], render: Render::Offers },
    Rule { kind: ReplyKind::Help, triggers: &["help"], render: Render::Fixed(HELP) },
    Rule { kind: ReplyKind::OrderStatus, triggers: &["order", "track"], render: Render::TrackOrder },
];

#[derive(Clone, Debug)]
pub struct Responder {
    currency_symbol: String,
}

impl Default for Responder {
    fn default() -> Self {
        Self::new(DEFAULT_CURRENCY_SYMBOL)
    }
}

impl Responder {
    pub fn new(currency_symbol: impl Into<String>) -> Self {
        Self { currency_symbol: currency_symbol.into() }
    }

    pub fn currency_symbol(&self) -> &str {
        &self.currency_symbol
    }

    /// Intent of a message before any lookup. Order messages classify as
    /// `OrderStatus` whether or not they carry an id.
    pub fn classify(&self, message: &str) -> ReplyKind {
        let lower = normalize(message);
        matching_rule(&lower).map(|rule| rule.kind).unwrap_or(ReplyKind::Fallback)
    }

    pub fn help(&self) -> Reply {
        Reply::new(ReplyKind::Help, HELP)
    }

    pub async fn respond(&self, message: &str, context: &ResponderContext<'_>) -> Reply {
        let lower = normalize(message);
        let Some(rule) = matching_rule(&lower) else {
            return Reply::new(ReplyKind::Fallback, FALLBACK);
        };

        match rule.render {
            Render::Fixed(text) => Reply::new(rule.kind, text),
            Render::CartCount => Reply::new(
                rule.kind,
                format!("You have {} item(s) in your cart.", context.cart.item_count),
            ),
            Render::CheckoutTotal => Reply::new(
                rule.kind,
                format!(
                    "Your total is {}{}. Ready to checkout?",
                    self.currency_symbol,
                    context.cart.total.normalize()
                ),
            ),
            Render::Offers => {
                Reply::new(rule.kind, OFFERS.replace("{currency}", &self.currency_symbol))
            }
            Render::TrackOrder => self.track_order(&lower, context).await,
        }
    }

    async fn track_order(&self, lower: &str, context: &ResponderContext<'_>) -> Reply {
        let Some(order_id) = extract_order_id(lower) else {
            return Reply::new(ReplyKind::MissingOrderId, MISSING_ORDER_ID);
        };

        match context.orders.lookup_order_status(&order_id).await {
            Ok(Some(status)) => {
                debug!(
                    event_name = "responder.order.found",
                    order_id = %order_id,
                    status = status.as_str(),
                    "order status resolved"
                );
                Reply::new(
                    ReplyKind::OrderStatus,
                    format!("📦 Order {order_id} status: {}", status.label()),
                )
            }
            Ok(None) => Reply::new(ReplyKind::OrderNotFound, ORDER_NOT_FOUND),
            Err(error) => {
                warn!(
                    event_name = "responder.order.lookup_failed",
                    order_id = %order_id,
                    error = %error,
                    "order status lookup failed; replying not found"
                );
                Reply::new(ReplyKind::OrderNotFound, ORDER_NOT_FOUND)
            }
        }
    }
}

fn matching_rule(lower: &str) -> Option<&'static Rule> {
    RULES.iter().find(|rule| rule.triggers.iter().any(|trigger| lower.contains(trigger)))
}

pub fn extract_order_id(lower: &str) -> Option<OrderId> {
    ORDER_ID
        .captures(lower)
        .and_then(|captures| captures.get(1))
        .map(|id| OrderId(id.as_str().to_owned()))
}
