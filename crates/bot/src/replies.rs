use rust_decimal::Decimal;
use serde::Serialize;

use storefront_core::domain::cart::CartItem;
use storefront_core::domain::order::OrderId;
use storefront_core::domain::product::Product;
use storefront_core::nlu::responder::{Reply, ReplyKind, Responder, QUICK_REPLIES};

pub const NO_PRODUCTS: &str = "❌ No products found.";
pub const PRODUCTS_UNAVAILABLE: &str = "⚠️ Error fetching products.";
pub const PRODUCT_NOT_FOUND: &str = "❌ Product not found.";
pub const ADD_TO_CART_USAGE: &str = "Usage: /addtocart <product number>. Send /products to see the numbers.";
pub const ADD_TO_CART_FAILED: &str = "⚠️ Could not add to cart.";
pub const EMPTY_CART: &str = "🛒 Your cart is empty.";
pub const CART_UNAVAILABLE: &str = "⚠️ Error fetching cart.";
pub const ORDER_FAILED: &str = "⚠️ Could not place order.";

/// Text sent back to a chat, optionally with a keyboard of canned replies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReplyMessage {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub quick_replies: Vec<String>,
}

impl ReplyMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), quick_replies: Vec::new() }
    }

    pub fn with_quick_replies<I, S>(mut self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.quick_replies = replies.into_iter().map(Into::into).collect();
        self
    }
}

/// Fallback and help replies offer the canned options as a keyboard.
impl From<Reply> for ReplyMessage {
    fn from(reply: Reply) -> Self {
        let message = ReplyMessage::new(reply.text);
        match reply.kind {
            ReplyKind::Fallback | ReplyKind::Help => {
                message.with_quick_replies(QUICK_REPLIES.iter().copied())
            }
            _ => message,
        }
    }
}

pub fn help_message() -> ReplyMessage {
    Responder::default().help().into()
}

pub fn unsupported_command(command: &str) -> ReplyMessage {
    ReplyMessage::new(format!("Unsupported command `{command}`. Try /help."))
}

pub fn product_list(products: &[Product], currency: &str) -> ReplyMessage {
    if products.is_empty() {
        return ReplyMessage::new(NO_PRODUCTS);
    }

    let mut text = String::from("🛍 Available Products:\n\n");
    for product in products {
        text.push_str(&product_line(product, currency));
    }
    ReplyMessage::new(text)
}

pub fn added_to_cart(product: &Product) -> ReplyMessage {
    ReplyMessage::new(format!("✅ Added {} to your cart.", product.name))
}

pub fn order_placed(
    items: &[CartItem],
    total: Decimal,
    order_id: &OrderId,
    currency: &str,
) -> ReplyMessage {
    let mut text = String::from("🛒 Your Order:\n\n");
    for item in items {
        text.push_str(&product_line(&item.product, currency));
    }
    text.push_str(&format!(
        "\n💰 Total: {currency}{}\n📦 Order #{order_id} placed successfully!",
        total.normalize()
    ));
    ReplyMessage::new(text)
}

fn product_line(product: &Product, currency: &str) -> String {
    format!("{}. {} - {currency}{}\n", product.short_id, product.name, product.price.normalize())
}
