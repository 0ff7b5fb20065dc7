//! Telegram storefront bot.
//!
//! Exposes the storefront as chat commands plus free-text conversation:
//! - **Commands** (`commands`) - `/products`, `/addtocart <n>`, `/checkout`, `/help`
//! - **Events** (`events`) - Routes updates to command or conversation handlers
//! - **Service** (`service`) - Store-backed handling shared by every chat
//! - **Transport** (`transport`, `telegram`) - Long polling and replies
//!
//! # Architecture
//!
//! ```text
//! Telegram getUpdates → PollingRunner → EventDispatcher → StorefrontBotService
//!                            ↓                                   ↓
//!                      sendMessage ← ReplyMessage ← Responder / stores
//! ```
//!
//! Free text goes through the same `Responder` the interactive session uses,
//! so "where is my order #12" and "track order 12" behave the same.

pub mod commands;
pub mod events;
pub mod replies;
pub mod service;
pub mod telegram;
pub mod transport;

pub use commands::{BotCommand, ChatId, CommandRouter};
pub use events::{storefront_dispatcher, BotEvent, BotUpdate, EventDispatcher};
pub use replies::ReplyMessage;
pub use service::StorefrontBotService;
pub use telegram::TelegramTransport;
pub use transport::{BotTransport, NoopTransport, PollingPolicy, PollingRunner, RunSummary, StopReason};
