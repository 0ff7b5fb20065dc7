use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::replies::{self, ReplyMessage};

/// Telegram chat the command arrived in. Carts are keyed by it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandEnvelope {
    pub chat_id: ChatId,
    pub command: BotCommand,
    pub request_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotCommand {
    Products,
    AddToCart { argument: Option<String> },
    Checkout,
    Help,
    Unknown { command: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("not a slash command: {0}")]
    NotACommand(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("command service failed: {0}")]
    Service(String),
}

/// Parses `/name[@bot] args...`. Command names are case-insensitive.
pub fn parse_bot_command(text: &str) -> Result<BotCommand, CommandParseError> {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix('/') else {
        return Err(CommandParseError::NotACommand(trimmed.to_owned()));
    };

    let mut parts = body.split_whitespace();
    let head = parts.next().unwrap_or_default();
    let name = head.split('@').next().unwrap_or_default().to_ascii_lowercase();
    let argument = parts.collect::<Vec<_>>().join(" ");

    Ok(match name.as_str() {
        "products" => BotCommand::Products,
        "addtocart" => BotCommand::AddToCart {
            argument: if argument.is_empty() { None } else { Some(argument) },
        },
        "checkout" => BotCommand::Checkout,
        "help" | "start" => BotCommand::Help,
        _ => BotCommand::Unknown { command: format!("/{name}") },
    })
}

#[async_trait]
pub trait BotCommandService: Send + Sync {
    async fn list_products(
        &self,
        envelope: &CommandEnvelope,
    ) -> Result<ReplyMessage, CommandRouteError>;

    async fn add_to_cart(
        &self,
        short_id: u32,
        envelope: &CommandEnvelope,
    ) -> Result<ReplyMessage, CommandRouteError>;

    async fn checkout(&self, envelope: &CommandEnvelope)
        -> Result<ReplyMessage, CommandRouteError>;
}

#[async_trait]
impl<S> BotCommandService for Arc<S>
where
    S: BotCommandService + ?Sized,
{
    async fn list_products(
        &self,
        envelope: &CommandEnvelope,
    ) -> Result<ReplyMessage, CommandRouteError> {
        (**self).list_products(envelope).await
    }

    async fn add_to_cart(
        &self,
        short_id: u32,
        envelope: &CommandEnvelope,
    ) -> Result<ReplyMessage, CommandRouteError> {
        (**self).add_to_cart(short_id, envelope).await
    }

    async fn checkout(
        &self,
        envelope: &CommandEnvelope,
    ) -> Result<ReplyMessage, CommandRouteError> {
        (**self).checkout(envelope).await
    }
}

pub struct CommandRouter<S> {
    service: S,
}

impl<S> CommandRouter<S>
where
    S: BotCommandService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub async fn route(
        &self,
        envelope: &CommandEnvelope,
    ) -> Result<ReplyMessage, CommandRouteError> {
        match &envelope.command {
            BotCommand::Products => self.service.list_products(envelope).await,
            BotCommand::AddToCart { argument: None } => {
                Ok(ReplyMessage::new(replies::ADD_TO_CART_USAGE))
            }
            BotCommand::AddToCart { argument: Some(argument) } => match parse_short_id(argument) {
                Some(short_id) => self.service.add_to_cart(short_id, envelope).await,
                None => Ok(ReplyMessage::new(replies::PRODUCT_NOT_FOUND)),
            },
            BotCommand::Checkout => self.service.checkout(envelope).await,
            BotCommand::Help => Ok(replies::help_message()),
            BotCommand::Unknown { command } => Ok(replies::unsupported_command(command)),
        }
    }
}

/// Leading digits of the first token, so "/addtocart 3" and "/addtocart #3" agree.
fn parse_short_id(argument: &str) -> Option<u32> {
    let token = argument.split_whitespace().next()?.trim_start_matches('#');
    token.parse::<u32>().ok().filter(|short_id| *short_id > 0)
}
