use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    commands::{
        parse_bot_command, ChatId, CommandEnvelope, CommandParseError, CommandRouteError,
        CommandRouter, BotCommandService,
    },
    replies::ReplyMessage,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BotUpdate {
    pub update_id: i64,
    pub event: BotEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotEvent {
    Command(IncomingMessage),
    Text(IncomingMessage),
    Unsupported { chat_id: Option<ChatId>, kind: String },
}

impl BotEvent {
    /// Slash-prefixed text is a command; anything else is conversation.
    pub fn from_message(message: IncomingMessage) -> Self {
        if message.text.trim_start().starts_with('/') {
            Self::Command(message)
        } else {
            Self::Text(message)
        }
    }

    pub fn event_type(&self) -> BotEventType {
        match self {
            Self::Command(_) => BotEventType::Command,
            Self::Text(_) => BotEventType::Text,
            Self::Unsupported { .. } => BotEventType::Unsupported,
        }
    }

    pub fn chat_id(&self) -> Option<ChatId> {
        match self {
            Self::Command(message) | Self::Text(message) => Some(message.chat_id),
            Self::Unsupported { chat_id, .. } => *chat_id,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BotEventType {
    Command,
    Text,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncomingMessage {
    pub chat_id: ChatId,
    pub user_id: Option<i64>,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(ReplyMessage),
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Parse(#[from] CommandParseError),
    #[error(transparent)]
    Route(#[from] CommandRouteError),
    #[error("text message handler failure: {0}")]
    TextMessage(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> BotEventType;
    async fn handle(
        &self,
        update: &BotUpdate,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<BotEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        update: &BotUpdate,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&update.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(update, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Commands and free text both go to `service`; other updates are ignored.
pub fn storefront_dispatcher<S>(service: Arc<S>) -> EventDispatcher
where
    S: BotCommandService + TextMessageService + 'static,
{
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(CommandHandler::new(service.clone()));
    dispatcher.register(TextMessageHandler::new(service));
    dispatcher
}

pub struct CommandHandler<S> {
    router: CommandRouter<Arc<S>>,
}

impl<S> CommandHandler<S>
where
    S: BotCommandService,
{
    pub fn new(service: Arc<S>) -> Self {
        Self { router: CommandRouter::new(service) }
    }
}

#[async_trait]
impl<S> EventHandler for CommandHandler<S>
where
    S: BotCommandService + 'static,
{
    fn event_type(&self) -> BotEventType {
        BotEventType::Command
    }

    async fn handle(
        &self,
        update: &BotUpdate,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let BotEvent::Command(message) = &update.event else {
            return Ok(HandlerResult::Ignored);
        };

        let envelope = CommandEnvelope {
            chat_id: message.chat_id,
            command: parse_bot_command(&message.text)?,
            request_id: ctx.correlation_id.clone(),
        };
        let reply = self.router.route(&envelope).await?;
        Ok(HandlerResult::Responded(reply))
    }
}

#[async_trait]
pub trait TextMessageService: Send + Sync {
    async fn handle_text_message(
        &self,
        message: &IncomingMessage,
        ctx: &EventContext,
    ) -> Result<Option<ReplyMessage>, EventHandlerError>;
}

pub struct TextMessageHandler<S> {
    service: Arc<S>,
}

impl<S> TextMessageHandler<S>
where
    S: TextMessageService,
{
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for TextMessageHandler<S>
where
    S: TextMessageService + 'static,
{
    fn event_type(&self) -> BotEventType {
        BotEventType::Text
    }

    async fn handle(
        &self,
        update: &BotUpdate,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let BotEvent::Text(message) = &update.event else {
            return Ok(HandlerResult::Ignored);
        };

        let reply = self.service.handle_text_message(message, ctx).await?;
        Ok(match reply {
            Some(reply) => HandlerResult::Responded(reply),
            None => HandlerResult::Processed,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{
        BotEvent, BotEventType, BotUpdate, EventContext, EventDispatcher, EventHandlerError,
        HandlerResult, IncomingMessage, TextMessageHandler, TextMessageService,
    };
    use crate::commands::ChatId;
    use crate::replies::ReplyMessage;

    struct EchoService;

    #[async_trait::async_trait]
    impl TextMessageService for EchoService {
        async fn handle_text_message(
            &self,
            message: &IncomingMessage,
            _ctx: &EventContext,
        ) -> Result<Option<ReplyMessage>, EventHandlerError> {
            if message.text.trim().is_empty() {
                return Ok(None);
            }
            if message.text == "boom" {
                return Err(EventHandlerError::TextMessage("store offline".to_owned()));
            }
            Ok(Some(ReplyMessage::new(format!("echo: {}", message.text))))
        }
    }

    fn message(text: &str) -> IncomingMessage {
        IncomingMessage { chat_id: ChatId(7), user_id: Some(99), text: text.to_owned() }
    }

    fn update(event: BotEvent) -> BotUpdate {
        BotUpdate { update_id: 1, event }
    }

    #[test]
    fn messages_are_split_into_commands_and_text() {
        assert_eq!(BotEvent::from_message(message("/products")).event_type(), BotEventType::Command);
        assert_eq!(BotEvent::from_message(message("hi there")).event_type(), BotEventType::Text);
        assert_eq!(BotEvent::from_message(message("hi")).chat_id(), Some(ChatId(7)));
    }

    #[tokio::test]
    async fn dispatcher_routes_to_registered_handler() {
        let mut dispatcher = EventDispatcher::new();
        dispatcher.register(TextMessageHandler::new(Arc::new(EchoService)));
        assert_eq!(dispatcher.handler_count(), 1);

        let result = dispatcher
            .dispatch(&update(BotEvent::Text(message("hello"))), &EventContext::default())
            .await
            .expect("dispatch");
        assert_eq!(result, HandlerResult::Responded(ReplyMessage::new("echo: hello")));

        let processed = dispatcher
            .dispatch(&update(BotEvent::Text(message("  "))), &EventContext::default())
            .await
            .expect("dispatch");
        assert_eq!(processed, HandlerResult::Processed);
    }

    #[tokio::test]
    async fn unregistered_event_types_are_ignored() {
        let dispatcher = EventDispatcher::new();
        let unsupported = BotEvent::Unsupported { chat_id: None, kind: "sticker".to_owned() };

        let result =
            dispatcher.dispatch(&update(unsupported), &EventContext::default()).await.expect("dispatch");
        assert_eq!(result, HandlerResult::Ignored);
    }

    #[tokio::test]
    async fn handler_failures_surface_as_dispatch_errors() {
        let mut dispatcher = EventDispatcher::new();
        dispatcher.register(TextMessageHandler::new(Arc::new(EchoService)));

        let result =
            dispatcher.dispatch(&update(BotEvent::Text(message("boom"))), &EventContext::default()).await;
        assert!(result.is_err());
    }
}
