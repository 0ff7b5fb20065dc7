use std::future::Future;
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use storefront_core::config::TelegramConfig;
use storefront_core::errors::ApplicationError;

use crate::commands::ChatId;
use crate::events::{BotUpdate, EventContext, EventDispatcher, HandlerResult};
use crate::replies::ReplyMessage;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("polling for updates failed: {0}")]
    Poll(String),
    #[error("sending message failed: {0}")]
    Send(String),
    #[error("bot api rejected the request: {0}")]
    Api(String),
    #[error("could not decode bot api response: {0}")]
    Decode(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub chat_id: ChatId,
    pub reply: ReplyMessage,
}

#[async_trait]
pub trait BotTransport: Send + Sync {
    /// Updates with id >= `offset`. Earlier updates are confirmed and not
    /// delivered again.
    async fn poll_updates(&self, offset: Option<i64>) -> Result<Vec<BotUpdate>, TransportError>;
    async fn send_message(&self, message: &OutgoingMessage) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopTransport;

#[async_trait]
impl BotTransport for NoopTransport {
    async fn poll_updates(&self, _offset: Option<i64>) -> Result<Vec<BotUpdate>, TransportError> {
        Ok(Vec::new())
    }

    async fn send_message(&self, _message: &OutgoingMessage) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Fixed pause after an empty or failed poll; no backoff.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollingPolicy {
    pub idle_delay: Duration,
    pub max_consecutive_failures: u32,
}

impl Default for PollingPolicy {
    fn default() -> Self {
        Self { idle_delay: Duration::from_millis(1_000), max_consecutive_failures: 10 }
    }
}

impl From<&TelegramConfig> for PollingPolicy {
    fn from(config: &TelegramConfig) -> Self {
        Self {
            idle_delay: Duration::from_millis(config.idle_delay_ms),
            max_consecutive_failures: config.max_consecutive_failures,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    FailureLimit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub updates_handled: u64,
    pub replies_sent: u64,
    pub stopped: StopReason,
}

pub struct PollingRunner {
    transport: Arc<dyn BotTransport>,
    dispatcher: EventDispatcher,
    policy: PollingPolicy,
}

impl PollingRunner {
    pub fn new(
        transport: Arc<dyn BotTransport>,
        dispatcher: EventDispatcher,
        policy: PollingPolicy,
    ) -> Self {
        Self { transport, dispatcher, policy }
    }

    /// Polls until `shutdown` resolves or polling fails
    /// `max_consecutive_failures` times in a row. Neither case is an error.
    pub async fn run<F>(&self, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut offset = None;
        let mut failures = 0_u32;
        let mut summary =
            RunSummary { updates_handled: 0, replies_sent: 0, stopped: StopReason::Shutdown };

        loop {
            let polled = tokio::select! {
                () = &mut shutdown => {
                    info!(event_name = "bot.runner.shutdown", "polling runner shutting down");
                    return summary;
                }
                polled = self.transport.poll_updates(offset) => polled,
            };

            let updates = match polled {
                Ok(updates) => {
                    failures = 0;
                    updates
                }
                Err(error) => {
                    failures += 1;
                    warn!(
                        event_name = "bot.poll.failed",
                        failures,
                        max_consecutive_failures = self.policy.max_consecutive_failures,
                        error = %error,
                        "polling for updates failed"
                    );
                    if failures >= self.policy.max_consecutive_failures {
                        warn!(
                            event_name = "bot.runner.gave_up",
                            failures,
                            "polling failure limit reached; stopping runner without crash"
                        );
                        summary.stopped = StopReason::FailureLimit;
                        return summary;
                    }
                    Vec::new()
                }
            };

            if updates.is_empty() {
                tokio::select! {
                    () = &mut shutdown => {
                        info!(event_name = "bot.runner.shutdown", "polling runner shutting down");
                        return summary;
                    }
                    () = tokio::time::sleep(self.policy.idle_delay) => {}
                }
                continue;
            }

            for update in updates {
                offset = Some(update.update_id + 1);
                summary.updates_handled += 1;
                if self.process_update(&update).await {
                    summary.replies_sent += 1;
                }
            }
        }
    }

    /// Returns whether a reply was delivered. Failures are logged, never fatal.
    pub async fn process_update(&self, update: &BotUpdate) -> bool {
        let correlation_id = format!("update-{}", update.update_id);
        let chat_id = update.event.chat_id();
        info!(
            event_name = "bot.update.received",
            update_id = update.update_id,
            event_type = ?update.event.event_type(),
            chat_id = chat_id.map(|chat| chat.0),
            correlation_id = %correlation_id,
            "received bot update"
        );

        let context = EventContext { correlation_id: correlation_id.clone() };
        let reply = match self.dispatcher.dispatch(update, &context).await {
            Ok(HandlerResult::Responded(reply)) => reply,
            Ok(HandlerResult::Processed | HandlerResult::Ignored) => return false,
            Err(error) => {
                warn!(
                    event_name = "bot.dispatch.failed",
                    update_id = update.update_id,
                    correlation_id = %correlation_id,
                    error = %error,
                    "event dispatch failed; continuing polling loop"
                );
                let failure = ApplicationError::Integration(error.to_string())
                    .into_interface(correlation_id.clone());
                ReplyMessage::new(failure.user_message())
            }
        };

        let Some(chat_id) = chat_id else {
            debug!(update_id = update.update_id, "reply produced for update without a chat");
            return false;
        };
        let outgoing = OutgoingMessage { chat_id, reply };
        match self.transport.send_message(&outgoing).await {
            Ok(()) => {
                debug!(
                    event_name = "bot.reply.sent",
                    chat_id = chat_id.0,
                    correlation_id = %correlation_id,
                    "reply sent"
                );
                true
            }
            Err(error) => {
                warn!(
                    event_name = "bot.reply.failed",
                    chat_id = chat_id.0,
                    correlation_id = %correlation_id,
                    error = %error,
                    "failed to send reply"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::{
        BotTransport, OutgoingMessage, PollingPolicy, PollingRunner, StopReason, TransportError,
    };
    use crate::commands::ChatId;
    use crate::events::{
        BotEvent, BotUpdate, EventContext, EventDispatcher, EventHandlerError, IncomingMessage,
        TextMessageHandler, TextMessageService,
    };
    use crate::replies::ReplyMessage;

    #[derive(Default)]
    struct ScriptedTransport {
        state: Mutex<ScriptedState>,
    }

    #[derive(Default)]
    struct ScriptedState {
        polls: VecDeque<Result<Vec<BotUpdate>, TransportError>>,
        offsets: Vec<Option<i64>>,
        sent: Vec<OutgoingMessage>,
        fail_sends: bool,
    }

    impl ScriptedTransport {
        fn with_polls(polls: Vec<Result<Vec<BotUpdate>, TransportError>>) -> Self {
            Self { state: Mutex::new(ScriptedState { polls: polls.into(), ..ScriptedState::default() }) }
        }

        async fn sent(&self) -> Vec<OutgoingMessage> {
            self.state.lock().await.sent.clone()
        }

        async fn offsets(&self) -> Vec<Option<i64>> {
            self.state.lock().await.offsets.clone()
        }
    }

    #[async_trait]
    impl BotTransport for ScriptedTransport {
        async fn poll_updates(
            &self,
            offset: Option<i64>,
        ) -> Result<Vec<BotUpdate>, TransportError> {
            let mut state = self.state.lock().await;
            state.offsets.push(offset);
            state
                .polls
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Poll("script exhausted".to_owned())))
        }

        async fn send_message(&self, message: &OutgoingMessage) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            if state.fail_sends {
                return Err(TransportError::Send("chat blocked the bot".to_owned()));
            }
            state.sent.push(message.clone());
            Ok(())
        }
    }

    struct UppercaseService;

    #[async_trait]
    impl TextMessageService for UppercaseService {
        async fn handle_text_message(
            &self,
            message: &IncomingMessage,
            _ctx: &EventContext,
        ) -> Result<Option<ReplyMessage>, EventHandlerError> {
            if message.text == "fail" {
                return Err(EventHandlerError::TextMessage("boom".to_owned()));
            }
            Ok(Some(ReplyMessage::new(message.text.to_uppercase())))
        }
    }

    fn text_update(update_id: i64, chat: i64, text: &str) -> BotUpdate {
        BotUpdate {
            update_id,
            event: BotEvent::Text(IncomingMessage {
                chat_id: ChatId(chat),
                user_id: None,
                text: text.to_owned(),
            }),
        }
    }

    fn dispatcher() -> EventDispatcher {
        let mut dispatcher = EventDispatcher::new();
        dispatcher.register(TextMessageHandler::new(Arc::new(UppercaseService)));
        dispatcher
    }

    fn policy(max_consecutive_failures: u32) -> PollingPolicy {
        PollingPolicy { idle_delay: Duration::from_millis(10), max_consecutive_failures }
    }

    #[tokio::test(start_paused = true)]
    async fn replies_are_sent_and_offsets_advance() {
        let transport = Arc::new(ScriptedTransport::with_polls(vec![
            Ok(vec![text_update(10, 1, "hi"), text_update(11, 2, "there")]),
            Ok(Vec::new()),
            Ok(vec![text_update(12, 1, "again")]),
        ]));
        let runner = PollingRunner::new(transport.clone(), dispatcher(), policy(1));

        let summary = runner.run(std::future::pending()).await;

        assert_eq!(summary.stopped, StopReason::FailureLimit);
        assert_eq!(summary.updates_handled, 3);
        assert_eq!(summary.replies_sent, 3);
        assert_eq!(transport.offsets().await, vec![None, Some(12), Some(12), Some(13)]);
        let sent = transport.sent().await;
        assert_eq!(sent[0].chat_id, ChatId(1));
        assert_eq!(sent[0].reply.text, "HI");
        assert_eq!(sent[1].reply.text, "THERE");
    }

    #[tokio::test(start_paused = true)]
    async fn dispatch_failures_get_an_apology_and_polling_continues() {
        let transport = Arc::new(ScriptedTransport::with_polls(vec![Ok(vec![
            text_update(1, 1, "fail"),
            text_update(2, 1, "ok"),
        ])]));
        let runner = PollingRunner::new(transport.clone(), dispatcher(), policy(1));

        let summary = runner.run(std::future::pending()).await;

        assert_eq!(summary.updates_handled, 2);
        assert_eq!(summary.replies_sent, 2);
        let sent = transport.sent().await;
        assert_eq!(sent[0].reply.text, "The store is temporarily unavailable. Please try again shortly.");
        assert_eq!(sent[1].reply.text, "OK");
    }

    #[tokio::test(start_paused = true)]
    async fn transient_poll_failures_reset_after_success() {
        let transport = Arc::new(ScriptedTransport::with_polls(vec![
            Err(TransportError::Poll("timeout".to_owned())),
            Err(TransportError::Poll("timeout".to_owned())),
            Ok(vec![text_update(5, 3, "late")]),
            Err(TransportError::Poll("timeout".to_owned())),
            Err(TransportError::Poll("timeout".to_owned())),
        ]));
        let runner = PollingRunner::new(transport.clone(), dispatcher(), policy(3));

        let summary = runner.run(std::future::pending()).await;

        assert_eq!(summary.stopped, StopReason::FailureLimit);
        assert_eq!(summary.replies_sent, 1);
        // two failures, one success, then three failures to hit the limit
        assert_eq!(transport.offsets().await.len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn send_failures_are_logged_and_skipped() {
        let transport = Arc::new(ScriptedTransport::with_polls(vec![Ok(vec![text_update(1, 1, "hi")])]));
        transport.state.lock().await.fail_sends = true;
        let runner = PollingRunner::new(transport.clone(), dispatcher(), policy(1));

        let summary = runner.run(std::future::pending()).await;

        assert_eq!(summary.updates_handled, 1);
        assert_eq!(summary.replies_sent, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_an_idle_runner() {
        let runner = PollingRunner::new(
            Arc::new(super::NoopTransport),
            EventDispatcher::default(),
            PollingPolicy::default(),
        );

        let summary = runner.run(tokio::time::sleep(Duration::from_secs(5))).await;

        assert_eq!(summary.stopped, StopReason::Shutdown);
        assert_eq!(summary.updates_handled, 0);
    }
}
