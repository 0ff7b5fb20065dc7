//! Telegram Bot API transport: `getUpdates` long polling and `sendMessage`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use storefront_core::config::TelegramConfig;

use crate::commands::ChatId;
use crate::events::{BotEvent, BotUpdate, IncomingMessage};
use crate::transport::{BotTransport, OutgoingMessage, TransportError};

const REQUEST_HEADROOM: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
    edited_message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    from: Option<User>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct User {
    id: i64,
}

#[derive(Debug, Serialize)]
struct GetUpdates<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<ReplyKeyboard<'a>>,
}

#[derive(Debug, Serialize)]
struct ReplyKeyboard<'a> {
    keyboard: Vec<Vec<KeyboardButton<'a>>>,
    resize_keyboard: bool,
    one_time_keyboard: bool,
}

#[derive(Debug, Serialize)]
struct KeyboardButton<'a> {
    text: &'a str,
}

impl<'a> SendMessage<'a> {
    fn from_outgoing(message: &'a OutgoingMessage) -> Self {
        let reply_markup = (!message.reply.quick_replies.is_empty()).then(|| ReplyKeyboard {
            keyboard: message
                .reply
                .quick_replies
                .chunks(2)
                .map(|row| row.iter().map(|text| KeyboardButton { text }).collect())
                .collect(),
            resize_keyboard: true,
            one_time_keyboard: true,
        });

        Self { chat_id: message.chat_id.0, text: &message.reply.text, reply_markup }
    }
}

fn into_bot_update(update: Update) -> BotUpdate {
    let event = match update.message.or(update.edited_message) {
        Some(Message { chat, from, text: Some(text) }) => BotEvent::from_message(IncomingMessage {
            chat_id: ChatId(chat.id),
            user_id: from.map(|user| user.id),
            text,
        }),
        Some(Message { chat, text: None, .. }) => {
            BotEvent::Unsupported { chat_id: Some(ChatId(chat.id)), kind: "non_text_message".to_owned() }
        }
        None => BotEvent::Unsupported { chat_id: None, kind: "non_message_update".to_owned() },
    };

    BotUpdate { update_id: update.update_id, event }
}

pub struct TelegramTransport {
    client: Client,
    api_base_url: String,
    bot_token: SecretString,
    poll_timeout_secs: u64,
}

impl TelegramTransport {
    pub fn new(config: &TelegramConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs) + REQUEST_HEADROOM)
            .build()
            .map_err(|error| TransportError::Poll(format!("http client setup failed: {error}")))?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            bot_token: config.bot_token.clone(),
            poll_timeout_secs: config.poll_timeout_secs,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base_url, self.bot_token.expose_secret())
    }

    /// Errors never carry the request URL, which embeds the token.
    async fn call<B, T>(
        &self,
        method: &str,
        body: &B,
        on_request_error: fn(String) -> TransportError,
    ) -> Result<T, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|error| on_request_error(error.without_url().to_string()))?;
        let status = response.status();

        let payload: ApiResponse<T> = response
            .json()
            .await
            .map_err(|error| TransportError::Decode(error.without_url().to_string()))?;
        if !payload.ok {
            let description = payload.description.unwrap_or_else(|| status.to_string());
            return Err(TransportError::Api(format!("{method}: {description}")));
        }
        payload
            .result
            .ok_or_else(|| TransportError::Decode(format!("{method} returned ok without a result")))
    }
}

#[async_trait]
impl BotTransport for TelegramTransport {
    async fn poll_updates(&self, offset: Option<i64>) -> Result<Vec<BotUpdate>, TransportError> {
        let request =
            GetUpdates { offset, timeout: self.poll_timeout_secs, allowed_updates: &["message"] };
        let updates: Vec<Update> = self.call("getUpdates", &request, TransportError::Poll).await?;
        debug!(event_name = "bot.poll.received", count = updates.len(), "polled telegram updates");
        Ok(updates.into_iter().map(into_bot_update).collect())
    }

    async fn send_message(&self, message: &OutgoingMessage) -> Result<(), TransportError> {
        let request = SendMessage::from_outgoing(message);
        let _sent: serde_json::Value =
            self.call("sendMessage", &request, TransportError::Send).await?;
        Ok(())
    }
}
