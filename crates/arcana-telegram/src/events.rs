// SPDX-FileCopyrightText: 2026 Arcana Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping from Telegram updates to transport-agnostic [`ChatEvent`]s.
//!
//! Messages, callback queries, pre-checkout queries, and successful
//! payments each map onto one variant of the closed event set; everything
//! else (media, stickers, channel posts) is dropped here.

use serde::Serialize;
use teloxide::types::{CallbackQuery, MaybeInaccessibleMessage, Message, PreCheckoutQuery};
use tracing::debug;

use arcana_core::types::{ChatEvent, MessageRef};

/// Maps an inbound message to an event.
///
/// Successful-payment notifications take precedence; then commands, then
/// plain text. Messages without a sender or with unsupported content
/// return `None`.
pub fn from_message(msg: &Message) -> Option<ChatEvent> {
    let user = msg.from.as_ref()?.id.0 as i64;
    let chat = msg.chat.id.0;

    if let Some(payment) = msg.successful_payment() {
        return Some(ChatEvent::PaymentSettled {
            user,
            chat,
            payload: payment.invoice_payload.clone(),
            amount: payment.total_amount as u32,
            currency: currency_code(&payment.currency),
        });
    }

    let text = msg.text()?;
    if let Some(name) = parse_command(text) {
        return Some(ChatEvent::Command {
            user,
            chat,
            name: name.to_string(),
        });
    }

    Some(ChatEvent::Text {
        user,
        chat,
        text: text.to_string(),
    })
}

/// Maps a callback query to a button event.
///
/// Queries without data or without an attached message are dropped (the
/// spinner times out on the client, nothing to act on).
pub fn from_callback(query: &CallbackQuery) -> Option<ChatEvent> {
    let user = query.from.id.0 as i64;
    let data = query.data.clone()?;
    let (chat, message) = match query.message.as_ref() {
        Some(MaybeInaccessibleMessage::Regular(msg)) => (msg.chat.id.0, MessageRef(msg.id.0)),
        Some(MaybeInaccessibleMessage::Inaccessible(msg)) => {
            (msg.chat.id.0, MessageRef(msg.message_id.0))
        }
        None => {
            debug!(user, "dropping callback query without message");
            return None;
        }
    };

    Some(ChatEvent::Button {
        user,
        chat,
        message,
        data,
        callback_id: query.id.to_string(),
    })
}

/// Maps a pre-checkout query to its event. Always produces an event; the
/// engine guarantees a terminal answer.
pub fn from_pre_checkout(query: &PreCheckoutQuery) -> ChatEvent {
    ChatEvent::PreCheckout {
        user: query.from.id.0 as i64,
        query_id: query.id.to_string(),
        payload: query.invoice_payload.clone(),
        amount: query.total_amount as u32,
        currency: currency_code(&query.currency),
    }
}

/// Extracts a command name from `/name` or `/name@botname` at the start of
/// a message.
fn parse_command(text: &str) -> Option<&str> {
    let token = text.split_whitespace().next()?;
    let name = token.strip_prefix('/')?;
    let name = name.split('@').next()?;
    if name.is_empty() { None } else { Some(name) }
}

/// Renders a currency value as its ISO code via its serde form, which
/// works for both enum and plain-string representations.
fn currency_code<T: Serialize>(currency: &T) -> String {
    serde_json::to_value(currency)
        .ok()
        .and_then(|v| v.as_str().map(str::to_owned))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_message(user_id: u64, text: &str) -> Message {
        let json = serde_json::json!({
            "message_id": 10,
            "date": 1700000000i64,
            "chat": {
                "id": user_id as i64,
                "type": "private",
                "first_name": "Test",
            },
            "from": {
                "id": user_id,
                "is_bot": false,
                "first_name": "Test",
            },
            "text": text,
        });
        serde_json::from_value(json).expect("failed to deserialize mock message")
    }

    fn make_payment_message(user_id: u64) -> Message {
        let json = serde_json::json!({
            "message_id": 11,
            "date": 1700000000i64,
            "chat": {
                "id": user_id as i64,
                "type": "private",
                "first_name": "Test",
            },
            "from": {
                "id": user_id,
                "is_bot": false,
                "first_name": "Test",
            },
            "successful_payment": {
                "currency": "XTR",
                "total_amount": 50,
                "invoice_payload": "premium_reading_12345",
                "telegram_payment_charge_id": "tg-charge",
                "provider_payment_charge_id": "provider-charge",
            },
        });
        serde_json::from_value(json).expect("failed to deserialize mock payment message")
    }

    fn make_callback(user_id: u64, data: &str) -> CallbackQuery {
        let json = serde_json::json!({
            "id": "cb-1",
            "from": {
                "id": user_id,
                "is_bot": false,
                "first_name": "Test",
            },
            "message": {
                "message_id": 10,
                "date": 1700000000i64,
                "chat": {
                    "id": user_id as i64,
                    "type": "private",
                    "first_name": "Test",
                },
                "from": {
                    "id": 999,
                    "is_bot": true,
                    "first_name": "Bot",
                },
                "text": "menu",
            },
            "chat_instance": "ci-1",
            "data": data,
        });
        serde_json::from_value(json).expect("failed to deserialize mock callback")
    }

    #[test]
    fn command_message_maps_to_command_event() {
        let msg = make_message(12345, "/start");
        match from_message(&msg) {
            Some(ChatEvent::Command { user, chat, name }) => {
                assert_eq!(user, 12345);
                assert_eq!(chat, 12345);
                assert_eq!(name, "start");
            }
            other => panic!("expected Command, got {other:?}"),
        }
    }

    #[test]
    fn command_with_bot_suffix_is_stripped() {
        let msg = make_message(12345, "/test@arcana_bot now");
        match from_message(&msg) {
            Some(ChatEvent::Command { name, .. }) => assert_eq!(name, "test"),
            other => panic!("expected Command, got {other:?}"),
        }
    }

    #[test]
    fn plain_text_maps_to_text_event() {
        let msg = make_message(12345, "05.08.1990");
        match from_message(&msg) {
            Some(ChatEvent::Text { text, .. }) => assert_eq!(text, "05.08.1990"),
            other => panic!("expected Text, got {other:?}"),
        }
    }

    #[test]
    fn successful_payment_maps_to_settled_event() {
        let msg = make_payment_message(12345);
        match from_message(&msg) {
            Some(ChatEvent::PaymentSettled {
                user,
                payload,
                amount,
                currency,
                ..
            }) => {
                assert_eq!(user, 12345);
                assert_eq!(payload, "premium_reading_12345");
                assert_eq!(amount, 50);
                assert_eq!(currency, "XTR");
            }
            other => panic!("expected PaymentSettled, got {other:?}"),
        }
    }

    #[test]
    fn callback_maps_to_button_event() {
        let query = make_callback(12345, "confirm_age");
        match from_callback(&query) {
            Some(ChatEvent::Button {
                user,
                chat,
                message,
                data,
                callback_id,
            }) => {
                assert_eq!(user, 12345);
                assert_eq!(chat, 12345);
                assert_eq!(message, MessageRef(10));
                assert_eq!(data, "confirm_age");
                assert_eq!(callback_id, "cb-1");
            }
            other => panic!("expected Button, got {other:?}"),
        }
    }

    #[test]
    fn parse_command_shapes() {
        assert_eq!(parse_command("/start"), Some("start"));
        assert_eq!(parse_command("/help extra words"), Some("help"));
        assert_eq!(parse_command("/premium@arcana_bot"), Some("premium"));
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command("/"), None);
        assert_eq!(parse_command(""), None);
    }
}
