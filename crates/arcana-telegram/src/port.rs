// SPDX-FileCopyrightText: 2026 Arcana Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`ChatPort`] implementation over the Telegram Bot API.
//!
//! All texts are sent as HTML. Inline keyboards are built from the
//! transport-agnostic [`Keyboard`] type; edits that change nothing are
//! tolerated rather than surfaced as errors.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    ChatId, InlineKeyboardButton, InlineKeyboardMarkup, LabeledPrice, ParseMode,
};
use tracing::debug;

use arcana_core::error::ArcanaError;
use arcana_core::traits::ChatPort;
use arcana_core::types::{Invoice, Keyboard, MessageRef};

/// The Telegram-backed outbound port.
pub struct TelegramPort {
    bot: Bot,
}

impl TelegramPort {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatPort for TelegramPort {
    async fn send_text(
        &self,
        chat: i64,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef, ArcanaError> {
        let mut request = self
            .bot
            .send_message(ChatId(chat), text)
            .parse_mode(ParseMode::Html);
        if let Some(kb) = keyboard {
            request = request.reply_markup(to_markup(&kb));
        }
        let sent = request.await.map_err(|e| ArcanaError::Channel {
            message: format!("failed to send message: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(MessageRef(sent.id.0))
    }

    async fn edit_text(
        &self,
        chat: i64,
        message: MessageRef,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<(), ArcanaError> {
        let mut request = self
            .bot
            .edit_message_text(ChatId(chat), teloxide::types::MessageId(message.0), text)
            .parse_mode(ParseMode::Html);
        if let Some(kb) = keyboard {
            request = request.reply_markup(to_markup(&kb));
        }
        match request.await {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("message is not modified") => {
                debug!(chat, message = message.0, "edit left message unchanged");
                Ok(())
            }
            Err(e) => Err(ArcanaError::Channel {
                message: format!("failed to edit message: {e}"),
                source: Some(Box::new(e)),
            }),
        }
    }

    async fn send_invoice(&self, chat: i64, invoice: &Invoice) -> Result<(), ArcanaError> {
        self.bot
            .send_invoice(
                ChatId(chat),
                invoice.title.clone(),
                invoice.description.clone(),
                invoice.payload.clone(),
                invoice.currency.clone(),
                vec![LabeledPrice {
                    label: invoice.title.clone(),
                    amount: invoice.price,
                }],
            )
            .await
            .map_err(|e| ArcanaError::Channel {
                message: format!("failed to send invoice: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(())
    }

    async fn answer_pre_checkout(
        &self,
        query_id: &str,
        ok: bool,
        error_message: Option<&str>,
    ) -> Result<(), ArcanaError> {
        let mut request = self
            .bot
            .answer_pre_checkout_query(
                teloxide::types::PreCheckoutQueryId(query_id.to_string()),
                ok,
            );
        if let Some(message) = error_message {
            request = request.error_message(message.to_string());
        }
        request.await.map_err(|e| ArcanaError::Channel {
            message: format!("failed to answer pre-checkout query: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), ArcanaError> {
        self.bot
            .answer_callback_query(teloxide::types::CallbackQueryId(callback_id.to_string()))
            .await
            .map_err(|e| ArcanaError::Channel {
                message: format!("failed to answer callback query: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(())
    }
}

/// Builds a Telegram inline keyboard from the transport-agnostic shape.
fn to_markup(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.rows.iter().map(|row| {
        row.iter()
            .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.action.to_string()))
            .collect::<Vec<_>>()
    }))
}
