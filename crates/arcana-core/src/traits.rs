// SPDX-FileCopyrightText: 2026 Arcana Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The outbound chat transport seam.
//!
//! The conversation engine talks to Telegram only through [`ChatPort`],
//! so flow logic can be exercised against a recording mock in tests.

use async_trait::async_trait;

use crate::error::ArcanaError;
use crate::types::{Invoice, Keyboard, MessageRef};

/// Outbound operations the conversation engine needs from the transport.
///
/// Texts are HTML-formatted; the implementation owns parse-mode details.
#[async_trait]
pub trait ChatPort: Send + Sync {
    /// Send a new message, optionally with an inline keyboard.
    async fn send_text(
        &self,
        chat: i64,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef, ArcanaError>;

    /// Edit a previously sent message in place.
    async fn edit_text(
        &self,
        chat: i64,
        message: MessageRef,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<(), ArcanaError>;

    /// Send a payment invoice.
    async fn send_invoice(&self, chat: i64, invoice: &Invoice) -> Result<(), ArcanaError>;

    /// Answer a pre-checkout query. Must be called exactly once per query;
    /// `error_message` is shown to the user when `ok` is false.
    async fn answer_pre_checkout(
        &self,
        query_id: &str,
        ok: bool,
        error_message: Option<&str>,
    ) -> Result<(), ArcanaError>;

    /// Acknowledge a callback query so the client stops its spinner.
    async fn answer_callback(&self, callback_id: &str) -> Result<(), ArcanaError>;
}
