// SPDX-FileCopyrightText: 2026 Arcana Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common domain types shared across the Arcana workspace.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier of a Telegram message, used for edit-in-place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef(pub i32);

/// Kind of a generated reading.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReadingKind {
    Test,
    Premium,
}

/// Tarot card suits, including the major arcana.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CardSuit {
    Cups,
    Pentacles,
    Swords,
    Wands,
    Major,
}

/// A single drawn tarot card.
///
/// Only `name` is guaranteed; the upstream generator fills the rest
/// depending on the reading kind (premium spreads carry a `position`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alcohol_recommendation: Option<String>,
}

/// A drink paired with a premium reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrinkRecommendation {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preparation: Option<String>,
}

/// Callback data attached to inline keyboard buttons.
///
/// The string forms are wire data: they round-trip through Telegram
/// callback queries and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ButtonAction {
    TestReading,
    PremiumReading,
    Help,
    Back,
    Pay,
    ConfirmAge,
    DeclineAge,
}

/// One inline keyboard button.
#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

impl Button {
    pub fn new(label: impl Into<String>, action: ButtonAction) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// A transport-agnostic inline keyboard: rows of buttons.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    /// One button per row, the layout every Arcana menu uses.
    pub fn column(buttons: impl IntoIterator<Item = Button>) -> Self {
        Self {
            rows: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }
}

/// An invoice to be sent through the chat transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    pub title: String,
    pub description: String,
    /// Opaque payload echoed back in the pre-checkout and settlement events.
    pub payload: String,
    pub currency: String,
    /// Price in the currency's native unit (Telegram Stars are not
    /// hundredths-denominated).
    pub price: u32,
}

/// An inbound chat event, normalized away from the transport's update types.
///
/// This is the closed set of inputs the conversation engine dispatches on.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// A slash command such as `/start`, with the leading slash stripped.
    Command { user: i64, chat: i64, name: String },
    /// Free-form text (birthdate entry and anything else typed).
    Text { user: i64, chat: i64, text: String },
    /// An inline keyboard button press.
    Button {
        user: i64,
        chat: i64,
        message: MessageRef,
        data: String,
        callback_id: String,
    },
    /// Payment pre-authorization check; must be answered within the
    /// platform window.
    PreCheckout {
        user: i64,
        query_id: String,
        payload: String,
        amount: u32,
        currency: String,
    },
    /// Settlement confirmation for a completed payment.
    PaymentSettled {
        user: i64,
        chat: i64,
        payload: String,
        amount: u32,
        currency: String,
    },
}

impl ChatEvent {
    /// The Telegram user the event originates from.
    pub fn user(&self) -> i64 {
        match self {
            Self::Command { user, .. }
            | Self::Text { user, .. }
            | Self::Button { user, .. }
            | Self::PreCheckout { user, .. }
            | Self::PaymentSettled { user, .. } => *user,
        }
    }
}
