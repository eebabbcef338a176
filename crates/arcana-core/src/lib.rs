// SPDX-FileCopyrightText: 2026 Arcana Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Arcana tarot bot.
//!
//! Provides the shared error type, domain types (cards, readings,
//! keyboards, chat events), and the [`ChatPort`] transport seam that the
//! conversation engine and the Telegram adapter meet at.

pub mod error;
pub mod traits;
pub mod types;

pub use error::ArcanaError;
pub use traits::ChatPort;
pub use types::{
    Button, ButtonAction, Card, CardSuit, ChatEvent, DrinkRecommendation, Invoice, Keyboard,
    MessageRef, ReadingKind,
};
