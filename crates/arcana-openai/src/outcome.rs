// SPDX-FileCopyrightText: 2026 Arcana Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outcome types returned by the generation client.
//!
//! Callers always receive a well-formed outcome: `success` is true and the
//! payload present, or `success` is false and `error` carries a
//! human-readable message. Upstream faults never escape as raised errors.

use serde::{Deserialize, Serialize};

use arcana_core::types::{Card, DrinkRecommendation};

/// Payload shape of a generated one-card test reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReadingPayload {
    pub card: Card,
    #[serde(default)]
    pub personality_traits: Vec<String>,
    pub interpretation: String,
    pub advice: String,
}

/// Payload shape of a generated three-card premium reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PremiumReadingPayload {
    /// Exactly three cards, positioned Past/Present/Future in order.
    pub cards: Vec<Card>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub general_interpretation: Option<String>,
    pub overall_interpretation: String,
    pub drink: DrinkRecommendation,
    pub advice: String,
}

/// Payload shape of a standalone message from the cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardMessagePayload {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<Card>,
}

/// Generic generation outcome: success with payload, or failure with a
/// human-readable error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome<P> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading: Option<P>,
}

impl<P> Outcome<P> {
    pub fn ok(reading: P) -> Self {
        Self {
            success: true,
            error: None,
            reading: Some(reading),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            reading: None,
        }
    }
}

pub type TestReadingOutcome = Outcome<TestReadingPayload>;
pub type PremiumReadingOutcome = Outcome<PremiumReadingPayload>;
pub type CardMessageOutcome = Outcome<CardMessagePayload>;
