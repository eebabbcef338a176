// SPDX-FileCopyrightText: 2026 Arcana Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI reading-generation client for the Arcana tarot bot.
//!
//! [`ReadingClient`] masks an unreliable upstream behind bounded retries
//! with exponential backoff, a categorized error taxonomy, per-instance
//! metrics, and schema validation with typed fallback: callers always get
//! a well-formed outcome, never a raised upstream fault.

pub mod client;
pub mod metrics;
pub mod outcome;
pub mod prompts;

use async_trait::async_trait;

pub use client::ReadingClient;
pub use metrics::{ErrorKind, GenerationMetrics, MetricsSnapshot};
pub use outcome::{
    CardMessageOutcome, CardMessagePayload, Outcome, PremiumReadingOutcome, PremiumReadingPayload,
    TestReadingOutcome, TestReadingPayload,
};

/// The generation seam the conversation engine depends on.
///
/// Implemented by [`ReadingClient`] in production and by scripted mocks in
/// flow tests.
#[async_trait]
pub trait ReadingGenerator: Send + Sync {
    async fn test_reading(&self) -> TestReadingOutcome;

    async fn premium_reading(
        &self,
        birthdate: Option<&str>,
        question: Option<&str>,
    ) -> PremiumReadingOutcome;

    async fn card_message(&self, context: Option<&str>) -> CardMessageOutcome;
}

#[async_trait]
impl ReadingGenerator for ReadingClient {
    async fn test_reading(&self) -> TestReadingOutcome {
        self.generate_test_reading().await
    }

    async fn premium_reading(
        &self,
        birthdate: Option<&str>,
        question: Option<&str>,
    ) -> PremiumReadingOutcome {
        self.generate_premium_reading(birthdate, question).await
    }

    async fn card_message(&self, context: Option<&str>) -> CardMessageOutcome {
        self.generate_card_message(context).await
    }
}
