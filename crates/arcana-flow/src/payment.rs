// SPDX-FileCopyrightText: 2026 Arcana Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment settlement adapter.
//!
//! Implements the two-phase Telegram payment handshake: a pre-checkout
//! validation that always produces a terminal answer, and a settlement
//! step that is the single point unlocking the birthdate flow. No
//! inventory is tracked, so pre-checkout accepts unless the transaction is
//! affirmatively invalid.

use tracing::{info, warn};

use arcana_core::types::Invoice;

/// Invoice payloads are `premium_reading_<user_id>`; the prefix is the
/// validity check at pre-checkout time.
pub const PAYLOAD_PREFIX: &str = "premium_reading";

/// Builds invoices and validates the payment handshake.
#[derive(Debug, Clone)]
pub struct PaymentGate {
    currency: String,
    price: u32,
}

impl PaymentGate {
    pub fn new(currency: impl Into<String>, price: u32) -> Self {
        Self {
            currency: currency.into(),
            price,
        }
    }

    pub fn price(&self) -> u32 {
        self.price
    }

    /// The invoice for one premium reading.
    pub fn invoice_for(&self, user: i64) -> Invoice {
        Invoice {
            title: "Premium tarot reading".to_string(),
            description: "A full three-card spread with detailed interpretation and a drink \
                          pairing"
                .to_string(),
            payload: format!("{PAYLOAD_PREFIX}_{user}"),
            currency: self.currency.clone(),
            price: self.price,
        }
    }

    /// Pre-authorization check. `Err` carries the user-facing reject
    /// reason; the caller must still answer the query either way.
    pub fn validate_pre_checkout(&self, payload: &str) -> Result<(), String> {
        if payload.starts_with(PAYLOAD_PREFIX) {
            Ok(())
        } else {
            warn!(payload, "rejecting pre-checkout with unknown payload");
            Err("This payment could not be matched to an order. Please start over.".to_string())
        }
    }

    /// Settlement confirmation. Called once per successful-payment event.
    pub fn confirm_settlement(&self, user: i64, payload: &str, amount: u32, currency: &str) {
        info!(user, payload, amount, currency, "payment settled");
    }
}
