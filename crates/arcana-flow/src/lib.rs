// SPDX-FileCopyrightText: 2026 Arcana Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation flow for the Arcana tarot bot.
//!
//! A per-user finite-state machine (age verification, menu, free and paid
//! readings, the payment handshake, birthdate collection) driving the
//! repositories and the generation client through the [`arcana_core::ChatPort`]
//! transport seam.

pub mod birthdate;
pub mod engine;
pub mod payment;
pub mod session;
pub mod texts;

pub use birthdate::parse_birthdate;
pub use engine::{EngineConfig, FlowEngine, Pacing};
pub use payment::{PAYLOAD_PREFIX, PaymentGate};
pub use session::{Session, SessionMap};
