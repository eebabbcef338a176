// SPDX-FileCopyrightText: 2026 Arcana Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user transient conversation state.
//!
//! A [`Session`] covers one user's in-flight flow and is discarded when the
//! flow completes or is cancelled. Nothing here is persisted; a process
//! restart loses at most the current conversational step.

use std::collections::HashMap;

use tokio::sync::Mutex;

/// The per-user conversation state, as a tagged variant.
///
/// Pending flow data (whether the birthdate prompt was reached through a
/// settled payment) rides on the variant instead of living in scattered
/// flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Session {
    /// Age gate not yet passed.
    Unverified,
    /// Resting state after age confirmation and after any completed or
    /// cancelled flow.
    Menu,
    /// Invoice sent, waiting for the payment handshake.
    AwaitingPayment,
    /// Payment settled (or skipped for allow-listed users); waiting for a
    /// birthdate.
    AwaitingBirthdate { paid: bool },
    /// A generation call is in flight. Always exits to [`Session::Menu`].
    Generating,
}

/// In-memory map of user id to session state.
#[derive(Debug, Default)]
pub struct SessionMap {
    inner: Mutex<HashMap<i64, Session>>,
}

impl SessionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user: i64) -> Option<Session> {
        self.inner.lock().await.get(&user).copied()
    }

    pub async fn set(&self, user: i64, session: Session) {
        self.inner.lock().await.insert(user, session);
    }

    /// Drops the user's transient state entirely.
    pub async fn clear(&self, user: i64) {
        self.inner.lock().await.remove(&user);
    }
}
