// SPDX-FileCopyrightText: 2026 Arcana Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted record types.
//!
//! [`UserRecord`] mutation helpers each apply exactly one semantic change
//! and refresh `updated_at`; callers round-trip every change through the
//! repository before the flow proceeds. [`ReadingRecord`] is write-once.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use arcana_core::types::{Card, DrinkRecommendation, ReadingKind};

/// Per-user conversation and usage state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default)]
    pub age_confirmed: bool,
    #[serde(default)]
    pub test_reading_count: u32,
    #[serde(default)]
    pub premium_reading_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_test_reading_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_premium_reading_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reading_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// A brand-new record with zero counts, created lazily on first contact.
    pub fn new(user_id: i64) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            username: None,
            age_confirmed: false,
            test_reading_count: 0,
            premium_reading_count: 0,
            last_test_reading_at: None,
            last_premium_reading_at: None,
            last_reading_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Marks the age gate as passed.
    pub fn confirm_age(&mut self) {
        self.age_confirmed = true;
        self.touch();
    }

    /// Counts one completed test reading.
    pub fn record_test_reading(&mut self) {
        self.test_reading_count += 1;
        self.last_test_reading_at = Some(Utc::now());
        self.touch();
    }

    /// Counts one completed premium reading.
    pub fn record_premium_reading(&mut self) {
        self.premium_reading_count += 1;
        self.last_premium_reading_at = Some(Utc::now());
        self.touch();
    }

    /// Points at the most recently produced reading.
    pub fn set_last_reading(&mut self, reading_id: &str) {
        self.last_reading_id = Some(reading_id.to_string());
        self.touch();
    }

    pub fn total_readings(&self) -> u32 {
        self.test_reading_count + self.premium_reading_count
    }

    /// Free-tier guard: allow-listed users are never blocked, everyone else
    /// is limited to `limit` test readings.
    pub fn can_start_test(&self, limit: u32, allow_list: &HashSet<i64>) -> bool {
        if allow_list.contains(&self.user_id) {
            return true;
        }
        self.test_reading_count < limit
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// A generated reading artifact. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingRecord {
    pub id: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub kind: ReadingKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    /// One card for a test reading, three positioned cards for premium.
    pub cards: Vec<Card>,
    pub general_interpretation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthdate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drink: Option<DrinkRecommendation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_interpretation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advice: Option<String>,
}
