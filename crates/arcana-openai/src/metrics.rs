// SPDX-FileCopyrightText: 2026 Arcana Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error taxonomy and process-lifetime request metrics.
//!
//! Every request attempt and every validation outcome is recorded exactly
//! once. The accumulator is owned by the client instance, so tests can
//! construct isolated copies; counters reset only on process restart.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use strum::{Display, EnumString};

/// Categorized failure causes, used for logging, metrics, and the retry
/// decision.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    RateLimit,
    Connection,
    Authentication,
    Permission,
    Api,
    Validation,
    JsonParse,
    Unknown,
}

impl ErrorKind {
    /// Whether a fault of this kind is worth retrying. Rate limiting,
    /// connection failures, and generic upstream errors are transient;
    /// auth/permission and data-shape faults are not.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::RateLimit | Self::Connection | Self::Api)
    }
}

#[derive(Debug, Default)]
struct MetricsInner {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    error_counts: BTreeMap<ErrorKind, u64>,
    total_latency: Duration,
}

/// Running counters for the generation client.
#[derive(Debug, Default)]
pub struct GenerationMetrics {
    inner: Mutex<MetricsInner>,
}

impl GenerationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, latency: Duration) {
        let mut inner = self.lock();
        inner.total_requests += 1;
        inner.successful_requests += 1;
        inner.total_latency += latency;
    }

    pub fn record_failure(&self, kind: ErrorKind, latency: Duration) {
        let mut inner = self.lock();
        inner.total_requests += 1;
        inner.failed_requests += 1;
        inner.total_latency += latency;
        *inner.error_counts.entry(kind).or_insert(0) += 1;
    }

    /// A point-in-time copy of the counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.lock();
        let average_latency = if inner.total_requests > 0 {
            inner.total_latency / inner.total_requests as u32
        } else {
            Duration::ZERO
        };
        MetricsSnapshot {
            total_requests: inner.total_requests,
            successful_requests: inner.successful_requests,
            failed_requests: inner.failed_requests,
            error_counts: inner.error_counts.clone(),
            average_latency,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MetricsInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// A point-in-time copy of [`GenerationMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub error_counts: BTreeMap<ErrorKind, u64>,
    pub average_latency: Duration,
}

impl MetricsSnapshot {
    pub fn error_count(&self, kind: ErrorKind) -> u64 {
        self.error_counts.get(&kind).copied().unwrap_or(0)
    }
}
