// SPDX-FileCopyrightText: 2026 Arcana Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flat-file persistence layer for the Arcana tarot bot.
//!
//! One JSON file per collection, a per-collection async lock, and
//! temp-file-then-rename writes. [`UserRepo`] and [`ReadingRepo`] are the
//! typed facades the conversation engine talks to; [`FileStore`] is the
//! generic store underneath them.

pub mod models;
pub mod repo;
pub mod store;

pub use models::{ReadingRecord, UserRecord};
pub use repo::{ReadingRepo, UserRepo};
pub use store::{Codec, FileStore, JsonCodec, StoreError};
