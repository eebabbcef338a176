// SPDX-FileCopyrightText: 2026 Arcana Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Birthdate input validation.
//!
//! Accepts exactly `DD.MM.YYYY`: zero-padded two-digit day and month,
//! four-digit year, dot separators, and a real calendar date. Anything
//! else is rejected with `None` so the caller can re-prompt.

use chrono::NaiveDate;

/// Parse a user-supplied birthdate, returning its canonical `DD.MM.YYYY`
/// rendering, or `None` when the input is not acceptable.
pub fn parse_birthdate(input: &str) -> Option<String> {
    let s = input.trim();
    let bytes = s.as_bytes();
    if bytes.len() != 10 || bytes[2] != b'.' || bytes[5] != b'.' {
        return None;
    }
    for (i, b) in bytes.iter().enumerate() {
        if i == 2 || i == 5 {
            continue;
        }
        if !b.is_ascii_digit() {
            return None;
        }
    }

    let day: u32 = s[0..2].parse().ok()?;
    let month: u32 = s[3..5].parse().ok()?;
    let year: i32 = s[6..10].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)?;

    Some(format!("{day:02}.{month:02}.{year:04}"))
}
