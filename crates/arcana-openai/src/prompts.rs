// SPDX-FileCopyrightText: 2026 Arcana Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Instruction templates and variable substitution.
//!
//! Substitution is literal token replacement, not general templating:
//! templates spell out the expected JSON shape, and their structural braces
//! must survive untouched when no variables are supplied.

/// System instruction for the free one-card reading.
pub const TEST_READING_SYSTEM: &str = r#"You are a tarot reader for an adult audience. Draw one tarot card and interpret it with a light, playful tone. Respond with a single JSON object of exactly this shape:
{
  "card": {"name": "...", "suit": "cups|pentacles|swords|wands|major", "interpretation": "...", "alcohol_recommendation": "..."},
  "personality_traits": ["...", "..."],
  "interpretation": "...",
  "advice": "..."
}
Return only the JSON object, no surrounding text."#;

/// User message for the free one-card reading.
pub const TEST_READING_USER: &str =
    "Draw one card for a quick personality reading and suggest a matching drink.";

/// System instruction for the paid three-card spread.
pub const PREMIUM_READING_SYSTEM: &str = r#"You are a tarot reader for an adult audience. Lay out a three-card spread for the positions Past, Present and Future, tailored to the client. Respond with a single JSON object of exactly this shape:
{
  "cards": [
    {"name": "...", "suit": "...", "position": "Past", "interpretation": "..."},
    {"name": "...", "suit": "...", "position": "Present", "interpretation": "..."},
    {"name": "...", "suit": "...", "position": "Future", "interpretation": "..."}
  ],
  "general_interpretation": "...",
  "overall_interpretation": "...",
  "drink": {"name": "...", "description": "...", "ingredients": ["..."], "preparation": "..."},
  "advice": "..."
}
Return only the JSON object, no surrounding text."#;

/// User message for the paid three-card spread.
pub const PREMIUM_READING_USER: &str =
    "Client birthdate: {birthdate}. Question: {question}. Read the spread for this client.";

/// System instruction for a short standalone message from the cards.
pub const CARD_MESSAGE_SYSTEM: &str = r#"You are a tarot reader. Draw one card and deliver a short message from it. Respond with a single JSON object of exactly this shape:
{
  "message": "...",
  "card": {"name": "...", "suit": "..."}
}
Return only the JSON object, no surrounding text."#;

/// User message for a standalone card message.
pub const CARD_MESSAGE_USER: &str = "Context: {context}. What do the cards want to say?";

/// Replace `{key}` tokens with their values, literally.
///
/// Only supplied keys are touched; every other brace in the template is
/// preserved, which keeps the JSON examples above intact.
pub fn substitute(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}
