// SPDX-FileCopyrightText: 2026 Arcana Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-visible message templates and keyboards.
//!
//! All texts are HTML-formatted for the Telegram transport. Keyboards are
//! built from the transport-agnostic [`Keyboard`] type.

use arcana_core::types::{Button, ButtonAction, Card, DrinkRecommendation, Keyboard};

pub const AGE_VERIFICATION: &str = "<b>🔞 Age check</b>\n\nThis bot pairs tarot readings with \
     alcohol recommendations and is intended for adults only.\n\nPlease confirm that you are 18 \
     or older.";

pub const AGE_DECLINED: &str = "<b>⚠️ Age restriction</b>\n\nUnfortunately you cannot use this \
     bot: it is intended only for people aged 18 and over.";

pub const HELP: &str = "<b>ℹ️ How it works</b>\n\n🔮 <b>Test reading</b>: one card, free, with a \
     limited number of tries.\n✨ <b>Premium reading</b>: a paid three-card spread (past, \
     present, future) with a drink pairing.\n\nReadings are for entertainment only. Please drink \
     responsibly.";

pub const TEST_STARTING: &str = "<b>🔮 Let us see what the cards have for you...</b>";

pub const TEST_PREPARING: &str = "<b>🔮 Preparing the reading...</b>";

pub const TEST_DRAWING: &str = "<b>🔮 Drawing a card...</b>";

pub const TEST_THINKING: &str = "<b>🤔 Reading the card...</b>";

pub const PREMIUM_PREPARING: &str = "<b>🔮 Preparing your spread. The cards are being laid \
     out...</b>";

pub const PAYMENT_SUCCESS: &str = "<b>✅ Payment received!</b>\n\nNow send me your birthdate in \
     the format <b>DD.MM.YYYY</b>, for example 05.08.1990.";

pub const PAYMENT_SKIPPED: &str = "<b>✨ You have free access to premium readings.</b>\n\nSend \
     me your birthdate in the format <b>DD.MM.YYYY</b>, for example 05.08.1990.";

pub const INVALID_DATE: &str = "<b>⚠️ That does not look like a date.</b>\n\nPlease send your \
     birthdate as <b>DD.MM.YYYY</b>, for example 05.08.1990.";

pub fn welcome() -> String {
    "<b>🔮 Arcana</b>\n\nWelcome! Pick a reading below.\n\n<i>Readings are for entertainment \
     only. Please drink responsibly.</i>"
        .to_string()
}

pub fn limit_reached(limit: u32) -> String {
    format!(
        "<b>⚠️ Free readings used up</b>\n\nYou have used all {limit} free test readings. The \
         premium spread is still available."
    )
}

pub fn premium_offer(price: u32, currency: &str) -> String {
    format!(
        "<b>✨ Premium reading</b>\n\nA three-card spread for past, present and future, with a \
         detailed interpretation and a drink pairing.\n\nPrice: <b>{price} {currency}</b>."
    )
}

pub fn generation_failed(detail: Option<&str>) -> String {
    format!(
        "<b>⚠️ The cards gave no answer</b>\n\n{}\n\nPlease try again later.",
        detail.unwrap_or("Something went wrong while preparing your reading.")
    )
}

/// The single-card result of a test reading.
pub fn test_result(card: &Card, interpretation: &str) -> String {
    let mut name = card.name.clone();
    if let Some(suit) = &card.suit {
        name.push_str(&format!(" ({suit})"));
    }
    let drink_block = card
        .alcohol_recommendation
        .as_deref()
        .map(|rec| format!("\n\n<b>🍸 To accompany it:</b>\n{rec}"))
        .unwrap_or_default();
    format!(
        "<b>🔮 Your card: {name}</b>\n\n<b>Interpretation:</b>\n{interpretation}{drink_block}"
    )
}

/// One card of the premium reveal sequence, 1-indexed.
pub fn premium_card(index: usize, card: &Card) -> String {
    let position = card.position.as_deref().unwrap_or("Card");
    let meaning = position_meaning(position);
    let interpretation = card.interpretation.as_deref().unwrap_or("...");
    let future_note = if position.eq_ignore_ascii_case("future") {
        "\n\n<i>Remember that the future is not set in stone; your own actions can always \
         change it.</i>"
    } else {
        ""
    };
    format!(
        "<b>🔮 Card {index}, {position}: {name}</b>\n\n<b>Place in the spread:</b> \
         {meaning}\n\n<b>Interpretation:</b>\n{interpretation}{future_note}",
        name = card.name
    )
}

fn position_meaning(position: &str) -> &str {
    match position.to_ascii_lowercase().as_str() {
        "past" => "Influences from the past that still act on the situation",
        "present" => "The current situation and its energies",
        "future" => "Potential opportunities and the direction things are heading",
        _ => "A card of the spread",
    }
}

/// The closing summary of a premium reading.
pub fn premium_summary(
    overall_interpretation: &str,
    drink: &DrinkRecommendation,
    advice: &str,
) -> String {
    let ingredients = if drink.ingredients.is_empty() {
        String::new()
    } else {
        format!("\n<b>Ingredients:</b> {}", drink.ingredients.join(", "))
    };
    let preparation = drink
        .preparation
        .as_deref()
        .map(|p| format!("\n<b>Preparation:</b> {p}"))
        .unwrap_or_default();
    format!(
        "<b>✨ The spread as a whole</b>\n\n{overall_interpretation}\n\n<b>🍸 Your \
         drink:</b>\n<b>{name}</b>\n{description}{ingredients}{preparation}\n\n<b>💡 \
         Advice:</b>\n{advice}",
        name = drink.name,
        description = drink.description
    )
}

pub fn menu_keyboard() -> Keyboard {
    Keyboard::column([
        Button::new("🔮 Test reading", ButtonAction::TestReading),
        Button::new("✨ Premium reading", ButtonAction::PremiumReading),
        Button::new("ℹ️ Help", ButtonAction::Help),
    ])
}

pub fn back_keyboard() -> Keyboard {
    Keyboard::column([Button::new("⬅️ Back", ButtonAction::Back)])
}

pub fn age_keyboard() -> Keyboard {
    Keyboard::column([
        Button::new("✅ I am 18 or older", ButtonAction::ConfirmAge),
        Button::new("❌ I am under 18", ButtonAction::DeclineAge),
    ])
}

pub fn premium_keyboard() -> Keyboard {
    Keyboard::column([
        Button::new("💳 Pay", ButtonAction::Pay),
        Button::new("⬅️ Back", ButtonAction::Back),
    ])
}

pub fn after_reading_keyboard() -> Keyboard {
    Keyboard::column([
        Button::new("✨ New premium reading", ButtonAction::PremiumReading),
        Button::new("🔮 Test reading", ButtonAction::TestReading),
        Button::new("ℹ️ Help", ButtonAction::Help),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_card(position: &str) -> Card {
        Card {
            name: "The Sun".into(),
            suit: Some("major".into()),
            position: Some(position.into()),
            description: None,
            interpretation: Some("clarity arrives".into()),
            alcohol_recommendation: Some("a bright spritz".into()),
        }
    }

    #[test]
    fn test_result_includes_suit_and_drink() {
        let text = test_result(&sample_card("Present"), "a clear day");
        assert!(text.contains("The Sun (major)"));
        assert!(text.contains("a clear day"));
        assert!(text.contains("a bright spritz"));
    }

    #[test]
    fn future_card_carries_the_disclaimer() {
        let text = premium_card(3, &sample_card("Future"));
        assert!(text.contains("not set in stone"));
        let text = premium_card(1, &sample_card("Past"));
        assert!(!text.contains("not set in stone"));
    }

    #[test]
    fn premium_summary_lists_ingredients_and_preparation() {
        let drink = DrinkRecommendation {
            name: "Negroni".into(),
            description: "bitter and bold".into(),
            ingredients: vec!["gin".into(), "campari".into()],
            preparation: Some("stir over ice".into()),
        };
        let text = premium_summary("a strong arc", &drink, "hold course");
        assert!(text.contains("Negroni"));
        assert!(text.contains("gin, campari"));
        assert!(text.contains("stir over ice"));
        assert!(text.contains("hold course"));
    }

    #[test]
    fn keyboards_have_expected_layouts() {
        assert_eq!(menu_keyboard().rows.len(), 3);
        assert_eq!(age_keyboard().rows.len(), 2);
        assert_eq!(premium_keyboard().rows.len(), 2);
        assert_eq!(back_keyboard().rows.len(), 1);
        assert_eq!(after_reading_keyboard().rows.len(), 3);
    }
}
