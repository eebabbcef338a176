// SPDX-FileCopyrightText: 2026 Arcana Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-user conversation engine.
//!
//! Dispatches inbound [`ChatEvent`]s against the current [`Session`] state,
//! guards the free tier, drives the payment handshake, and sequences the
//! reveal of generated readings. Out-of-table transitions are rejected
//! defensively; the engine never assumes the transport sequences events
//! correctly.
//!
//! Counter discipline: a usage counter increments exactly once per
//! successfully completed flow, only after the generation result is
//! confirmed, so a failed generation never consumes the user's allowance.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use arcana_config::model::ArcanaConfig;
use arcana_core::types::{ButtonAction, ChatEvent, Keyboard, MessageRef, ReadingKind};
use arcana_core::{ArcanaError, ChatPort};
use arcana_openai::{PremiumReadingPayload, ReadingGenerator, TestReadingPayload};
use arcana_store::{ReadingRecord, ReadingRepo, UserRecord, UserRepo};

use crate::birthdate::parse_birthdate;
use crate::payment::PaymentGate;
use crate::session::{Session, SessionMap};
use crate::texts;

/// Cooperative delays between outgoing messages in a reveal sequence.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    pub short: Duration,
    pub medium: Duration,
    pub long: Duration,
}

impl Pacing {
    pub fn from_config(config: &arcana_config::model::PacingConfig) -> Self {
        Self {
            short: Duration::from_millis(config.short_ms),
            medium: Duration::from_millis(config.medium_ms),
            long: Duration::from_millis(config.long_ms),
        }
    }

    /// No delays; used by tests.
    pub fn zero() -> Self {
        Self {
            short: Duration::ZERO,
            medium: Duration::ZERO,
            long: Duration::ZERO,
        }
    }
}

/// The slice of application configuration the engine needs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub free_test_limit: u32,
    pub allow_list: HashSet<i64>,
    pub currency: String,
    pub premium_price: u32,
    pub pacing: Pacing,
}

impl EngineConfig {
    pub fn from_app(config: &ArcanaConfig) -> Self {
        Self {
            free_test_limit: config.limits.free_test_limit,
            allow_list: config.bot.allow_list.iter().copied().collect(),
            currency: config.payments.currency.clone(),
            premium_price: config.payments.premium_price,
            pacing: Pacing::from_config(&config.pacing),
        }
    }
}

/// The conversation engine. One instance serves all users; per-user state
/// lives in the [`SessionMap`] and the persisted records.
pub struct FlowEngine {
    config: EngineConfig,
    users: UserRepo,
    readings: ReadingRepo,
    generator: Arc<dyn ReadingGenerator>,
    port: Arc<dyn ChatPort>,
    payments: PaymentGate,
    sessions: SessionMap,
}

impl FlowEngine {
    pub fn new(
        config: EngineConfig,
        users: UserRepo,
        readings: ReadingRepo,
        generator: Arc<dyn ReadingGenerator>,
        port: Arc<dyn ChatPort>,
    ) -> Self {
        let payments = PaymentGate::new(config.currency.clone(), config.premium_price);
        Self {
            config,
            users,
            readings,
            generator,
            port,
            payments,
            sessions: SessionMap::new(),
        }
    }

    /// Dispatch one inbound event.
    pub async fn handle(&self, event: ChatEvent) -> Result<(), ArcanaError> {
        match event {
            ChatEvent::Command { user, chat, name } => self.on_command(user, chat, &name).await,
            ChatEvent::Text { user, chat, text } => self.on_text(user, chat, &text).await,
            ChatEvent::Button {
                user,
                chat,
                message,
                data,
                callback_id,
            } => self.on_button(user, chat, message, &data, &callback_id).await,
            ChatEvent::PreCheckout {
                user,
                query_id,
                payload,
                ..
            } => self.on_pre_checkout(user, &query_id, &payload).await,
            ChatEvent::PaymentSettled {
                user,
                chat,
                payload,
                amount,
                currency,
            } => {
                self.on_payment_settled(user, chat, &payload, amount, &currency)
                    .await
            }
        }
    }

    async fn on_command(&self, user: i64, chat: i64, name: &str) -> Result<(), ArcanaError> {
        debug!(user, command = name, "handling command");
        match name {
            "start" => self.show_entry(user, chat).await,
            "help" => {
                self.port
                    .send_text(chat, texts::HELP, Some(texts::back_keyboard()))
                    .await?;
                Ok(())
            }
            "test" => self.start_test_reading(user, chat, None).await,
            "premium" => self.show_premium_offer(user, chat, None).await,
            other => {
                debug!(user, command = other, "ignoring unknown command");
                Ok(())
            }
        }
    }

    /// `/start`: age gate for new or unconfirmed users, menu for the rest.
    async fn show_entry(&self, user: i64, chat: i64) -> Result<(), ArcanaError> {
        match self.users.fetch(user).await {
            Some(record) if record.age_confirmed => {
                self.sessions.set(user, Session::Menu).await;
                self.port
                    .send_text(chat, &texts::welcome(), Some(texts::menu_keyboard()))
                    .await?;
                Ok(())
            }
            record => {
                if record.is_none() {
                    // First contact: create the record lazily with zero counts.
                    let fresh = UserRecord::new(user);
                    if !self.users.save(&fresh).await {
                        warn!(user, "could not persist new user record");
                    }
                }
                self.sessions.set(user, Session::Unverified).await;
                self.port
                    .send_text(chat, texts::AGE_VERIFICATION, Some(texts::age_keyboard()))
                    .await?;
                Ok(())
            }
        }
    }

    async fn on_button(
        &self,
        user: i64,
        chat: i64,
        message: MessageRef,
        data: &str,
        callback_id: &str,
    ) -> Result<(), ArcanaError> {
        // Stop the client's spinner regardless of what the press means;
        // a failure here must not block the flow.
        if let Err(e) = self.port.answer_callback(callback_id).await {
            debug!(user, error = %e, "failed to answer callback query");
        }

        let Ok(action) = data.parse::<ButtonAction>() else {
            warn!(user, data, "ignoring unknown callback data");
            return Ok(());
        };

        let state = self.state_for(user).await;
        debug!(user, ?state, %action, "handling button press");

        match (state, action) {
            (Session::Unverified, ButtonAction::ConfirmAge) => {
                self.on_confirm_age(user, chat, message).await
            }
            (Session::Unverified, ButtonAction::DeclineAge) => {
                self.on_decline_age(user, chat, message).await
            }
            (_, ButtonAction::Help) => {
                self.port
                    .send_text(chat, texts::HELP, Some(texts::back_keyboard()))
                    .await?;
                Ok(())
            }
            (
                Session::AwaitingPayment | Session::AwaitingBirthdate { .. },
                ButtonAction::Back,
            ) => self.cancel_flow(user, chat, message).await,
            (_, ButtonAction::Back) => {
                self.sessions.set(user, Session::Menu).await;
                self.port
                    .edit_text(chat, message, &texts::welcome(), Some(texts::menu_keyboard()))
                    .await?;
                Ok(())
            }
            (_, ButtonAction::TestReading) => {
                self.start_test_reading(user, chat, Some(message)).await
            }
            (_, ButtonAction::PremiumReading) => {
                self.show_premium_offer(user, chat, Some(message)).await
            }
            (Session::Menu, ButtonAction::Pay) => self.on_pay(user, chat, message).await,
            (state, action) => {
                warn!(user, ?state, %action, "rejecting out-of-table transition");
                Ok(())
            }
        }
    }

    async fn on_confirm_age(
        &self,
        user: i64,
        chat: i64,
        message: MessageRef,
    ) -> Result<(), ArcanaError> {
        if !self.users.confirm_age(user).await {
            warn!(user, "age confirmation was not persisted");
        }
        info!(user, "age verification confirmed");
        self.sessions.set(user, Session::Menu).await;
        self.port
            .edit_text(chat, message, &texts::welcome(), Some(texts::menu_keyboard()))
            .await?;
        Ok(())
    }

    async fn on_decline_age(
        &self,
        user: i64,
        chat: i64,
        message: MessageRef,
    ) -> Result<(), ArcanaError> {
        info!(user, "age verification declined");
        self.sessions.clear(user).await;
        self.port.edit_text(chat, message, texts::AGE_DECLINED, None).await?;
        Ok(())
    }

    async fn cancel_flow(
        &self,
        user: i64,
        chat: i64,
        message: MessageRef,
    ) -> Result<(), ArcanaError> {
        info!(user, "flow cancelled, returning to menu");
        self.sessions.set(user, Session::Menu).await;
        self.port
            .edit_text(chat, message, &texts::welcome(), Some(texts::menu_keyboard()))
            .await?;
        Ok(())
    }

    /// The free one-card reading, guarded by the age gate and the
    /// free-tier limit. A guard failure never mutates counters.
    async fn start_test_reading(
        &self,
        user: i64,
        chat: i64,
        trigger: Option<MessageRef>,
    ) -> Result<(), ArcanaError> {
        let record = self
            .users
            .fetch(user)
            .await
            .unwrap_or_else(|| UserRecord::new(user));

        if !record.age_confirmed {
            self.sessions.set(user, Session::Unverified).await;
            self.send_or_edit(chat, trigger, texts::AGE_VERIFICATION, Some(texts::age_keyboard()))
                .await?;
            return Ok(());
        }

        if !record.can_start_test(self.config.free_test_limit, &self.config.allow_list) {
            info!(
                user,
                count = record.test_reading_count,
                limit = self.config.free_test_limit,
                "test reading blocked by free-tier limit"
            );
            self.send_or_edit(
                chat,
                trigger,
                &texts::limit_reached(self.config.free_test_limit),
                Some(texts::back_keyboard()),
            )
            .await?;
            return Ok(());
        }

        self.sessions.set(user, Session::Generating).await;
        self.send_or_edit(chat, trigger, texts::TEST_STARTING, None).await?;
        for step in [texts::TEST_PREPARING, texts::TEST_DRAWING, texts::TEST_THINKING] {
            self.port.send_text(chat, step, None).await?;
            tokio::time::sleep(self.config.pacing.long).await;
        }

        let outcome = self.generator.test_reading().await;
        // Whatever happened, the flow lands back on the menu.
        self.sessions.set(user, Session::Menu).await;

        match (outcome.success, outcome.reading) {
            (true, Some(payload)) => self.deliver_test_reading(user, chat, payload).await,
            (_, _) => {
                warn!(user, error = ?outcome.error, "test reading generation failed");
                self.port
                    .send_text(
                        chat,
                        &texts::generation_failed(outcome.error.as_deref()),
                        Some(texts::menu_keyboard()),
                    )
                    .await?;
                Ok(())
            }
        }
    }

    async fn deliver_test_reading(
        &self,
        user: i64,
        chat: i64,
        payload: TestReadingPayload,
    ) -> Result<(), ArcanaError> {
        let record = ReadingRecord {
            id: String::new(),
            user_id: user,
            created_at: Utc::now(),
            kind: ReadingKind::Test,
            question: None,
            cards: vec![payload.card.clone()],
            general_interpretation: payload.interpretation.clone(),
            birthdate: None,
            drink: None,
            overall_interpretation: None,
            advice: Some(payload.advice.clone()),
        };
        let reading_id = self.readings.insert(record).await;
        self.users.record_test_reading(user).await;
        if let Some(id) = &reading_id {
            self.users.set_last_reading(user, id).await;
        }

        self.port
            .send_text(
                chat,
                &texts::test_result(&payload.card, &payload.interpretation),
                Some(texts::after_reading_keyboard()),
            )
            .await?;
        info!(user, reading_id = ?reading_id, "test reading delivered");
        Ok(())
    }

    /// The premium offer screen. Age-gated like the test reading.
    async fn show_premium_offer(
        &self,
        user: i64,
        chat: i64,
        trigger: Option<MessageRef>,
    ) -> Result<(), ArcanaError> {
        let record = self
            .users
            .fetch(user)
            .await
            .unwrap_or_else(|| UserRecord::new(user));

        if !record.age_confirmed {
            self.sessions.set(user, Session::Unverified).await;
            self.send_or_edit(chat, trigger, texts::AGE_VERIFICATION, Some(texts::age_keyboard()))
                .await?;
            return Ok(());
        }

        self.sessions.set(user, Session::Menu).await;
        self.send_or_edit(
            chat,
            trigger,
            &texts::premium_offer(self.config.premium_price, &self.config.currency),
            Some(texts::premium_keyboard()),
        )
        .await?;
        Ok(())
    }

    /// The pay button. Allow-listed users skip the payment step entirely
    /// and go straight to the birthdate prompt.
    async fn on_pay(&self, user: i64, chat: i64, message: MessageRef) -> Result<(), ArcanaError> {
        if self.config.allow_list.contains(&user) {
            info!(user, "payment step skipped for allow-listed user");
            self.port
                .edit_text(chat, message, texts::PAYMENT_SKIPPED, Some(texts::back_keyboard()))
                .await?;
            self.sessions
                .set(user, Session::AwaitingBirthdate { paid: false })
                .await;
            return Ok(());
        }

        let invoice = self.payments.invoice_for(user);
        self.port.send_invoice(chat, &invoice).await?;
        self.sessions.set(user, Session::AwaitingPayment).await;
        info!(user, payload = %invoice.payload, "invoice sent");
        Ok(())
    }

    /// Pre-authorization check. The query is always answered, even when
    /// answering itself fails once: a client waiting at checkout must never
    /// be left hanging.
    async fn on_pre_checkout(
        &self,
        user: i64,
        query_id: &str,
        payload: &str,
    ) -> Result<(), ArcanaError> {
        let verdict = self.payments.validate_pre_checkout(payload);
        let answer = match &verdict {
            Ok(()) => self.port.answer_pre_checkout(query_id, true, None).await,
            Err(reason) => {
                self.port
                    .answer_pre_checkout(query_id, false, Some(reason))
                    .await
            }
        };

        if let Err(e) = answer {
            error!(user, error = %e, "failed to answer pre-checkout, rejecting instead");
            self.port
                .answer_pre_checkout(
                    query_id,
                    false,
                    Some("Payment processing failed. Please try again later."),
                )
                .await?;
        }
        Ok(())
    }

    /// Settlement confirmation: the single point that unlocks the
    /// birthdate step.
    async fn on_payment_settled(
        &self,
        user: i64,
        chat: i64,
        payload: &str,
        amount: u32,
        currency: &str,
    ) -> Result<(), ArcanaError> {
        self.payments.confirm_settlement(user, payload, amount, currency);

        let state = self.state_for(user).await;
        if state != Session::AwaitingPayment {
            // The money is real even if our transient state is not (e.g.
            // a restart between invoice and settlement). Proceed.
            warn!(user, ?state, "payment settled outside the payment flow, proceeding");
        }

        self.sessions
            .set(user, Session::AwaitingBirthdate { paid: true })
            .await;
        self.port
            .send_text(chat, texts::PAYMENT_SUCCESS, Some(texts::back_keyboard()))
            .await?;
        Ok(())
    }

    async fn on_text(&self, user: i64, chat: i64, text: &str) -> Result<(), ArcanaError> {
        match self.state_for(user).await {
            Session::AwaitingBirthdate { paid } => {
                self.on_birthdate(user, chat, text, paid).await
            }
            state => {
                debug!(user, ?state, "ignoring free-form text outside the birthdate step");
                Ok(())
            }
        }
    }

    async fn on_birthdate(
        &self,
        user: i64,
        chat: i64,
        text: &str,
        paid: bool,
    ) -> Result<(), ArcanaError> {
        let Some(birthdate) = parse_birthdate(text) else {
            debug!(user, "birthdate rejected, re-prompting");
            self.port.send_text(chat, texts::INVALID_DATE, None).await?;
            return Ok(());
        };

        info!(user, paid, "birthdate accepted, generating premium reading");
        self.sessions.set(user, Session::Generating).await;
        self.port.send_text(chat, texts::PREMIUM_PREPARING, None).await?;

        let outcome = self
            .generator
            .premium_reading(Some(&birthdate), None)
            .await;
        self.sessions.set(user, Session::Menu).await;

        match (outcome.success, outcome.reading) {
            (true, Some(payload)) => {
                self.deliver_premium_reading(user, chat, &birthdate, payload).await
            }
            (_, _) => {
                warn!(user, error = ?outcome.error, "premium reading generation failed");
                self.port
                    .send_text(
                        chat,
                        &texts::generation_failed(outcome.error.as_deref()),
                        Some(texts::menu_keyboard()),
                    )
                    .await?;
                Ok(())
            }
        }
    }

    async fn deliver_premium_reading(
        &self,
        user: i64,
        chat: i64,
        birthdate: &str,
        payload: PremiumReadingPayload,
    ) -> Result<(), ArcanaError> {
        let record = ReadingRecord {
            id: String::new(),
            user_id: user,
            created_at: Utc::now(),
            kind: ReadingKind::Premium,
            question: None,
            cards: payload.cards.clone(),
            general_interpretation: payload
                .general_interpretation
                .clone()
                .unwrap_or_else(|| payload.overall_interpretation.clone()),
            birthdate: Some(birthdate.to_string()),
            drink: Some(payload.drink.clone()),
            overall_interpretation: Some(payload.overall_interpretation.clone()),
            advice: Some(payload.advice.clone()),
        };
        let reading_id = self.readings.insert(record).await;
        self.users.record_premium_reading(user).await;
        if let Some(id) = &reading_id {
            self.users.set_last_reading(user, id).await;
        }

        // The reveal: cards one by one in spread order, then the summary.
        for (i, card) in payload.cards.iter().enumerate() {
            self.port
                .send_text(chat, &texts::premium_card(i + 1, card), None)
                .await?;
            tokio::time::sleep(self.config.pacing.long).await;
        }
        tokio::time::sleep(self.config.pacing.medium).await;
        self.port
            .send_text(
                chat,
                &texts::premium_summary(
                    &payload.overall_interpretation,
                    &payload.drink,
                    &payload.advice,
                ),
                Some(texts::after_reading_keyboard()),
            )
            .await?;
        info!(user, reading_id = ?reading_id, "premium reading delivered");
        Ok(())
    }

    /// The effective state: the transient session when present, otherwise
    /// derived from the persisted record (confirmed users rest on the menu).
    async fn state_for(&self, user: i64) -> Session {
        if let Some(session) = self.sessions.get(user).await {
            return session;
        }
        match self.users.fetch(user).await {
            Some(record) if record.age_confirmed => Session::Menu,
            _ => Session::Unverified,
        }
    }

    async fn send_or_edit(
        &self,
        chat: i64,
        trigger: Option<MessageRef>,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<(), ArcanaError> {
        match trigger {
            Some(message) => self.port.edit_text(chat, message, text, keyboard).await,
            None => self.port.send_text(chat, text, keyboard).await.map(|_| ()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicI32, Ordering};

    use async_trait::async_trait;
    use arcana_core::types::{Card, DrinkRecommendation, Invoice};
    use arcana_openai::{
        CardMessageOutcome, PremiumReadingOutcome, TestReadingOutcome, outcome::Outcome,
    };

    #[derive(Debug, Clone, PartialEq)]
    enum PortCall {
        Send { chat: i64, text: String, keyboard: bool },
        Edit { chat: i64, text: String },
        Invoice { chat: i64, payload: String, price: u32 },
        PreCheckoutAnswer { ok: bool },
        CallbackAnswer,
    }

    #[derive(Debug, Default)]
    struct MockPort {
        calls: Mutex<Vec<PortCall>>,
        counter: AtomicI32,
    }

    impl MockPort {
        fn calls(&self) -> Vec<PortCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Texts of Send and Edit calls, in order.
        fn texts(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    PortCall::Send { text, .. } | PortCall::Edit { text, .. } => Some(text),
                    _ => None,
                })
                .collect()
        }

        fn last_text(&self) -> String {
            self.texts().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl ChatPort for MockPort {
        async fn send_text(
            &self,
            chat: i64,
            text: &str,
            keyboard: Option<Keyboard>,
        ) -> Result<MessageRef, ArcanaError> {
            self.calls.lock().unwrap().push(PortCall::Send {
                chat,
                text: text.to_string(),
                keyboard: keyboard.is_some(),
            });
            Ok(MessageRef(self.counter.fetch_add(1, Ordering::SeqCst)))
        }

        async fn edit_text(
            &self,
            chat: i64,
            _message: MessageRef,
            text: &str,
            _keyboard: Option<Keyboard>,
        ) -> Result<(), ArcanaError> {
            self.calls.lock().unwrap().push(PortCall::Edit {
                chat,
                text: text.to_string(),
            });
            Ok(())
        }

        async fn send_invoice(&self, chat: i64, invoice: &Invoice) -> Result<(), ArcanaError> {
            self.calls.lock().unwrap().push(PortCall::Invoice {
                chat,
                payload: invoice.payload.clone(),
                price: invoice.price,
            });
            Ok(())
        }

        async fn answer_pre_checkout(
            &self,
            _query_id: &str,
            ok: bool,
            _error_message: Option<&str>,
        ) -> Result<(), ArcanaError> {
            self.calls
                .lock()
                .unwrap()
                .push(PortCall::PreCheckoutAnswer { ok });
            Ok(())
        }

        async fn answer_callback(&self, _callback_id: &str) -> Result<(), ArcanaError> {
            self.calls.lock().unwrap().push(PortCall::CallbackAnswer);
            Ok(())
        }
    }

    struct MockGenerator {
        test: TestReadingOutcome,
        premium: PremiumReadingOutcome,
    }

    impl Default for MockGenerator {
        fn default() -> Self {
            Self {
                test: Outcome::ok(test_payload()),
                premium: Outcome::ok(premium_payload()),
            }
        }
    }

    #[async_trait]
    impl ReadingGenerator for MockGenerator {
        async fn test_reading(&self) -> TestReadingOutcome {
            self.test.clone()
        }

        async fn premium_reading(
            &self,
            _birthdate: Option<&str>,
            _question: Option<&str>,
        ) -> PremiumReadingOutcome {
            self.premium.clone()
        }

        async fn card_message(&self, _context: Option<&str>) -> CardMessageOutcome {
            Outcome::failure("not scripted")
        }
    }

    fn test_payload() -> TestReadingPayload {
        TestReadingPayload {
            card: Card {
                name: "The Star".into(),
                suit: Some("major".into()),
                position: None,
                description: None,
                interpretation: Some("hope".into()),
                alcohol_recommendation: Some("sparkling water, honestly".into()),
            },
            personality_traits: vec!["curious".into()],
            interpretation: "a hopeful streak".into(),
            advice: "follow it".into(),
        }
    }

    fn premium_payload() -> PremiumReadingPayload {
        let card = |name: &str, position: &str| Card {
            name: name.into(),
            suit: Some("major".into()),
            position: Some(position.into()),
            description: None,
            interpretation: Some(format!("{name} speaks")),
            alcohol_recommendation: None,
        };
        PremiumReadingPayload {
            cards: vec![
                card("The Tower", "Past"),
                card("The Sun", "Present"),
                card("The Moon", "Future"),
            ],
            general_interpretation: None,
            overall_interpretation: "turbulence resolving into light".into(),
            drink: DrinkRecommendation {
                name: "Negroni".into(),
                description: "bitter and bold".into(),
                ingredients: vec!["gin".into(), "campari".into(), "vermouth".into()],
                preparation: Some("stir over ice".into()),
            },
            advice: "hold course".into(),
        }
    }

    struct Harness {
        engine: FlowEngine,
        port: Arc<MockPort>,
        dir: tempfile::TempDir,
    }

    impl Harness {
        fn users(&self) -> UserRepo {
            UserRepo::new(self.dir.path())
        }

        fn readings(&self) -> ReadingRepo {
            ReadingRepo::new(self.dir.path())
        }
    }

    fn harness_with(generator: MockGenerator, allow_list: &[i64], free_limit: u32) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let port = Arc::new(MockPort::default());
        let config = EngineConfig {
            free_test_limit: free_limit,
            allow_list: allow_list.iter().copied().collect(),
            currency: "XTR".into(),
            premium_price: 50,
            pacing: Pacing::zero(),
        };
        let engine = FlowEngine::new(
            config,
            UserRepo::new(dir.path()),
            ReadingRepo::new(dir.path()),
            Arc::new(generator),
            port.clone(),
        );
        Harness { engine, port, dir }
    }

    fn harness() -> Harness {
        harness_with(MockGenerator::default(), &[], 3)
    }

    fn cmd(user: i64, name: &str) -> ChatEvent {
        ChatEvent::Command {
            user,
            chat: user,
            name: name.to_string(),
        }
    }

    fn btn(user: i64, data: &str) -> ChatEvent {
        ChatEvent::Button {
            user,
            chat: user,
            message: MessageRef(1),
            data: data.to_string(),
            callback_id: "cb-1".to_string(),
        }
    }

    fn text(user: i64, body: &str) -> ChatEvent {
        ChatEvent::Text {
            user,
            chat: user,
            text: body.to_string(),
        }
    }

    async fn confirmed_user(h: &Harness, user: i64) {
        h.engine.handle(cmd(user, "start")).await.unwrap();
        h.engine.handle(btn(user, "confirm_age")).await.unwrap();
    }

    #[tokio::test]
    async fn new_user_gets_age_prompt_and_decline_persists_unconfirmed() {
        let h = harness();
        h.engine.handle(cmd(7, "start")).await.unwrap();
        assert!(h.port.last_text().contains("Age check"));

        h.engine.handle(btn(7, "decline_age")).await.unwrap();
        assert!(h.port.last_text().contains("Age restriction"));

        let record = h.users().fetch(7).await.unwrap();
        assert!(!record.age_confirmed);
    }

    #[tokio::test]
    async fn declined_user_can_restart_and_confirm() {
        let h = harness();
        h.engine.handle(cmd(7, "start")).await.unwrap();
        h.engine.handle(btn(7, "decline_age")).await.unwrap();

        h.engine.handle(cmd(7, "start")).await.unwrap();
        assert!(h.port.last_text().contains("Age check"));
        h.engine.handle(btn(7, "confirm_age")).await.unwrap();
        assert!(h.port.last_text().contains("Welcome"));

        let record = h.users().fetch(7).await.unwrap();
        assert!(record.age_confirmed);
    }

    #[tokio::test]
    async fn test_reading_delivers_and_increments_counter_once() {
        let h = harness();
        confirmed_user(&h, 7).await;
        h.engine.handle(btn(7, "test_reading")).await.unwrap();

        let result = h.port.last_text();
        assert!(result.contains("The Star"), "got: {result}");
        assert!(result.contains("sparkling water"));

        let record = h.users().fetch(7).await.unwrap();
        assert_eq!(record.test_reading_count, 1);
        assert!(record.last_reading_id.is_some());

        let readings = h.readings().readings_for_user(7).await;
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].kind, ReadingKind::Test);
        assert_eq!(readings[0].cards.len(), 1);
    }

    #[tokio::test]
    async fn test_reading_blocked_at_limit_without_mutation() {
        let h = harness_with(MockGenerator::default(), &[], 1);
        confirmed_user(&h, 7).await;

        h.engine.handle(btn(7, "test_reading")).await.unwrap();
        assert_eq!(h.users().fetch(7).await.unwrap().test_reading_count, 1);

        h.engine.handle(btn(7, "test_reading")).await.unwrap();
        assert!(h.port.last_text().contains("Free readings used up"));
        assert_eq!(h.users().fetch(7).await.unwrap().test_reading_count, 1);
        assert_eq!(h.readings().readings_for_user(7).await.len(), 1);
    }

    #[tokio::test]
    async fn allow_listed_user_is_never_limit_blocked() {
        let h = harness_with(MockGenerator::default(), &[7], 1);
        confirmed_user(&h, 7).await;

        for _ in 0..3 {
            h.engine.handle(btn(7, "test_reading")).await.unwrap();
        }
        assert_eq!(h.users().fetch(7).await.unwrap().test_reading_count, 3);
    }

    #[tokio::test]
    async fn unverified_user_requesting_test_reading_hits_age_gate() {
        let h = harness();
        h.engine.handle(cmd(7, "test")).await.unwrap();
        assert!(h.port.last_text().contains("Age check"));
        assert!(h.users().fetch(7).await.is_none() || h.readings().readings_for_user(7).await.is_empty());
    }

    #[tokio::test]
    async fn failed_generation_does_not_consume_allowance() {
        let generator = MockGenerator {
            test: Outcome::failure("generation failed: rate_limit"),
            ..MockGenerator::default()
        };
        let h = harness_with(generator, &[], 3);
        confirmed_user(&h, 7).await;

        h.engine.handle(btn(7, "test_reading")).await.unwrap();
        let last = h.port.last_text();
        assert!(last.contains("no answer"), "got: {last}");

        let record = h.users().fetch(7).await.unwrap();
        assert_eq!(record.test_reading_count, 0);
        assert!(h.readings().readings_for_user(7).await.is_empty());

        // The user is back on the menu and can try again.
        h.engine.handle(btn(7, "test_reading")).await.unwrap();
        assert_eq!(h.users().fetch(7).await.unwrap().test_reading_count, 0);
    }

    #[tokio::test]
    async fn allow_listed_premium_skips_payment_entirely() {
        let h = harness_with(MockGenerator::default(), &[7], 3);
        confirmed_user(&h, 7).await;

        h.engine.handle(btn(7, "premium_reading")).await.unwrap();
        assert!(h.port.last_text().contains("Premium reading"));

        h.engine.handle(btn(7, "pay")).await.unwrap();
        assert!(h.port.last_text().contains("birthdate"));
        // No invoice was ever sent.
        assert!(
            !h.port
                .calls()
                .iter()
                .any(|c| matches!(c, PortCall::Invoice { .. }))
        );
    }

    #[tokio::test]
    async fn paid_premium_flow_end_to_end() {
        let h = harness();
        confirmed_user(&h, 7).await;

        h.engine.handle(btn(7, "premium_reading")).await.unwrap();
        h.engine.handle(btn(7, "pay")).await.unwrap();

        let invoice = h
            .port
            .calls()
            .into_iter()
            .find_map(|c| match c {
                PortCall::Invoice { payload, price, .. } => Some((payload, price)),
                _ => None,
            })
            .expect("invoice should be sent");
        assert_eq!(invoice.0, "premium_reading_7");
        assert_eq!(invoice.1, 50);

        h.engine
            .handle(ChatEvent::PreCheckout {
                user: 7,
                query_id: "q-1".into(),
                payload: "premium_reading_7".into(),
                amount: 50,
                currency: "XTR".into(),
            })
            .await
            .unwrap();
        assert!(
            h.port
                .calls()
                .contains(&PortCall::PreCheckoutAnswer { ok: true })
        );

        h.engine
            .handle(ChatEvent::PaymentSettled {
                user: 7,
                chat: 7,
                payload: "premium_reading_7".into(),
                amount: 50,
                currency: "XTR".into(),
            })
            .await
            .unwrap();
        assert!(h.port.last_text().contains("birthdate"));

        h.engine.handle(text(7, "05.08.1990")).await.unwrap();

        // Three card messages in spread order, then the summary.
        let texts = h.port.texts();
        let card_positions: Vec<&String> = texts
            .iter()
            .filter(|t| t.starts_with("<b>🔮 Card "))
            .collect();
        assert_eq!(card_positions.len(), 3);
        assert!(card_positions[0].contains("Past"));
        assert!(card_positions[1].contains("Present"));
        assert!(card_positions[2].contains("Future"));
        let summary = h.port.last_text();
        assert!(summary.contains("Negroni"));
        assert!(summary.contains("hold course"));

        let record = h.users().fetch(7).await.unwrap();
        assert_eq!(record.premium_reading_count, 1);
        assert_eq!(record.test_reading_count, 0);

        let readings = h.readings().readings_for_user(7).await;
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].kind, ReadingKind::Premium);
        assert_eq!(readings[0].birthdate.as_deref(), Some("05.08.1990"));
    }

    #[tokio::test]
    async fn invalid_birthdate_re_prompts_without_leaving_state() {
        let h = harness_with(MockGenerator::default(), &[7], 3);
        confirmed_user(&h, 7).await;
        h.engine.handle(btn(7, "premium_reading")).await.unwrap();
        h.engine.handle(btn(7, "pay")).await.unwrap();

        h.engine.handle(text(7, "5.8.90")).await.unwrap();
        assert!(h.port.last_text().contains("does not look like a date"));

        // Still awaiting the birthdate: a valid one completes the flow.
        h.engine.handle(text(7, "05.08.1990")).await.unwrap();
        assert_eq!(h.users().fetch(7).await.unwrap().premium_reading_count, 1);
    }

    #[tokio::test]
    async fn failed_premium_generation_keeps_counter_and_returns_to_menu() {
        let generator = MockGenerator {
            premium: Outcome::failure("generation failed: connection"),
            ..MockGenerator::default()
        };
        let h = harness_with(generator, &[7], 3);
        confirmed_user(&h, 7).await;
        h.engine.handle(btn(7, "premium_reading")).await.unwrap();
        h.engine.handle(btn(7, "pay")).await.unwrap();
        h.engine.handle(text(7, "05.08.1990")).await.unwrap();

        assert!(h.port.last_text().contains("no answer"));
        let record = h.users().fetch(7).await.unwrap();
        assert_eq!(record.premium_reading_count, 0);
        assert!(h.readings().readings_for_user(7).await.is_empty());

        // Back on the menu: further birthdate text is out of table now.
        let before = h.port.calls().len();
        h.engine.handle(text(7, "05.08.1990")).await.unwrap();
        assert_eq!(h.port.calls().len(), before);
    }

    #[tokio::test]
    async fn back_from_payment_cancels_to_menu() {
        let h = harness();
        confirmed_user(&h, 7).await;
        h.engine.handle(btn(7, "premium_reading")).await.unwrap();
        h.engine.handle(btn(7, "pay")).await.unwrap();

        h.engine.handle(btn(7, "back")).await.unwrap();
        assert!(h.port.last_text().contains("Welcome"));

        // Birthdate text is no longer consumed.
        let before = h.port.calls().len();
        h.engine.handle(text(7, "05.08.1990")).await.unwrap();
        assert_eq!(h.port.calls().len(), before);
    }

    #[tokio::test]
    async fn out_of_table_button_is_rejected_quietly() {
        let h = harness();
        confirmed_user(&h, 7).await;

        let before = h.port.calls().len();
        h.engine.handle(btn(7, "confirm_age")).await.unwrap();
        let calls = h.port.calls();
        // Only the callback acknowledgement happened.
        assert_eq!(calls.len(), before + 1);
        assert_eq!(calls.last(), Some(&PortCall::CallbackAnswer));
    }

    #[tokio::test]
    async fn unknown_callback_data_is_ignored() {
        let h = harness();
        confirmed_user(&h, 7).await;
        let before = h.port.calls().len();
        h.engine.handle(btn(7, "drop_tables")).await.unwrap();
        assert_eq!(h.port.calls().len(), before + 1); // just the ack
    }

    #[tokio::test]
    async fn pre_checkout_with_unknown_payload_is_rejected_but_answered() {
        let h = harness();
        h.engine
            .handle(ChatEvent::PreCheckout {
                user: 7,
                query_id: "q-9".into(),
                payload: "mystery_box".into(),
                amount: 50,
                currency: "XTR".into(),
            })
            .await
            .unwrap();
        assert!(
            h.port
                .calls()
                .contains(&PortCall::PreCheckoutAnswer { ok: false })
        );
    }

    #[tokio::test]
    async fn settlement_without_prior_state_still_unlocks_birthdate() {
        // A restart between invoice and settlement loses the session; the
        // paid user must still reach the birthdate step.
        let h = harness();
        confirmed_user(&h, 7).await;
        h.engine
            .handle(ChatEvent::PaymentSettled {
                user: 7,
                chat: 7,
                payload: "premium_reading_7".into(),
                amount: 50,
                currency: "XTR".into(),
            })
            .await
            .unwrap();
        assert!(h.port.last_text().contains("birthdate"));

        h.engine.handle(text(7, "05.08.1990")).await.unwrap();
        assert_eq!(h.users().fetch(7).await.unwrap().premium_reading_count, 1);
    }

    #[tokio::test]
    async fn help_is_reachable_from_command_and_button() {
        let h = harness();
        confirmed_user(&h, 7).await;
        h.engine.handle(cmd(7, "help")).await.unwrap();
        assert!(h.port.last_text().contains("How it works"));
        h.engine.handle(btn(7, "help")).await.unwrap();
        assert!(h.port.last_text().contains("How it works"));
    }
}
