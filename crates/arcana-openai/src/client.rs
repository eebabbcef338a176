// SPDX-FileCopyrightText: 2026 Arcana Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the OpenAI chat-completions API.
//!
//! Provides [`ReadingClient`] which handles request construction,
//! authentication, transient-error retry with exponential backoff, strict
//! JSON-object response parsing, and shape validation with typed fallback.

use std::time::{Duration, Instant};

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use arcana_config::model::OpenAiConfig;
use arcana_core::ArcanaError;

use crate::metrics::{ErrorKind, GenerationMetrics, MetricsSnapshot};
use crate::outcome::{
    CardMessageOutcome, CardMessagePayload, Outcome, PremiumReadingOutcome, PremiumReadingPayload,
    TestReadingOutcome, TestReadingPayload,
};
use crate::prompts;

/// Total attempts per logical request, including the first.
const MAX_ATTEMPTS: u32 = 3;
/// Backoff bounds; the delay doubles per attempt within these.
const MIN_BACKOFF: Duration = Duration::from_secs(2);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// An internal, categorized request failure. Never escapes `generate_*`;
/// it is folded into the outcome's `error` string.
#[derive(Debug, Clone)]
pub(crate) struct GenerationError {
    pub kind: ErrorKind,
    pub message: String,
}

impl GenerationError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat<'a>,
}

#[derive(Debug, serde::Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, serde::Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    type_: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for reading generation against the OpenAI chat-completions API.
///
/// Owns the retry policy, the error taxonomy, and a per-instance
/// [`GenerationMetrics`] accumulator.
pub struct ReadingClient {
    http: reqwest::Client,
    model: String,
    max_tokens: u32,
    temperature: f32,
    base_url: String,
    metrics: GenerationMetrics,
}

impl ReadingClient {
    /// Creates a new client from configuration.
    ///
    /// Requires `config.api_key` to be set.
    pub fn new(config: &OpenAiConfig) -> Result<Self, ArcanaError> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| ArcanaError::Config("openai.api_key is required".into()))?;
        if api_key.is_empty() {
            return Err(ArcanaError::Config("openai.api_key cannot be empty".into()));
        }

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| ArcanaError::Config(format!("invalid API key header value: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth);
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ArcanaError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        info!(model = %config.model, "generation client initialized");

        Ok(Self {
            http,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            base_url: config.base_url.clone(),
            metrics: GenerationMetrics::new(),
        })
    }

    /// A point-in-time copy of the request counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Generates the free one-card reading.
    pub async fn generate_test_reading(&self) -> TestReadingOutcome {
        info!("generating test reading");
        self.generate(
            prompts::TEST_READING_SYSTEM,
            prompts::TEST_READING_USER,
            &[],
            "test reading",
            |payload: &TestReadingPayload| {
                if payload.card.name.trim().is_empty() {
                    Some("card name is empty".to_string())
                } else {
                    None
                }
            },
        )
        .await
    }

    /// Generates the paid three-card reading.
    pub async fn generate_premium_reading(
        &self,
        birthdate: Option<&str>,
        question: Option<&str>,
    ) -> PremiumReadingOutcome {
        info!(
            has_birthdate = birthdate.is_some(),
            has_question = question.is_some(),
            "generating premium reading"
        );
        let vars = [
            ("birthdate", birthdate.unwrap_or("Unknown")),
            ("question", question.unwrap_or("General forecast")),
        ];
        self.generate(
            prompts::PREMIUM_READING_SYSTEM,
            prompts::PREMIUM_READING_USER,
            &vars,
            "premium reading",
            |payload: &PremiumReadingPayload| {
                if payload.cards.len() != 3 {
                    Some(format!("expected 3 cards, got {}", payload.cards.len()))
                } else {
                    None
                }
            },
        )
        .await
    }

    /// Generates a short standalone message from the cards.
    pub async fn generate_card_message(&self, context: Option<&str>) -> CardMessageOutcome {
        info!(has_context = context.is_some(), "generating card message");
        let vars = [("context", context.unwrap_or("General message"))];
        self.generate(
            prompts::CARD_MESSAGE_SYSTEM,
            prompts::CARD_MESSAGE_USER,
            &vars,
            "card message",
            |payload: &CardMessagePayload| {
                if payload.message.trim().is_empty() {
                    Some("message is empty".to_string())
                } else {
                    None
                }
            },
        )
        .await
    }

    /// Shared generate path: request with retries, then validate the parsed
    /// object against the expected payload shape. A shape mismatch yields
    /// the typed fallback, never a raised error.
    async fn generate<P>(
        &self,
        system: &str,
        user: &str,
        vars: &[(&str, &str)],
        operation: &str,
        check: impl Fn(&P) -> Option<String>,
    ) -> Outcome<P>
    where
        P: DeserializeOwned,
    {
        let started = Instant::now();
        let value = match self.request_json(system, user, vars).await {
            Ok(value) => value,
            Err(e) => {
                error!(
                    operation,
                    kind = %e.kind,
                    error = %e.message,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "generation failed"
                );
                return Outcome::failure(format!("generation failed: {}", e.kind));
            }
        };

        match serde_json::from_value::<P>(value.clone()) {
            Ok(payload) => {
                if let Some(problem) = check(&payload) {
                    self.metrics
                        .record_failure(ErrorKind::Validation, started.elapsed());
                    warn!(operation, problem, "generated payload failed shape check");
                    return Outcome::failure(format!("invalid {operation} shape: {problem}"));
                }
                info!(
                    operation,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "generation succeeded"
                );
                Outcome::ok(payload)
            }
            Err(e) => {
                self.metrics
                    .record_failure(ErrorKind::Validation, started.elapsed());
                warn!(operation, error = %e, response = %truncate(&value.to_string(), 500),
                    "generated payload failed validation");
                Outcome::failure(format!("invalid {operation} shape: {e}"))
            }
        }
    }

    /// One logical request with up to [`MAX_ATTEMPTS`] attempts. Each
    /// attempt is recorded in the metrics individually.
    async fn request_json(
        &self,
        system: &str,
        user: &str,
        vars: &[(&str, &str)],
    ) -> Result<Value, GenerationError> {
        let system = prompts::substitute(system, vars);
        let user = prompts::substitute(user, vars);

        let mut last_error = None;

        for attempt in 1..=MAX_ATTEMPTS {
            if attempt > 1 {
                let delay = backoff_delay(attempt - 1);
                warn!(attempt, delay_ms = delay.as_millis() as u64, "retrying after transient error");
                tokio::time::sleep(delay).await;
            }

            let started = Instant::now();
            match self.attempt(&system, &user).await {
                Ok(value) => {
                    self.metrics.record_success(started.elapsed());
                    debug!(attempt, elapsed_ms = started.elapsed().as_millis() as u64, "request succeeded");
                    return Ok(value);
                }
                Err(e) => {
                    self.metrics.record_failure(e.kind, started.elapsed());
                    warn!(attempt, kind = %e.kind, error = %e.message, "request attempt failed");
                    let transient = e.kind.is_transient();
                    last_error = Some(e);
                    if !transient {
                        break;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            GenerationError::new(ErrorKind::Unknown, "request failed without a recorded error")
        }))
    }

    /// A single HTTP attempt: send, classify the status, extract the
    /// message content, and parse it strictly as a JSON object.
    async fn attempt(&self, system: &str, user: &str) -> Result<Value, GenerationError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            response_format: ResponseFormat {
                type_: "json_object",
            },
        };

        let response = self
            .http
            .post(&self.base_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                GenerationError::new(ErrorKind::Connection, format!("HTTP request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let kind = classify_status(status);
            return Err(GenerationError::new(
                kind,
                format!("API returned {status}: {}", truncate(&text, 500)),
            ));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            GenerationError::new(ErrorKind::Api, format!("failed to parse API response: {e}"))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                GenerationError::new(ErrorKind::Unknown, "empty response from the generation API")
            })?;

        let value: Value = serde_json::from_str(&content).map_err(|e| {
            GenerationError::new(
                ErrorKind::JsonParse,
                format!("response is not valid JSON: {e}"),
            )
        })?;

        if !value.is_object() {
            return Err(GenerationError::new(
                ErrorKind::JsonParse,
                "response is not a JSON object",
            ));
        }

        Ok(value)
    }
}

/// Map an HTTP error status onto the error taxonomy.
fn classify_status(status: StatusCode) -> ErrorKind {
    match status.as_u16() {
        429 => ErrorKind::RateLimit,
        401 => ErrorKind::Authentication,
        403 => ErrorKind::Permission,
        _ => ErrorKind::Api,
    }
}

/// Exponential backoff doubling per retry, clamped to the policy bounds.
fn backoff_delay(retry: u32) -> Duration {
    let exp = Duration::from_secs(1 << retry.min(6));
    exp.clamp(MIN_BACKOFF, MAX_BACKOFF)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
