// SPDX-FileCopyrightText: 2026 Arcana Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram transport adapter for the Arcana tarot bot.
//!
//! Connects via long polling, maps updates (messages, callback queries,
//! pre-checkout queries, successful payments) into [`ChatEvent`]s for the
//! conversation engine, and implements the outbound [`ChatPort`] over the
//! Bot API.

pub mod events;
pub mod port;

use std::sync::Arc;

use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, Message, PreCheckoutQuery};
use tracing::{error, info};

use arcana_core::types::ChatEvent;
use arcana_flow::FlowEngine;

pub use port::TelegramPort;

/// Runs the long-polling dispatcher until shutdown (ctrl-c).
///
/// Every supported update kind maps to one [`ChatEvent`] and is handed to
/// the engine; unsupported updates are silently ignored.
pub async fn run_polling(bot: Bot, engine: Arc<FlowEngine>) {
    info!("starting Telegram long polling");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback_query))
        .branch(Update::filter_pre_checkout_query().endpoint(on_pre_checkout_query));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![engine])
        .default_handler(|_| async {}) // Silently ignore other update kinds
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Telegram long polling stopped");
}

async fn on_message(msg: Message, engine: Arc<FlowEngine>) -> ResponseResult<()> {
    if let Some(event) = events::from_message(&msg) {
        dispatch(&engine, event).await;
    }
    Ok(())
}

async fn on_callback_query(query: CallbackQuery, engine: Arc<FlowEngine>) -> ResponseResult<()> {
    if let Some(event) = events::from_callback(&query) {
        dispatch(&engine, event).await;
    }
    Ok(())
}

async fn on_pre_checkout_query(
    query: PreCheckoutQuery,
    engine: Arc<FlowEngine>,
) -> ResponseResult<()> {
    dispatch(&engine, events::from_pre_checkout(&query)).await;
    Ok(())
}

/// Hands one event to the engine. Engine errors are logged, never
/// propagated to the dispatcher: one failed event must not stop polling.
async fn dispatch(engine: &FlowEngine, event: ChatEvent) {
    let user = event.user();
    if let Err(e) = engine.handle(event).await {
        error!(user, error = %e, "event handling failed");
    }
}
