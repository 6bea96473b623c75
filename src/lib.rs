//! Library root for `slack-rag-bot`.
//!
//! Slack-rag-bot answers Slack threads from a queue of chat events:
//! - Each queued event is decoded into a channel/thread/text message
//! - The thread's prior turns are loaded from the history store
//! - A retrieval-augmented chain answers using a managed search index
//! - The answer is recorded in history and posted back to the thread
//!
//! The bot integrates with Slack for chat, SurrealDB for history,
//! OpenAI for answers, and AWS for secrets and event delivery.  The
//! architecture is built around narrow traits so each collaborator can be
//! swapped or mocked independently of the processing flow.

#[deny(missing_docs)]
pub mod base;
pub mod interaction;
pub mod prelude;
pub mod runtime;
pub mod service;

use base::{
    config::Config,
    error::ProcessError,
    types::{Acknowledgment, QueueEvent, Res, Void},
};
use rustls::crypto;
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and serves queue events:
/// - Initializes the crypto provider
/// - Creates the runtime context with history, chain, chat, and secrets clients
/// - Hands each delivered event to the message processor
pub async fn start(config: Config) -> Void {
    info!("Starting slack-rag-bot ...");

    install_crypto_provider();

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Serve events.
    runtime.serve().await
}

/// Process a single serialized queue event and return its acknowledgment.
///
/// Used for local runs and replaying dead-lettered records.
pub async fn process_once(config: Config, raw_event: &str) -> Res<Acknowledgment> {
    install_crypto_provider();

    let event: QueueEvent = serde_json::from_str(raw_event).map_err(|e| ProcessError::MalformedEvent(format!("invalid queue event: {e}")))?;

    let runtime = runtime::Runtime::new(config).await?;

    Ok(runtime.process(&event).await?)
}

/// Install the process-wide rustls provider; a provider installed earlier is kept.
fn install_crypto_provider() {
    let _ = crypto::aws_lc_rs::default_provider().install_default();
}
