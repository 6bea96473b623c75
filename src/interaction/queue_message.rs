//! Processing of a single queued chat event.
//!
//! The flow is strictly linear: decode, gather secrets and settings, read the
//! thread's history, run the chain, record the answer, publish it.  Every
//! failure up to and including the history write fails the invocation so the
//! queue can redeliver.  Publish failures are judged by the configured
//! [`PublishFailurePolicy`](crate::base::error::PublishFailurePolicy).

use tracing::Span;

use crate::{
    base::{
        error::ProcessError,
        types::{Acknowledgment, ChainScope, ChatMessage, QueueEvent},
    },
    prelude::*,
    runtime::Runtime,
    service::secrets::{OPENAI_API_KEY, SLACK_BOT_TOKEN},
};

/// Handles one queue event end to end.
#[instrument(skip_all, fields(event_id = tracing::field::Empty, thread = tracing::field::Empty))]
pub async fn handle_queue_event(event: &QueueEvent, runtime: &Runtime) -> Result<Acknowledgment, ProcessError> {
    debug!("Received event: {:?}", event);

    if event.records.len() > 1 {
        warn!("Event carries {} records; only the first is processed.", event.records.len());
    }

    // Decode the record.

    let message = ChatMessage::from_event(event)?;

    let span = Span::current();
    span.record("event_id", message.event_id.as_str());
    span.record("thread", message.thread.as_str());

    // Open the thread's history.

    let history = runtime.history.thread(&message.thread);

    // Gather secrets and settings.

    let secrets = runtime.secrets.get_secrets().await.map_err(ProcessError::Configuration)?;
    let api_key = secrets.require(OPENAI_API_KEY).map_err(ProcessError::Configuration)?;
    let bot_token = secrets.require(SLACK_BOT_TOKEN).map_err(ProcessError::Configuration)?;
    let index_id = required_setting("search_index_id", &runtime.config.search_index_id)?;
    required_setting("history_table", &runtime.config.history_table)?;

    // Bind the chain to this thread.

    let chain = runtime.chain.scoped(ChainScope {
        api_key: api_key.to_string(),
        session_id: message.thread.clone(),
        index_id: index_id.to_string(),
    });

    // Read the buffered history.

    let turns = history.turns().await.map_err(ProcessError::History)?;

    // Run the chain.

    info!("Sending message with event_id `{}` to the chain ({} prior turns).", message.event_id, turns.len());

    let prompt = message.sanitized_text();
    let response = chain.run(&prompt, &turns).await.map_err(ProcessError::ChainInvocation)?;
    let answer = response
        .answer
        .ok_or_else(|| ProcessError::ChainInvocation(anyhow!("Chain response for event_id `{}` has no answer.", message.event_id)))?;

    if !response.sources.is_empty() {
        debug!("Answer cites {} sources: {:?}", response.sources.len(), response.sources);
    }

    // Record the answer before anything is published.

    let user_text = runtime.config.record_user_turns.then_some(prompt.as_str());

    history.record_exchange(user_text, &answer).await.map_err(ProcessError::History)?;

    // Publish the answer to the thread.

    info!("Writing response for message with event_id `{}` to chat.", message.event_id);

    if let Err(err) = runtime.chat.send_message(bot_token, &message.channel, &message.thread, &answer).await {
        if runtime.config.publish_failure_policy.is_non_fatal(&err) {
            error!("Failed to publish reply for event_id `{}`: {}", message.event_id, err);
        } else {
            return Err(ProcessError::Publish(err));
        }
    }

    Ok(Acknowledgment::success())
}

/// A configuration identifier that must be set for processing to proceed.
fn required_setting<'a>(name: &str, value: &'a str) -> Result<&'a str, ProcessError> {
    if value.trim().is_empty() {
        return Err(ProcessError::Configuration(anyhow!("Setting `{name}` is not configured.")));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_settings_are_configuration_errors() {
        assert!(matches!(required_setting("search_index_id", "  "), Err(ProcessError::Configuration(_))));
        assert_eq!(required_setting("search_index_id", "vs_1").unwrap(), "vs_1");
    }
}
