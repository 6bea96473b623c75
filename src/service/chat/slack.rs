//! Slack integration for posting replies.
//!
//! Only `chat.postMessage` is used: the bot receives its events through the
//! queue, never through a socket-mode or events-API listener.

use crate::base::{error::ChatError, types::Res};
use async_trait::async_trait;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use slack_morphism::{errors::SlackClientError, prelude::*};
use tracing::{debug, instrument};

use std::sync::Arc;

use super::{ChatClient, GenericChatClient};

// Type aliases.

type FullClient = slack_morphism::SlackClient<SlackClientHyperConnector<HttpsConnector<HttpConnector>>>;

// Extra methods on `ChatClient` applied by the slack implementation.

impl ChatClient {
    /// Creates a new Slack chat client.
    pub fn slack() -> Res<Self> {
        let client = SlackChatClient::new()?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Structs.

/// Slack client implementation.
#[derive(Clone)]
pub struct SlackChatClient {
    client: Arc<FullClient>,
}

impl SlackChatClient {
    /// Create a new Slack chat client.
    #[instrument(name = "SlackChatClient::new", skip_all)]
    pub fn new() -> Res<Self> {
        let https_connector = HttpsConnector::<HttpConnector>::builder().with_native_roots()?.https_only().enable_all_versions().build();
        let connector = SlackClientHyperConnector::with_connector(https_connector);
        let client = Arc::new(slack_morphism::SlackClient::new(connector));

        Ok(Self { client })
    }
}

#[async_trait]
impl GenericChatClient for SlackChatClient {
    #[instrument(skip(self, bot_token, text))]
    async fn send_message(&self, bot_token: &str, channel_id: &str, thread_ts: &str, text: &str) -> Result<(), ChatError> {
        let token = SlackApiToken::new(SlackApiTokenValue(bot_token.to_string()));
        let message = SlackMessageContent::new().with_text(text.to_string());

        let request = SlackApiChatPostMessageRequest::new(SlackChannelId(channel_id.to_string()), message)
            .with_thread_ts(SlackTs(thread_ts.to_string()))
            .with_link_names(true);

        let session = self.client.open_session(&token);

        session.chat_post_message(&request).await.map_err(classify_slack_error)?;

        debug!("Posted reply to `{}` in `{}`.", thread_ts, channel_id);

        Ok(())
    }
}

/// Split Slack client failures into platform answers and transport failures.
///
/// Anything Slack itself answered (an `ok: false` body, a rate limit, a non-2xx
/// status) is a platform error; only failures that never produced a Slack
/// answer are transport errors.
fn classify_slack_error(err: SlackClientError) -> ChatError {
    match err {
        SlackClientError::ApiError(api_error) => ChatError::Platform { code: api_error.code },
        SlackClientError::RateLimitError(rate_limit) => ChatError::Platform {
            code: rate_limit.code.unwrap_or_else(|| "ratelimited".to_string()),
        },
        SlackClientError::HttpError(http_error) => ChatError::Platform {
            code: format!("http_{}", http_error.status_code.as_u16()),
        },
        other => ChatError::Transport(other.to_string()),
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use slack_morphism::errors::{SlackClientApiError, SlackClientHttpError, SlackClientHttpProtocolError, SlackRateLimitError};

    use super::*;

    #[test]
    fn api_errors_are_platform_errors() {
        let err = SlackClientError::ApiError(SlackClientApiError::new("channel_not_found".to_string()));

        assert!(matches!(classify_slack_error(err), ChatError::Platform { code } if code == "channel_not_found"));
    }

    #[test]
    fn rate_limits_are_platform_errors() {
        let err = SlackClientError::RateLimitError(SlackRateLimitError::new().with_retry_after(Duration::from_secs(30)));

        assert!(matches!(classify_slack_error(err), ChatError::Platform { code } if code == "ratelimited"));

        let err = SlackClientError::RateLimitError(SlackRateLimitError::new().with_code("ratelimited".to_string()));

        assert!(matches!(classify_slack_error(err), ChatError::Platform { code } if code == "ratelimited"));
    }

    #[test]
    fn http_status_errors_are_platform_errors() {
        let err = SlackClientError::HttpError(SlackClientHttpError::new(http::StatusCode::SERVICE_UNAVAILABLE));

        assert!(matches!(classify_slack_error(err), ChatError::Platform { code } if code == "http_503"));
    }

    #[test]
    fn protocol_failures_are_transport_errors() {
        let cause = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset");
        let err = SlackClientError::HttpProtocolError(SlackClientHttpProtocolError::new().with_cause(Box::new(cause)));

        assert!(matches!(classify_slack_error(err), ChatError::Transport(_)));
    }

    #[test]
    fn swallowed_by_default_policy() {
        let policy = crate::base::error::PublishFailurePolicy::default();
        let err = SlackClientError::RateLimitError(SlackRateLimitError::new());

        assert!(policy.is_non_fatal(&classify_slack_error(err)));
    }
}
