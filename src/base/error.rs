//! Error taxonomy for processing a queued chat event.

use serde::Deserialize;
use thiserror::Error;

use super::types::Err;

/// Why a queue record could not be processed.
///
/// Every variant is fatal for the invocation: the record is reported as failed
/// and left to the queue for redelivery.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The envelope or record body could not be decoded.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// A required setting or secret is missing or unreadable.
    #[error("configuration error: {0:#}")]
    Configuration(Err),

    /// The history store could not be read or written.
    #[error("history store error: {0:#}")]
    History(Err),

    /// The chain failed or produced no answer.
    #[error("chain invocation failed: {0:#}")]
    ChainInvocation(Err),

    /// The reply could not be posted and the failure policy treats it as fatal.
    #[error("failed to publish reply: {0}")]
    Publish(#[from] ChatError),
}

/// Failures raised by a chat platform client.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The platform received the request and rejected it (e.g. `channel_not_found`).
    #[error("platform rejected the request: {code}")]
    Platform {
        /// The platform's error code.
        code: String,
    },

    /// The request never produced a platform answer.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Which publish failures are tolerated once a reply has been recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishFailurePolicy {
    /// Platform rejections are logged and dropped; transport failures still propagate.
    #[default]
    SwallowPlatformErrors,
    /// Every publish failure fails the invocation.
    Propagate,
}

impl PublishFailurePolicy {
    /// Whether the given publish failure should be dropped rather than propagated.
    pub fn is_non_fatal(&self, error: &ChatError) -> bool {
        match self {
            Self::SwallowPlatformErrors => matches!(error, ChatError::Platform { .. }),
            Self::Propagate => false,
        }
    }
}
