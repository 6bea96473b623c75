pub mod slack;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::error::ChatError;

// Traits.

/// Generic "chat" trait that clients must implement.
///
/// This trait defines the one chat-platform operation the bot consumes:
/// posting a reply into a thread.  Implementing this trait allows different
/// chat services to be used with the bot.
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Send a message to a channel thread.
    ///
    /// The bot token is supplied per call, since it is fetched from the
    /// secrets provider on every invocation.  Failures distinguish platform
    /// rejections from transport problems so callers can apply a policy.
    async fn send_message(&self, bot_token: &str, channel_id: &str, thread_ts: &str, text: &str) -> Result<(), ChatError>;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}
