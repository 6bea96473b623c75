pub mod surreal;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{Res, Turn, Void};

// Traits.

/// Generic history store trait that clients must implement.
///
/// A history store keeps an ordered, append-only list of conversation turns
/// per thread.  Implementing this trait allows different database backends to
/// back the bot's conversation memory.
#[async_trait]
pub trait GenericHistoryClient: Send + Sync + 'static {
    /// Gets every stored turn for the thread, oldest first.
    ///
    /// A thread with no history yields an empty list.
    async fn get_turns(&self, thread_id: &str) -> Res<Vec<Turn>>;

    /// Appends turns to the end of the thread's history in one atomic write.
    ///
    /// Either every turn is stored, in order, or none is.
    async fn append_turns(&self, thread_id: &str, turns: &[Turn]) -> Void;

    /// Appends a single turn to the end of the thread's history.
    async fn append_turn(&self, thread_id: &str, turn: &Turn) -> Void {
        self.append_turns(thread_id, std::slice::from_ref(turn)).await
    }
}

// Structs.

/// History client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct HistoryClient {
    inner: Arc<dyn GenericHistoryClient>,
}

impl Deref for HistoryClient {
    type Target = dyn GenericHistoryClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl HistoryClient {
    pub fn new(inner: Arc<dyn GenericHistoryClient>) -> Self {
        Self { inner }
    }

    /// Opens a handle scoped to a single thread.
    pub fn thread(&self, thread_id: &str) -> ThreadHistory {
        ThreadHistory {
            client: self.clone(),
            thread_id: thread_id.to_string(),
        }
    }
}

/// A view of one thread's history, used both to read prior turns and to record new ones.
#[derive(Clone)]
pub struct ThreadHistory {
    client: HistoryClient,
    thread_id: String,
}

impl ThreadHistory {
    /// Reads the buffered history for the thread.
    pub async fn turns(&self) -> Res<Vec<Turn>> {
        self.client.get_turns(&self.thread_id).await
    }

    /// Records the bot's reply, preceded by the user's message when one is given.
    ///
    /// Both turns land in a single write, so a failure never leaves the user
    /// turn behind without its answer.
    pub async fn record_exchange(&self, user_text: Option<&str>, answer: &str) -> Void {
        let mut turns = Vec::with_capacity(2);

        if let Some(text) = user_text {
            turns.push(Turn::human(text));
        }
        turns.push(Turn::ai(answer));

        self.client.append_turns(&self.thread_id, &turns).await
    }
}
