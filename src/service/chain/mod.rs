pub mod openai;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{ChainResponse, ChainScope, Res, Turn};

// Traits.

/// Generic answer chain trait that clients must implement.
///
/// A chain turns a prompt plus the thread's prior turns into an answer,
/// retrieving supporting passages from the search index named in the scope.
/// Prompt construction and retrieval live entirely behind this trait.
#[async_trait]
pub trait GenericChainClient: Send + Sync + 'static {
    /// Run the chain once.
    ///
    /// The returned response may lack an answer; deciding whether that is an
    /// error is left to the caller.
    async fn invoke(&self, scope: &ChainScope, prompt: &str, history: &[Turn]) -> Res<ChainResponse>;
}

// Structs.

/// Chain client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChainClient {
    inner: Arc<dyn GenericChainClient>,
}

impl Deref for ChainClient {
    type Target = dyn GenericChainClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChainClient {
    pub fn new(inner: Arc<dyn GenericChainClient>) -> Self {
        Self { inner }
    }

    /// Binds the chain to a credential, session and search index.
    pub fn scoped(&self, scope: ChainScope) -> ScopedChain {
        ScopedChain { client: self.clone(), scope }
    }
}

/// A chain bound to one session.
#[derive(Clone)]
pub struct ScopedChain {
    client: ChainClient,
    scope: ChainScope,
}

impl ScopedChain {
    /// Run the chain with the current prompt and buffered history.
    pub async fn run(&self, prompt: &str, history: &[Turn]) -> Res<ChainResponse> {
        self.client.invoke(&self.scope, prompt, history).await
    }
}
