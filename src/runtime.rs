//! Runtime services and shared state for the slack-rag-bot.

use lambda_runtime::{LambdaEvent, service_fn};
use tracing::{error, instrument};

use crate::{
    base::{
        config::Config,
        error::ProcessError,
        types::{Acknowledgment, QueueEvent, Res, Void},
    },
    interaction,
    service::{chain::ChainClient, chat::ChatClient, history::HistoryClient, secrets::SecretsClient},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the configuration and every collaborator the message
/// processor talks to.  It is designed to be trivially cloneable, allowing it
/// to be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The conversation history store.
    pub history: HistoryClient,
    /// The answer chain.
    pub chain: ChainClient,
    /// The chat platform client.
    pub chat: ChatClient,
    /// The secrets provider.
    pub secrets: SecretsClient,
}

impl Runtime {
    /// Create a new runtime instance.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the history store.
        let history = HistoryClient::surreal(&config).await?;

        // Initialize the chain.
        let chain = ChainClient::openai(&config);

        // Initialize the slack client.
        let chat = ChatClient::slack()?;

        // Initialize the secrets provider.
        let secrets = SecretsClient::from_config(&config).await;

        Ok(Self {
            config,
            history,
            chain,
            chat,
            secrets,
        })
    }

    /// Process one queue event.
    pub async fn process(&self, event: &QueueEvent) -> Result<Acknowledgment, ProcessError> {
        interaction::queue_message::handle_queue_event(event, self).await
    }

    /// Serve queue events delivered by the AWS Lambda runtime until it shuts down.
    pub async fn serve(self) -> Void {
        let handler = service_fn(move |event: LambdaEvent<QueueEvent>| {
            let runtime = self.clone();

            async move {
                // Log any errors.
                runtime.process(&event.payload).await.map_err(|err| {
                    error!("Error while handling: {}", err);
                    lambda_runtime::Error::from(err)
                })
            }
        });

        lambda_runtime::run(handler).await.map_err(|e| anyhow::anyhow!("Lambda runtime stopped: {e}"))
    }
}
