//! AWS Secrets Manager provider.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::base::types::Res;

use super::{GenericSecretsClient, Secrets, SecretsClient};

impl SecretsClient {
    /// Creates a secrets client reading the given Secrets Manager secret.
    pub async fn aws(secret_id: &str) -> Self {
        let client = AwsSecretsClient::new(secret_id).await;
        Self { inner: Arc::new(client) }
    }
}

/// Reads a JSON `SecretString` from AWS Secrets Manager.
pub struct AwsSecretsClient {
    client: aws_sdk_secretsmanager::Client,
    secret_id: String,
}

impl AwsSecretsClient {
    /// Build a client from the ambient AWS environment (region, credentials chain).
    #[instrument(name = "AwsSecretsClient::new")]
    pub async fn new(secret_id: &str) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest()).load().await;

        Self {
            client: aws_sdk_secretsmanager::Client::new(&sdk_config),
            secret_id: secret_id.to_string(),
        }
    }
}

#[async_trait]
impl GenericSecretsClient for AwsSecretsClient {
    #[instrument(name = "AwsSecretsClient::get_secrets", skip(self), fields(secret_id = %self.secret_id))]
    async fn get_secrets(&self) -> Res<Secrets> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(&self.secret_id)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Secrets Manager GetSecretValue failed: {e}"))?;

        let raw = output.secret_string().ok_or_else(|| anyhow::anyhow!("Secret `{}` has no string value.", self.secret_id))?;
        let secrets = Secrets::from_json(raw)?;

        debug!("Loaded secrets: {:?}", secrets);

        Ok(secrets)
    }
}
