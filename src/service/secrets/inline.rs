//! Secrets taken from the loaded configuration.
//!
//! Intended for local runs, where the `secrets` table lives in
//! `.hidden/config.toml` next to the rest of the settings.

use std::sync::Arc;

use async_trait::async_trait;

use crate::base::{config::Config, types::Res};

use super::{GenericSecretsClient, Secrets, SecretsClient};

impl SecretsClient {
    /// Creates a secrets client serving the config's `secrets` table.
    pub fn inline(config: &Config) -> Self {
        let client = InlineSecretsClient {
            secrets: Secrets::from(config.secrets.clone()),
        };
        Self { inner: Arc::new(client) }
    }
}

/// Serves a fixed secret map.
pub struct InlineSecretsClient {
    secrets: Secrets,
}

#[async_trait]
impl GenericSecretsClient for InlineSecretsClient {
    async fn get_secrets(&self) -> Res<Secrets> {
        Ok(self.secrets.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::{base::config::ConfigInner, service::secrets::OPENAI_API_KEY};

    #[tokio::test]
    async fn serves_config_table() {
        let config = Config::from(ConfigInner {
            secrets: HashMap::from([(OPENAI_API_KEY.to_string(), "sk-local".to_string())]),
            ..Default::default()
        });

        let secrets = SecretsClient::from_config(&config).await.get_secrets().await.unwrap();

        assert_eq!(secrets.require(OPENAI_API_KEY).unwrap(), "sk-local");
    }
}
