pub mod aws;
pub mod inline;

use std::{collections::HashMap, ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::{config::Config, types::Res};

/// Key of the OpenAI API key in the secret map.
pub const OPENAI_API_KEY: &str = "openai-api-key";
/// Key of the Slack bot token in the secret map.
pub const SLACK_BOT_TOKEN: &str = "slack-bot-token";

// Traits.

/// Generic secrets provider trait that clients must implement.
///
/// Secrets are fetched on every invocation, so rotated credentials are picked
/// up without a restart.
#[async_trait]
pub trait GenericSecretsClient: Send + Sync + 'static {
    /// Fetch the full secret map.
    async fn get_secrets(&self) -> Res<Secrets>;
}

// Structs.

/// A map of named secret values.
///
/// The `Debug` output lists key names only.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secrets {
    values: HashMap<String, String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys = self.values.keys().collect::<Vec<_>>();
        keys.sort();
        f.debug_struct("Secrets").field("keys", &keys).finish()
    }
}

impl From<HashMap<String, String>> for Secrets {
    fn from(values: HashMap<String, String>) -> Self {
        Self { values }
    }
}

impl Secrets {
    /// Parse a flat JSON object of string values (the Secrets Manager `SecretString` layout).
    pub fn from_json(raw: &str) -> Res<Self> {
        let values: HashMap<String, String> = serde_json::from_str(raw).map_err(|e| anyhow::anyhow!("Secret is not a flat JSON object of strings: {e}"))?;

        Ok(Self { values })
    }

    /// Get a secret that must be present and non-empty.
    pub fn require(&self, key: &str) -> Res<&str> {
        match self.values.get(key) {
            Some(value) if !value.is_empty() => Ok(value.as_str()),
            Some(_) => Err(anyhow::anyhow!("Secret `{key}` is empty.")),
            None => Err(anyhow::anyhow!("Secret `{key}` is missing.")),
        }
    }
}

/// Secrets client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct SecretsClient {
    inner: Arc<dyn GenericSecretsClient>,
}

impl Deref for SecretsClient {
    type Target = dyn GenericSecretsClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl SecretsClient {
    pub fn new(inner: Arc<dyn GenericSecretsClient>) -> Self {
        Self { inner }
    }

    /// Pick the provider named by the configuration.
    ///
    /// A configured `secrets_id` selects AWS Secrets Manager; otherwise the
    /// inline `secrets` table is used.
    pub async fn from_config(config: &Config) -> Self {
        match &config.secrets_id {
            Some(secret_id) => Self::aws(secret_id).await,
            None => Self::inline(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_secret_string() {
        let secrets = Secrets::from_json(r#"{"openai-api-key":"sk-1","slack-bot-token":"xoxb-1"}"#).unwrap();

        assert_eq!(secrets.require(OPENAI_API_KEY).unwrap(), "sk-1");
        assert_eq!(secrets.require(SLACK_BOT_TOKEN).unwrap(), "xoxb-1");
    }

    #[test]
    fn rejects_nested_secret_string() {
        assert!(Secrets::from_json(r#"{"openai-api-key":{"value":"sk-1"}}"#).is_err());
    }

    #[test]
    fn missing_and_empty_secrets_are_errors() {
        let secrets = Secrets::from(HashMap::from([(SLACK_BOT_TOKEN.to_string(), String::new())]));

        assert!(secrets.require(OPENAI_API_KEY).is_err());
        assert!(secrets.require(SLACK_BOT_TOKEN).is_err());
    }

    #[test]
    fn debug_hides_values() {
        let secrets = Secrets::from(HashMap::from([(OPENAI_API_KEY.to_string(), "sk-very-secret".to_string())]));

        let debug = format!("{secrets:?}");
        assert!(debug.contains(OPENAI_API_KEY));
        assert!(!debug.contains("sk-very-secret"));
    }
}
