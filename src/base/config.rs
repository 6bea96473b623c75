//! Load configuration via `config` crate with env-override support.

use std::{collections::HashMap, ops::Deref, sync::Arc, time::Duration};

use serde::Deserialize;
use serde_with::{DurationSeconds, serde_as};

use crate::base::{error::PublishFailurePolicy, prompts};

use super::types::{Res, Void};

/// Default table holding per-thread conversation history.
fn default_history_table() -> String {
    "chat_history".to_string()
}

/// Default database endpoint (in-memory).
fn default_db_endpoint() -> String {
    "mem://".to_string()
}

/// Default database namespace.
fn default_db_namespace() -> String {
    "slack".to_string()
}

/// Default database name.
fn default_db_database() -> String {
    "rag_bot".to_string()
}

/// Default OpenAI model to use for the chain.
fn default_openai_model() -> String {
    "gpt-4.1-mini".to_string()
}

/// Default sampling temperature for the chain.
fn default_openai_temperature() -> f32 {
    0.0
}

/// Default max output tokens for OpenAI model
fn default_openai_max_tokens() -> u32 {
    4096
}

/// Default number of passages pulled from the search index.
fn default_openai_max_results() -> u32 {
    5
}

/// Default per-request timeout for OpenAI calls.
fn default_openai_timeout() -> Duration {
    Duration::from_secs(120)
}

/// Default number of retries for a failed OpenAI call.
fn default_openai_max_retries() -> u32 {
    2
}

/// Default system directive for the chain.
fn default_system_directive() -> String {
    prompts::CHAIN_SYSTEM_DIRECTIVE.to_string()
}

/// Default log level.
fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration for the slack-rag-bot application.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// The shared settings.
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl From<ConfigInner> for Config {
    fn from(inner: ConfigInner) -> Self {
        Self { inner: Arc::new(inner) }
    }
}

/// The settings behind [`Config`].
#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct ConfigInner {
    /// Identifier of the managed search index (vector store) used for retrieval (`SEARCH_INDEX_ID`).
    #[serde(default)]
    pub search_index_id: String,
    /// Table holding per-thread conversation history (`HISTORY_TABLE`).
    #[serde(default = "default_history_table")]
    pub history_table: String,
    /// Database endpoint URL (`DB_ENDPOINT`), e.g. `ws://localhost:8000` or `mem://`.
    #[serde(default = "default_db_endpoint")]
    pub db_endpoint: String,
    /// Database namespace (`DB_NAMESPACE`).
    #[serde(default = "default_db_namespace")]
    pub db_namespace: String,
    /// Database name (`DB_DATABASE`).
    #[serde(default = "default_db_database")]
    pub db_database: String,
    /// Database username (`DB_USERNAME`); sign-in is skipped when absent.
    #[serde(default)]
    pub db_username: Option<String>,
    /// Database password (`DB_PASSWORD`).
    #[serde(default)]
    pub db_password: Option<String>,
    /// AWS Secrets Manager secret holding the API credentials (`SECRETS_ID`).
    /// When absent, the `secrets` table below is used instead.
    #[serde(default)]
    pub secrets_id: Option<String>,
    /// Inline secrets, keyed like the managed secret (`openai-api-key`, `slack-bot-token`).
    #[serde(default)]
    pub secrets: HashMap<String, String>,
    /// OpenAI model used by the chain (`OPENAI_MODEL`).
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    /// Sampling temperature for the chain (`OPENAI_TEMPERATURE`).
    /// Value between 0 and 2; ignored for reasoning (`o*`) models.
    #[serde(default = "default_openai_temperature")]
    pub openai_temperature: f32,
    /// Max output tokens for OpenAI model (`OPENAI_MAX_TOKENS`).
    #[serde(default = "default_openai_max_tokens")]
    pub openai_max_tokens: u32,
    /// Maximum number of passages retrieved from the search index (`OPENAI_MAX_RESULTS`).
    #[serde(default = "default_openai_max_results")]
    pub openai_max_results: u32,
    /// Timeout, in seconds, for a single OpenAI request (`OPENAI_TIMEOUT`).
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_openai_timeout")]
    pub openai_timeout: Duration,
    /// Retries after a failed or timed-out OpenAI request (`OPENAI_MAX_RETRIES`).
    #[serde(default = "default_openai_max_retries")]
    pub openai_max_retries: u32,
    /// Optional custom system directive to override the default (`SYSTEM_DIRECTIVE`).
    #[serde(default = "default_system_directive")]
    pub system_directive: String,
    /// Also store the user's message as a turn before the reply (`RECORD_USER_TURNS`).
    #[serde(default)]
    pub record_user_turns: bool,
    /// Which publish failures are tolerated (`PUBLISH_FAILURE_POLICY`).
    #[serde(default)]
    pub publish_failure_policy: PublishFailurePolicy,
    /// Log level filter directive (`LOG_LEVEL`), e.g. `info` or `slack_rag_bot=debug`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines (`LOG_JSON`).
    #[serde(default)]
    pub log_json: bool,
    /// Export spans over OTLP/HTTP (`OTLP_ENABLED`).
    #[serde(default)]
    pub otlp_enabled: bool,
}

impl Default for ConfigInner {
    fn default() -> Self {
        Self {
            search_index_id: String::new(),
            history_table: default_history_table(),
            db_endpoint: default_db_endpoint(),
            db_namespace: default_db_namespace(),
            db_database: default_db_database(),
            db_username: None,
            db_password: None,
            secrets_id: None,
            secrets: HashMap::new(),
            openai_model: default_openai_model(),
            openai_temperature: default_openai_temperature(),
            openai_max_tokens: default_openai_max_tokens(),
            openai_max_results: default_openai_max_results(),
            openai_timeout: default_openai_timeout(),
            openai_max_retries: default_openai_max_retries(),
            system_directive: default_system_directive(),
            record_user_turns: false,
            publish_failure_policy: PublishFailurePolicy::default(),
            log_level: default_log_level(),
            log_json: false,
            otlp_enabled: false,
        }
    }
}

impl Config {
    /// Load settings from the config file (explicit path or `.hidden/config.toml`),
    /// then apply `SLACK_RAG_BOT_*` environment overrides.
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder();

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        cfg = cfg.add_source(config::Environment::default().prefix("SLACK_RAG_BOT"));

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Void {
        if self.openai_temperature < 0.0 || self.openai_temperature > 2.0 {
            return Err(anyhow::anyhow!("OpenAI temperature must be between 0 and 2."));
        }

        if self.openai_max_tokens < 1 || self.openai_max_tokens > 128000 {
            return Err(anyhow::anyhow!("OpenAI max tokens must be between 1 and 128000."));
        }

        if self.openai_max_results < 1 || self.openai_max_results > 50 {
            return Err(anyhow::anyhow!("OpenAI max results must be between 1 and 50."));
        }

        if self.openai_max_retries > 10 {
            return Err(anyhow::anyhow!("OpenAI max retries must be between 0 and 10."));
        }

        if self.openai_timeout.is_zero() {
            return Err(anyhow::anyhow!("OpenAI timeout must be greater than zero."));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("slack-rag-bot-config-{}-{}.toml", std::process::id(), chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_file_with_defaults() {
        let path = write_config(
            r#"
search_index_id = "vs_123"
openai_timeout = 30

[secrets]
openai-api-key = "sk-test"
slack-bot-token = "xoxb-test"
"#,
        );

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.search_index_id, "vs_123");
        assert_eq!(config.history_table, "chat_history");
        assert_eq!(config.openai_timeout, Duration::from_secs(30));
        assert_eq!(config.secrets.get("slack-bot-token").map(String::as_str), Some("xoxb-test"));
        assert_eq!(config.publish_failure_policy, PublishFailurePolicy::SwallowPlatformErrors);
        assert!(!config.record_user_turns);
    }

    #[test]
    fn loads_publish_policy() {
        let path = write_config(
            r#"
search_index_id = "vs_123"
publish_failure_policy = "propagate"
"#,
        );

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.publish_failure_policy, PublishFailurePolicy::Propagate);
    }

    #[test]
    fn rejects_out_of_range_temperature() {
        let config = Config::from(ConfigInner {
            search_index_id: "vs_123".to_string(),
            openai_temperature: 2.5,
            ..Default::default()
        });

        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_max_results() {
        let config = Config::from(ConfigInner {
            search_index_id: "vs_123".to_string(),
            openai_max_results: 0,
            ..Default::default()
        });

        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_max_retries() {
        let config = Config::from(ConfigInner {
            search_index_id: "vs_123".to_string(),
            openai_max_retries: 64,
            ..Default::default()
        });

        assert!(config.validate().is_err());

        let config = Config::from(ConfigInner {
            openai_max_retries: 10,
            ..(*config.inner).clone()
        });

        assert!(config.validate().is_ok());
    }

    #[test]
    fn defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }
}
