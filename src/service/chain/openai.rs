//! Retrieval-augmented answer chain on top of the OpenAI Responses API.
//!
//! Retrieval is delegated to OpenAI's hosted `file_search` tool: the search
//! index id from the chain scope is passed through as the vector store to
//! search, so this module never touches embeddings or documents itself.

use std::{sync::Arc, time::Duration};

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::responses::{
        Content, CreateResponseArgs, FileSearchArgs, Input, InputItem, InputMessageArgs, OutputContent, Response, Role, TextConfig, TextResponseFormat, ToolDefinition,
    },
};
use async_trait::async_trait;
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::base::{
    config::Config,
    prompts,
    types::{ChainResponse, ChainScope, Res, Turn, TurnRole},
};

use super::{ChainClient, GenericChainClient};

const RETRY_DELAY_MS: u64 = 1000;

// Extra methods on `ChainClient` applied by the openai implementation.

impl ChainClient {
    pub fn openai(config: &Config) -> Self {
        let client = OpenAiChainClient::new(config);
        Self { inner: Arc::new(client) }
    }
}

// Specific implementations.

/// OpenAI chain client implementation.
///
/// The API key arrives with each invocation's scope, so an HTTP client is
/// built per call rather than held here.
#[derive(Clone)]
pub struct OpenAiChainClient {
    config: Config,
}

impl OpenAiChainClient {
    /// Create a new OpenAI chain client.
    #[instrument(name = "OpenAiChainClient::new", skip_all)]
    pub fn new(config: &Config) -> Self {
        Self { config: config.clone() }
    }

    /// Helper function to make OpenAI API calls with retry logic and timeout handling.
    async fn call_openai_api(&self, client: &Client<OpenAIConfig>, request_builder: CreateResponseArgs) -> Res<Response> {
        let max_retries = self.config.openai_max_retries;
        let request_timeout = self.config.openai_timeout;

        let mut retries = 0;

        loop {
            let request = request_builder.build()?;
            let result = timeout(request_timeout, client.responses().create(request)).await;

            match result {
                Ok(Ok(response)) => {
                    info!("OpenAI API call succeeded after {} attempts", retries + 1);
                    return Ok(response);
                }
                Ok(Err(err)) => {
                    if retries >= max_retries {
                        return Err(anyhow::anyhow!("OpenAI API call failed after {max_retries} retries: {err}"));
                    }
                    retries += 1;
                    warn!("OpenAI API call failed, retrying {retries}/{max_retries}: {err}");
                }
                Err(_) => {
                    if retries >= max_retries {
                        return Err(anyhow::anyhow!("OpenAI API call timed out after {} attempts", max_retries + 1));
                    }
                    retries += 1;
                    warn!("OpenAI API call timed out, retrying {retries}/{max_retries}");
                }
            }

            // Exponential backoff between attempts.
            let delay = Duration::from_millis(RETRY_DELAY_MS * 2_u64.pow(retries - 1));
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl GenericChainClient for OpenAiChainClient {
    #[instrument(name = "OpenAiChainClient::invoke", skip(self, prompt, history), fields(history_len = history.len()))]
    async fn invoke(&self, scope: &ChainScope, prompt: &str, history: &[Turn]) -> Res<ChainResponse> {
        let client = Client::with_config(OpenAIConfig::new().with_api_key(scope.api_key.clone()));

        let input = build_chain_input(prompt, history)?;
        let tools = vec![ToolDefinition::FileSearch(
            FileSearchArgs::default()
                .vector_store_ids(vec![scope.index_id.clone()])
                .max_num_results(self.config.openai_max_results)
                .build()?,
        )];
        let text_config = TextConfig { format: TextResponseFormat::Text };

        // Create the request.
        let mut request = CreateResponseArgs::default();
        request
            .instructions(self.config.system_directive.clone())
            .max_output_tokens(self.config.openai_max_tokens)
            .model(&self.config.openai_model)
            .tools(tools)
            .text(text_config)
            .input(input);

        // Add the temperature for the non-reasoning models.
        if self.config.openai_model.starts_with("gpt") {
            request.temperature(self.config.openai_temperature);
        }

        let response = self.call_openai_api(&client, request).await?;

        parse_chain_response(&response)
    }
}

/// Build the request input: prior turns in order, then the current prompt.
pub fn build_chain_input(prompt: &str, history: &[Turn]) -> Res<Input> {
    let mut items = Vec::with_capacity(history.len() + 1);

    for turn in history {
        let role = match turn.role {
            TurnRole::Human => Role::User,
            TurnRole::Ai => Role::Assistant,
        };

        items.push(InputItem::Message(InputMessageArgs::default().role(role).content(turn.text.clone()).build()?));
    }

    items.push(InputItem::Message(InputMessageArgs::default().role(Role::User).content(prompts::user_prompt(prompt)).build()?));

    Ok(Input::Items(items))
}

/// Collect the answer text and cited files from a response.
#[instrument(skip_all)]
pub fn parse_chain_response(response: &Response) -> Res<ChainResponse> {
    let mut texts = Vec::new();
    let mut sources = Vec::new();

    info!("Chain response has {} outputs.", response.output.len());
    for output in &response.output {
        match output {
            OutputContent::Message(message) => {
                for message_content in &message.content {
                    match message_content {
                        Content::OutputText(text) => {
                            collect_file_ids(&serde_json::to_value(&text.annotations)?, &mut sources);
                            texts.push(text.text.clone());
                        }
                        Content::Refusal(reason) => {
                            return Err(anyhow::anyhow!("Request refused: {reason:#?}"));
                        }
                    }
                }
            }
            other => {
                debug!("Skipping non-message output: {other:?}");
            }
        }
    }

    let answer = texts.join("\n\n");
    let answer = if answer.trim().is_empty() { None } else { Some(answer) };

    Ok(ChainResponse { answer, sources })
}

/// Gather every distinct `file_id` found in a serialized annotation list.
fn collect_file_ids(value: &Value, sources: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(file_id)) = map.get("file_id")
                && !sources.contains(file_id)
            {
                sources.push(file_id.clone());
            }
            map.values().for_each(|v| collect_file_ids(v, sources));
        }
        Value::Array(items) => items.iter().for_each(|v| collect_file_ids(v, sources)),
        _ => {}
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::base::config::ConfigInner;

    #[test]
    fn input_places_history_before_prompt() {
        let history = vec![Turn::human("what is the on-call rotation?"), Turn::ai("It rotates weekly.")];

        let input = build_chain_input("who is on call today?", &history).unwrap();

        let Input::Items(items) = &input else {
            panic!("expected item input");
        };
        assert_eq!(items.len(), 3);

        let serialized = serde_json::to_string(&input).unwrap();
        let first = serialized.find("on-call rotation").unwrap();
        let second = serialized.find("rotates weekly").unwrap();
        let prompt = serialized.find("who is on call today?").unwrap();
        assert!(first < second && second < prompt);
    }

    #[test]
    fn input_without_history_is_just_the_prompt() {
        let Input::Items(items) = build_chain_input("hello", &[]).unwrap() else {
            panic!("expected item input");
        };

        assert_eq!(items.len(), 1);
    }

    #[test]
    fn collects_distinct_file_ids() {
        let annotations = json!([
            { "type": "file_citation", "file_id": "file-a", "index": 3 },
            { "type": "file_citation", "file_id": "file-b", "index": 9 },
            { "type": "file_citation", "file_id": "file-a", "index": 12 },
            { "type": "url_citation", "url": "https://example.com" }
        ]);

        let mut sources = Vec::new();
        collect_file_ids(&annotations, &mut sources);

        assert_eq!(sources, vec!["file-a".to_string(), "file-b".to_string()]);
    }

    #[tokio::test]
    #[ignore = "requires OPENAI_API_KEY and OPENAI_VECTOR_STORE_ID"]
    async fn live_invocation_returns_answer() {
        let config = Config::from(ConfigInner {
            openai_max_tokens: 300,
            ..Default::default()
        });
        let client = ChainClient::openai(&config);
        let scope = ChainScope {
            api_key: std::env::var("OPENAI_API_KEY").unwrap(),
            session_id: "1234567890.123456".to_string(),
            index_id: std::env::var("OPENAI_VECTOR_STORE_ID").unwrap(),
        };

        let response = client.scoped(scope).run("What does this knowledge base cover?", &[]).await.unwrap();

        assert!(response.answer.is_some());
    }
}
