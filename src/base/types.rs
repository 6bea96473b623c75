//! Shared types for queue events, history turns and chain calls.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::error::ProcessError;

/// The crate-wide error type.
pub type Err = anyhow::Error;
/// The crate-wide result type.
pub type Res<T> = Result<T, Err>;
/// A result carrying no value.
pub type Void = Res<()>;

/// The body returned to the queue runtime once a record has been handled.
pub const ACKNOWLEDGMENT_MESSAGE: &str = "Processed message successfully!";

// Queue types.

/// The envelope delivered by the queue runtime.
///
/// Mirrors the shape of an SQS batch (`{"Records": [...]}`), though only the
/// fields the processor consumes are modeled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueEvent {
    /// The delivered records.
    #[serde(rename = "Records", default)]
    pub records: Vec<QueueRecord>,
}

/// A single queued record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueRecord {
    /// The queue's id for the record, when present.
    #[serde(rename = "messageId", default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// The serialized chat message.
    pub body: String,
}

impl QueueEvent {
    /// Build an envelope holding a single record with the given body.
    pub fn single(body: impl Into<String>) -> Self {
        Self {
            records: vec![QueueRecord { message_id: None, body: body.into() }],
        }
    }
}

// Chat message.

/// A chat event as enqueued by the receiving side of the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The channel the message was posted in.
    pub channel: String,
    /// The thread timestamp; doubles as the history and session key.
    pub thread: String,
    /// The platform event id, used for correlation only.
    pub event_id: String,
    /// The raw message text, markup included.
    pub text: String,
}

impl ChatMessage {
    /// Decode a chat message from a queue record body.
    pub fn from_body(body: &str) -> Result<Self, ProcessError> {
        serde_json::from_str(body).map_err(|e| ProcessError::MalformedEvent(format!("invalid record body: {e}")))
    }

    /// Decode the chat message carried by a queue envelope.
    ///
    /// Only the first record is considered.
    pub fn from_event(event: &QueueEvent) -> Result<Self, ProcessError> {
        let record = event.records.first().ok_or_else(|| ProcessError::MalformedEvent("event contains no records".to_string()))?;

        Self::from_body(&record.body)
    }

    /// The message text with Slack markup normalized for the chain.
    pub fn sanitized_text(&self) -> String {
        sanitize_text(&self.text)
    }
}

/// Normalize Slack `mrkdwn` for consumption by the chain.
///
/// User mentions are dropped, channel references and links are reduced to their
/// readable form, entities are unescaped and whitespace is collapsed.
pub fn sanitize_text(text: &str) -> String {
    let replaced = markup_regex().replace_all(text, |caps: &Captures| {
        let target = &caps["target"];
        let label = caps.name("label").map(|m| m.as_str());

        match target.chars().next() {
            Some('@') => String::new(),
            Some('#') => match label {
                Some(label) => format!("#{label}"),
                None => format!("#{}", &target[1..]),
            },
            Some('!') => match &target[1..] {
                "here" | "channel" | "everyone" => format!("@{}", &target[1..]),
                _ => label.map(str::to_string).unwrap_or_default(),
            },
            _ => label.unwrap_or(target).to_string(),
        }
    });

    let unescaped = replaced.replace("&lt;", "<").replace("&gt;", ">").replace("&amp;", "&");

    unescaped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn markup_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<(?P<target>[^<>|]+)(?:\|(?P<label>[^<>]*))?>").expect("markup pattern is valid"))
}

// History.

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// The user.
    Human,
    /// The bot.
    Ai,
}

/// A single stored conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who wrote the turn.
    pub role: TurnRole,
    /// The turn text.
    pub text: String,
    /// When the turn was recorded.
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// A turn written by the user.
    pub fn human(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Human,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    /// A turn written by the bot.
    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Ai,
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

// Chain.

/// The scope a chain invocation runs under.
#[derive(Clone, PartialEq, Eq)]
pub struct ChainScope {
    /// Credentials for the model provider.
    pub api_key: String,
    /// The session (thread) the invocation belongs to.
    pub session_id: String,
    /// The managed search index used for retrieval.
    pub index_id: String,
}

impl std::fmt::Debug for ChainScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainScope")
            .field("api_key", &"<redacted>")
            .field("session_id", &self.session_id)
            .field("index_id", &self.index_id)
            .finish()
    }
}

/// The result of a chain invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainResponse {
    /// The generated answer, if the chain produced one.
    pub answer: Option<String>,
    /// Identifiers of the documents the answer cites.
    #[serde(default)]
    pub sources: Vec<String>,
}

impl ChainResponse {
    /// A response with the given answer and no sources.
    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            answer: Some(text.into()),
            sources: Vec::new(),
        }
    }
}

// Acknowledgment.

/// The structured value handed back to the queue runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Acknowledgment {
    /// HTTP-style status code.
    pub status_code: u16,
    /// Human-readable outcome.
    pub body: String,
}

impl Acknowledgment {
    /// The acknowledgment for a fully processed record.
    pub fn success() -> Self {
        Self {
            status_code: 200,
            body: ACKNOWLEDGMENT_MESSAGE.to_string(),
        }
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_all_fields() {
        let body = r#"{"channel":"C1","thread":"T1","event_id":"E1","text":"hello"}"#;
        let message = ChatMessage::from_event(&QueueEvent::single(body)).unwrap();

        assert_eq!(
            message,
            ChatMessage {
                channel: "C1".to_string(),
                thread: "T1".to_string(),
                event_id: "E1".to_string(),
                text: "hello".to_string(),
            }
        );
    }

    #[test]
    fn rejects_missing_field() {
        let body = r#"{"channel":"C1","thread":"T1","text":"hello"}"#;
        let result = ChatMessage::from_body(body);

        assert!(matches!(result, Err(ProcessError::MalformedEvent(_))));
    }

    #[test]
    fn rejects_invalid_json() {
        let result = ChatMessage::from_body("{not json");

        assert!(matches!(result, Err(ProcessError::MalformedEvent(_))));
    }

    #[test]
    fn rejects_empty_envelope() {
        let result = ChatMessage::from_event(&QueueEvent::default());

        assert!(matches!(result, Err(ProcessError::MalformedEvent(_))));
    }

    #[test]
    fn parses_sqs_envelope() {
        let raw = r#"{"Records":[{"messageId":"m-1","body":"{\"channel\":\"C9\",\"thread\":\"1.2\",\"event_id\":\"Ev\",\"text\":\"hi\"}","receiptHandle":"x"}]}"#;
        let event: QueueEvent = serde_json::from_str(raw).unwrap();

        assert_eq!(event.records.len(), 1);
        assert_eq!(event.records[0].message_id.as_deref(), Some("m-1"));
        assert_eq!(ChatMessage::from_event(&event).unwrap().channel, "C9");
    }

    #[test]
    fn strips_user_mentions() {
        assert_eq!(sanitize_text("<@U123ABC> what is   the deploy process?"), "what is the deploy process?");
        assert_eq!(sanitize_text("hey <@U1|bob>, ping"), "hey , ping");
    }

    #[test]
    fn rewrites_channels_links_and_specials() {
        assert_eq!(sanitize_text("see <#C42|ops-help>"), "see #ops-help");
        assert_eq!(sanitize_text("read <https://docs.rs|the docs> and <https://example.com>"), "read the docs and https://example.com");
        assert_eq!(sanitize_text("<!here> outage"), "@here outage");
        assert_eq!(sanitize_text("<!subteam^S1|@oncall> help"), "@oncall help");
    }

    #[test]
    fn unescapes_entities() {
        assert_eq!(sanitize_text("a &lt; b &amp;&amp; c &gt; d"), "a < b && c > d");
    }

    #[test]
    fn acknowledgment_serializes_camel_case() {
        let json = serde_json::to_value(Acknowledgment::success()).unwrap();

        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["body"], ACKNOWLEDGMENT_MESSAGE);
    }

    #[test]
    fn chain_scope_debug_redacts_key() {
        let scope = ChainScope {
            api_key: "sk-secret".to_string(),
            session_id: "T1".to_string(),
            index_id: "vs_1".to_string(),
        };

        assert!(!format!("{scope:?}").contains("sk-secret"));
    }
}
