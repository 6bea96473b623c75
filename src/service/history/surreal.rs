//! SurrealDB implementation of the conversation history store.
//!
//! Each thread maps to one record (`<table>:<thread_id>`) carrying an ordered
//! `turns` array.  Every append is a single `UPSERT` statement, so a batch of
//! turns is stored whole or not at all and the array only ever grows.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use surrealdb::{
    Surreal,
    engine::any::{self, Any},
    opt::auth::Root,
};
use tracing::{debug, info, instrument};

use crate::base::{
    config::Config,
    types::{Res, Turn, Void},
};

use super::{GenericHistoryClient, HistoryClient};

// Extra methods on `HistoryClient` applied by the surreal implementation.

impl HistoryClient {
    /// Creates a history client backed by the configured SurrealDB endpoint.
    pub async fn surreal(config: &Config) -> Res<Self> {
        let client = SurrealHistoryClient::new(
            &config.db_endpoint,
            config.db_username.as_deref().zip(config.db_password.as_deref()),
            &config.db_namespace,
            &config.db_database,
            &config.history_table,
        )
        .await?;

        Ok(Self::new(std::sync::Arc::new(client)))
    }

    /// Creates a history client backed by an in-memory SurrealDB instance.
    pub async fn surreal_memory(table: &str) -> Res<Self> {
        let client = SurrealHistoryClient::new("mem://", None, "slack", "rag_bot", table).await?;

        Ok(Self::new(std::sync::Arc::new(client)))
    }
}

// Structs.

/// A thread's history record in the database.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SurrealHistory {
    #[serde(default)]
    turns: Vec<Turn>,
}

/// SurrealDB history client.
#[derive(Clone)]
pub struct SurrealHistoryClient {
    db: Surreal<Any>,
    table: String,
}

impl SurrealHistoryClient {
    /// Connect, authenticate, and prepare the history table.
    #[instrument(name = "SurrealHistoryClient::new", skip(credentials))]
    pub async fn new(endpoint: &str, credentials: Option<(&str, &str)>, namespace: &str, database: &str, table: &str) -> Res<Self> {
        validate_table_name(table)?;

        let db = any::connect(endpoint).await?;

        // Authenticate with the database if credentials were provided.
        if let Some((username, password)) = credentials {
            db.signin(Root { username, password }).await?;
        }

        // Use a specific namespace and database
        db.use_ns(namespace).use_db(database).await?;

        // Define schemas.

        db.query(format!("DEFINE TABLE IF NOT EXISTS {table} SCHEMALESS;")).await?.check()?;

        info!("History store initialized successfully.");

        Ok(Self { db, table: table.to_string() })
    }
}

#[async_trait]
impl GenericHistoryClient for SurrealHistoryClient {
    #[instrument(skip(self))]
    async fn get_turns(&self, thread_id: &str) -> Res<Vec<Turn>> {
        let record: Option<SurrealHistory> = self.db.select((self.table.as_str(), thread_id)).await?;
        let turns = record.map(|r| r.turns).unwrap_or_default();

        debug!("Thread `{}` has {} stored turns.", thread_id, turns.len());

        Ok(turns)
    }

    #[instrument(skip(self, turns), fields(count = turns.len()))]
    async fn append_turns(&self, thread_id: &str, turns: &[Turn]) -> Void {
        if turns.is_empty() {
            return Ok(());
        }

        self.db
            .query("UPSERT type::thing($table, $thread) SET turns = array::concat(turns ?? [], $turns), updated_at = time::now();")
            .bind(("table", self.table.clone()))
            .bind(("thread", thread_id.to_string()))
            .bind(("turns", turns.to_vec()))
            .await?
            .check()?;

        debug!("Appended {} turns to thread `{}`.", turns.len(), thread_id);

        Ok(())
    }
}

/// Table names are interpolated into SurrealQL, so only plain identifiers are accepted.
fn validate_table_name(table: &str) -> Void {
    let valid = !table.is_empty() && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') && !table.starts_with(|c: char| c.is_ascii_digit());

    if !valid {
        return Err(anyhow::anyhow!("Invalid history table name `{table}`: use letters, digits, and underscores."));
    }

    Ok(())
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::types::TurnRole;

    #[tokio::test]
    async fn unknown_thread_has_no_turns() {
        let history = HistoryClient::surreal_memory("chat_history").await.unwrap();

        assert!(history.get_turns("1700000000.000100").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn appends_in_order_per_thread() {
        let history = HistoryClient::surreal_memory("chat_history").await.unwrap();

        history.append_turn("1.1", &Turn::human("first")).await.unwrap();
        history.append_turn("1.1", &Turn::ai("second")).await.unwrap();
        history.append_turn("2.2", &Turn::ai("other thread")).await.unwrap();

        let turns = history.get_turns("1.1").await.unwrap();

        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].text, "first");
        assert_eq!(turns[0].role, TurnRole::Human);
        assert_eq!(turns[1].text, "second");
        assert_eq!(turns[1].role, TurnRole::Ai);
        assert_eq!(history.get_turns("2.2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn thread_handle_reads_and_writes() {
        let history = HistoryClient::surreal_memory("chat_history").await.unwrap();
        let thread = history.thread("T1");

        thread.record_exchange(None, "hi there").await.unwrap();

        let turns = thread.turns().await.unwrap();
        assert_eq!(turns, history.get_turns("T1").await.unwrap());
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].text, "hi there");
    }

    #[tokio::test]
    async fn exchange_is_stored_in_one_write() {
        let history = HistoryClient::surreal_memory("chat_history").await.unwrap();
        history.append_turn("T1", &Turn::ai("earlier")).await.unwrap();

        history.thread("T1").record_exchange(Some("hello"), "hi there").await.unwrap();

        let turns = history.get_turns("T1").await.unwrap();
        let stored = turns.iter().map(|t| (t.role, t.text.as_str())).collect::<Vec<_>>();
        assert_eq!(stored, vec![(TurnRole::Ai, "earlier"), (TurnRole::Human, "hello"), (TurnRole::Ai, "hi there")]);
    }

    #[tokio::test]
    async fn empty_batch_creates_nothing() {
        let history = HistoryClient::surreal_memory("chat_history").await.unwrap();

        history.append_turns("T1", &[]).await.unwrap();

        assert!(history.get_turns("T1").await.unwrap().is_empty());
    }

    #[test]
    fn rejects_unsafe_table_names() {
        assert!(validate_table_name("chat_history").is_ok());
        assert!(validate_table_name("history; REMOVE TABLE x").is_err());
        assert!(validate_table_name("1table").is_err());
        assert!(validate_table_name("").is_err());
    }
}
