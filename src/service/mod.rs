//! Service integrations for external APIs and clients.
//!
//! This module contains implementations for the collaborators the message processor relies on:
//! - Chat services (e.g., Slack)
//! - Answer chains (e.g., OpenAI with hosted file search)
//! - History stores (e.g., SurrealDB)
//! - Secrets providers (e.g., AWS Secrets Manager)
//!
//! Each service module defines both generic traits and concrete implementations,
//! allowing for extensibility and easy testing.

pub mod chain;
pub mod chat;
pub mod history;
pub mod secrets;
