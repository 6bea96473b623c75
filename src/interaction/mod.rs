//! Event handling for slack-rag-bot.
//!
//! This module turns queued chat events into thread replies:
//! - Decoding queue records into chat messages
//! - Reading and extending the thread's conversation history
//! - Coordinating the chain, history store, and chat platform for one event

pub mod queue_message;
