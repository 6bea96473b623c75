//! Core components, types, and utilities for the slack-rag-bot.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - The error taxonomy for processing queued events.
//! - System prompts for the answer chain.
//! - Logging and tracing setup.
//! - Common types and result handling.

pub mod config;
pub mod error;
pub mod prompts;
pub mod telemetry;
pub mod types;
