//! API request handlers.

/// Single-turn chat handler.
pub mod chat;
/// Health check handler.
pub mod health;
/// Workflow execution and inspection handlers.
pub mod workflows;
