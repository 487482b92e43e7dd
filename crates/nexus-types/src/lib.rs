//! Shared domain types for Nexus.
//!
//! This crate contains the domain types used across the Nexus platform:
//! bots, teams, team collaboration sessions, LLM request/response shapes,
//! global configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod bot;
pub mod config;
pub mod error;
pub mod llm;
pub mod session;
