//! Infrastructure layer for Nexus.
//!
//! Contains implementations of the traits defined in `nexus-core`: SQLite
//! repositories for sessions and the bot/team roster, and an
//! OpenAI-compatible completion provider. Also loads `config.toml`.

pub mod config;
pub mod llm;
pub mod sqlite;
