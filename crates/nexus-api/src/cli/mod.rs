//! CLI command definitions and dispatch for the `nexus` binary.
//!
//! Uses clap derive macros for argument parsing. The CLI follows a verb-noun
//! pattern (e.g., `nexus create bot`, `nexus list sessions`).

pub mod key;
pub mod roster;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Run briefs through teams of bots.
#[derive(Parser)]
#[command(name = "nexus", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// User that owns created bots, teams, and keys.
    #[arg(long, global = true, env = "NEXUS_USER", default_value = "local")]
    pub user: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new resource.
    Create {
        #[command(subcommand)]
        resource: CreateResource,
    },

    /// List resources.
    #[command(alias = "ls")]
    List {
        #[command(subcommand)]
        resource: ListResource,
    },

    /// Manage team membership.
    Team {
        #[command(subcommand)]
        action: TeamCommand,
    },

    /// Manage REST API keys.
    Key {
        #[command(subcommand)]
        action: KeyCommand,
    },

    /// Start the REST API server.
    Serve {
        /// Port to listen on (defaults to `server.port` in config.toml).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (defaults to `server.host` in config.toml).
        #[arg(long)]
        host: Option<String>,

        /// Export spans to stdout through OpenTelemetry.
        #[arg(long)]
        otel: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum CreateResource {
    /// Create a new bot.
    Bot {
        /// Display name.
        #[arg(long)]
        name: String,

        /// Model identifier (defaults to `provider.default_model`).
        #[arg(long)]
        model: Option<String>,

        /// Short description.
        #[arg(long, short)]
        description: Option<String>,

        /// System prompt sent before every task.
        #[arg(long)]
        system_prompt: Option<String>,

        /// Sampling temperature, 0.0 to 2.0.
        #[arg(long)]
        temperature: Option<f64>,

        /// Output token cap per call.
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Role label shown in team listings.
        #[arg(long)]
        role: Option<String>,
    },

    /// Create a new team.
    Team {
        /// Display name.
        #[arg(long)]
        name: String,

        /// Short description.
        #[arg(long, short)]
        description: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ListResource {
    /// List your bots.
    Bots,

    /// List your sessions for a team, newest first.
    Sessions {
        /// Team ID.
        team_id: String,
    },
}

#[derive(Subcommand)]
pub enum TeamCommand {
    /// Add a bot to a team.
    #[command(name = "add-bot")]
    AddBot {
        /// Team ID.
        team_id: String,

        /// Bot ID.
        bot_id: String,
    },

    /// Remove a bot from a team. The bot itself is kept.
    #[command(name = "remove-bot")]
    RemoveBot {
        /// Team ID.
        team_id: String,

        /// Bot ID.
        bot_id: String,
    },
}

#[derive(Subcommand)]
pub enum KeyCommand {
    /// Create an API key for the user given by `--user`.
    Create {
        /// Label stored with the key.
        #[arg(long, default_value = "default")]
        name: String,
    },
}
