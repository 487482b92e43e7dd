//! RosterRepository trait definition.
//!
//! Bots, teams, and team membership. Collaboration sessions only read from
//! the roster; the write methods back the CLI's roster management.

use nexus_types::bot::{Bot, BotId, Team, TeamId};
use nexus_types::error::RepositoryError;

/// Repository trait for bot and team records.
pub trait RosterRepository: Send + Sync {
    /// Create a new bot. Returns the created bot.
    fn create_bot(
        &self,
        bot: &Bot,
    ) -> impl std::future::Future<Output = Result<Bot, RepositoryError>> + Send;

    /// Get a bot by its unique ID.
    fn get_bot(
        &self,
        id: &BotId,
    ) -> impl std::future::Future<Output = Result<Option<Bot>, RepositoryError>> + Send;

    /// Bots owned by a user, oldest first.
    fn list_bots(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Bot>, RepositoryError>> + Send;

    /// Create a new team. Returns the created team.
    fn create_team(
        &self,
        team: &Team,
    ) -> impl std::future::Future<Output = Result<Team, RepositoryError>> + Send;

    /// Get a team by its unique ID.
    fn get_team(
        &self,
        id: &TeamId,
    ) -> impl std::future::Future<Output = Result<Option<Team>, RepositoryError>> + Send;

    /// Add a bot to a team. Adding an existing member is a `Conflict`.
    fn add_team_member(
        &self,
        team_id: &TeamId,
        bot_id: &BotId,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Remove a bot from a team. Removing a non-member is `NotFound`.
    fn remove_team_member(
        &self,
        team_id: &TeamId,
        bot_id: &BotId,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Current members of a team, in the order they joined.
    fn get_team_bots(
        &self,
        team_id: &TeamId,
    ) -> impl std::future::Future<Output = Result<Vec<Bot>, RepositoryError>> + Send;
}
