//! SessionRepository trait definition.

use nexus_types::bot::TeamId;
use nexus_types::error::RepositoryError;
use nexus_types::session::{SessionId, TeamSession};

/// Repository trait for collaboration session persistence.
///
/// Implementations live in nexus-infra (e.g., `SqliteSessionRepository`).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait SessionRepository: Send + Sync {
    /// Insert a new session. Returns the stored session.
    fn create(
        &self,
        session: &TeamSession,
    ) -> impl std::future::Future<Output = Result<TeamSession, RepositoryError>> + Send;

    /// Get a session by its unique ID.
    fn get(
        &self,
        id: &SessionId,
    ) -> impl std::future::Future<Output = Result<Option<TeamSession>, RepositoryError>> + Send;

    /// Overwrite a session, guarded by its version.
    ///
    /// The write only applies if the stored version still equals
    /// `expected_version`; the stored record gets `expected_version + 1` and
    /// is returned. A stale version yields `RepositoryError::Conflict`, a
    /// missing row `RepositoryError::NotFound`.
    fn save(
        &self,
        session: &TeamSession,
        expected_version: i64,
    ) -> impl std::future::Future<Output = Result<TeamSession, RepositoryError>> + Send;

    /// All sessions for a team, newest first.
    fn list_by_team(
        &self,
        team_id: &TeamId,
    ) -> impl std::future::Future<Output = Result<Vec<TeamSession>, RepositoryError>> + Send;

    /// Permanently delete a session.
    fn delete(
        &self,
        id: &SessionId,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
