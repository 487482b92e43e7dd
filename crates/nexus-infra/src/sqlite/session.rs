//! SQLite session repository implementation.
//!
//! The ordered logs of a session are stored as JSON text columns and
//! validated on read; a column that no longer matches its type is reported
//! as a query error rather than silently dropped.

use nexus_core::repository::session::SessionRepository;
use nexus_types::bot::TeamId;
use nexus_types::error::RepositoryError;
use nexus_types::session::{SessionId, SessionPhase, TeamSession};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, query_error};

/// SQLite-backed implementation of `SessionRepository`.
pub struct SqliteSessionRepository {
    pool: DatabasePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain TeamSession.
struct SessionRow {
    id: String,
    team_id: String,
    user_id: String,
    title: String,
    brief: String,
    phase: String,
    planning_messages: String,
    task_assignments: String,
    execution_outputs: String,
    review_messages: String,
    suggestions: String,
    version: i64,
    created_at: String,
    updated_at: String,
}

impl SessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            team_id: row.try_get("team_id")?,
            user_id: row.try_get("user_id")?,
            title: row.try_get("title")?,
            brief: row.try_get("brief")?,
            phase: row.try_get("phase")?,
            planning_messages: row.try_get("planning_messages")?,
            task_assignments: row.try_get("task_assignments")?,
            execution_outputs: row.try_get("execution_outputs")?,
            review_messages: row.try_get("review_messages")?,
            suggestions: row.try_get("suggestions")?,
            version: row.try_get("version")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_session(self) -> Result<TeamSession, RepositoryError> {
        let id = self
            .id
            .parse::<SessionId>()
            .map_err(|e| RepositoryError::Query(format!("invalid session id: {e}")))?;
        let team_id = self
            .team_id
            .parse::<TeamId>()
            .map_err(|e| RepositoryError::Query(format!("invalid team id: {e}")))?;
        let phase: SessionPhase = self.phase.parse().map_err(RepositoryError::Query)?;

        Ok(TeamSession {
            id,
            team_id,
            user_id: self.user_id,
            title: self.title,
            brief: self.brief,
            phase,
            planning_messages: decode("planning_messages", &self.planning_messages)?,
            task_assignments: decode("task_assignments", &self.task_assignments)?,
            execution_outputs: decode("execution_outputs", &self.execution_outputs)?,
            review_messages: decode("review_messages", &self.review_messages)?,
            suggestions: decode("suggestions", &self.suggestions)?,
            version: self.version,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn decode<T: DeserializeOwned>(column: &str, json: &str) -> Result<T, RepositoryError> {
    serde_json::from_str(json)
        .map_err(|e| RepositoryError::Query(format!("invalid {column} JSON: {e}")))
}

fn encode<T: Serialize>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| RepositoryError::Query(e.to_string()))
}

/// JSON columns of a session, in table order.
struct EncodedLogs {
    planning_messages: String,
    task_assignments: String,
    execution_outputs: String,
    review_messages: String,
    suggestions: String,
}

impl EncodedLogs {
    fn of(session: &TeamSession) -> Result<Self, RepositoryError> {
        Ok(Self {
            planning_messages: encode(&session.planning_messages)?,
            task_assignments: encode(&session.task_assignments)?,
            execution_outputs: encode(&session.execution_outputs)?,
            review_messages: encode(&session.review_messages)?,
            suggestions: encode(&session.suggestions)?,
        })
    }
}

impl SessionRepository for SqliteSessionRepository {
    async fn create(&self, session: &TeamSession) -> Result<TeamSession, RepositoryError> {
        let logs = EncodedLogs::of(session)?;

        let result = sqlx::query(
            "INSERT INTO team_sessions (id, team_id, user_id, title, brief, phase, planning_messages, task_assignments, execution_outputs, review_messages, suggestions, version, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(session.id.to_string())
        .bind(session.team_id.to_string())
        .bind(&session.user_id)
        .bind(&session.title)
        .bind(&session.brief)
        .bind(session.phase.to_string())
        .bind(&logs.planning_messages)
        .bind(&logs.task_assignments)
        .bind(&logs.execution_outputs)
        .bind(&logs.review_messages)
        .bind(&logs.suggestions)
        .bind(session.version)
        .bind(format_datetime(&session.created_at))
        .bind(format_datetime(&session.updated_at))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(session.clone()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => Err(
                RepositoryError::Conflict(format!("session '{}' already exists", session.id)),
            ),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("FOREIGN KEY") => {
                Err(RepositoryError::Query(format!(
                    "team '{}' does not exist",
                    session.team_id
                )))
            }
            Err(e) => Err(query_error(e)),
        }
    }

    async fn get(&self, id: &SessionId) -> Result<Option<TeamSession>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM team_sessions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => {
                let session_row = SessionRow::from_row(&row).map_err(query_error)?;
                Ok(Some(session_row.into_session()?))
            }
            None => Ok(None),
        }
    }

    async fn save(
        &self,
        session: &TeamSession,
        expected_version: i64,
    ) -> Result<TeamSession, RepositoryError> {
        let logs = EncodedLogs::of(session)?;
        let next_version = expected_version + 1;

        // Identity columns (team, owner, brief, created_at) are never rewritten.
        let result = sqlx::query(
            "UPDATE team_sessions SET title = ?, phase = ?, planning_messages = ?, task_assignments = ?, execution_outputs = ?, review_messages = ?, suggestions = ?, version = ?, updated_at = ?
             WHERE id = ? AND version = ?",
        )
        .bind(&session.title)
        .bind(session.phase.to_string())
        .bind(&logs.planning_messages)
        .bind(&logs.task_assignments)
        .bind(&logs.execution_outputs)
        .bind(&logs.review_messages)
        .bind(&logs.suggestions)
        .bind(next_version)
        .bind(format_datetime(&session.updated_at))
        .bind(session.id.to_string())
        .bind(expected_version)
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        if result.rows_affected() == 0 {
            let current: Option<(i64,)> =
                sqlx::query_as("SELECT version FROM team_sessions WHERE id = ?")
                    .bind(session.id.to_string())
                    .fetch_optional(&self.pool.writer)
                    .await
                    .map_err(query_error)?;
            return Err(match current {
                Some((version,)) => RepositoryError::Conflict(format!(
                    "session '{}' is at version {version}, expected {expected_version}",
                    session.id
                )),
                None => RepositoryError::NotFound,
            });
        }

        let mut saved = session.clone();
        saved.version = next_version;
        Ok(saved)
    }

    async fn list_by_team(&self, team_id: &TeamId) -> Result<Vec<TeamSession>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM team_sessions WHERE team_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(team_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in &rows {
            let session_row = SessionRow::from_row(row).map_err(query_error)?;
            sessions.push(session_row.into_session()?);
        }
        Ok(sessions)
    }

    async fn delete(&self, id: &SessionId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM team_sessions WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
