//! SQLite roster repository implementation.
//!
//! Implements `RosterRepository` from `nexus-core` over the `bots`,
//! `teams`, and `team_members` tables.

use nexus_core::repository::roster::RosterRepository;
use nexus_types::bot::{Bot, BotId, Team, TeamId};
use nexus_types::error::RepositoryError;
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, query_error};

/// SQLite-backed implementation of `RosterRepository`.
pub struct SqliteRosterRepository {
    pool: DatabasePool,
}

impl SqliteRosterRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain Bot.
struct BotRow {
    id: String,
    user_id: String,
    name: String,
    description: Option<String>,
    model: String,
    system_prompt: Option<String>,
    temperature: f64,
    max_tokens: i64,
    role: Option<String>,
    created_at: String,
    updated_at: String,
}

impl BotRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            model: row.try_get("model")?,
            system_prompt: row.try_get("system_prompt")?,
            temperature: row.try_get("temperature")?,
            max_tokens: row.try_get("max_tokens")?,
            role: row.try_get("role")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_bot(self) -> Result<Bot, RepositoryError> {
        let id = self
            .id
            .parse::<BotId>()
            .map_err(|e| RepositoryError::Query(format!("invalid bot id: {e}")))?;
        let max_tokens = u32::try_from(self.max_tokens)
            .map_err(|_| RepositoryError::Query(format!("invalid max_tokens: {}", self.max_tokens)))?;

        Ok(Bot {
            id,
            user_id: self.user_id,
            name: self.name,
            description: self.description,
            model: self.model,
            system_prompt: self.system_prompt,
            temperature: self.temperature,
            max_tokens,
            role: self.role,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn team_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Team, RepositoryError> {
    let id: String = row.try_get("id").map_err(query_error)?;
    let created_at: String = row.try_get("created_at").map_err(query_error)?;
    let updated_at: String = row.try_get("updated_at").map_err(query_error)?;

    Ok(Team {
        id: id
            .parse::<TeamId>()
            .map_err(|e| RepositoryError::Query(format!("invalid team id: {e}")))?,
        user_id: row.try_get("user_id").map_err(query_error)?,
        name: row.try_get("name").map_err(query_error)?,
        description: row.try_get("description").map_err(query_error)?,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

fn bots_from_rows(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<Bot>, RepositoryError> {
    let mut bots = Vec::with_capacity(rows.len());
    for row in rows {
        let bot_row = BotRow::from_row(row).map_err(query_error)?;
        bots.push(bot_row.into_bot()?);
    }
    Ok(bots)
}

impl RosterRepository for SqliteRosterRepository {
    async fn create_bot(&self, bot: &Bot) -> Result<Bot, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO bots (id, user_id, name, description, model, system_prompt, temperature, max_tokens, role, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(bot.id.to_string())
        .bind(&bot.user_id)
        .bind(&bot.name)
        .bind(&bot.description)
        .bind(&bot.model)
        .bind(&bot.system_prompt)
        .bind(bot.temperature)
        .bind(i64::from(bot.max_tokens))
        .bind(&bot.role)
        .bind(format_datetime(&bot.created_at))
        .bind(format_datetime(&bot.updated_at))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(bot.clone()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => Err(
                RepositoryError::Conflict(format!("bot '{}' already exists", bot.id)),
            ),
            Err(e) => Err(query_error(e)),
        }
    }

    async fn get_bot(&self, id: &BotId) -> Result<Option<Bot>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM bots WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => {
                let bot_row = BotRow::from_row(&row).map_err(query_error)?;
                Ok(Some(bot_row.into_bot()?))
            }
            None => Ok(None),
        }
    }

    async fn list_bots(&self, user_id: &str) -> Result<Vec<Bot>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM bots WHERE user_id = ? ORDER BY created_at ASC, id ASC")
            .bind(user_id)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;
        bots_from_rows(&rows)
    }

    async fn create_team(&self, team: &Team) -> Result<Team, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO teams (id, user_id, name, description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(team.id.to_string())
        .bind(&team.user_id)
        .bind(&team.name)
        .bind(&team.description)
        .bind(format_datetime(&team.created_at))
        .bind(format_datetime(&team.updated_at))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(team.clone()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => Err(
                RepositoryError::Conflict(format!("team '{}' already exists", team.id)),
            ),
            Err(e) => Err(query_error(e)),
        }
    }

    async fn get_team(&self, id: &TeamId) -> Result<Option<Team>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM teams WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        row.as_ref().map(team_from_row).transpose()
    }

    async fn add_team_member(&self, team_id: &TeamId, bot_id: &BotId) -> Result<(), RepositoryError> {
        let result = sqlx::query("INSERT INTO team_members (team_id, bot_id, created_at) VALUES (?, ?, ?)")
            .bind(team_id.to_string())
            .bind(bot_id.to_string())
            .bind(format_datetime(&chrono::Utc::now()))
            .execute(&self.pool.writer)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => Err(
                RepositoryError::Conflict(format!("bot '{bot_id}' is already in team '{team_id}'")),
            ),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("FOREIGN KEY") => {
                Err(RepositoryError::NotFound)
            }
            Err(e) => Err(query_error(e)),
        }
    }

    async fn remove_team_member(&self, team_id: &TeamId, bot_id: &BotId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM team_members WHERE team_id = ? AND bot_id = ?")
            .bind(team_id.to_string())
            .bind(bot_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn get_team_bots(&self, team_id: &TeamId) -> Result<Vec<Bot>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT b.* FROM team_members m
             JOIN bots b ON b.id = m.bot_id
             WHERE m.team_id = ?
             ORDER BY m.seq ASC",
        )
        .bind(team_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;
        bots_from_rows(&rows)
    }
}
