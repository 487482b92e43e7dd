//! API key authentication extractor.
//!
//! Extracts and verifies API keys from:
//! - `Authorization: Bearer <key>` header
//! - `X-API-Key: <key>` header
//!
//! Keys are SHA-256 hashed and compared against the `api_keys` table. The
//! matching row names the user the request acts for.

use aes_gcm::aead::{OsRng, rand_core::RngCore};
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use sha2::{Digest, Sha256};
use sqlx::Row;

use nexus_infra::sqlite::pool::DatabasePool;

use crate::http::error::AppError;
use crate::state::AppState;

/// Prefix on every generated key, so keys are recognizable in configs and logs.
pub const API_KEY_PREFIX: &str = "nexus_";

/// The user an authenticated request acts for.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user_id: String,
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let api_key = extract_api_key(&parts.headers)?;
        let key_hash = hash_api_key(&api_key);

        let row = sqlx::query("SELECT id, user_id FROM api_keys WHERE key_hash = ?")
            .bind(&key_hash)
            .fetch_optional(&state.db_pool.reader)
            .await
            .map_err(|e| AppError::Internal(format!("Database error: {e}")))?;

        let Some(row) = row else {
            return Err(AppError::Unauthorized(
                "Invalid API key. Provide a valid key via 'Authorization: Bearer <key>' or 'X-API-Key: <key>' header.".to_string(),
            ));
        };

        // Best effort: a failed timestamp update never fails the request.
        let id: String = row.get("id");
        let now = chrono::Utc::now().to_rfc3339();
        if let Err(e) = sqlx::query("UPDATE api_keys SET last_used_at = ? WHERE id = ?")
            .bind(&now)
            .bind(&id)
            .execute(&state.db_pool.writer)
            .await
        {
            tracing::debug!(error = %e, "failed to record api key use");
        }

        Ok(Authenticated {
            user_id: row.get("user_id"),
        })
    }
}

/// Extract the API key from request headers.
fn extract_api_key(headers: &HeaderMap) -> Result<String, AppError> {
    if let Some(auth) = headers.get("authorization") {
        let auth_str = auth.to_str().map_err(|_| {
            AppError::Unauthorized("Invalid Authorization header encoding".to_string())
        })?;
        if let Some(key) = auth_str.strip_prefix("Bearer ") {
            return Ok(key.trim().to_string());
        }
    }

    if let Some(key) = headers.get("x-api-key") {
        let key_str = key.to_str().map_err(|_| {
            AppError::Unauthorized("Invalid X-API-Key header encoding".to_string())
        })?;
        return Ok(key_str.trim().to_string());
    }

    Err(AppError::Unauthorized(
        "Missing API key. Provide via 'Authorization: Bearer <key>' or 'X-API-Key: <key>' header.".to_string(),
    ))
}

/// Compute SHA-256 hash of an API key (lowercase hex).
pub fn hash_api_key(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    format!("{:x}", digest)
}

/// Generate a new API key for `user_id` and store its hash.
///
/// Returns the plaintext key; only the hash is kept, so it cannot be shown again.
pub async fn create_api_key(
    pool: &DatabasePool,
    user_id: &str,
    name: &str,
) -> anyhow::Result<String> {
    let mut key_bytes = [0u8; 32];
    OsRng.fill_bytes(&mut key_bytes);
    let plaintext_key = format!(
        "{API_KEY_PREFIX}{}",
        key_bytes.iter().map(|b| format!("{b:02x}")).collect::<String>()
    );

    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO api_keys (id, user_id, key_hash, name, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(user_id)
    .bind(hash_api_key(&plaintext_key))
    .bind(name)
    .bind(&now)
    .execute(&pool.writer)
    .await?;

    tracing::info!(user_id, name, "created api key");
    Ok(plaintext_key)
}

/// Create a first key for `user_id` when the table is empty.
///
/// Returns `None` when any key already exists.
pub async fn ensure_api_key(pool: &DatabasePool, user_id: &str) -> anyhow::Result<Option<String>> {
    let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM api_keys LIMIT 1")
        .fetch_optional(&pool.reader)
        .await?;
    if existing.is_some() {
        return Ok(None);
    }
    Ok(Some(create_api_key(pool, user_id, "default").await?))
}
