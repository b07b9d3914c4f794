//! User and API-token rows.
//!
//! Credential issuance lives outside this service; these functions are the
//! storage half of the authentication collaborator: a hashed bearer token
//! resolves to exactly one user id, or to nothing.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;

/// Insert a user row and return its id.
pub fn insert_user(conn: &Connection, email: &str) -> Result<Uuid, DatabaseError> {
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO users (id, email, created_at) VALUES (?1, ?2, ?3)",
        params![id.to_string(), email, Utc::now().to_rfc3339()],
    )?;
    Ok(id)
}

/// Register a hashed bearer token for a user.
pub fn insert_token(
    conn: &Connection,
    token_hash: &[u8; 32],
    user_id: Uuid,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO api_tokens (token_hash, user_id, created_at) VALUES (?1, ?2, ?3)",
        params![token_hash.as_slice(), user_id.to_string(), Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// Resolve a hashed bearer token to the owning user, if any.
pub fn user_for_token(
    conn: &Connection,
    token_hash: &[u8; 32],
) -> Result<Option<Uuid>, DatabaseError> {
    let id: Option<String> = conn
        .query_row(
            "SELECT user_id FROM api_tokens WHERE token_hash = ?1",
            params![token_hash.as_slice()],
            |row| row.get(0),
        )
        .optional()?;

    match id {
        None => Ok(None),
        Some(s) => Uuid::parse_str(&s)
            .map(Some)
            .map_err(|e| DatabaseError::CorruptRow(format!("user id: {e}"))),
    }
}
