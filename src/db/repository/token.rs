use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;

/// Store a bearer token hash for an owner. The plaintext token is
/// returned to the client once and never persisted.
pub fn insert_api_token(
    conn: &Connection,
    user_id: &Uuid,
    token_hash: &str,
    label: Option<&str>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO api_tokens (token_hash, user_id, label) VALUES (?1, ?2, ?3)",
        params![token_hash, user_id.to_string(), label],
    )?;
    Ok(())
}

/// Resolve a token hash to its owner. Returns (user_id, profile name).
pub fn lookup_token_owner(
    conn: &Connection,
    token_hash: &str,
) -> Result<Option<(Uuid, String)>, DatabaseError> {
    let result = conn.query_row(
        "SELECT t.user_id, p.name
         FROM api_tokens t
         INNER JOIN profiles p ON p.user_id = t.user_id
         WHERE t.token_hash = ?1",
        params![token_hash],
        |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            Ok((id, name))
        },
    );
    match result {
        Ok((id, name)) => Ok(id.parse().ok().map(|uuid| (uuid, name))),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DatabaseError::from(e)),
    }
}
