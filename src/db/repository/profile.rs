use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Profile, ProfileUpdate};

const PROFILE_COLUMNS: &str =
    "user_id, name, age, gender, caretaker_email, adherence_score";

pub fn insert_profile(conn: &Connection, profile: &Profile) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO profiles (user_id, name, age, gender, caretaker_email, adherence_score)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            profile.user_id.to_string(),
            profile.name,
            profile.age,
            profile.gender,
            profile.caretaker_email,
            profile.adherence_score,
        ],
    )?;
    Ok(())
}

pub fn get_profile(conn: &Connection, user_id: &Uuid) -> Result<Option<Profile>, DatabaseError> {
    let result = conn.query_row(
        &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1"),
        params![user_id.to_string()],
        profile_row,
    );
    match result {
        Ok(p) => Ok(Some(p)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DatabaseError::from(e)),
    }
}

pub fn update_profile(
    conn: &Connection,
    user_id: &Uuid,
    update: &ProfileUpdate,
) -> Result<bool, DatabaseError> {
    let affected = conn.execute(
        "UPDATE profiles SET name = ?2, age = ?3, gender = ?4, caretaker_email = ?5
         WHERE user_id = ?1",
        params![
            user_id.to_string(),
            update.name,
            update.age,
            update.gender,
            update.caretaker_email,
        ],
    )?;
    Ok(affected > 0)
}

/// Refresh the cached adherence snapshot.
pub fn update_adherence_snapshot(
    conn: &Connection,
    user_id: &Uuid,
    score: u8,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE profiles SET adherence_score = ?2 WHERE user_id = ?1",
        params![user_id.to_string(), score],
    )?;
    Ok(())
}

/// Every owner id — rollover iterates these.
pub fn list_user_ids(conn: &Connection) -> Result<Vec<Uuid>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT user_id FROM profiles")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows
        .into_iter()
        .filter_map(|s| s.parse().ok())
        .collect())
}

fn profile_row(row: &Row) -> rusqlite::Result<Profile> {
    Ok(Profile {
        user_id: row
            .get::<_, String>(0)?
            .parse()
            .unwrap_or_else(|_| Uuid::nil()),
        name: row.get(1)?,
        age: row.get(2)?,
        gender: row.get(3)?,
        caretaker_email: row.get(4)?,
        adherence_score: row.get::<_, i64>(5)?.clamp(0, 100) as u8,
    })
}
