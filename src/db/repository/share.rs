use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::{format_datetime, parse_datetime};
use crate::db::DatabaseError;
use crate::models::CaretakerShare;

const SHARE_COLUMNS: &str = "id, patient_user_id, share_token, is_active, created_at";

pub fn insert_share(conn: &Connection, share: &CaretakerShare) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO caretaker_shares (id, patient_user_id, share_token, is_active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            share.id.to_string(),
            share.patient_user_id.to_string(),
            share.share_token,
            share.is_active as i32,
            format_datetime(&share.created_at),
        ],
    )?;
    Ok(())
}

/// Look up a share by its token — the caretaker view's only credential.
pub fn get_share_by_token(
    conn: &Connection,
    token: &str,
) -> Result<Option<CaretakerShare>, DatabaseError> {
    let result = conn.query_row(
        &format!("SELECT {SHARE_COLUMNS} FROM caretaker_shares WHERE share_token = ?1"),
        params![token],
        share_row,
    );
    match result {
        Ok(s) => Ok(Some(s)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DatabaseError::from(e)),
    }
}

pub fn list_shares(
    conn: &Connection,
    patient_user_id: &Uuid,
) -> Result<Vec<CaretakerShare>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SHARE_COLUMNS} FROM caretaker_shares
         WHERE patient_user_id = ?1 ORDER BY created_at DESC"
    ))?;
    let rows = stmt
        .query_map(params![patient_user_id.to_string()], share_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Deactivate a share. Only the owning patient can revoke; returns
/// whether a row changed.
pub fn revoke_share(
    conn: &Connection,
    patient_user_id: &Uuid,
    share_id: &Uuid,
) -> Result<bool, DatabaseError> {
    let affected = conn.execute(
        "UPDATE caretaker_shares SET is_active = 0
         WHERE id = ?1 AND patient_user_id = ?2",
        params![share_id.to_string(), patient_user_id.to_string()],
    )?;
    Ok(affected > 0)
}

fn share_row(row: &Row) -> rusqlite::Result<CaretakerShare> {
    Ok(CaretakerShare {
        id: row
            .get::<_, String>(0)?
            .parse()
            .unwrap_or_else(|_| Uuid::nil()),
        patient_user_id: row
            .get::<_, String>(1)?
            .parse()
            .unwrap_or_else(|_| Uuid::nil()),
        share_token: row.get(2)?,
        is_active: row.get::<_, i32>(3)? != 0,
        created_at: row
            .get::<_, String>(4)
            .map(|s| parse_datetime(&s).unwrap_or(NaiveDateTime::default()))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::insert_profile;
    use crate::db::sqlite::open_memory_database;
    use crate::models::Profile;

    fn seed_patient(conn: &Connection) -> Uuid {
        let user_id = Uuid::new_v4();
        insert_profile(
            conn,
            &Profile {
                user_id,
                name: "Priya".into(),
                age: None,
                gender: None,
                caretaker_email: None,
                adherence_score: 100,
            },
        )
        .unwrap();
        user_id
    }

    fn new_share(patient: Uuid, token: &str) -> CaretakerShare {
        CaretakerShare {
            id: Uuid::new_v4(),
            patient_user_id: patient,
            share_token: token.into(),
            is_active: true,
            created_at: chrono::NaiveDate::from_ymd_opt(2025, 3, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn token_lookup_round_trip() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn);
        insert_share(&conn, &new_share(patient, "tok-abc")).unwrap();

        let found = get_share_by_token(&conn, "tok-abc").unwrap().unwrap();
        assert_eq!(found.patient_user_id, patient);
        assert!(found.is_active);
        assert!(get_share_by_token(&conn, "tok-missing").unwrap().is_none());
    }

    #[test]
    fn revoke_flips_active_flag() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn);
        let share = new_share(patient, "tok-abc");
        insert_share(&conn, &share).unwrap();

        assert!(revoke_share(&conn, &patient, &share.id).unwrap());
        let found = get_share_by_token(&conn, "tok-abc").unwrap().unwrap();
        assert!(!found.is_active);
    }

    #[test]
    fn revoke_requires_owning_patient() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn);
        let other = seed_patient(&conn);
        let share = new_share(patient, "tok-abc");
        insert_share(&conn, &share).unwrap();

        assert!(!revoke_share(&conn, &other, &share.id).unwrap());
        assert!(get_share_by_token(&conn, "tok-abc").unwrap().unwrap().is_active);
    }

    #[test]
    fn duplicate_token_rejected() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn);
        insert_share(&conn, &new_share(patient, "tok-abc")).unwrap();
        assert!(insert_share(&conn, &new_share(patient, "tok-abc")).is_err());
    }

    #[test]
    fn listing_scoped_to_patient() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn);
        let other = seed_patient(&conn);
        insert_share(&conn, &new_share(patient, "tok-1")).unwrap();
        insert_share(&conn, &new_share(other, "tok-2")).unwrap();

        let shares = list_shares(&conn, &patient).unwrap();
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].share_token, "tok-1");
    }
}
