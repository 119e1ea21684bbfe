use std::str::FromStr;

use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::{format_time, parse_time};
use crate::db::DatabaseError;
use crate::models::enums::MedicineColor;
use crate::models::Medicine;

const MEDICINE_COLUMNS: &str = "id, user_id, name, dosage, morning, morning_time,
     afternoon, afternoon_time, night, night_time, before_food,
     days_remaining, start_date, color";

pub fn insert_medicine(conn: &Connection, med: &Medicine) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medicines (id, user_id, name, dosage, morning, morning_time,
         afternoon, afternoon_time, night, night_time, before_food,
         days_remaining, start_date, color)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            med.id.to_string(),
            med.user_id.to_string(),
            med.name,
            med.dosage,
            med.morning as i32,
            med.morning_time.as_ref().map(format_time),
            med.afternoon as i32,
            med.afternoon_time.as_ref().map(format_time),
            med.night as i32,
            med.night_time.as_ref().map(format_time),
            med.before_food as i32,
            med.days_remaining,
            med.start_date.to_string(),
            med.color.as_str(),
        ],
    )?;
    Ok(())
}

pub fn get_medicine(conn: &Connection, id: &Uuid) -> Result<Option<Medicine>, DatabaseError> {
    let result = conn.query_row(
        &format!("SELECT {MEDICINE_COLUMNS} FROM medicines WHERE id = ?1"),
        params![id.to_string()],
        medicine_row,
    );
    match result {
        Ok(med) => Ok(Some(med)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DatabaseError::from(e)),
    }
}

/// All medicines owned by `user_id`, newest start date first.
pub fn list_medicines(conn: &Connection, user_id: &Uuid) -> Result<Vec<Medicine>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MEDICINE_COLUMNS} FROM medicines
         WHERE user_id = ?1
         ORDER BY start_date DESC, name ASC"
    ))?;
    let rows = stmt
        .query_map(params![user_id.to_string()], medicine_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Medicines with supply left, across all owners — rollover input.
pub fn list_medicines_with_supply(conn: &Connection) -> Result<Vec<Medicine>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MEDICINE_COLUMNS} FROM medicines WHERE days_remaining > 0"
    ))?;
    let rows = stmt
        .query_map([], medicine_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Delete a medicine; dose logs cascade with it.
/// Returns whether a row was removed.
pub fn delete_medicine(
    conn: &Connection,
    user_id: &Uuid,
    id: &Uuid,
) -> Result<bool, DatabaseError> {
    let affected = conn.execute(
        "DELETE FROM medicines WHERE id = ?1 AND user_id = ?2",
        params![id.to_string(), user_id.to_string()],
    )?;
    Ok(affected > 0)
}

/// Decrement the remaining-days counter, flooring at zero.
pub fn decrement_days_remaining(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE medicines SET days_remaining = MAX(days_remaining - 1, 0) WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(())
}

fn medicine_row(row: &Row) -> rusqlite::Result<Medicine> {
    Ok(Medicine {
        id: row
            .get::<_, String>(0)?
            .parse()
            .unwrap_or_else(|_| Uuid::nil()),
        user_id: row
            .get::<_, String>(1)?
            .parse()
            .unwrap_or_else(|_| Uuid::nil()),
        name: row.get(2)?,
        dosage: row.get(3)?,
        morning: row.get::<_, i32>(4)? != 0,
        morning_time: row
            .get::<_, Option<String>>(5)?
            .and_then(|s| parse_time(&s)),
        afternoon: row.get::<_, i32>(6)? != 0,
        afternoon_time: row
            .get::<_, Option<String>>(7)?
            .and_then(|s| parse_time(&s)),
        night: row.get::<_, i32>(8)? != 0,
        night_time: row
            .get::<_, Option<String>>(9)?
            .and_then(|s| parse_time(&s)),
        before_food: row.get::<_, i32>(10)? != 0,
        days_remaining: row.get(11)?,
        start_date: chrono::NaiveDate::parse_from_str(&row.get::<_, String>(12)?, "%Y-%m-%d")
            .unwrap_or_default(),
        color: MedicineColor::from_str(&row.get::<_, String>(13)?)
            .unwrap_or(MedicineColor::Primary),
    })
}
