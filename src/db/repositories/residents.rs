use anyhow::{anyhow, bail, Context, Result};
use chrono::{SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{
    models::{Resident, ResidentInput, ResidentUpdate},
    Database,
};

const RESIDENT_COLUMNS: &str = "id, name, room_number, whatsapp_group_id, notes, photo_url";

fn row_to_resident(row: &Row) -> rusqlite::Result<Resident> {
    Ok(Resident {
        id: row.get("id")?,
        name: row.get("name")?,
        room_number: row.get("room_number")?,
        whatsapp_group_id: row.get("whatsapp_group_id")?,
        notes: row.get("notes")?,
        photo_url: row.get("photo_url")?,
    })
}

impl Database {
    /// All residents, alphabetical by name
    pub async fn list_residents(&self) -> Result<Vec<Resident>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RESIDENT_COLUMNS} FROM residents ORDER BY name COLLATE NOCASE ASC"
            ))?;

            let mut rows = stmt.query([])?;
            let mut residents = Vec::new();
            while let Some(row) = rows.next()? {
                residents.push(row_to_resident(row)?);
            }

            Ok(residents)
        })
        .await
    }

    pub async fn get_resident(&self, resident_id: &str) -> Result<Option<Resident>> {
        let resident_id = resident_id.to_string();
        self.execute(move |conn| {
            let resident = conn
                .query_row(
                    &format!("SELECT {RESIDENT_COLUMNS} FROM residents WHERE id = ?1"),
                    params![resident_id],
                    row_to_resident,
                )
                .optional()?;
            Ok(resident)
        })
        .await
    }

    pub async fn create_resident(&self, input: ResidentInput) -> Result<Resident> {
        let resident = input.into_resident(Uuid::new_v4().to_string());
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO residents (id, name, room_number, whatsapp_group_id, notes, photo_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    resident.id,
                    resident.name,
                    resident.room_number,
                    resident.whatsapp_group_id,
                    resident.notes,
                    resident.photo_url,
                    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
                ],
            )
            .with_context(|| "failed to insert resident")?;
            Ok(resident)
        })
        .await
    }

    /// Apply a partial update and return the stored record
    pub async fn update_resident(&self, resident_id: &str, update: ResidentUpdate) -> Result<Resident> {
        if update.is_empty() {
            bail!("No fields to update");
        }

        let resident_id = resident_id.to_string();
        self.execute(move |conn| {
            let mut resident = conn
                .query_row(
                    &format!("SELECT {RESIDENT_COLUMNS} FROM residents WHERE id = ?1"),
                    params![resident_id],
                    row_to_resident,
                )
                .optional()?
                .ok_or_else(|| anyhow!("Resident {resident_id} not found"))?;

            update.apply_to(&mut resident);

            conn.execute(
                "UPDATE residents
                 SET name = ?1,
                     room_number = ?2,
                     whatsapp_group_id = ?3,
                     notes = ?4,
                     photo_url = ?5
                 WHERE id = ?6",
                params![
                    resident.name,
                    resident.room_number,
                    resident.whatsapp_group_id,
                    resident.notes,
                    resident.photo_url,
                    resident.id,
                ],
            )
            .with_context(|| "failed to update resident")?;

            Ok(resident)
        })
        .await
    }

    /// Delete a resident together with every log written for them
    pub async fn delete_resident(&self, resident_id: &str) -> Result<()> {
        let resident_id = resident_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            // Logs first, so the cascade does not depend on the foreign_keys pragma.
            tx.execute(
                "DELETE FROM activity_logs WHERE resident_id = ?1",
                params![resident_id],
            )
            .with_context(|| "failed to clean up resident logs")?;

            let rows_affected = tx.execute("DELETE FROM residents WHERE id = ?1", params![resident_id])?;
            if rows_affected == 0 {
                return Err(anyhow!("Resident {resident_id} not found"));
            }

            tx.commit()?;
            Ok(())
        })
        .await
    }
}
