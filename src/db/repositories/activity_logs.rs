use anyhow::{anyhow, Context, Result};
use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Row};
use uuid::Uuid;

use crate::db::{
    helpers::{decode_image_urls, encode_image_urls, parse_category, parse_datetime, parse_status},
    models::{ActivityLog, DeliveryStatus, NewActivityLog},
    Database,
};

fn row_to_log(row: &Row) -> Result<ActivityLog> {
    let category: String = row.get("category")?;
    let created_at: String = row.get("created_at")?;
    let image_urls: String = row.get("image_urls")?;
    let status: String = row.get("status")?;

    Ok(ActivityLog {
        id: row.get("id")?,
        resident_id: row.get("resident_id")?,
        resident_name: row.get("resident_name")?,
        staff_name: row.get("staff_name")?,
        category: parse_category(&category)?,
        timestamp: parse_datetime(&created_at, "created_at")?,
        notes: row.get("notes")?,
        image_urls: decode_image_urls(&image_urls)?,
        status: parse_status(&status)?,
        ai_generated_message: row.get("ai_generated_message")?,
    })
}

impl Database {
    /// Every log, newest first
    pub async fn list_logs(&self) -> Result<Vec<ActivityLog>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, resident_id, resident_name, staff_name, category, notes, image_urls,
                        status, ai_generated_message, created_at
                 FROM activity_logs
                 ORDER BY created_at DESC, rowid DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut logs = Vec::new();
            while let Some(row) = rows.next()? {
                logs.push(row_to_log(row)?);
            }

            Ok(logs)
        })
        .await
    }

    /// Insert a log in the `PENDING` state
    pub async fn create_log(&self, new_log: NewActivityLog) -> Result<ActivityLog> {
        let log = new_log.into_log(Uuid::new_v4().to_string(), Utc::now());
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO activity_logs (id, resident_id, resident_name, staff_name, category, notes,
                                            image_urls, status, ai_generated_message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    log.id,
                    log.resident_id,
                    log.resident_name,
                    log.staff_name,
                    log.category.as_str(),
                    log.notes,
                    encode_image_urls(&log.image_urls)?,
                    log.status.as_str(),
                    log.ai_generated_message,
                    log.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
                ],
            )
            .with_context(|| "failed to insert activity log")?;
            Ok(log)
        })
        .await
    }

    pub async fn set_log_status(&self, log_id: &str, status: DeliveryStatus) -> Result<()> {
        let log_id = log_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE activity_logs SET status = ?1 WHERE id = ?2",
                params![status.as_str(), log_id],
            )?;
            if rows_affected == 0 {
                return Err(anyhow!("Activity log {log_id} not found"));
            }
            Ok(())
        })
        .await
    }
}
