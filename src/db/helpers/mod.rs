use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::db::models::DeliveryStatus;
use crate::models::UpdateCategory;

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_status(value: &str) -> Result<DeliveryStatus> {
    match value {
        "PENDING" => Ok(DeliveryStatus::Pending),
        "SENT" => Ok(DeliveryStatus::Sent),
        "FAILED" => Ok(DeliveryStatus::Failed),
        other => Err(anyhow!("unknown delivery status {other}")),
    }
}

pub fn parse_category(value: &str) -> Result<UpdateCategory> {
    value
        .parse()
        .with_context(|| format!("invalid category column value '{value}'"))
}

pub fn encode_image_urls(urls: &[String]) -> Result<String> {
    serde_json::to_string(urls).context("failed to encode image_urls")
}

pub fn decode_image_urls(raw: &str) -> Result<Vec<String>> {
    serde_json::from_str(raw).context("failed to decode image_urls")
}
