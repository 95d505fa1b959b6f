//! Activity logs: one caregiver update and its delivery state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::UpdateCategory;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "PENDING",
            DeliveryStatus::Sent => "SENT",
            DeliveryStatus::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: String,
    pub resident_id: String,
    pub resident_name: String,
    pub staff_name: String,
    pub category: UpdateCategory,
    pub timestamp: DateTime<Utc>,
    pub notes: String,
    #[serde(default)]
    pub image_urls: Vec<String>,
    pub status: DeliveryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_generated_message: Option<String>,
}

/// Everything the caller supplies; id, timestamp and status are assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivityLog {
    pub resident_id: String,
    pub resident_name: String,
    pub staff_name: String,
    pub category: UpdateCategory,
    pub notes: String,
    pub image_urls: Vec<String>,
    pub ai_generated_message: Option<String>,
}

impl NewActivityLog {
    pub fn into_log(self, id: String, timestamp: DateTime<Utc>) -> ActivityLog {
        ActivityLog {
            id,
            resident_id: self.resident_id,
            resident_name: self.resident_name,
            staff_name: self.staff_name,
            category: self.category,
            timestamp,
            notes: self.notes,
            image_urls: self.image_urls,
            status: DeliveryStatus::Pending,
            ai_generated_message: self.ai_generated_message,
        }
    }
}
