//! Resident records and the payloads used to create or edit them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resident {
    pub id: String,
    pub name: String,
    pub room_number: String,
    pub whatsapp_group_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl Resident {
    /// Residents without a group id have nowhere to deliver updates.
    pub fn has_group(&self) -> bool {
        !self.whatsapp_group_id.trim().is_empty()
    }
}

/// Input data for creating a resident
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidentInput {
    pub name: String,
    pub room_number: String,
    pub whatsapp_group_id: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl ResidentInput {
    pub fn into_resident(self, id: String) -> Resident {
        Resident {
            id,
            name: self.name,
            room_number: self.room_number,
            whatsapp_group_id: self.whatsapp_group_id,
            notes: self.notes,
            photo_url: self.photo_url,
        }
    }
}

/// Partial update; `None` leaves the field as it is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidentUpdate {
    pub name: Option<String>,
    pub room_number: Option<String>,
    pub whatsapp_group_id: Option<String>,
    pub notes: Option<String>,
    pub photo_url: Option<String>,
}

impl ResidentUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.room_number.is_none()
            && self.whatsapp_group_id.is_none()
            && self.notes.is_none()
            && self.photo_url.is_none()
    }

    pub fn apply_to(self, resident: &mut Resident) {
        if let Some(name) = self.name {
            resident.name = name;
        }
        if let Some(room_number) = self.room_number {
            resident.room_number = room_number;
        }
        if let Some(group_id) = self.whatsapp_group_id {
            resident.whatsapp_group_id = group_id;
        }
        if let Some(notes) = self.notes {
            resident.notes = Some(notes);
        }
        if let Some(photo_url) = self.photo_url {
            resident.photo_url = Some(photo_url);
        }
    }
}
