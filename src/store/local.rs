use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{
    ActivityLog, DeliveryStatus, NewActivityLog, Resident, ResidentInput, ResidentUpdate,
};

use super::LogStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalData {
    residents: Vec<Resident>,
    /// Kept newest first.
    logs: Vec<ActivityLog>,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            residents: demo_residents(),
            logs: Vec::new(),
        }
    }
}

fn demo_residents() -> Vec<Resident> {
    [
        ("1", "Alice Johnson", "101", "120363045@g.us"),
        ("2", "Robert Smith", "102", "120363046@g.us"),
        ("3", "Eleanor Rigby", "205", "120363047@g.us"),
    ]
    .into_iter()
    .map(|(id, name, room, group)| Resident {
        id: id.into(),
        name: name.into(),
        room_number: room.into(),
        whatsapp_group_id: group.into(),
        notes: None,
        photo_url: None,
    })
    .collect()
}

/// Renames an unreadable store file to `<name>.corrupt-<timestamp>` so its bytes survive reseeding.
fn set_aside(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "carewatch-local.json".into());
    let backup = path.with_file_name(format!(
        "{file_name}.corrupt-{}",
        Utc::now().format("%Y%m%dT%H%M%S%.3f")
    ));
    fs::rename(path, &backup)
        .with_context(|| format!("Failed to set aside unreadable store {}", path.display()))?;
    Ok(backup)
}

/// JSON-file store for demos and offline use.
pub struct LocalStore {
    path: PathBuf,
    data: RwLock<LocalData>,
}

impl LocalStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read local store from {}", path.display()))?;
            match serde_json::from_str::<LocalData>(&contents) {
                Ok(data) => {
                    return Ok(Self {
                        path,
                        data: RwLock::new(data),
                    })
                }
                Err(err) => {
                    let backup = set_aside(&path)?;
                    warn!(
                        "Local store at {} is unreadable ({err}); moved it to {} and starting over",
                        path.display(),
                        backup.display()
                    );
                }
            }
        }

        let store = Self {
            path,
            data: RwLock::new(LocalData::default()),
        };
        store.persist_current()?;
        Ok(store)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, LocalData>> {
        self.data
            .read()
            .map_err(|_| anyhow!("local store lock poisoned"))
    }

    fn mutate<T>(&self, change: impl FnOnce(&mut LocalData) -> Result<T>) -> Result<T> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("local store lock poisoned"))?;
        let mut staged = guard.clone();
        let value = change(&mut staged)?;
        self.persist(&staged)?;
        *guard = staged;
        Ok(value)
    }

    fn persist_current(&self) -> Result<()> {
        let guard = self.read()?;
        self.persist(&guard)
    }

    fn persist(&self, data: &LocalData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write local store to {}", self.path.display()))
    }
}

#[async_trait]
impl LogStore for LocalStore {
    async fn list_residents(&self) -> Result<Vec<Resident>> {
        let mut residents = self.read()?.residents.clone();
        residents.sort_by_key(|r| r.name.to_lowercase());
        Ok(residents)
    }

    async fn get_resident(&self, resident_id: &str) -> Result<Option<Resident>> {
        Ok(self
            .read()?
            .residents
            .iter()
            .find(|r| r.id == resident_id)
            .cloned())
    }

    async fn create_resident(&self, input: ResidentInput) -> Result<Resident> {
        let resident = input.into_resident(Uuid::new_v4().to_string());
        self.mutate(|data| {
            data.residents.push(resident.clone());
            Ok(resident)
        })
    }

    async fn update_resident(&self, resident_id: &str, update: ResidentUpdate) -> Result<Resident> {
        if update.is_empty() {
            bail!("No fields to update");
        }
        self.mutate(|data| {
            let resident = data
                .residents
                .iter_mut()
                .find(|r| r.id == resident_id)
                .ok_or_else(|| anyhow!("Resident {resident_id} not found"))?;
            update.apply_to(resident);
            Ok(resident.clone())
        })
    }

    async fn delete_resident(&self, resident_id: &str) -> Result<()> {
        self.mutate(|data| {
            let before = data.residents.len();
            data.residents.retain(|r| r.id != resident_id);
            if data.residents.len() == before {
                bail!("Resident {resident_id} not found");
            }
            data.logs.retain(|l| l.resident_id != resident_id);
            Ok(())
        })
    }

    async fn list_logs(&self) -> Result<Vec<ActivityLog>> {
        Ok(self.read()?.logs.clone())
    }

    async fn create_log(&self, new_log: NewActivityLog) -> Result<ActivityLog> {
        let log = new_log.into_log(Uuid::new_v4().to_string(), Utc::now());
        self.mutate(|data| {
            if !data.residents.iter().any(|r| r.id == log.resident_id) {
                bail!("Resident {} not found", log.resident_id);
            }
            data.logs.insert(0, log.clone());
            Ok(log)
        })
    }

    async fn set_log_status(&self, log_id: &str, status: DeliveryStatus) -> Result<()> {
        self.mutate(|data| {
            let log = data
                .logs
                .iter_mut()
                .find(|l| l.id == log_id)
                .ok_or_else(|| anyhow!("Activity log {log_id} not found"))?;
            log.status = status;
            Ok(())
        })
    }
}
