//! Resident/log persistence behind one async interface.
//!
//! `Database` is the durable backend; `LocalStore` is a JSON-file mock seeded with demo
//! residents for trying the tool without any setup. `open_store` picks one from settings.

mod local;

use std::{path::Path, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::db::{
    ActivityLog, Database, DeliveryStatus, NewActivityLog, Resident, ResidentInput, ResidentUpdate,
};

pub use local::LocalStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    Local,
    Sqlite,
}

impl StoreMode {
    pub fn from_env_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" | "mock" => Some(StoreMode::Local),
            "sqlite" | "live" => Some(StoreMode::Sqlite),
            _ => None,
        }
    }
}

#[async_trait]
pub trait LogStore: Send + Sync {
    async fn list_residents(&self) -> Result<Vec<Resident>>;

    async fn get_resident(&self, resident_id: &str) -> Result<Option<Resident>>;

    async fn create_resident(&self, input: ResidentInput) -> Result<Resident>;

    async fn update_resident(&self, resident_id: &str, update: ResidentUpdate) -> Result<Resident>;

    /// Removes the resident and all of their logs.
    async fn delete_resident(&self, resident_id: &str) -> Result<()>;

    /// Newest first.
    async fn list_logs(&self) -> Result<Vec<ActivityLog>>;

    /// Stores the log as `PENDING` with a fresh id and timestamp.
    async fn create_log(&self, new_log: NewActivityLog) -> Result<ActivityLog>;

    async fn set_log_status(&self, log_id: &str, status: DeliveryStatus) -> Result<()>;
}

#[async_trait]
impl LogStore for Database {
    async fn list_residents(&self) -> Result<Vec<Resident>> {
        Database::list_residents(self).await
    }

    async fn get_resident(&self, resident_id: &str) -> Result<Option<Resident>> {
        Database::get_resident(self, resident_id).await
    }

    async fn create_resident(&self, input: ResidentInput) -> Result<Resident> {
        Database::create_resident(self, input).await
    }

    async fn update_resident(&self, resident_id: &str, update: ResidentUpdate) -> Result<Resident> {
        Database::update_resident(self, resident_id, update).await
    }

    async fn delete_resident(&self, resident_id: &str) -> Result<()> {
        Database::delete_resident(self, resident_id).await
    }

    async fn list_logs(&self) -> Result<Vec<ActivityLog>> {
        Database::list_logs(self).await
    }

    async fn create_log(&self, new_log: NewActivityLog) -> Result<ActivityLog> {
        Database::create_log(self, new_log).await
    }

    async fn set_log_status(&self, log_id: &str, status: DeliveryStatus) -> Result<()> {
        Database::set_log_status(self, log_id, status).await
    }
}

pub fn open_store(mode: StoreMode, data_dir: &Path) -> Result<Arc<dyn LogStore>> {
    let store: Arc<dyn LogStore> = match mode {
        StoreMode::Sqlite => Arc::new(Database::new(data_dir.join("carewatch.sqlite3"))?),
        StoreMode::Local => Arc::new(LocalStore::new(data_dir.join("carewatch-local.json"))?),
    };
    Ok(store)
}
