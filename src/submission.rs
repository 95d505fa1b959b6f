//! Caregiver submission: compose, collage, log and deliver one update.

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::collage::{self, CollageConfig};
use crate::composer::MessageComposer;
use crate::db::{ActivityLog, DeliveryStatus, NewActivityLog};
use crate::media::to_data_uri;
use crate::models::UpdateCategory;
use crate::relay::RelayClient;
use crate::store::LogStore;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Debug, Clone)]
pub struct SubmitUpdate {
    pub resident_id: String,
    pub staff_name: String,
    pub category: UpdateCategory,
    pub notes: String,
    pub images: Vec<Vec<u8>>,
}

pub struct SubmissionService {
    store: Arc<dyn LogStore>,
    composer: MessageComposer,
    relay: RelayClient,
    collage: CollageConfig,
}

impl SubmissionService {
    pub fn new(
        store: Arc<dyn LogStore>,
        composer: MessageComposer,
        relay: RelayClient,
        collage: CollageConfig,
    ) -> Self {
        Self {
            store,
            composer,
            relay,
            collage,
        }
    }

    /// Records the update and attempts delivery. Delivery problems end up in the
    /// returned log's status; only validation and storage failures are errors.
    pub async fn submit(&self, update: SubmitUpdate) -> Result<ActivityLog> {
        let resident = self
            .store
            .get_resident(&update.resident_id)
            .await?
            .with_context(|| format!("Resident {} not found", update.resident_id))?;

        let policy = update.category.policy();
        if update.images.len() > policy.max_images {
            bail!(
                "{} accepts at most {} image(s), got {}",
                update.category,
                policy.max_images,
                update.images.len()
            );
        }

        let message = self
            .composer
            .compose(&resident.name, update.category, &update.notes)
            .await;

        let images = self.prepare_images(update.category, update.images).await;
        let image_urls: Vec<String> = images.iter().map(|bytes| to_data_uri(bytes)).collect();

        let mut log = self
            .store
            .create_log(NewActivityLog {
                resident_id: resident.id.clone(),
                resident_name: resident.name.clone(),
                staff_name: update.staff_name,
                category: update.category,
                notes: update.notes,
                image_urls,
                ai_generated_message: Some(message).filter(|m| !m.trim().is_empty()),
            })
            .await
            .context("Failed to record activity log")?;

        let Some(message) = log.ai_generated_message.clone() else {
            return Ok(log);
        };
        if !resident.has_group() {
            log_info!("{} has no family group; log {} stays pending", resident.name, log.id);
            return Ok(log);
        }

        let status = match self
            .relay
            .send_update(&resident.whatsapp_group_id, &message, &log.image_urls)
            .await
        {
            Ok(()) => DeliveryStatus::Sent,
            Err(err) => {
                log_error!("Delivery of log {} failed: {err:#}", log.id);
                DeliveryStatus::Failed
            }
        };

        self.store
            .set_log_status(&log.id, status)
            .await
            .with_context(|| format!("Failed to record delivery status for log {}", log.id))?;
        log.status = status;
        Ok(log)
    }

    /// Vitals with several photos become one collage; any compositor failure sends
    /// the originals instead.
    async fn prepare_images(&self, category: UpdateCategory, images: Vec<Vec<u8>>) -> Vec<Vec<u8>> {
        if !category.should_collage(images.len()) {
            return images;
        }

        match collage::compose(images.clone(), &self.collage).await {
            Ok(composite) => {
                log_info!("Merged {} {} photos into one collage", images.len(), category);
                vec![composite.into_bytes()]
            }
            Err(err) => {
                log_warn!("Failed to generate collage, sending originals: {err}");
                images
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::path::PathBuf;

    use image::{ImageFormat, Rgb, RgbImage};
    use uuid::Uuid;

    use super::*;
    use crate::db::ResidentInput;
    use crate::media::parse_data_uri;
    use crate::relay::test_server::{spawn_relay, Route};
    use crate::settings::{ComposerSettings, RelaySettings};
    use crate::store::LocalStore;

    fn temp_store() -> Arc<dyn LogStore> {
        let path: PathBuf = std::env::temp_dir()
            .join("carewatch-tests")
            .join(format!("{}.json", Uuid::new_v4()));
        Arc::new(LocalStore::new(path).unwrap())
    }

    fn service(store: Arc<dyn LogStore>, relay_url: &str) -> SubmissionService {
        SubmissionService::new(
            store,
            MessageComposer::new(ComposerSettings::default()),
            RelayClient::new(&RelaySettings {
                base_url: relay_url.into(),
                ..RelaySettings::default()
            }),
            CollageConfig::default(),
        )
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 40, 40]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn update(category: UpdateCategory, images: Vec<Vec<u8>>) -> SubmitUpdate {
        SubmitUpdate {
            resident_id: "1".into(),
            staff_name: "Jane Doe".into(),
            category,
            notes: "Ate well".into(),
            images,
        }
    }

    #[tokio::test]
    async fn delivered_update_is_marked_sent() {
        let relay = spawn_relay(vec![Route::post("/send-update", 200, r#"{"success":true}"#)]).await;
        let store = temp_store();
        let service = service(store.clone(), &relay.base_url);

        let log = service
            .submit(update(UpdateCategory::Lunch, vec![png(40, 30)]))
            .await
            .unwrap();

        assert_eq!(log.status, DeliveryStatus::Sent);
        assert_eq!(
            log.ai_generated_message.as_deref(),
            Some("Update for Alice Johnson: Lunch. Ate well")
        );
        assert_eq!(store.list_logs().await.unwrap()[0].status, DeliveryStatus::Sent);

        let body: serde_json::Value = serde_json::from_str(&relay.requests()[0].body).unwrap();
        assert_eq!(body["groupId"], "120363045@g.us");
    }

    #[tokio::test]
    async fn relay_failure_marks_failed() {
        let store = temp_store();
        let log = service(store.clone(), "http://127.0.0.1:9")
            .submit(update(UpdateCategory::General, Vec::new()))
            .await
            .unwrap();

        assert_eq!(log.status, DeliveryStatus::Failed);
        assert_eq!(store.list_logs().await.unwrap()[0].status, DeliveryStatus::Failed);
    }

    #[tokio::test]
    async fn resident_without_group_stays_pending() {
        let store = temp_store();
        let resident = store
            .create_resident(ResidentInput {
                name: "Walter White".into(),
                room_number: "310".into(),
                whatsapp_group_id: "".into(),
                notes: None,
                photo_url: None,
            })
            .await
            .unwrap();

        let mut request = update(UpdateCategory::Dinner, Vec::new());
        request.resident_id = resident.id;
        let log = service(store, "http://127.0.0.1:9").submit(request).await.unwrap();
        assert_eq!(log.status, DeliveryStatus::Pending);
    }

    #[tokio::test]
    async fn vitals_photos_become_one_collage() {
        let store = temp_store();
        let log = service(store, "http://127.0.0.1:9")
            .submit(update(
                UpdateCategory::Vitals,
                vec![png(120, 80), png(60, 90)],
            ))
            .await
            .unwrap();

        assert_eq!(log.image_urls.len(), 1);
        let composite = parse_data_uri(&log.image_urls[0]).unwrap();
        assert_eq!(composite.mime, "image/jpeg");
        let decoded = image::load_from_memory(&composite.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (2167, 1000));
    }

    #[tokio::test]
    async fn broken_vitals_photo_falls_back_to_originals() {
        let store = temp_store();
        let originals = vec![png(50, 50), b"not an image".to_vec(), png(20, 40)];
        let log = service(store, "http://127.0.0.1:9")
            .submit(update(UpdateCategory::Vitals, originals.clone()))
            .await
            .unwrap();

        assert_eq!(log.image_urls.len(), 3);
        for (url, original) in log.image_urls.iter().zip(&originals) {
            assert_eq!(&parse_data_uri(url).unwrap().bytes, original);
        }
    }

    #[tokio::test]
    async fn rejects_too_many_images() {
        let store = temp_store();
        let err = service(store.clone(), "http://127.0.0.1:9")
            .submit(update(UpdateCategory::Breakfast, vec![png(10, 10), png(10, 10)]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("at most 1"));
        assert!(store.list_logs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_unknown_resident() {
        let mut request = update(UpdateCategory::Lunch, Vec::new());
        request.resident_id = "missing".into();
        assert!(service(temp_store(), "http://127.0.0.1:9")
            .submit(request)
            .await
            .is_err());
    }
}
