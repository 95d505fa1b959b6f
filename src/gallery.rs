//! Photo gallery built from activity logs, zip export and dashboard counters.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use log::{info, warn};
use serde::Serialize;
use tokio::task::JoinSet;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::db::{ActivityLog, Resident};
use crate::media;
use crate::models::UpdateCategory;

const ARCHIVE_FOLDER: &str = "CareWatch_Memories";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImage {
    /// `{logId}-{index}`
    pub id: String,
    pub log_id: String,
    pub index: usize,
    pub url: String,
    pub resident_id: String,
    pub resident: String,
    pub category: UpdateCategory,
    pub date: DateTime<Utc>,
    pub notes: String,
    pub staff: String,
}

pub fn gallery_images(logs: &[ActivityLog]) -> Vec<GalleryImage> {
    logs.iter()
        .flat_map(|log| {
            log.image_urls.iter().enumerate().map(move |(index, url)| GalleryImage {
                id: format!("{}-{}", log.id, index),
                log_id: log.id.clone(),
                index,
                url: url.clone(),
                resident_id: log.resident_id.clone(),
                resident: log.resident_name.clone(),
                category: log.category,
                date: log.timestamp,
                notes: log.notes.clone(),
                staff: log.staff_name.clone(),
            })
        })
        .collect()
}

/// `None` matches everything.
#[derive(Debug, Clone, Default)]
pub struct GalleryFilter {
    /// Resident name or id.
    pub resident: Option<String>,
    pub category: Option<UpdateCategory>,
}

impl GalleryFilter {
    pub fn matches(&self, image: &GalleryImage) -> bool {
        let resident_ok = self
            .resident
            .as_deref()
            .map_or(true, |r| image.resident == r || image.resident_id == r);
        let category_ok = self.category.map_or(true, |c| image.category == c);
        resident_ok && category_ok
    }

    pub fn apply(&self, images: Vec<GalleryImage>) -> Vec<GalleryImage> {
        images.into_iter().filter(|img| self.matches(img)).collect()
    }
}

fn underscore_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join("_")
}

/// `Alice_Johnson_Lunch_2024-05-01.jpg`
pub fn export_filename(image: &GalleryImage) -> String {
    format!(
        "{}_{}_{}.jpg",
        underscore_whitespace(&image.resident),
        image.category,
        image.date.format("%Y-%m-%d")
    )
}

/// Filename inside an archive, made unique by the log id prefix and image index.
pub fn bundled_filename(image: &GalleryImage) -> String {
    let stem = export_filename(image);
    let stem = stem.trim_end_matches(".jpg");
    let prefix: String = image.log_id.chars().take(8).collect();
    format!("{stem}_{prefix}-{}.jpg", image.index)
}

/// First free path for `filename` in `dir`, adding ` (1)`, ` (2)`, ... before the extension.
fn unused_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = filename.rsplit_once('.').unwrap_or((filename, "jpg"));
    (1..)
        .map(|n| dir.join(format!("{stem} ({n}).{ext}")))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

/// Download one gallery image into `out_dir` under its export filename.
pub async fn save_image(image: &GalleryImage, client: &reqwest::Client, out_dir: &Path) -> Result<PathBuf> {
    let bytes = media::resolve(&image.url, client)
        .await
        .with_context(|| format!("Failed to fetch image {}", image.id))?;

    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let path = unused_path(out_dir, &export_filename(image));
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Saved image {} to {}", image.id, path.display());
    Ok(path)
}

pub fn archive_name(date: NaiveDate) -> String {
    format!("{ARCHIVE_FOLDER}_{}.zip", date.format("%Y-%m-%d"))
}

#[derive(Debug)]
pub struct ExportArchive {
    pub name: String,
    pub bytes: Vec<u8>,
    pub entries: Vec<String>,
    /// Ids of images whose bytes could not be fetched.
    pub skipped: Vec<String>,
}

/// Fetch every selected image and pack the ones that resolve into a zip.
pub async fn bundle_archive(
    images: &[GalleryImage],
    client: &reqwest::Client,
    today: NaiveDate,
) -> Result<ExportArchive> {
    if images.is_empty() {
        bail!("No images selected for export");
    }

    let mut fetches = JoinSet::new();
    for (position, image) in images.iter().enumerate() {
        let client = client.clone();
        let url = image.url.clone();
        fetches.spawn(async move { (position, media::resolve(&url, &client).await) });
    }

    let mut fetched: Vec<Option<Vec<u8>>> = vec![None; images.len()];
    while let Some(joined) = fetches.join_next().await {
        let (position, result) = joined.context("image fetch task failed")?;
        match result {
            Ok(bytes) => fetched[position] = Some(bytes),
            Err(err) => warn!("Failed to fetch image for zip: {} ({err:#})", images[position].id),
        }
    }

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .add_directory(format!("{ARCHIVE_FOLDER}/"), options)
        .context("Failed to create archive folder")?;

    let mut entries = Vec::new();
    let mut skipped = Vec::new();
    for (image, bytes) in images.iter().zip(fetched) {
        let Some(bytes) = bytes else {
            skipped.push(image.id.clone());
            continue;
        };
        let entry = format!("{ARCHIVE_FOLDER}/{}", bundled_filename(image));
        writer
            .start_file(entry.as_str(), options)
            .with_context(|| format!("Failed to add {entry} to archive"))?;
        writer.write_all(&bytes)?;
        entries.push(entry);
    }

    let bytes = writer.finish().context("Failed to finish archive")?.into_inner();
    info!(
        "Bundled {} image(s) into archive ({} skipped, {} bytes)",
        entries.len(),
        skipped.len(),
        bytes.len()
    );

    Ok(ExportArchive {
        name: archive_name(today),
        bytes,
        entries,
        skipped,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_residents: usize,
    /// Residents with a family group to deliver to.
    pub active_families: usize,
    pub updates_today: usize,
}

impl DashboardStats {
    pub fn compute(residents: &[Resident], logs: &[ActivityLog], now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        Self {
            total_residents: residents.len(),
            active_families: residents.iter().filter(|r| r.has_group()).count(),
            updates_today: logs
                .iter()
                .filter(|log| log.timestamp.date_naive() == today)
                .count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use chrono::{Duration, TimeZone};
    use zip::ZipArchive;

    use super::*;
    use crate::db::DeliveryStatus;
    use crate::media::to_data_uri;

    fn log(id: &str, resident: &str, category: UpdateCategory, urls: Vec<String>) -> ActivityLog {
        ActivityLog {
            id: id.into(),
            resident_id: format!("id-{resident}"),
            resident_name: resident.into(),
            staff_name: "Jane Doe".into(),
            category,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
            notes: "Ate well".into(),
            image_urls: urls,
            status: DeliveryStatus::Sent,
            ai_generated_message: None,
        }
    }

    fn resident(name: &str, group: &str) -> Resident {
        Resident {
            id: name.into(),
            name: name.into(),
            room_number: "101".into(),
            whatsapp_group_id: group.into(),
            notes: None,
            photo_url: None,
        }
    }

    #[test]
    fn flattens_logs_into_images() {
        let logs = vec![
            log("log-a", "Alice Johnson", UpdateCategory::Vitals, vec!["u1".into(), "u2".into()]),
            log("log-b", "Robert Smith", UpdateCategory::Lunch, Vec::new()),
            log("log-c", "Robert Smith", UpdateCategory::Lunch, vec!["u3".into()]),
        ];
        let images = gallery_images(&logs);
        let ids: Vec<_> = images.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["log-a-0", "log-a-1", "log-c-0"]);
        assert_eq!(images[2].resident, "Robert Smith");
    }

    #[test]
    fn filters_by_resident_and_category() {
        let logs = vec![
            log("a", "Alice Johnson", UpdateCategory::Vitals, vec!["u1".into()]),
            log("b", "Alice Johnson", UpdateCategory::Lunch, vec!["u2".into()]),
            log("c", "Robert Smith", UpdateCategory::Lunch, vec!["u3".into()]),
        ];
        let images = gallery_images(&logs);

        let by_resident = GalleryFilter {
            resident: Some("Alice Johnson".into()),
            category: None,
        };
        assert_eq!(by_resident.apply(images.clone()).len(), 2);

        let both = GalleryFilter {
            resident: Some("id-Alice Johnson".into()),
            category: Some(UpdateCategory::Lunch),
        };
        let filtered = both.apply(images.clone());
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "b-0");

        assert_eq!(GalleryFilter::default().apply(images).len(), 3);
    }

    #[test]
    fn derives_filenames() {
        let logs = vec![log(
            "3f2a9c1e-77aa-4b1e-9a0c-1234567890ab",
            "Mary  Ann Lee",
            UpdateCategory::Vitals,
            vec!["u".into(), "v".into()],
        )];
        let images = gallery_images(&logs);
        assert_eq!(export_filename(&images[1]), "Mary_Ann_Lee_Vital Signs_2024-05-01.jpg");
        assert_eq!(
            bundled_filename(&images[1]),
            "Mary_Ann_Lee_Vital Signs_2024-05-01_3f2a9c1e-1.jpg"
        );
        assert_eq!(
            archive_name(NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()),
            "CareWatch_Memories_2024-05-02.zip"
        );
    }

    #[tokio::test]
    async fn bundles_resolvable_images_and_skips_the_rest() {
        let logs = vec![log(
            "abcdef1234",
            "Alice Johnson",
            UpdateCategory::Lunch,
            vec![to_data_uri(b"first"), "data:image/png,raw".into(), to_data_uri(b"third")],
        )];
        let images = gallery_images(&logs);
        let archive = bundle_archive(
            &images,
            &reqwest::Client::new(),
            NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
        )
        .await
        .unwrap();

        assert_eq!(archive.name, "CareWatch_Memories_2024-05-02.zip");
        assert_eq!(archive.skipped, vec!["abcdef1234-1".to_string()]);

        let mut zip = ZipArchive::new(Cursor::new(archive.bytes)).unwrap();
        let mut contents = String::new();
        zip.by_name("CareWatch_Memories/Alice_Johnson_Lunch_2024-05-01_abcdef12-2.jpg")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "third");
        assert_eq!(archive.entries.len(), 2);
    }

    #[tokio::test]
    async fn saves_single_image_without_clobbering() {
        let logs = vec![log(
            "abcdef1234",
            "Alice Johnson",
            UpdateCategory::Lunch,
            vec![to_data_uri(b"first"), to_data_uri(b"second")],
        )];
        let images = gallery_images(&logs);
        let out_dir = std::env::temp_dir()
            .join("carewatch-tests")
            .join(uuid::Uuid::new_v4().to_string());
        let client = reqwest::Client::new();

        let first = save_image(&images[0], &client, &out_dir).await.unwrap();
        assert_eq!(first, out_dir.join("Alice_Johnson_Lunch_2024-05-01.jpg"));
        assert_eq!(std::fs::read(&first).unwrap(), b"first");

        let second = save_image(&images[1], &client, &out_dir).await.unwrap();
        assert_eq!(second, out_dir.join("Alice_Johnson_Lunch_2024-05-01 (1).jpg"));
        assert_eq!(std::fs::read(&second).unwrap(), b"second");
    }

    #[tokio::test]
    async fn saving_unresolvable_image_fails() {
        let logs = vec![log("x", "Alice Johnson", UpdateCategory::Lunch, vec!["data:image/png,raw".into()])];
        let images = gallery_images(&logs);
        let out_dir = std::env::temp_dir().join("carewatch-tests").join("never-written");
        assert!(save_image(&images[0], &reqwest::Client::new(), &out_dir).await.is_err());
    }

    #[tokio::test]
    async fn empty_selection_is_an_error() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        assert!(bundle_archive(&[], &reqwest::Client::new(), today).await.is_err());
    }

    #[test]
    fn counts_dashboard_stats() {
        let residents = vec![
            resident("Alice Johnson", "120363045@g.us"),
            resident("Robert Smith", ""),
        ];
        let mut old = log("a", "Alice Johnson", UpdateCategory::Lunch, Vec::new());
        old.timestamp = old.timestamp - Duration::days(1);
        let logs = vec![
            log("b", "Alice Johnson", UpdateCategory::Lunch, Vec::new()),
            log("c", "Robert Smith", UpdateCategory::Dinner, Vec::new()),
            old,
        ];
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 22, 0, 0).unwrap();

        assert_eq!(
            DashboardStats::compute(&residents, &logs, now),
            DashboardStats {
                total_residents: 2,
                active_families: 1,
                updates_today: 2,
            }
        );
    }
}
