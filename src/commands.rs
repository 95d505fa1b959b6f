//! Handlers behind each CLI subcommand.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use log::info;
use serde::Serialize;

use crate::cli::{
    CollageArgs, Commands, GalleryCommand, GalleryFilterArgs, LogCommand, RelayCommand,
    ResidentCommand, SettingsArgs, SettingsCommand, SubmitArgs,
};
use crate::collage::{self, CompositeImage};
use crate::composer::MessageComposer;
use crate::db::{ResidentInput, ResidentUpdate};
use crate::gallery::{self, DashboardStats, GalleryFilter};
use crate::relay::{RelayClient, RelayMonitor};
use crate::settings::AppSettings;
use crate::submission::{SubmissionService, SubmitUpdate};
use crate::AppState;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn dispatch(state: &AppState, command: Commands) -> Result<()> {
    match command {
        Commands::Residents(command) => residents(state, command).await,
        Commands::Logs(command) => logs(state, command).await,
        Commands::Submit(args) => submit(state, args).await,
        Commands::Collage(args) => make_collage(state, args).await,
        Commands::Relay(command) => relay(state, command).await,
        Commands::Gallery(command) => gallery(state, command).await,
        Commands::Stats => stats(state).await,
        Commands::Settings(command) => settings(state, command),
    }
}

async fn residents(state: &AppState, command: ResidentCommand) -> Result<()> {
    let store = &state.store;
    match command {
        ResidentCommand::List => {
            for resident in store.list_residents().await? {
                let group = if resident.has_group() {
                    resident.whatsapp_group_id.as_str()
                } else {
                    "-"
                };
                println!(
                    "{}\t{}\troom {}\t{}",
                    resident.id, resident.name, resident.room_number, group
                );
            }
            Ok(())
        }
        ResidentCommand::Show { id } => {
            let resident = store
                .get_resident(&id)
                .await?
                .with_context(|| format!("Resident {id} not found"))?;
            print_json(&resident)
        }
        ResidentCommand::Add(args) => {
            let resident = store
                .create_resident(ResidentInput {
                    name: args.name,
                    room_number: args.room,
                    whatsapp_group_id: args.group,
                    notes: args.notes,
                    photo_url: args.photo_url,
                })
                .await?;
            print_json(&resident)
        }
        ResidentCommand::Update { id, fields } => {
            let resident = store
                .update_resident(
                    &id,
                    ResidentUpdate {
                        name: fields.name,
                        room_number: fields.room,
                        whatsapp_group_id: fields.group,
                        notes: fields.notes,
                        photo_url: fields.photo_url,
                    },
                )
                .await?;
            print_json(&resident)
        }
        ResidentCommand::Delete { id } => {
            store.delete_resident(&id).await?;
            println!("Deleted resident {id}");
            Ok(())
        }
    }
}

async fn logs(state: &AppState, command: LogCommand) -> Result<()> {
    match command {
        LogCommand::List { limit } => {
            let logs = state.store.list_logs().await?;
            for log in logs.iter().take(limit.unwrap_or(usize::MAX)) {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{} image(s)",
                    log.timestamp.format("%Y-%m-%d %H:%M"),
                    log.status.as_str(),
                    log.resident_name,
                    log.category,
                    log.staff_name,
                    log.image_urls.len()
                );
            }
            Ok(())
        }
    }
}

async fn submit(state: &AppState, args: SubmitArgs) -> Result<()> {
    let settings = state.settings.effective();

    let mut images = Vec::with_capacity(args.images.len());
    for path in &args.images {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read image {}", path.display()))?;
        images.push(bytes);
    }

    let service = SubmissionService::new(
        state.store.clone(),
        MessageComposer::new(settings.composer.clone()),
        RelayClient::new(&settings.relay),
        settings.collage.clone(),
    );

    let log = service
        .submit(SubmitUpdate {
            resident_id: args.resident,
            staff_name: args.staff.unwrap_or(settings.staff_name),
            category: args.category,
            notes: args.notes,
            images,
        })
        .await?;

    println!("Log {} for {}: {}", log.id, log.resident_name, log.status.as_str());
    if let Some(message) = &log.ai_generated_message {
        println!("{message}");
    }
    Ok(())
}

async fn make_collage(state: &AppState, args: CollageArgs) -> Result<()> {
    let mut config = state.settings.effective().collage;
    if let Some(height) = args.height {
        config.target_height = height;
    }

    let mut captures = Vec::with_capacity(args.images.len());
    for path in &args.images {
        captures.push(
            tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read image {}", path.display()))?,
        );
    }

    let composite = collage::compose(captures, &config).await?;
    tokio::fs::write(&args.out, composite.bytes())
        .await
        .with_context(|| format!("Failed to write {}", args.out.display()))?;

    match composite {
        CompositeImage::Collage { width, height, .. } => {
            println!("Wrote {width}x{height} collage to {}", args.out.display())
        }
        CompositeImage::Original(_) => {
            println!("Single image copied unchanged to {}", args.out.display())
        }
    }
    Ok(())
}

async fn relay(state: &AppState, command: RelayCommand) -> Result<()> {
    let relay_settings = state.settings.effective().relay;
    let client = RelayClient::new(&relay_settings);

    match command {
        RelayCommand::Status => {
            let status = client.status().await;
            println!(
                "{} ({}){}",
                status.status.as_str(),
                client.base_url(),
                if status.has_qr { ", pairing code available" } else { "" }
            );
            Ok(())
        }
        RelayCommand::Qr => {
            match client.pairing_code().await {
                Some(code) => println!("{code}"),
                None => println!("No pairing code available"),
            }
            Ok(())
        }
        RelayCommand::Groups => {
            for group in client.groups().await? {
                println!("{}\t{}", group.id, group.name);
            }
            Ok(())
        }
        RelayCommand::Watch => watch_relay(client, relay_settings.poll_interval_secs).await,
    }
}

async fn watch_relay(client: RelayClient, poll_interval_secs: u64) -> Result<()> {
    let mut monitor = RelayMonitor::new();
    monitor.start(client, Duration::from_secs(poll_interval_secs))?;
    let mut rx = monitor.subscribe();
    let mut last_printed = None;

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                let key = (snapshot.status, snapshot.pairing_code.clone());
                if last_printed.as_ref() != Some(&key) {
                    match &snapshot.pairing_code {
                        Some(code) => println!("{} - scan pairing code: {code}", snapshot.status.as_str()),
                        None => println!("{}", snapshot.status.as_str()),
                    }
                    last_printed = Some(key);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping relay watch");
                break;
            }
        }
    }

    monitor.stop().await
}

impl From<GalleryFilterArgs> for GalleryFilter {
    fn from(args: GalleryFilterArgs) -> Self {
        GalleryFilter {
            resident: args.resident,
            category: args.category,
        }
    }
}

async fn gallery(state: &AppState, command: GalleryCommand) -> Result<()> {
    let logs = state.store.list_logs().await?;
    let images = gallery::gallery_images(&logs);

    match command {
        GalleryCommand::List(filter) => {
            for image in GalleryFilter::from(filter).apply(images) {
                println!(
                    "{}\t{}\t{}\t{}",
                    image.id,
                    image.date.format("%Y-%m-%d"),
                    image.resident,
                    gallery::export_filename(&image)
                );
            }
            Ok(())
        }
        GalleryCommand::Save { id, out_dir } => {
            let image = images
                .iter()
                .find(|image| image.id == id)
                .with_context(|| format!("Gallery image {id} not found"))?;
            let path = gallery::save_image(image, &state.http, &out_dir).await?;
            println!("Saved {}", path.display());
            Ok(())
        }
        GalleryCommand::Export {
            filter,
            ids,
            out_dir,
        } => {
            let mut selected = GalleryFilter::from(filter).apply(images);
            if !ids.is_empty() {
                selected.retain(|image| ids.contains(&image.id));
            }

            let archive =
                gallery::bundle_archive(&selected, &state.http, Utc::now().date_naive()).await?;
            if archive.entries.is_empty() {
                bail!("None of the selected images could be fetched");
            }

            tokio::fs::create_dir_all(&out_dir)
                .await
                .with_context(|| format!("Failed to create {}", out_dir.display()))?;
            let path = out_dir.join(&archive.name);
            tokio::fs::write(&path, &archive.bytes)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;

            println!("Wrote {} image(s) to {}", archive.entries.len(), path.display());
            for id in &archive.skipped {
                println!("Skipped {id}");
            }
            Ok(())
        }
    }
}

async fn stats(state: &AppState) -> Result<()> {
    let residents = state.store.list_residents().await?;
    let logs = state.store.list_logs().await?;
    print_json(&DashboardStats::compute(&residents, &logs, Utc::now()))
}

fn settings(state: &AppState, command: SettingsCommand) -> Result<()> {
    match command {
        SettingsCommand::Show => {
            let mut effective = state.settings.effective();
            if !effective.composer.api_key.is_empty() {
                effective.composer.api_key = "********".into();
            }
            print_json(&effective)
        }
        SettingsCommand::Set(args) => {
            let mut candidate = state.settings.stored();
            apply_settings(&mut candidate, args);
            candidate.collage.validate()?;
            if candidate.relay.poll_interval_secs == 0 {
                bail!("Relay poll interval must be at least one second");
            }

            state.settings.update(|stored| *stored = candidate)?;
            println!("Settings saved");
            Ok(())
        }
    }
}

fn apply_settings(settings: &mut AppSettings, args: SettingsArgs) {
    if let Some(store) = args.store {
        settings.store = store;
    }
    if let Some(staff_name) = args.staff_name {
        settings.staff_name = staff_name;
    }
    if let Some(api_key) = args.api_key {
        settings.composer.api_key = api_key;
    }
    if let Some(model) = args.model {
        settings.composer.model = model;
    }
    if let Some(url) = args.relay_url {
        settings.relay.base_url = url;
    }
    if let Some(secs) = args.poll_interval {
        settings.relay.poll_interval_secs = secs;
    }
    if let Some(height) = args.collage_height {
        settings.collage.target_height = height;
    }
    if let Some(quality) = args.collage_quality {
        settings.collage.jpeg_quality = quality;
    }
}
