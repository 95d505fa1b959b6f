//! Command-line surface: one subcommand group per console tab.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::models::UpdateCategory;
use crate::store::StoreMode;

#[derive(Parser, Debug)]
#[command(name = "carewatch")]
#[command(author, version, about = "Care-home activity logging with family updates")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding settings and store files
    #[arg(long, global = true, env = "CAREWATCH_DATA_DIR", default_value = "carewatch-data")]
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage resident records
    #[command(subcommand)]
    Residents(ResidentCommand),

    /// Browse activity logs
    #[command(subcommand)]
    Logs(LogCommand),

    /// Record an update and send it to the resident's family group
    Submit(SubmitArgs),

    /// Merge images into a single side-by-side collage
    Collage(CollageArgs),

    /// Inspect the messaging relay
    #[command(subcommand)]
    Relay(RelayCommand),

    /// Browse and export photos attached to logs
    #[command(subcommand)]
    Gallery(GalleryCommand),

    /// Headline counters for the admin overview
    Stats,

    /// Show or change stored settings
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Subcommand, Debug)]
pub enum ResidentCommand {
    /// List residents by name
    List,
    /// Show one resident
    Show { id: String },
    /// Add a resident
    Add(ResidentArgs),
    /// Change fields of a resident
    Update {
        id: String,
        #[command(flatten)]
        fields: ResidentFields,
    },
    /// Remove a resident and their logs
    Delete { id: String },
}

#[derive(Args, Debug)]
pub struct ResidentArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub room: String,
    /// WhatsApp group id, e.g. 120363045@g.us
    #[arg(long, default_value = "")]
    pub group: String,
    #[arg(long)]
    pub notes: Option<String>,
    #[arg(long)]
    pub photo_url: Option<String>,
}

#[derive(Args, Debug)]
pub struct ResidentFields {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub room: Option<String>,
    #[arg(long)]
    pub group: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    #[arg(long)]
    pub photo_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum LogCommand {
    /// List logs, newest first
    List {
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Resident id
    #[arg(short, long)]
    pub resident: String,
    /// Breakfast, Lunch, Dinner, Vitals, Glucose or General
    #[arg(short, long)]
    pub category: UpdateCategory,
    #[arg(short, long, default_value = "")]
    pub notes: String,
    /// Staff name; defaults to the configured one
    #[arg(long)]
    pub staff: Option<String>,
    /// Image files in capture order
    #[arg(short, long = "image")]
    pub images: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CollageArgs {
    /// Output JPEG path
    #[arg(short, long)]
    pub out: PathBuf,
    /// Normalised strip height in pixels
    #[arg(long)]
    pub height: Option<u32>,
    /// Input images, left to right
    #[arg(required = true)]
    pub images: Vec<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum RelayCommand {
    /// Connection state of the relay
    Status,
    /// Current pairing code, if the relay is waiting to be paired
    Qr,
    /// Groups visible to the paired account
    Groups,
    /// Poll the relay and print every state change until interrupted
    Watch,
}

#[derive(Subcommand, Debug)]
pub enum GalleryCommand {
    /// List gallery images
    List(GalleryFilterArgs),
    /// Download one image under its export filename
    Save {
        /// Image id (`{logId}-{index}`)
        id: String,
        /// Directory the image is written to
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Bundle gallery images into a zip archive
    Export {
        #[command(flatten)]
        filter: GalleryFilterArgs,
        /// Only these image ids (`{logId}-{index}`)
        #[arg(long = "id")]
        ids: Vec<String>,
        /// Directory the archive is written to
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct GalleryFilterArgs {
    /// Resident name or id
    #[arg(long)]
    pub resident: Option<String>,
    #[arg(long)]
    pub category: Option<UpdateCategory>,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Print effective settings (environment overrides applied)
    Show,
    /// Change stored settings
    Set(SettingsArgs),
}

#[derive(Args, Debug)]
pub struct SettingsArgs {
    #[arg(long, value_parser = parse_store_mode)]
    pub store: Option<StoreMode>,
    #[arg(long)]
    pub staff_name: Option<String>,
    #[arg(long)]
    pub api_key: Option<String>,
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long)]
    pub relay_url: Option<String>,
    #[arg(long)]
    pub poll_interval: Option<u64>,
    #[arg(long)]
    pub collage_height: Option<u32>,
    /// JPEG quality between 0 and 1
    #[arg(long)]
    pub collage_quality: Option<f32>,
}

fn parse_store_mode(raw: &str) -> Result<StoreMode, String> {
    StoreMode::from_env_value(raw).ok_or_else(|| format!("unknown store '{raw}' (expected local or sqlite)"))
}
