pub mod collage;
pub mod composer;
pub mod db;
pub mod gallery;
pub mod media;
pub mod models;
pub mod relay;
pub mod settings;
pub mod store;
pub mod submission;

mod cli;
mod commands;
mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use cli::Cli;
use settings::SettingsStore;
use store::{open_store, LogStore};

pub(crate) struct AppState {
    pub(crate) store: Arc<dyn LogStore>,
    pub(crate) settings: SettingsStore,
    pub(crate) http: reqwest::Client,
}

/// `RUST_LOG` wins when set; otherwise everything at info and above.
fn logger_env() -> env_logger::Env<'static> {
    env_logger::Env::default().default_filter_or("info")
}

fn init_logging() {
    env_logger::Builder::from_env(logger_env()).init();
}

pub async fn run() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    std::fs::create_dir_all(&cli.data_dir)
        .with_context(|| format!("Failed to create data directory {}", cli.data_dir.display()))?;

    let settings = SettingsStore::new(cli.data_dir.join("settings.json"))?;
    let mode = settings.effective().store;
    let store = open_store(mode, &cli.data_dir)?;
    log::info!("CareWatch using {mode:?} store in {}", cli.data_dir.display());

    let state = AppState {
        store,
        settings,
        http: reqwest::Client::new(),
    };

    commands::dispatch(&state, cli.command).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_can_raise_verbosity() {
        std::env::set_var("RUST_LOG", "debug");
        let logger = env_logger::Builder::from_env(logger_env()).build();
        std::env::remove_var("RUST_LOG");

        assert_eq!(logger.filter(), log::LevelFilter::Debug);
    }

    #[test]
    fn defaults_to_info_without_rust_log() {
        let logger = env_logger::Builder::from_env(
            env_logger::Env::new().filter("CAREWATCH_TEST_UNSET_FILTER").default_filter_or("info"),
        )
        .build();

        assert_eq!(logger.filter(), log::LevelFilter::Info);
    }
}
