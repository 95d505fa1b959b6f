//! Turns a caregiver note into a family-facing message.

mod prompt;

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::UpdateCategory;
use crate::settings::ComposerSettings;

pub use prompt::{fallback_message, family_update_prompt};

const REQUEST_TIMEOUT_SECS: u64 = 30;
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize, Serialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize, Serialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

fn response_text(response: GenerateResponse) -> Option<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Clone)]
pub struct MessageComposer {
    settings: ComposerSettings,
    client: reqwest::Client,
}

impl MessageComposer {
    pub fn new(settings: ComposerSettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|err| {
                warn!("Falling back to default HTTP client: {err}");
                reqwest::Client::new()
            });
        Self { settings, client }
    }

    pub fn is_configured(&self) -> bool {
        !self.settings.api_key.trim().is_empty()
    }

    /// Always yields a message; the template covers every failure.
    pub async fn compose(&self, resident_name: &str, category: UpdateCategory, staff_notes: &str) -> String {
        if !self.is_configured() {
            warn!("Message generation API key missing. Returning default message.");
            return fallback_message(resident_name, category, staff_notes);
        }

        match self.generate(resident_name, category, staff_notes).await {
            Ok(message) => {
                info!("Generated family message for {resident_name} ({category})");
                message
            }
            Err(err) => {
                error!("Error generating family message: {err:#}");
                fallback_message(resident_name, category, staff_notes)
            }
        }
    }

    async fn generate(&self, resident_name: &str, category: UpdateCategory, staff_notes: &str) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.endpoint.trim_end_matches('/'),
            self.settings.model
        );
        let body = json!({
            "contents": [{
                "parts": [{ "text": family_update_prompt(resident_name, category, staff_notes) }]
            }]
        });

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, self.settings.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| e.without_url())
            .context("generation request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("generation backend returned {status}");
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| e.without_url())
            .context("generation response unreadable")?;

        response_text(parsed).ok_or_else(|| anyhow!("generation backend returned no text"))
    }
}
