use std::{fmt, str::FromStr};

use anyhow::{anyhow, Error};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateCategory {
    Breakfast,
    Lunch,
    Dinner,
    #[serde(rename = "Vital Signs")]
    Vitals,
    Glucose,
    #[serde(rename = "General Update")]
    General,
}

/// Per-category capture rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryPolicy {
    pub max_images: usize,
    /// Multi-image submissions are merged into one collage.
    pub collage: bool,
}

const SINGLE_PHOTO: CategoryPolicy = CategoryPolicy {
    max_images: 1,
    collage: false,
};

const READINGS: CategoryPolicy = CategoryPolicy {
    max_images: 3,
    collage: true,
};

impl UpdateCategory {
    pub const ALL: [UpdateCategory; 6] = [
        UpdateCategory::Breakfast,
        UpdateCategory::Lunch,
        UpdateCategory::Dinner,
        UpdateCategory::Vitals,
        UpdateCategory::Glucose,
        UpdateCategory::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateCategory::Breakfast => "Breakfast",
            UpdateCategory::Lunch => "Lunch",
            UpdateCategory::Dinner => "Dinner",
            UpdateCategory::Vitals => "Vital Signs",
            UpdateCategory::Glucose => "Glucose",
            UpdateCategory::General => "General Update",
        }
    }

    pub fn policy(&self) -> CategoryPolicy {
        match self {
            UpdateCategory::Vitals => READINGS,
            _ => SINGLE_PHOTO,
        }
    }

    pub fn should_collage(&self, image_count: usize) -> bool {
        self.policy().collage && image_count > 1
    }
}

impl fmt::Display for UpdateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateCategory {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "breakfast" => Ok(UpdateCategory::Breakfast),
            "lunch" => Ok(UpdateCategory::Lunch),
            "dinner" => Ok(UpdateCategory::Dinner),
            "vital signs" | "vitals" => Ok(UpdateCategory::Vitals),
            "glucose" => Ok(UpdateCategory::Glucose),
            "general update" | "general" => Ok(UpdateCategory::General),
            _ => Err(anyhow!("unknown update category '{value}'")),
        }
    }
}
