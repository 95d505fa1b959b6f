use serde::{Deserialize, Serialize};

use super::CollageError;

/// Tallest strip the compositor will allocate. Keeps a full-width canvas within a few GB.
pub const MAX_TARGET_HEIGHT: u32 = 8_192;

/// Tunable parameters for the strip compositor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollageConfig {
    /// Height every image is scaled to before concatenation.
    pub target_height: u32,

    /// Stroke width of the gutter drawn over each boundary between two images.
    pub divider_width: f64,

    /// Lossy encode quality on a 0-1 scale.
    pub jpeg_quality: f32,

    /// Canvas fill, also used for the dividers.
    pub background: [u8; 3],
}

impl Default for CollageConfig {
    fn default() -> Self {
        Self {
            target_height: 1000,
            divider_width: 8.0,
            jpeg_quality: 0.85,
            background: [255, 255, 255],
        }
    }
}

impl CollageConfig {
    pub fn validate(&self) -> Result<(), CollageError> {
        if self.target_height == 0 {
            return Err(CollageError::InvalidInput(
                "target height must be greater than zero".into(),
            ));
        }
        if self.target_height > MAX_TARGET_HEIGHT {
            return Err(CollageError::InvalidInput(format!(
                "target height {} exceeds the {MAX_TARGET_HEIGHT}px limit",
                self.target_height
            )));
        }
        if !self.divider_width.is_finite() || self.divider_width < 0.0 {
            return Err(CollageError::InvalidInput(format!(
                "divider width {} is not a non-negative number",
                self.divider_width
            )));
        }
        if !(self.jpeg_quality > 0.0 && self.jpeg_quality <= 1.0) {
            return Err(CollageError::InvalidInput(format!(
                "jpeg quality {} is outside (0, 1]",
                self.jpeg_quality
            )));
        }
        Ok(())
    }

    /// Quality mapped onto the encoder's 1-100 scale.
    pub fn encoder_quality(&self) -> u8 {
        (self.jpeg_quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}
