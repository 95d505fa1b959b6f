//! Strip geometry: every image scaled to a common height and laid out left to right.
//!
//! Widths stay real-valued until a slot is turned into pixel bounds, so rounding never
//! accumulates along the strip.

use super::CollageError;

/// Largest width or height a baseline JPEG can carry.
pub const MAX_JPEG_DIMENSION: u32 = 65_535;

/// Placement of one image inside the strip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slot {
    pub index: usize,
    pub x: f64,
    pub width: f64,
}

impl Slot {
    /// Half-open pixel column range `[start, end)` covered by this slot.
    pub fn pixel_span(&self) -> (u32, u32) {
        let start = self.x.round() as u32;
        let end = (self.x + self.width).round() as u32;
        (start, end.max(start))
    }

    pub fn pixel_width(&self) -> u32 {
        let (start, end) = self.pixel_span();
        end - start
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StripLayout {
    pub height: u32,
    pub width: f64,
    pub slots: Vec<Slot>,
}

impl StripLayout {
    /// Plan the strip for images given as `(width, height)` in capture order.
    pub fn plan(dimensions: &[(u32, u32)], target_height: u32) -> Result<Self, CollageError> {
        if dimensions.is_empty() {
            return Err(CollageError::InvalidInput("capture set is empty".into()));
        }
        if target_height == 0 {
            return Err(CollageError::InvalidInput(
                "target height must be greater than zero".into(),
            ));
        }

        let height = f64::from(target_height);
        let mut cursor = 0.0_f64;
        let mut slots = Vec::with_capacity(dimensions.len());

        for (index, &(w, h)) in dimensions.iter().enumerate() {
            if w == 0 || h == 0 {
                return Err(CollageError::DecodeError {
                    index,
                    reason: format!("image has a zero dimension ({w}x{h})"),
                });
            }
            let width = height * (f64::from(w) / f64::from(h));
            slots.push(Slot {
                index,
                x: cursor,
                width,
            });
            cursor += width;
        }

        Ok(Self {
            height: target_height,
            width: cursor,
            slots,
        })
    }

    /// Raster width of the canvas. Matches the end of the last slot.
    pub fn canvas_width(&self) -> u32 {
        let rounded = self.width.round();
        if rounded >= f64::from(u32::MAX) {
            u32::MAX
        } else {
            (rounded as u32).max(1)
        }
    }

    /// x coordinates shared by adjacent slots (one fewer than the number of slots).
    pub fn boundaries(&self) -> impl Iterator<Item = f64> + '_ {
        self.slots.iter().skip(1).map(|slot| slot.x)
    }

    pub fn fits_jpeg(&self) -> Result<(), CollageError> {
        let width = self.canvas_width();
        if width > MAX_JPEG_DIMENSION || self.height > MAX_JPEG_DIMENSION {
            return Err(CollageError::EncodeError(format!(
                "collage of {width}x{} exceeds the JPEG limit of {MAX_JPEG_DIMENSION}px",
                self.height
            )));
        }
        Ok(())
    }
}

/// Pixel columns covered by a divider of `stroke` width centred on `boundary`, clipped to the canvas.
pub fn divider_span(boundary: f64, stroke: f64, canvas_width: u32) -> Option<(u32, u32)> {
    let half = stroke / 2.0;
    let start = (boundary - half).round().max(0.0);
    let end = (boundary + half).round().min(f64::from(canvas_width));
    if end > start {
        Some((start as u32, end as u32))
    } else {
        None
    }
}
