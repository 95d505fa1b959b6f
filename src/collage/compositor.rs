use std::sync::Arc;

use image::DynamicImage;
use log::info;

use super::{
    decode::decode_all,
    layout::{divider_span, StripLayout},
    surface::{RasterSurface, Surface},
    CollageConfig, CollageError,
};

/// Result of compositing a capture set.
#[derive(Debug, Clone, PartialEq)]
pub enum CompositeImage {
    /// Single-image capture sets pass through byte for byte.
    Original(Vec<u8>),
    Collage {
        jpeg: Vec<u8>,
        width: u32,
        height: u32,
    },
}

impl CompositeImage {
    pub fn bytes(&self) -> &[u8] {
        match self {
            CompositeImage::Original(bytes) => bytes,
            CompositeImage::Collage { jpeg, .. } => jpeg,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            CompositeImage::Original(bytes) => bytes,
            CompositeImage::Collage { jpeg, .. } => jpeg,
        }
    }

    pub fn is_collage(&self) -> bool {
        matches!(self, CompositeImage::Collage { .. })
    }
}

/// Draw decoded images onto a fresh surface as a fixed-height strip.
pub fn render_strip<S: Surface>(
    images: &[DynamicImage],
    config: &CollageConfig,
) -> Result<S, CollageError> {
    config.validate()?;

    let dimensions: Vec<(u32, u32)> = images.iter().map(|img| (img.width(), img.height())).collect();
    let layout = StripLayout::plan(&dimensions, config.target_height)?;
    layout.fits_jpeg()?;

    let canvas_width = layout.canvas_width();
    let mut surface = S::allocate(canvas_width, layout.height, config.background)?;

    for slot in &layout.slots {
        let (start, end) = slot.pixel_span();
        surface.blit_scaled(&images[slot.index], start, end - start);

        // Gutter goes on after the right-hand image so it covers both edges.
        if slot.index > 0 {
            if let Some((from, to)) = divider_span(slot.x, config.divider_width, canvas_width) {
                surface.fill_columns(from, to, config.background);
            }
        }
    }

    Ok(surface)
}

/// Render and encode already-decoded images.
pub fn encode_strip(
    images: &[DynamicImage],
    config: &CollageConfig,
) -> Result<CompositeImage, CollageError> {
    let surface: RasterSurface = render_strip(images, config)?;
    let (width, height) = surface.dimensions();
    let jpeg = surface.encode_jpeg(config.encoder_quality())?;

    info!(
        "Composed {}x{} collage from {} images ({} bytes)",
        width,
        height,
        images.len(),
        jpeg.len()
    );

    Ok(CompositeImage::Collage {
        jpeg,
        width,
        height,
    })
}

/// Combine a capture set into one image.
///
/// One image comes back untouched. Two or more are decoded concurrently, laid out
/// left to right in the order given and encoded as a single JPEG.
pub async fn compose(
    mut captures: Vec<Vec<u8>>,
    config: &CollageConfig,
) -> Result<CompositeImage, CollageError> {
    match captures.len() {
        0 => return Err(CollageError::InvalidInput("capture set is empty".into())),
        1 => {
            if let Some(only) = captures.pop() {
                return Ok(CompositeImage::Original(only));
            }
        }
        _ => {}
    }

    config.validate()?;

    let buffers: Vec<Arc<[u8]>> = captures.into_iter().map(Arc::from).collect();
    let images = decode_all(&buffers).await?;

    let config = config.clone();
    tokio::task::spawn_blocking(move || encode_strip(&images, &config))
        .await
        .map_err(|err| CollageError::EncodeError(format!("render worker failed: {err}")))?
}
