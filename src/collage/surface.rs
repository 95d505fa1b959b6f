use image::{
    codecs::jpeg::JpegEncoder, imageops, imageops::FilterType, DynamicImage, Rgb, RgbImage,
    Rgba, RgbaImage,
};

use super::CollageError;

/// Minimal raster canvas the compositor draws through.
pub trait Surface: Sized {
    fn allocate(width: u32, height: u32, background: [u8; 3]) -> Result<Self, CollageError>;

    fn dimensions(&self) -> (u32, u32);

    /// Stretch `image` over columns `[x, x + width)` and the full canvas height.
    fn blit_scaled(&mut self, image: &DynamicImage, x: u32, width: u32);

    /// Paint columns `[start, end)` top to bottom.
    fn fill_columns(&mut self, start: u32, end: u32, color: [u8; 3]);

    fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>, CollageError>;
}

/// `Surface` backed by an in-memory RGBA buffer from the `image` crate.
pub struct RasterSurface {
    canvas: RgbaImage,
}

impl RasterSurface {
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.canvas.get_pixel(x, y).0
    }
}

impl Surface for RasterSurface {
    fn allocate(width: u32, height: u32, background: [u8; 3]) -> Result<Self, CollageError> {
        if width == 0 || height == 0 {
            return Err(CollageError::InvalidInput(format!(
                "cannot allocate a {width}x{height} canvas"
            )));
        }
        let [r, g, b] = background;
        Ok(Self {
            canvas: RgbaImage::from_pixel(width, height, Rgba([r, g, b, 255])),
        })
    }

    fn dimensions(&self) -> (u32, u32) {
        self.canvas.dimensions()
    }

    fn blit_scaled(&mut self, image: &DynamicImage, x: u32, width: u32) {
        let (canvas_width, height) = self.canvas.dimensions();
        if width == 0 || x >= canvas_width {
            return;
        }
        let scaled = image
            .resize_exact(width, height, FilterType::Triangle)
            .to_rgba8();
        // Blends alpha over the opaque background already on the canvas.
        imageops::overlay(&mut self.canvas, &scaled, i64::from(x), 0);
    }

    fn fill_columns(&mut self, start: u32, end: u32, color: [u8; 3]) {
        let (width, height) = self.canvas.dimensions();
        let [r, g, b] = color;
        let fill = Rgba([r, g, b, 255]);
        for x in start..end.min(width) {
            for y in 0..height {
                self.canvas.put_pixel(x, y, fill);
            }
        }
    }

    fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>, CollageError> {
        let (width, height) = self.canvas.dimensions();
        let rgb = RgbImage::from_fn(width, height, |x, y| {
            let [r, g, b, _] = self.canvas.get_pixel(x, y).0;
            Rgb([r, g, b])
        });

        let mut bytes = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
        encoder
            .encode_image(&rgb)
            .map_err(|err| CollageError::EncodeError(err.to_string()))?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_filled_canvas() {
        let surface = RasterSurface::allocate(4, 3, [255, 255, 255]).unwrap();
        assert_eq!(surface.dimensions(), (4, 3));
        assert_eq!(surface.pixel(3, 2), [255, 255, 255, 255]);
    }

    #[test]
    fn zero_sized_canvas_is_rejected() {
        assert!(RasterSurface::allocate(0, 10, [255, 255, 255]).is_err());
    }

    #[test]
    fn transparent_pixels_show_background() {
        let mut surface = RasterSurface::allocate(10, 10, [255, 255, 255]).unwrap();
        let clear = DynamicImage::ImageRgba8(RgbaImage::from_pixel(5, 5, Rgba([0, 0, 0, 0])));
        surface.blit_scaled(&clear, 0, 10);
        assert_eq!(surface.pixel(5, 5), [255, 255, 255, 255]);
    }

    #[test]
    fn blit_stretches_into_slot_only() {
        let mut surface = RasterSurface::allocate(20, 10, [255, 255, 255]).unwrap();
        let red = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 7, Rgb([255, 0, 0])));
        surface.blit_scaled(&red, 5, 10);

        assert_eq!(surface.pixel(4, 5), [255, 255, 255, 255]);
        assert_eq!(surface.pixel(5, 0), [255, 0, 0, 255]);
        assert_eq!(surface.pixel(14, 9), [255, 0, 0, 255]);
        assert_eq!(surface.pixel(15, 5), [255, 255, 255, 255]);
    }

    #[test]
    fn encodes_decodable_jpeg() {
        let surface = RasterSurface::allocate(16, 8, [10, 20, 30]).unwrap();
        let bytes = surface.encode_jpeg(85).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }
}
