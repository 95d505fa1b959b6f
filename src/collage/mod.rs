//! Strip collage compositor for multi-photo updates.
//!
//! Images are normalised to one height, placed left to right in capture order with a
//! background-coloured gutter over each seam, and encoded as a single JPEG.

pub mod compositor;
pub mod config;
pub mod decode;
pub mod error;
pub mod layout;
pub mod surface;

pub use compositor::{compose, encode_strip, render_strip, CompositeImage};
pub use config::CollageConfig;
pub use error::CollageError;
pub use layout::StripLayout;
pub use surface::{RasterSurface, Surface};
