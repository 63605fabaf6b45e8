//! Signature capture.
//!
//! A signature arrives as pointer strokes recorded by a signature pad. This
//! module turns those strokes into a PNG image that can be stored with a
//! registry entry and embedded in exported documents:
//!
//! - [`parse_strokes`] reads the raw JSON leniently, keeping unreadable points
//!   as gaps instead of failing.
//! - [`rasterize`] scales the strokes uniformly onto a fixed-size canvas and
//!   draws each stroke on its own.
//! - [`render_signature`] does both and packages the result as a
//!   [`SignatureImage`], including a digest of the strokes it came from.
//!
//! Input that has nothing to draw is not an error; it simply produces no
//! image.
//!
//! # Example
//!
//! ```
//! use community_registry::signature::{render_signature, RasterOptions};
//!
//! let raw = r#"[[{"x":0,"y":0},{"x":40,"y":12}],[{"x":5,"y":20},{"x":35,"y":20}]]"#;
//! let image = render_signature(raw, &RasterOptions::default()).unwrap();
//! assert!(image.is_some());
//!
//! let nothing = render_signature("[]", &RasterOptions::default()).unwrap();
//! assert!(nothing.is_none());
//! ```

mod raster;
mod stroke;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

pub use raster::{rasterize, Background, RasterImage, RasterOptions, DEFAULT_MARGIN, STROKE_WIDTH};
pub use stroke::{parse_strokes, strokes_from_value, Point, Stroke};

/// A rendered signature attached to a registry entry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureImage {
    /// PNG-encoded RGBA image.
    #[serde(skip)]
    pub png: Vec<u8>,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// BLAKE3 digest of the strokes this image was rendered from.
    pub stroke_digest: String,
}

impl std::fmt::Debug for SignatureImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("png_bytes", &self.png.len())
            .field("stroke_digest", &self.stroke_digest)
            .finish()
    }
}

impl SignatureImage {
    /// Decode the stored PNG back into pixels.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored bytes are not a valid PNG.
    pub fn decode(&self) -> Result<RasterImage> {
        RasterImage::from_png(&self.png)
    }

    /// File name used when the image is written out for a record.
    #[must_use]
    pub fn file_name(record_id: i64) -> String {
        format!("signature_{record_id}.png")
    }

    /// Whether this image was rendered from exactly these strokes.
    #[must_use]
    pub fn matches(&self, strokes: &[Stroke]) -> bool {
        self.stroke_digest == stroke_digest(strokes)
    }
}

/// Compute a stable digest of stroke data, gaps included.
#[must_use]
pub fn stroke_digest(strokes: &[Stroke]) -> String {
    let mut hasher = blake3::Hasher::new();
    for stroke in strokes {
        hasher.update(b"S");
        for entry in stroke.entries() {
            match entry {
                Some(p) => {
                    hasher.update(b"P");
                    hasher.update(&p.x.to_bits().to_le_bytes());
                    hasher.update(&p.y.to_bits().to_le_bytes());
                }
                None => {
                    hasher.update(b"_");
                }
            }
        }
    }
    hasher.finalize().to_hex().to_string()
}

/// Render already-parsed strokes into a [`SignatureImage`].
///
/// # Errors
///
/// Returns an error only if PNG encoding fails.
pub fn render_strokes(strokes: &[Stroke], options: &RasterOptions) -> Result<Option<SignatureImage>> {
    let Some(image) = rasterize(strokes, options) else {
        debug!(
            "Signature with {} stroke(s) has nothing to draw",
            strokes.len()
        );
        return Ok(None);
    };

    let png = image.to_png()?;
    debug!(
        "Rendered signature {}x{} ({} bytes)",
        image.width(),
        image.height(),
        png.len()
    );

    Ok(Some(SignatureImage {
        png,
        width: image.width(),
        height: image.height(),
        stroke_digest: stroke_digest(strokes),
    }))
}

/// Parse raw signature-pad JSON and render it.
///
/// # Errors
///
/// Returns an error only if PNG encoding fails; malformed input yields
/// `Ok(None)`.
pub fn render_signature(raw: &str, options: &RasterOptions) -> Result<Option<SignatureImage>> {
    render_strokes(&parse_strokes(raw), options)
}
