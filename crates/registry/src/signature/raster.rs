//! Conversion of pointer strokes into an RGBA raster.

use serde::{Deserialize, Serialize};

use super::stroke::{Point, Stroke};
use crate::error::{Error, Result};

/// Width of every drawn line, in pixels.
pub const STROKE_WIDTH: f64 = 2.0;

/// Default blank border kept around the drawn signature, in pixels.
pub const DEFAULT_MARGIN: u32 = 10;

const INK: [u8; 4] = [0, 0, 0, 255];

/// Canvas fill used before strokes are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Background {
    /// Fully transparent; suited to compositing into exported documents.
    #[default]
    Transparent,
    /// Solid white; suited to flat previews.
    OpaqueWhite,
}

impl Background {
    fn fill(self) -> [u8; 4] {
        match self {
            Self::Transparent => [0, 0, 0, 0],
            Self::OpaqueWhite => [255, 255, 255, 255],
        }
    }
}

impl std::fmt::Display for Background {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transparent => write!(f, "transparent"),
            Self::OpaqueWhite => write!(f, "opaque-white"),
        }
    }
}

/// Canvas settings for [`rasterize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterOptions {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Blank border on every side, in pixels.
    pub margin: u32,
    /// Canvas fill.
    pub background: Background,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            width: 400,
            height: 150,
            margin: DEFAULT_MARGIN,
            background: Background::Transparent,
        }
    }
}

impl RasterOptions {
    /// Create options for a canvas of the given size with default margin
    /// and background.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Set the margin.
    #[must_use]
    pub fn with_margin(mut self, margin: u32) -> Self {
        self.margin = margin;
        self
    }

    /// Set the background.
    #[must_use]
    pub fn with_background(mut self, background: Background) -> Self {
        self.background = background;
        self
    }
}

/// An 8-bit RGBA image held in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl std::fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

impl RasterImage {
    /// Create an image filled with a single colour.
    #[must_use]
    pub fn new(width: u32, height: u32, fill: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * 4);
        for _ in 0..count {
            pixels.extend_from_slice(&fill);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Image width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes, row-major.
    #[must_use]
    pub fn as_rgba(&self) -> &[u8] {
        &self.pixels
    }

    /// The pixel at `(x, y)`, or `None` outside the image.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    /// Whether the pixel at `(x, y)` is dark and mostly opaque.
    #[must_use]
    pub fn is_inked(&self, x: u32, y: u32) -> bool {
        self.pixel(x, y)
            .is_some_and(|[r, g, b, a]| a >= 128 && r.max(g).max(b) < 128)
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)` of inked pixels, inclusive.
    #[must_use]
    pub fn ink_bounds(&self) -> Option<(u32, u32, u32, u32)> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for y in 0..self.height {
            for x in 0..self.width {
                if !self.is_inked(x, y) {
                    continue;
                }
                bounds = Some(match bounds {
                    None => (x, y, x, y),
                    Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                });
            }
        }
        bounds
    }

    /// Split into packed RGB bytes and a separate alpha channel.
    #[must_use]
    pub fn rgb_and_alpha(&self) -> (Vec<u8>, Vec<u8>) {
        let count = self.pixels.len() / 4;
        let mut rgb = Vec::with_capacity(count * 3);
        let mut alpha = Vec::with_capacity(count);
        for px in self.pixels.chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
            alpha.push(px[3]);
        }
        (rgb, alpha)
    }

    /// Encode as an RGBA PNG.
    ///
    /// # Errors
    ///
    /// Returns an error if the PNG encoder rejects the image.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&self.pixels)?;
            writer.finish()?;
        }
        Ok(out)
    }

    /// Decode a PNG of any common colour type into RGBA.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a decodable PNG.
    pub fn from_png(bytes: &[u8]) -> Result<Self> {
        let mut decoder = png::Decoder::new(bytes);
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        let mut reader = decoder.read_info()?;
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf)?;
        buf.truncate(info.buffer_size());

        let pixels = match info.color_type {
            png::ColorType::Rgba => buf,
            png::ColorType::Rgb => buf
                .chunks_exact(3)
                .flat_map(|px| [px[0], px[1], px[2], 255])
                .collect(),
            png::ColorType::GrayscaleAlpha => buf
                .chunks_exact(2)
                .flat_map(|px| [px[0], px[0], px[0], px[1]])
                .collect(),
            png::ColorType::Grayscale => buf.iter().flat_map(|&v| [v, v, v, 255]).collect(),
            png::ColorType::Indexed => {
                return Err(Error::internal("indexed PNG was not expanded"));
            }
        };

        if pixels.len() != info.width as usize * info.height as usize * 4 {
            return Err(Error::internal(format!(
                "decoded PNG has {} bytes for {}x{}",
                pixels.len(),
                info.width,
                info.height
            )));
        }

        Ok(Self {
            width: info.width,
            height: info.height,
            pixels,
        })
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    fn put(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = self.offset(x, y);
        self.pixels[i..i + 4].copy_from_slice(&rgba);
    }

    /// Ink every pixel whose centre lies within `width / 2` of segment `a-b`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn draw_segment(&mut self, a: Point, b: Point, width: f64, rgba: [u8; 4]) {
        let half = width / 2.0;
        let max_x = f64::from(self.width) - 1.0;
        let max_y = f64::from(self.height) - 1.0;

        let x0 = (a.x.min(b.x) - half).floor().clamp(0.0, max_x) as u32;
        let x1 = (a.x.max(b.x) + half).ceil().clamp(0.0, max_x) as u32;
        let y0 = (a.y.min(b.y) - half).floor().clamp(0.0, max_y) as u32;
        let y1 = (a.y.max(b.y) + half).ceil().clamp(0.0, max_y) as u32;

        for py in y0..=y1 {
            for px in x0..=x1 {
                let centre = Point::new(f64::from(px) + 0.5, f64::from(py) + 0.5);
                if distance_to_segment(centre, a, b) <= half {
                    self.put(px, py, rgba);
                }
            }
        }
    }
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    let t = if len2 == 0.0 {
        0.0
    } else {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0)
    };
    let (cx, cy) = (a.x + t * dx, a.y + t * dy);
    ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt()
}

/// Axis-aligned bounds over every usable point of every stroke.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Bounds {
    fn of(strokes: &[Stroke]) -> Option<Self> {
        let mut points = strokes.iter().flat_map(Stroke::points);
        let first = points.next()?;
        let init = Self {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        Some(points.fold(init, |b, p| Self {
            min_x: b.min_x.min(p.x),
            min_y: b.min_y.min(p.y),
            max_x: b.max_x.max(p.x),
            max_y: b.max_y.max(p.y),
        }))
    }

    fn x_span(&self) -> Span {
        Span::new(self.min_x, self.max_x)
    }

    fn y_span(&self) -> Span {
        Span::new(self.min_y, self.max_y)
    }
}

/// One axis of the bounds, measured in `unit`-sized steps so that the extent
/// of finite coordinates is always finite.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Span {
    min: f64,
    extent: f64,
    unit: f64,
}

impl Span {
    fn new(min: f64, max: f64) -> Self {
        let extent = max - min;
        if extent.is_finite() {
            Self {
                min,
                extent,
                unit: 1.0,
            }
        } else {
            Self {
                min,
                extent: max / 2.0 - min / 2.0,
                unit: 2.0,
            }
        }
    }

    fn is_degenerate(self) -> bool {
        self.extent <= 0.0
    }

    /// Pixels per input unit that fit this span into `room` pixels.
    fn fit(self, room: f64) -> f64 {
        room / self.extent / self.unit
    }

    fn map(self, value: f64, scale: f64, margin: f64) -> f64 {
        (value / self.unit - self.min / self.unit) * (scale * self.unit) + margin
    }
}

/// Render strokes onto a canvas, scaled uniformly to fit inside the margin.
///
/// Returns `None` when there is nothing meaningful to draw: no points, no
/// stroke with a drawable segment, a zero-width or zero-height bounding box,
/// a canvas too small for its margins, or a bounding box so small that its
/// scale overflows.
#[must_use]
pub fn rasterize(strokes: &[Stroke], options: &RasterOptions) -> Option<RasterImage> {
    if !strokes.iter().any(Stroke::is_drawable) {
        return None;
    }

    let bounds = Bounds::of(strokes)?;
    let (xs, ys) = (bounds.x_span(), bounds.y_span());
    if xs.is_degenerate() || ys.is_degenerate() {
        return None;
    }

    let margin = f64::from(options.margin);
    let usable_w = f64::from(options.width) - 2.0 * margin;
    let usable_h = f64::from(options.height) - 2.0 * margin;
    let scale = xs.fit(usable_w).min(ys.fit(usable_h));
    if !scale.is_finite() || scale <= 0.0 {
        return None;
    }

    let map = |p: Point| Point::new(xs.map(p.x, scale, margin), ys.map(p.y, scale, margin));

    let mut image = RasterImage::new(options.width, options.height, options.background.fill());
    for stroke in strokes {
        for (a, b) in stroke.segments() {
            image.draw_segment(map(a), map(b), STROKE_WIDTH, INK);
        }
    }
    Some(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroke(points: &[(f64, f64)]) -> Stroke {
        Stroke::new(points.iter().map(|&(x, y)| Point::new(x, y)))
    }

    #[test]
    fn test_empty_input_is_absent() {
        assert!(rasterize(&[], &RasterOptions::default()).is_none());
    }

    #[test]
    fn test_single_point_is_absent() {
        let strokes = vec![stroke(&[(3.0, 4.0)])];
        assert!(rasterize(&strokes, &RasterOptions::default()).is_none());
    }

    #[test]
    fn test_horizontal_line_is_absent() {
        let strokes = vec![stroke(&[(0.0, 4.0), (10.0, 4.0)])];
        assert!(rasterize(&strokes, &RasterOptions::default()).is_none());
    }

    #[test]
    fn test_vertical_line_is_absent() {
        let strokes = vec![stroke(&[(2.0, 0.0), (2.0, 10.0)])];
        assert!(rasterize(&strokes, &RasterOptions::default()).is_none());
    }

    #[test]
    fn test_canvas_smaller_than_margins_is_absent() {
        let strokes = vec![stroke(&[(0.0, 0.0), (10.0, 10.0)])];
        let options = RasterOptions::new(10, 10).with_margin(5);
        assert!(rasterize(&strokes, &options).is_none());
    }

    #[test]
    fn test_two_strokes_stay_disjoint() {
        let strokes = vec![
            stroke(&[(0.0, 0.0), (10.0, 0.0)]),
            stroke(&[(0.0, 10.0), (10.0, 10.0)]),
        ];
        let options = RasterOptions::new(100, 100).with_margin(5);
        let image = rasterize(&strokes, &options).unwrap();

        assert!(image.is_inked(50, 5));
        assert!(image.is_inked(50, 95));
        assert!(image.is_inked(5, 5));
        assert!(image.is_inked(95, 95));

        // A connector from (95, 5) to (5, 95) would cross the centre.
        for y in 8..92 {
            assert!(!image.is_inked(50, y), "unexpected ink at (50, {y})");
        }
        assert!(!image.is_inked(50, 50));
    }

    #[test]
    fn test_uniform_scale_preserves_proportions() {
        // 20 wide, 10 tall on a square canvas: width-limited.
        let strokes = vec![stroke(&[(0.0, 0.0), (20.0, 10.0)])];
        let options = RasterOptions::new(110, 110).with_margin(5);
        let image = rasterize(&strokes, &options).unwrap();
        let (_, _, max_x, max_y) = image.ink_bounds().unwrap();
        assert!(max_x >= 100);
        // scale = 5, so the line ends near y = 55.
        assert!((54..=56).contains(&max_y));
    }

    #[test]
    fn test_extreme_coordinates_still_render() {
        let strokes = vec![stroke(&[(-1e308, 0.0), (1e308, 10.0)])];
        let options = RasterOptions::new(100, 100).with_margin(5);
        let image = rasterize(&strokes, &options).unwrap();
        let (x0, _, x1, y1) = image.ink_bounds().unwrap();
        assert!(x0 <= 5 && x1 >= 94);
        assert!(y1 <= 95);

        let tall = vec![stroke(&[(0.0, f64::MAX), (3.0, -f64::MAX)])];
        assert!(rasterize(&tall, &options).is_some());
    }

    #[test]
    fn test_ink_stays_inside_margin() {
        let strokes = vec![stroke(&[(-50.0, 3.0), (10.0, 90.0), (200.0, -7.5)])];
        let options = RasterOptions::new(300, 120).with_margin(8);
        let image = rasterize(&strokes, &options).unwrap();
        let (x0, y0, x1, y1) = image.ink_bounds().unwrap();
        assert!(x0 >= 6 && y0 >= 6);
        assert!(x1 <= 300 - 8 + 1 && y1 <= 120 - 8 + 1);
    }

    #[test]
    fn test_transparent_background() {
        let strokes = vec![stroke(&[(0.0, 0.0), (10.0, 10.0)])];
        let image = rasterize(&strokes, &RasterOptions::new(50, 50)).unwrap();
        assert_eq!(image.pixel(0, 49), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_opaque_white_background() {
        let strokes = vec![stroke(&[(0.0, 0.0), (10.0, 10.0)])];
        let options = RasterOptions::new(50, 50).with_background(Background::OpaqueWhite);
        let image = rasterize(&strokes, &options).unwrap();
        assert_eq!(image.pixel(0, 49), Some([255, 255, 255, 255]));
        assert!(image.is_inked(25, 25));
    }

    #[test]
    fn test_undrawable_stroke_does_not_abort() {
        let strokes = vec![
            Stroke::with_gaps(vec![Some(Point::new(0.0, 0.0)), None]),
            stroke(&[(0.0, 0.0), (10.0, 10.0)]),
        ];
        assert!(rasterize(&strokes, &RasterOptions::new(60, 60)).is_some());
    }

    #[test]
    fn test_rasterize_is_deterministic() {
        let strokes = vec![stroke(&[(1.0, 2.0), (7.5, 9.25), (3.0, 4.0)])];
        let options = RasterOptions::new(80, 40);
        assert_eq!(rasterize(&strokes, &options), rasterize(&strokes, &options));
    }

    #[test]
    fn test_png_round_trip() {
        let strokes = vec![stroke(&[(0.0, 0.0), (10.0, 10.0)])];
        let image = rasterize(&strokes, &RasterOptions::new(40, 30)).unwrap();
        let png = image.to_png().unwrap();
        assert_eq!(&png[1..4], b"PNG");
        let decoded = RasterImage::from_png(&png).unwrap();
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_from_png_rejects_garbage() {
        assert!(RasterImage::from_png(b"definitely not a png").is_err());
    }

    #[test]
    fn test_rgb_and_alpha_split() {
        let image = RasterImage::new(2, 1, [10, 20, 30, 40]);
        let (rgb, alpha) = image.rgb_and_alpha();
        assert_eq!(rgb, vec![10, 20, 30, 10, 20, 30]);
        assert_eq!(alpha, vec![40, 40]);
    }

    #[test]
    fn test_background_serde() {
        let json = serde_json::to_string(&Background::OpaqueWhite).unwrap();
        assert_eq!(json, "\"opaque-white\"");
        let parsed: Background = serde_json::from_str("\"transparent\"").unwrap();
        assert_eq!(parsed, Background::Transparent);
    }
}
