//! Pointer stroke data captured from a signature pad.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

/// A single sampled pointer position in input-device coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Read a point from a JSON object with numeric `x` and `y` members.
    ///
    /// Returns `None` when either coordinate is missing, non-numeric or not
    /// finite.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let x = value.get("x")?.as_f64()?;
        let y = value.get("y")?.as_f64()?;
        if x.is_finite() && y.is_finite() {
            Some(Self { x, y })
        } else {
            None
        }
    }
}

/// One continuous pointer drag.
///
/// Entries that could not be read as a point are kept as gaps so that the
/// segments on either side of them are not joined.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stroke {
    points: Vec<Option<Point>>,
}

impl Stroke {
    /// Create a stroke from well-formed points.
    #[must_use]
    pub fn new(points: impl IntoIterator<Item = Point>) -> Self {
        Self {
            points: points.into_iter().map(Some).collect(),
        }
    }

    /// Create a stroke whose entries may contain unreadable points.
    #[must_use]
    pub fn with_gaps(points: Vec<Option<Point>>) -> Self {
        Self { points }
    }

    /// Number of raw entries, including gaps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the stroke has no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate over the usable points of this stroke.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.points.iter().flatten().copied()
    }

    /// Iterate over drawable segments: adjacent entries that are both usable.
    pub fn segments(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        self.points.windows(2).filter_map(|pair| match (pair[0], pair[1]) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        })
    }

    /// Whether this stroke contributes at least one segment.
    #[must_use]
    pub fn is_drawable(&self) -> bool {
        self.segments().next().is_some()
    }

    pub(crate) fn entries(&self) -> &[Option<Point>] {
        &self.points
    }
}

/// Parse raw signature-pad JSON into strokes.
///
/// Accepts a list of stroke objects (`[{"points": [...]}, ...]`), a list of
/// point lists (`[[{"x":..,"y":..}, ...], ...]`), or a flat list of points,
/// which is read as a single stroke. Anything unparsable yields no strokes.
#[must_use]
pub fn parse_strokes(raw: &str) -> Vec<Stroke> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(value) => strokes_from_value(&value),
        Err(e) => {
            debug!("Ignoring unparsable signature data: {}", e);
            Vec::new()
        }
    }
}

/// Read strokes out of an already-parsed JSON value.
#[must_use]
pub fn strokes_from_value(value: &Value) -> Vec<Stroke> {
    let Some(items) = value.as_array() else {
        debug!("Ignoring signature data whose root is not an array");
        return Vec::new();
    };

    if items.iter().any(is_stroke_like) {
        items
            .iter()
            .filter_map(|item| {
                let stroke = stroke_from_value(item);
                if stroke.is_none() {
                    trace!("Skipping non-stroke entry in signature data");
                }
                stroke
            })
            .collect()
    } else if items.is_empty() {
        Vec::new()
    } else {
        // Legacy flat point list.
        vec![Stroke::with_gaps(items.iter().map(Point::from_value).collect())]
    }
}

fn is_stroke_like(value: &Value) -> bool {
    value.is_array() || value.get("points").is_some_and(Value::is_array)
}

fn stroke_from_value(value: &Value) -> Option<Stroke> {
    let points = match value {
        Value::Array(points) => points,
        Value::Object(map) => map.get("points")?.as_array()?,
        _ => return None,
    };
    Some(Stroke::with_gaps(points.iter().map(Point::from_value).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_from_value() {
        let value = serde_json::json!({"x": 1.5, "y": 2});
        assert_eq!(Point::from_value(&value), Some(Point::new(1.5, 2.0)));
    }

    #[test]
    fn test_point_missing_coordinate() {
        assert!(Point::from_value(&serde_json::json!({"x": 1.0})).is_none());
        assert!(Point::from_value(&serde_json::json!({"y": 1.0})).is_none());
        assert!(Point::from_value(&serde_json::json!({"x": "a", "y": 1})).is_none());
        assert!(Point::from_value(&serde_json::json!(42)).is_none());
    }

    #[test]
    fn test_parse_stroke_objects() {
        let raw = r#"[{"points":[{"x":0,"y":0},{"x":10,"y":0}]},{"points":[{"x":0,"y":5}]}]"#;
        let strokes = parse_strokes(raw);
        assert_eq!(strokes.len(), 2);
        assert_eq!(strokes[0].len(), 2);
        assert!(strokes[0].is_drawable());
        assert!(!strokes[1].is_drawable());
    }

    #[test]
    fn test_parse_nested_arrays() {
        let raw = r#"[[{"x":0,"y":0},{"x":10,"y":0}],[{"x":0,"y":10},{"x":10,"y":10}]]"#;
        let strokes = parse_strokes(raw);
        assert_eq!(strokes.len(), 2);
        assert_eq!(strokes[1].points().next(), Some(Point::new(0.0, 10.0)));
    }

    #[test]
    fn test_parse_flat_points_as_single_stroke() {
        let raw = r#"[{"x":0,"y":0},{"x":3,"y":4},{"x":6,"y":0}]"#;
        let strokes = parse_strokes(raw);
        assert_eq!(strokes.len(), 1);
        assert_eq!(strokes[0].segments().count(), 2);
    }

    #[test]
    fn test_malformed_point_breaks_segment() {
        let raw = r#"[[{"x":0,"y":0},{"x":5},{"x":10,"y":0},{"x":20,"y":0}]]"#;
        let strokes = parse_strokes(raw);
        assert_eq!(strokes[0].len(), 4);
        assert_eq!(strokes[0].points().count(), 3);
        let segments: Vec<_> = strokes[0].segments().collect();
        assert_eq!(
            segments,
            vec![(Point::new(10.0, 0.0), Point::new(20.0, 0.0))]
        );
    }

    #[test]
    fn test_parse_garbage_yields_nothing() {
        assert!(parse_strokes("").is_empty());
        assert!(parse_strokes("not json").is_empty());
        assert!(parse_strokes(r#"{"x":1,"y":2}"#).is_empty());
        assert!(parse_strokes("[]").is_empty());
    }

    #[test]
    fn test_non_stroke_entries_skipped() {
        let raw = r#"[[{"x":0,"y":0},{"x":1,"y":1}], 7, "text"]"#;
        let strokes = parse_strokes(raw);
        assert_eq!(strokes.len(), 1);
    }

    #[test]
    fn test_empty_stroke() {
        let stroke = Stroke::default();
        assert!(stroke.is_empty());
        assert!(!stroke.is_drawable());
    }
}
