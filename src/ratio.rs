//! Aspect ratio and dimension resolution for a picture directive.
//!
//! The browser needs an aspect ratio before the image arrives, otherwise the
//! page jumps while pictures load. A directive can state it in several ways,
//! tried in this order (first usable value wins):
//!
//! 1. **Sized filename**: `istanbul/IMG_1850.800x600.jpg` → exactly 800×600.
//! 2. **`ratio` attribute**: `ratio="4:3"` or `ratio="1.5"`.
//! 3. **`orient` attribute**: `orient="portrait"` flips the default ratio.
//! 4. **Default**: 16:9 ([`DEFAULT_RATIO`]).
//!
//! Malformed values never fail the directive; they fall through to the next
//! strategy. When the size is not encoded in the filename, placeholder
//! dimensions are synthesized from the ratio ([`ImageDimensions::fake_from_ratio`])
//! so the page can still reserve the right amount of space.

use crate::scanner::AttributeMap;
use serde::Serialize;

/// 16:9, rounded the way it is written in directives.
pub const DEFAULT_RATIO: f64 = 1.777;

/// Decimal places kept for a ratio derived from a sized filename.
const FILENAME_RATIO_PRECISION: i32 = 2;

/// Decimal places kept for the portrait ratio.
const ORIENTATION_RATIO_PRECISION: i32 = 3;

/// Narrowest and widest `ratio` attribute accepted; anything outside falls through.
const MIN_RATIO: f64 = 0.01;
const MAX_RATIO: f64 = 100.0;

/// Pixel dimensions of a picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Parse dimensions encoded in a filename.
    ///
    /// - `"img/1.800x600.jpg"` → `Some(800×600)`
    /// - `"img/1.800x600"` → `Some(800×600)`
    /// - `"img/1.jpg"` → `None`
    /// - `"img/1.800x0.jpg"` → `None` (zero sides are rejected)
    pub fn from_filename(path: &str) -> Option<Self> {
        let filename = path.rsplit('/').next().unwrap_or(path);
        parse_size_suffix(filename).or_else(|| {
            let (stem, _ext) = filename.rsplit_once('.')?;
            parse_size_suffix(stem)
        })
    }

    /// Placeholder dimensions for an image whose true size is unknown.
    ///
    /// Width is `max_width`; height follows from the ratio and is at least 1.
    pub fn fake_from_ratio(ratio: f64, max_width: u32) -> Self {
        let height = (f64::from(max_width) / ratio).round().max(1.0) as u32;
        Self::new(max_width, height)
    }
}

/// Parse a trailing `<base>.<width>x<height>` with a non-empty base.
fn parse_size_suffix(name: &str) -> Option<ImageDimensions> {
    let (base, size) = name.rsplit_once('.')?;
    if base.is_empty() {
        return None;
    }
    let (width, height) = size.split_once('x')?;
    let width = parse_digits(width)?;
    let height = parse_digits(height)?;
    if width == 0 || height == 0 {
        return None;
    }
    Some(ImageDimensions::new(width, height))
}

fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Picture orientation requested through the `orient` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "landscape" => Some(Self::Landscape),
            "portrait" => Some(Self::Portrait),
            _ => None,
        }
    }
}

/// Which strategy produced a resolved ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatioSource {
    Filename,
    Attribute,
    Orientation,
    Default,
}

/// Outcome of ratio resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedRatio {
    pub ratio: f64,
    pub dimensions: ImageDimensions,
    pub source: RatioSource,
}

/// Resolve ratio and dimensions for a directive's attributes.
///
/// `max_width` sizes the placeholder dimensions used when the filename does
/// not carry the real size.
pub fn resolve(attrs: &AttributeMap, max_width: u32) -> ResolvedRatio {
    let src = attrs.get("src").map(String::as_str).unwrap_or_default();
    if let Some(dimensions) = ImageDimensions::from_filename(src) {
        let ratio = round_to(
            f64::from(dimensions.width) / f64::from(dimensions.height),
            FILENAME_RATIO_PRECISION,
        );
        return ResolvedRatio {
            ratio,
            dimensions,
            source: RatioSource::Filename,
        };
    }

    let (ratio, source) = attrs
        .get("ratio")
        .and_then(|value| parse_ratio(value))
        .map(|ratio| (ratio, RatioSource::Attribute))
        .or_else(|| {
            let portrait = attrs
                .get("orient")
                .and_then(|value| Orientation::parse(value))
                == Some(Orientation::Portrait);
            portrait.then(|| {
                (
                    round_to(1.0 / DEFAULT_RATIO, ORIENTATION_RATIO_PRECISION),
                    RatioSource::Orientation,
                )
            })
        })
        .unwrap_or((DEFAULT_RATIO, RatioSource::Default));

    ResolvedRatio {
        ratio,
        dimensions: ImageDimensions::fake_from_ratio(ratio, max_width),
        source,
    }
}

/// Parse a `ratio` attribute: `"W:H"` or a decimal.
///
/// Returns `None` for anything that does not yield a ratio between
/// `MIN_RATIO` and `MAX_RATIO`.
pub fn parse_ratio(value: &str) -> Option<f64> {
    let value = value.trim();
    let ratio = if let Some((width, height)) = value.split_once(':') {
        let width: u32 = width.trim().parse().ok()?;
        let height: u32 = height.trim().parse().ok()?;
        if height == 0 {
            tracing::debug!(value, "ignoring ratio with zero height");
            return None;
        }
        f64::from(width) / f64::from(height)
    } else {
        value.parse::<f64>().ok()?
    };
    if !(MIN_RATIO..=MAX_RATIO).contains(&ratio) {
        tracing::debug!(value, "ignoring out-of-range ratio");
        return None;
    }
    Some(ratio)
}

/// Round half away from zero to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}
