//! Parameter types for proxy requests.
//!
//! These describe *what* the image proxy should do with a source image. The
//! [`signer`](super::signer) serializes them into the request path, so their
//! order matters: [`ProcessingOptions`] keeps insertion order and never sorts.
//!
//! ## Types
//!
//! - [`ProcessingOptions`]: ordered `key:value` processing options.
//! - [`Quality`]: lossy encoding quality (1–100). Clamped on construction.
//! - [`Crop`] / [`Gravity`]: the `crop` directive attribute, validated.

use std::fmt;

/// Ordered processing options, serialized as `key:value` path segments.
///
/// Setting a key that already exists replaces its value in place, so the
/// option keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingOptions {
    entries: Vec<(String, String)>,
}

impl ProcessingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl fmt::Display) {
        let value = value.to_string();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    /// Set `key` only when a value is present.
    pub fn set_opt(&mut self, key: &str, value: Option<impl fmt::Display>) {
        if let Some(value) = value {
            self.set(key, value);
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// New options with `first` in front of every entry of `self`.
    pub fn prefixed(&self, first: &ProcessingOptions) -> ProcessingOptions {
        let mut merged = first.clone();
        for (key, value) in self.iter() {
            merged.set(key, value);
        }
        merged
    }

    /// Path form: `key:value` pairs joined by `/`.
    pub fn to_path(&self) -> String {
        self.iter()
            .map(|(k, v)| format!("{k}:{v}"))
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Quality setting for lossy encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(75)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Anchor point for a crop, using the proxy's gravity codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gravity {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
    Center,
    Smart,
}

impl Gravity {
    pub fn parse(code: &str) -> Option<Self> {
        Some(match code {
            "no" => Self::North,
            "so" => Self::South,
            "ea" => Self::East,
            "we" => Self::West,
            "noea" => Self::NorthEast,
            "nowe" => Self::NorthWest,
            "soea" => Self::SouthEast,
            "sowe" => Self::SouthWest,
            "ce" => Self::Center,
            "sm" => Self::Smart,
            _ => return None,
        })
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::North => "no",
            Self::South => "so",
            Self::East => "ea",
            Self::West => "we",
            Self::NorthEast => "noea",
            Self::NorthWest => "nowe",
            Self::SouthEast => "soea",
            Self::SouthWest => "sowe",
            Self::Center => "ce",
            Self::Smart => "sm",
        }
    }
}

/// A validated `crop` attribute: `W:H` or `W:H:gravity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crop {
    pub width: u32,
    pub height: u32,
    pub gravity: Option<Gravity>,
}

impl Crop {
    /// Parse a crop value. Anything malformed yields `None`.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.trim().split(':');
        let width: u32 = parts.next()?.parse().ok()?;
        let height: u32 = parts.next()?.parse().ok()?;
        let gravity = match parts.next() {
            Some(code) => Some(Gravity::parse(code)?),
            None => None,
        };
        if parts.next().is_some() || width == 0 || height == 0 {
            return None;
        }
        Some(Self {
            width,
            height,
            gravity,
        })
    }
}

impl fmt::Display for Crop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)?;
        if let Some(gravity) = self.gravity {
            write!(f, ":{}", gravity.code())?;
        }
        Ok(())
    }
}
