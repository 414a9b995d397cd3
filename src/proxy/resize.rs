//! Responsive breakpoints and srcsets for one source image.
//!
//! A [`ResizeSet`] turns one source image into the `<source>` entries of a
//! `<picture>` element. Each breakpoint becomes a `max-width` entry whose
//! srcset holds the image at that width plus density variants (`2x`, ...).
//! A final `min-width` entry serves everything wider than the last
//! breakpoint at the maximum display width:
//!
//! ```text
//! breakpoints  320   480   ...  1280
//! media        ≤320  321–480 ... 1025–1280  ≥1281
//! srcset       w320  w480  ...  w1280      w1400
//!              w640 2x ...                 w2800 2x
//! ```
//!
//! The entries partition the viewport axis: every entry's range starts one
//! pixel after the previous entry's range ends, and the last one is open.
//!
//! Breakpoints and density variants never exceed the source width, so the
//! proxy is never asked to upscale. When the real source width is unknown it
//! defaults to [`MAX_SOURCE_WIDTH`], which keeps every configured breakpoint.

use super::params::{ProcessingOptions, Quality};
use super::signer::UrlSigner;
use crate::config::{ImagesConfig, ProxyConfig};

/// Breakpoints used when none are configured.
pub const DEFAULT_BREAKPOINTS: [u32; 7] = [320, 480, 640, 800, 960, 1024, 1280];

/// Widest rendering of an image.
pub const MAX_IMAGE_WIDTH: u32 = 1400;

/// Assumed source width when the real one is unknown.
pub const MAX_SOURCE_WIDTH: u32 = 9999;

/// Media feature an entry is selected by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaCondition {
    MaxWidth,
    MinWidth,
    Any,
}

impl MediaCondition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MaxWidth => "max-width",
            Self::MinWidth => "min-width",
            Self::Any => "any",
        }
    }
}

/// One `<source>` of a picture.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeEntry {
    pub width: u32,
    /// URL at `width` first, then `"<url> <f>x"` density variants.
    pub srcset: Vec<String>,
    pub condition: MediaCondition,
}

impl ResizeEntry {
    /// Media query for this entry alone, e.g. `(max-width: 640px)`.
    pub fn media_query(&self) -> String {
        match self.condition {
            MediaCondition::Any => "(min-width: 0px)".to_string(),
            condition => format!("({}: {}px)", condition.as_str(), self.width),
        }
    }

    /// The srcset attribute value.
    pub fn srcset_attr(&self) -> String {
        self.srcset.join(", ")
    }
}

/// Inclusive viewport width range selected by an entry; `max` is open when `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidthRange {
    pub min: u32,
    pub max: Option<u32>,
}

/// Inputs that shape a [`ResizeSet`], independent of the source image.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeSettings {
    pub source_width: u32,
    pub max_width: u32,
    /// `None` requests a single source at `max_width` with no breakpoints.
    pub breakpoints: Option<Vec<u32>>,
    pub density_factors: Vec<u32>,
    /// Output format of srcset URLs.
    pub format: String,
    /// Output format of the fallback URL.
    pub fallback_format: String,
    /// Quality added to srcset URLs when the options carry no `q`.
    pub default_quality: Quality,
}

impl Default for ResizeSettings {
    fn default() -> Self {
        Self {
            source_width: MAX_SOURCE_WIDTH,
            max_width: MAX_IMAGE_WIDTH,
            breakpoints: Some(DEFAULT_BREAKPOINTS.to_vec()),
            density_factors: vec![2],
            format: "webp".to_string(),
            fallback_format: "jpg".to_string(),
            default_quality: Quality::default(),
        }
    }
}

impl ResizeSettings {
    pub fn from_config(images: &ImagesConfig, proxy: &ProxyConfig) -> Self {
        Self {
            source_width: images.source_width,
            max_width: images.max_width,
            breakpoints: Some(images.breakpoints.clone()),
            density_factors: images.density_factors.clone(),
            format: images.format.clone(),
            fallback_format: images.fallback_format.clone(),
            default_quality: Quality::new(proxy.default_quality),
        }
    }
}

/// Responsive sources and fallback for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeSet {
    source_url: String,
    source_width: u32,
    max_width: u32,
    entries: Vec<ResizeEntry>,
    fallback: String,
}

impl ResizeSet {
    /// Compute all entries and the fallback for `source_url`.
    ///
    /// `options` are extra proxy options (cache buster, crop, quality) applied
    /// to every URL. Output is fully determined by the inputs.
    pub fn new(
        signer: &UrlSigner,
        source_url: &str,
        settings: &ResizeSettings,
        options: &ProcessingOptions,
    ) -> Self {
        let mut set = Self {
            source_url: source_url.to_string(),
            source_width: settings.source_width,
            max_width: settings.max_width,
            entries: Vec::new(),
            fallback: String::new(),
        };

        let mut params = options.clone();
        let quality = params
            .remove("q")
            .unwrap_or_else(|| settings.default_quality.to_string());
        params.set("q", quality);

        set.entries = match &settings.breakpoints {
            Some(breakpoints) => set.breakpoint_entries(signer, breakpoints, settings, &params),
            None => vec![ResizeEntry {
                width: set.max_width,
                srcset: set.srcset(signer, set.max_width, settings, &params),
                condition: MediaCondition::Any,
            }],
        };
        set.fallback = set.fallback_url(
            signer,
            settings.max_width,
            &settings.fallback_format,
            options,
        );

        tracing::debug!(
            source = source_url,
            entries = set.entries.len(),
            "computed resize set"
        );
        set
    }

    fn breakpoint_entries(
        &self,
        signer: &UrlSigner,
        breakpoints: &[u32],
        settings: &ResizeSettings,
        params: &ProcessingOptions,
    ) -> Vec<ResizeEntry> {
        let mut relevant: Vec<u32> = breakpoints
            .iter()
            .copied()
            .filter(|&bp| bp > 0 && bp < self.source_width)
            .collect();
        relevant.sort_unstable();
        relevant.dedup();

        let mut entries: Vec<ResizeEntry> = relevant
            .into_iter()
            .map(|bp| ResizeEntry {
                width: bp,
                srcset: self.srcset(signer, bp, settings, params),
                condition: MediaCondition::MaxWidth,
            })
            .collect();

        let terminal_width = entries.last().map_or(1, |last| last.width + 1);
        entries.push(ResizeEntry {
            width: terminal_width,
            srcset: self.srcset(signer, self.max_width, settings, params),
            condition: MediaCondition::MinWidth,
        });
        entries
    }

    /// URL at `width`, then one descriptor-tagged URL per density factor that
    /// still fits inside the source.
    fn srcset(
        &self,
        signer: &UrlSigner,
        width: u32,
        settings: &ResizeSettings,
        params: &ProcessingOptions,
    ) -> Vec<String> {
        let base = signer.resized_url(&self.source_url, width, &settings.format, params);
        let variants = settings.density_factors.iter().filter_map(|&factor| {
            let factored = width.saturating_mul(factor);
            (factored < self.source_width).then(|| {
                let url = signer.resized_url(&self.source_url, factored, &settings.format, params);
                format!("{url} {factor}x")
            })
        });
        std::iter::once(base).chain(variants).collect()
    }

    /// A single URL of the source at `width` in `ext`, e.g. for structured data.
    pub fn fallback_url(
        &self,
        signer: &UrlSigner,
        width: u32,
        ext: &str,
        options: &ProcessingOptions,
    ) -> String {
        signer.resized_url(&self.source_url, width, ext, options)
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn source_width(&self) -> u32 {
        self.source_width
    }

    pub fn max_width(&self) -> u32 {
        self.max_width
    }

    pub fn entries(&self) -> &[ResizeEntry] {
        &self.entries
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// The `max-width` entry directly before `index`, if any.
    ///
    /// Only `max-width` entries chain to a predecessor; the terminal entry's
    /// own width already starts where the chain ends.
    pub fn previous(&self, index: usize) -> Option<&ResizeEntry> {
        let entry = self.entries.get(index)?;
        if entry.condition != MediaCondition::MaxWidth || index == 0 {
            return None;
        }
        self.entries.get(index - 1)
    }

    /// Media query bounded on both sides where a predecessor exists, e.g.
    /// `(min-width: 481px) and (max-width: 640px)`.
    pub fn media_query_full(&self, index: usize) -> String {
        let Some(entry) = self.entries.get(index) else {
            return String::new();
        };
        match self.previous(index) {
            Some(prev) => format!(
                "(min-width: {}px) and ({}: {}px)",
                prev.width + 1,
                entry.condition.as_str(),
                entry.width
            ),
            None => entry.media_query(),
        }
    }

    /// Viewport widths selected by the entry at `index`.
    pub fn range(&self, index: usize) -> Option<WidthRange> {
        let entry = self.entries.get(index)?;
        Some(match entry.condition {
            MediaCondition::MaxWidth => WidthRange {
                min: self.previous(index).map_or(0, |prev| prev.width + 1),
                max: Some(entry.width),
            },
            MediaCondition::MinWidth => WidthRange {
                min: entry.width,
                max: None,
            },
            MediaCondition::Any => WidthRange { min: 0, max: None },
        })
    }
}
