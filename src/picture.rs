//! Picture directives: one matched `[pic ...]` block, ready to render.
//!
//! A [`Picture`] ties together the directive's attributes, its resolved
//! ratio and dimensions, and its [`ResizeSet`]. Pictures are numbered in the
//! order they appear in a document, starting at 1. The numbering lives in a
//! [`PictureSequence`] owned by a single document pass, so concurrent
//! documents never share a counter.
//!
//! ## Recognized Attributes
//!
//! | Attribute | Effect |
//! |---|---|
//! | `src` | Source image (required; without it the directive is declined) |
//! | `id` | Anchor id (default: the index) |
//! | `alt` | Alt text (default: `Image <index>`) |
//! | `ratio`, `orient` | Aspect ratio hints, see [`ratio`](crate::ratio) |
//! | `crop` | `W:H[:gravity]`, forwarded to the proxy |
//! | `v` | Cache buster, sent as `cachebuster:v<value>` |
//! | `lazy="false"`, `eager` | Eager loading |
//! | `grid="span\|offset"`, `w`, `x` | Layout hints for the figure |

use crate::proxy::{Crop, ProcessingOptions, ResizeSet, ResizeSettings, UrlSigner};
use crate::ratio::{self, ImageDimensions, ResolvedRatio};
use crate::scanner::AttributeMap;
use maud::html;
use serde::Serialize;

/// Layout value used when the directive sets none.
const GRID_DEFAULT: &str = "*";

/// `loading` attribute of the rendered `<img>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Loading {
    Lazy,
    Eager,
}

impl Loading {
    /// `eager` when the directive says `lazy="false"` or carries an `eager` attribute.
    pub fn from_attributes(attrs: &AttributeMap) -> Self {
        let eager =
            attrs.get("lazy").map(String::as_str) == Some("false") || attrs.contains_key("eager");
        if eager { Self::Eager } else { Self::Lazy }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lazy => "lazy",
            Self::Eager => "eager",
        }
    }
}

/// One accepted directive.
#[derive(Debug, Clone)]
pub struct Picture {
    index: usize,
    attributes: AttributeMap,
    resolved: ResolvedRatio,
    resizes: ResizeSet,
}

impl Picture {
    /// Build a picture from scanned attributes.
    ///
    /// Returns `None` when `src` is missing or empty.
    pub fn from_attributes(
        attributes: AttributeMap,
        index: usize,
        signer: &UrlSigner,
        settings: &ResizeSettings,
    ) -> Option<Self> {
        let src = attributes.get("src").filter(|s| !s.is_empty())?;
        let options = processing_options(&attributes);
        let resizes = ResizeSet::new(signer, src, settings, &options);
        let resolved = ratio::resolve(&attributes, settings.max_width);
        Some(Self {
            index,
            attributes,
            resolved,
            resizes,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn src(&self) -> &str {
        self.attr("src").unwrap_or_default()
    }

    /// Anchor id: the `id` attribute, or the index.
    pub fn id(&self) -> String {
        self.attr("id")
            .filter(|id| !id.is_empty())
            .map_or_else(|| self.index.to_string(), str::to_string)
    }

    pub fn alt(&self) -> String {
        self.attr("alt")
            .filter(|alt| !alt.is_empty())
            .map_or_else(|| format!("Image {}", self.index), str::to_string)
    }

    pub fn loading(&self) -> Loading {
        Loading::from_attributes(&self.attributes)
    }

    pub fn ratio(&self) -> f64 {
        self.resolved.ratio
    }

    pub fn dimensions(&self) -> ImageDimensions {
        self.resolved.dimensions
    }

    pub fn resolved(&self) -> &ResolvedRatio {
        &self.resolved
    }

    pub fn resizes(&self) -> &ResizeSet {
        &self.resizes
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    /// Figure span and offset from `grid="span|offset"`, overridden by `w` and `x`.
    pub fn grid(&self) -> (String, String) {
        let (grid_span, grid_offset) = match self.attr("grid") {
            Some(grid) => grid.split_once('|').unwrap_or((grid, "")),
            None => ("", ""),
        };
        let pick = |key: &str, fallback: &str| {
            self.attr(key)
                .filter(|v| !v.is_empty())
                .or(Some(fallback).filter(|v| !v.is_empty()))
                .unwrap_or(GRID_DEFAULT)
                .to_string()
        };
        (pick("w", grid_span), pick("x", grid_offset))
    }

    /// Numbered bookmark link to the figure.
    pub fn caption(&self) -> String {
        html! {
            a href=(format!("#{}", self.id())) rel="bookmark" { (self.index) }
        }
        .into_string()
    }

    /// Everything a renderer needs, as plain data.
    pub fn context(&self) -> PictureContext {
        let (span, offset) = self.grid();
        let sources = self
            .resizes
            .entries()
            .iter()
            .enumerate()
            .map(|(i, entry)| SourceContext {
                width: entry.width,
                media: self.resizes.media_query_full(i),
                srcset: entry.srcset_attr(),
            })
            .collect();
        PictureContext {
            src: self.src().to_string(),
            index: self.index,
            id: self.id(),
            sources,
            fallback: self.resizes.fallback().to_string(),
            loading: self.loading(),
            dimensions: self.dimensions(),
            ratio: self.ratio(),
            alt: self.alt(),
            caption: self.caption(),
            span,
            offset,
        }
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Proxy options requested by the directive itself.
fn processing_options(attrs: &AttributeMap) -> ProcessingOptions {
    let mut options = ProcessingOptions::new();
    if let Some(version) = attrs.get("v").filter(|v| !v.is_empty()) {
        options.set("cachebuster", format!("v{version}"));
    }
    if let Some(value) = attrs.get("crop") {
        match Crop::parse(value) {
            Some(crop) => options.set("crop", crop),
            None => tracing::debug!(crop = %value, "ignoring malformed crop"),
        }
    }
    options
}

/// Render-ready view of a [`Picture`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PictureContext {
    pub src: String,
    pub index: usize,
    pub id: String,
    pub sources: Vec<SourceContext>,
    pub fallback: String,
    pub loading: Loading,
    pub dimensions: ImageDimensions,
    pub ratio: f64,
    pub alt: String,
    /// Pre-escaped HTML.
    pub caption: String,
    pub span: String,
    pub offset: String,
}

/// One `<source>` element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceContext {
    pub width: u32,
    pub media: String,
    pub srcset: String,
}

/// Pictures accepted so far in one document, in encounter order.
#[derive(Debug, Default)]
pub struct PictureSequence {
    pictures: Vec<Picture>,
}

impl PictureSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next accepted picture will get.
    pub fn next_index(&self) -> usize {
        self.pictures.len() + 1
    }

    /// Accept a directive. Declined directives do not consume an index.
    pub fn accept(
        &mut self,
        attributes: AttributeMap,
        signer: &UrlSigner,
        settings: &ResizeSettings,
    ) -> Option<&Picture> {
        let picture = Picture::from_attributes(attributes, self.next_index(), signer, settings)?;
        self.pictures.push(picture);
        self.pictures.last()
    }

    pub fn pictures(&self) -> &[Picture] {
        &self.pictures
    }

    pub fn len(&self) -> usize {
        self.pictures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pictures.is_empty()
    }

    pub fn into_pictures(self) -> Vec<Picture> {
        self.pictures
    }
}
