//! HTML markup for pictures and structured data.
//!
//! Uses [maud](https://maud.lambda.xyz/) like the rest of the crate: markup
//! is compiled Rust, and every interpolated value is escaped. The figure
//! markup is emitted on a single line so it can stand as a raw HTML block
//! inside markdown.
//!
//! ## Figure Structure
//!
//! ```html
//! <figure id="1" data-src="img/1.jpg" data-index="1" style="--ratio: 1.333; --span: *; --offset: *">
//!   <picture>
//!     <source media="(max-width: 320px)" srcset="… , … 2x" type="image/webp">
//!     …
//!     <img src="…fallback.jpg" alt="Image 1" loading="lazy" width="1400" height="1050">
//!   </picture>
//!   <figcaption><a href="#1" rel="bookmark">1</a></figcaption>
//! </figure>
//! ```

use crate::jsonld::ImageObject;
use crate::picture::{Loading, PictureContext};
use crate::proxy::{ProcessingOptions, UrlSigner};
use crate::ratio::DEFAULT_RATIO;
use maud::{Markup, PreEscaped, html};

/// MIME type announced on `<source>` elements for an output format.
pub fn mime_type(format: &str) -> String {
    match format.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg".to_string(),
        other => format!("image/{other}"),
    }
}

/// Full `<figure>` for one directive.
pub fn render_picture(ctx: &PictureContext, format: &str) -> Markup {
    let style = format!(
        "--ratio: {}; --span: {}; --offset: {}",
        ctx.ratio, ctx.span, ctx.offset
    );
    let mime = mime_type(format);
    html! {
        figure id=(ctx.id) data-src=(ctx.src) data-index=(ctx.index) style=(style) {
            picture {
                @for source in &ctx.sources {
                    source media=(source.media) srcset=(source.srcset) type=(mime);
                }
                img src=(ctx.fallback) alt=(ctx.alt) loading=(ctx.loading.as_str())
                    width=(ctx.dimensions.width) height=(ctx.dimensions.height);
            }
            figcaption { (PreEscaped(&ctx.caption)) }
        }
    }
}

/// A fixed-size picture outside of any document, e.g. a cover image.
#[derive(Debug, Clone)]
pub struct PictureTag {
    pub src: String,
    pub width: u32,
    pub ratio: f64,
    pub alt: String,
    pub loading: Loading,
    pub format: String,
    pub options: ProcessingOptions,
}

impl PictureTag {
    pub fn new(src: impl Into<String>, width: u32) -> Self {
        Self {
            src: src.into(),
            width,
            ratio: DEFAULT_RATIO,
            alt: String::new(),
            loading: Loading::Lazy,
            format: "webp".to_string(),
            options: ProcessingOptions::new(),
        }
    }

    pub fn ratio(mut self, ratio: f64) -> Self {
        self.ratio = ratio;
        self
    }

    pub fn alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = alt.into();
        self
    }

    pub fn loading(mut self, loading: Loading) -> Self {
        self.loading = loading;
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn options(mut self, options: ProcessingOptions) -> Self {
        self.options = options;
        self
    }

    /// Height for the tag's width; non-positive ratios use the default.
    pub fn height(&self) -> u32 {
        let ratio = if self.ratio.is_finite() && self.ratio > 0.0 {
            self.ratio
        } else {
            DEFAULT_RATIO
        };
        (f64::from(self.width) / ratio).round() as u32
    }
}

/// `<picture>` with one source (1x and 2x) and a JPEG fallback.
pub fn render_picture_tag(signer: &UrlSigner, tag: &PictureTag) -> Markup {
    let height = tag.height();
    let sized = |w: u32, h: u32| {
        tag.options
            .prefixed(&ProcessingOptions::new().with("w", w).with("h", h))
    };
    let srcset = format!(
        "{}, {} 2x",
        signer.processed_url(&tag.src, &sized(tag.width, height), Some(&tag.format)),
        signer.processed_url(
            &tag.src,
            &sized(tag.width.saturating_mul(2), height.saturating_mul(2)),
            Some(&tag.format)
        ),
    );
    let fallback = signer.processed_url(&tag.src, &sized(tag.width, height), Some("jpg"));
    let style = format!("--ratio: {}", tag.ratio);
    html! {
        picture style=(style) {
            source media="(min-width: 0px)" srcset=(srcset) type=(mime_type(&tag.format));
            img src=(fallback) alt=(tag.alt) loading=(tag.loading.as_str())
                width=(tag.width) height=(height);
        }
    }
}

/// `<script type="application/ld+json">` holding `records`.
///
/// `</` is escaped so no string value can close the script element.
pub fn render_json_ld(records: &[ImageObject]) -> Result<Markup, serde_json::Error> {
    let json = serde_json::to_string(records)?.replace("</", "<\\/");
    Ok(html! {
        script type="application/ld+json" { (PreEscaped(json)) }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonld::Person;
    use crate::picture::Picture;
    use crate::proxy::ResizeSettings;
    use crate::test_helpers::{attrs, test_signer};

    fn context(pairs: &[(&str, &str)]) -> PictureContext {
        Picture::from_attributes(attrs(pairs), 1, &test_signer(), &ResizeSettings::default())
            .unwrap()
            .context()
    }

    // =========================================================================
    // render_picture
    // =========================================================================

    #[test]
    fn figure_carries_data_attributes() {
        let html = render_picture(&context(&[("src", "img/1.jpg"), ("ratio", "2")]), "webp")
            .into_string();
        assert!(html.starts_with(r#"<figure id="1" data-src="img/1.jpg" data-index="1""#));
        assert!(html.contains(r#"style="--ratio: 2; --span: *; --offset: *""#));
        assert!(html.contains("<picture>"));
        assert!(html.contains("<figcaption><a href=\"#1\" rel=\"bookmark\">1</a></figcaption>"));
    }

    #[test]
    fn figure_has_one_source_per_entry() {
        let html = render_picture(&context(&[("src", "img/1.jpg")]), "webp").into_string();
        assert_eq!(html.matches("<source ").count(), 8);
        assert_eq!(html.matches(r#"type="image/webp""#).count(), 8);
        assert!(html.contains(r#"media="(min-width: 321px) and (max-width: 480px)""#));
    }

    #[test]
    fn img_carries_loading_and_dimensions() {
        let html = render_picture(
            &context(&[("src", "img/1.jpg"), ("ratio", "4:3"), ("eager", "")]),
            "webp",
        )
        .into_string();
        assert!(html.contains(r#"alt="Image 1""#));
        assert!(html.contains(r#"loading="eager""#));
        assert!(html.contains(r#"width="1400" height="1050""#));
    }

    #[test]
    fn figure_is_a_single_line() {
        let html = render_picture(&context(&[("src", "img/1.jpg")]), "webp").into_string();
        assert!(!html.contains('\n'));
    }

    #[test]
    fn attribute_values_are_escaped() {
        let html = render_picture(
            &context(&[("src", "img/1.jpg"), ("alt", r#""><script>alert(1)</script>"#)]),
            "webp",
        )
        .into_string();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&quot;&gt;&lt;script&gt;"));
    }

    #[test]
    fn mime_types() {
        assert_eq!(mime_type("webp"), "image/webp");
        assert_eq!(mime_type("AVIF"), "image/avif");
        assert_eq!(mime_type("jpg"), "image/jpeg");
        assert_eq!(mime_type("jpeg"), "image/jpeg");
    }

    // =========================================================================
    // render_picture_tag
    // =========================================================================

    #[test]
    fn picture_tag_height_follows_ratio() {
        assert_eq!(PictureTag::new("a.jpg", 800).ratio(2.0).height(), 400);
        assert_eq!(PictureTag::new("a.jpg", 800).ratio(0.5).height(), 1600);
        // 800 / 1.777 = 450.19
        assert_eq!(PictureTag::new("a.jpg", 800).height(), 450);
        assert_eq!(PictureTag::new("a.jpg", 800).ratio(0.0).height(), 450);
    }

    #[test]
    fn picture_tag_sources_and_fallback() {
        let signer = test_signer().plain_source(true);
        let tag = PictureTag::new("cover.jpg", 600).ratio(1.5).alt("Cover");
        let html = render_picture_tag(&signer, &tag).into_string();
        assert!(html.contains(r#"media="(min-width: 0px)""#));
        assert!(html.contains("/w:600/h:400/plain/local:///photos/cover.jpg@webp, "));
        assert!(html.contains("/w:1200/h:800/plain/local:///photos/cover.jpg@webp 2x"));
        assert!(html.contains("/w:600/h:400/plain/local:///photos/cover.jpg@jpg\""));
        assert!(html.contains(r#"width="600" height="400""#));
        assert!(html.contains(r#"alt="Cover""#));
        assert!(html.contains(r#"loading="lazy""#));
    }

    #[test]
    fn picture_tag_keeps_extra_options_after_size() {
        let signer = test_signer().plain_source(true);
        let tag = PictureTag::new("cover.jpg", 600)
            .ratio(1.5)
            .loading(Loading::Eager)
            .options(ProcessingOptions::new().with("q", 90));
        let html = render_picture_tag(&signer, &tag).into_string();
        assert!(html.contains("/w:600/h:400/q:90/plain/"));
        assert!(html.contains(r#"loading="eager""#));
    }

    // =========================================================================
    // render_json_ld
    // =========================================================================

    fn record(url: &str) -> ImageObject {
        ImageObject {
            context: "https://schema.org/",
            kind: "ImageObject",
            creator: Some(Person {
                kind: "Person",
                name: "</script><b>".to_string(),
            }),
            content_url: url.to_string(),
        }
    }

    #[test]
    fn json_ld_script_wraps_array() {
        let html = render_json_ld(&[record("https://x/1.jpg")]).unwrap().into_string();
        assert!(html.starts_with(r#"<script type="application/ld+json">[{"#));
        assert!(html.ends_with("}]</script>"));
        assert!(html.contains(r#""contentUrl":"https://x/1.jpg""#));
    }

    #[test]
    fn json_ld_cannot_close_script_early() {
        let html = render_json_ld(&[record("u")]).unwrap().into_string();
        assert_eq!(html.matches("</script>").count(), 1);
        assert!(html.contains(r"<\/script>"));
    }
}
