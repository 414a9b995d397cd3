//! # picmark
//!
//! Expands `[pic …]` directives in markdown into responsive `<figure>`
//! elements whose images are served by a signing image proxy. Authors write
//! one line per picture; readers get a `<picture>` with a source per viewport
//! breakpoint, high-DPI variants, a fixed-size `<img>` fallback, and
//! schema.org records describing the images.
//!
//! # Pipeline
//!
//! ```text
//! markdown ─► blocks ─► [pic] scan ─► Picture ─► <figure> ─► pulldown-cmark ─► HTML
//!                                        │
//!                                        └──► ImageObject ─► <script type="application/ld+json">
//! ```
//!
//! Only a directive that opens a paragraph is expanded; text after it is kept
//! as a paragraph below the figure. A directive quoted in running text or in
//! a code fence stays as written.
//! Pictures are numbered in document order starting at 1; the number is the
//! default anchor id and alt text.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scanner`] | Finds a bracketed tag in a block and parses its `key="value"` attributes |
//! | [`ratio`] | Aspect ratio resolution: explicit ratio, filename dimensions, orientation, default |
//! | [`proxy`] | Processing options, HMAC URL signing, and breakpoint/srcset generation |
//! | [`picture`] | One directive with its index, resolved ratio, and resize set |
//! | [`jsonld`] | schema.org `ImageObject` records for a document's pictures |
//! | [`render`] | Maud markup for figures, standalone picture tags, and JSON-LD scripts |
//! | [`document`] | Markdown rendering with directive expansion; file and directory batches |
//! | [`config`] | `picmark.toml` loading, stock defaults, environment overrides, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Dimensions Without Reading Images
//!
//! Nothing here opens an image file. Width and height attributes come from the
//! ratio alone: the image is assumed to render at `max_width`, and the height
//! follows. This keeps rendering a pure text transform, and the browser still
//! reserves the right box before the image arrives.
//!
//! ## Signed URLs
//!
//! Every URL is signed with HMAC-SHA256 over a salt and the request path, the
//! scheme used by imgproxy-compatible servers. A signer cannot be built with a
//! missing key, salt, host or namespace, so unsigned URLs are never produced.
//!
//! ## Maud Markup
//!
//! Figures are built with [Maud](https://maud.lambda.xyz/). All interpolation
//! is escaped, so directive attributes can never inject markup.

pub mod config;
pub mod document;
pub mod jsonld;
pub mod output;
pub mod picture;
pub mod proxy;
pub mod ratio;
pub mod render;
pub mod scanner;

#[cfg(test)]
pub(crate) mod test_helpers;
