//! Image proxy URLs: options, signing, responsive sizes.
//!
//! Nothing here touches pixels. The proxy decodes, resizes and encodes; this
//! module only decides *which* URLs to ask for and signs them.
//!
//! | Concern | Type |
//! |---|---|
//! | **Options** | [`ProcessingOptions`], [`Quality`], [`Crop`] |
//! | **Signing** | [`SigningConfig`] + [`UrlSigner`] (HMAC-SHA256, base64url) |
//! | **Responsive sizes** | [`ResizeSet`] built from [`ResizeSettings`] |
//!
//! The module is split into:
//! - **Parameters**: ordered option lists and validated option values
//! - **Signer**: source qualification, encoding and path signing
//! - **Resize**: breakpoint and density math producing srcsets

pub mod params;
pub mod resize;
pub mod signer;

pub use params::{Crop, Gravity, ProcessingOptions, Quality};
pub use resize::{MediaCondition, ResizeEntry, ResizeSet, ResizeSettings, WidthRange};
pub use signer::{SignerError, SigningConfig, UrlSigner, decode_source, encode_source};
