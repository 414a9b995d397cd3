//! Signed proxy URL construction.
//!
//! Every image URL points at an external image proxy that resizes and
//! re-encodes on the fly. The proxy only serves paths signed with a shared
//! secret, so nobody can make it do arbitrary work. A URL is assembled in
//! five steps:
//!
//! ```text
//! img/1.jpg
//!   │ qualify   local:///photos/img/1.jpg
//!   │ encode    bG9jYWw6Ly8vcGhv/dG9zL2ltZy8xLmpw/Zw     (or plain/local:///…)
//!   │ options   /w:320/q:75/bG9jYWw6Ly8vcGhv/dG9zL2ltZy8xLmpw/Zw
//!   │ extension …/Zw.webp                                 (or …@webp in plain mode)
//!   │ sign      HMAC-SHA256(key, salt ‖ path), base64url
//!   ▼
//! https://img.example.com/<signature>/w:320/q:75/bG9jYWw6Ly8vcGhv/dG9zL2ltZy8xLmpw/Zw.webp
//! ```
//!
//! The signing secrets live in an explicit [`SigningConfig`], built once at
//! startup and handed to [`UrlSigner::new`]. A signer cannot exist without a
//! key, salt, host and namespace: the proxy rejects unsigned requests, so
//! running without them is a startup error rather than a per-URL one.

use super::params::ProcessingOptions;
use crate::config::ProxyConfig;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Width of each `/`-separated segment of an encoded source.
const ENCODED_SEGMENT_LEN: usize = 16;

/// Scheme marking sources served from the proxy's local storage.
const LOCAL_SCHEME: &str = "local://";

/// Extensions longer than this are not extensions (e.g. `.800x600`).
const MAX_EXTENSION_LEN: usize = 4;

#[derive(Error, Debug)]
pub enum SignerError {
    #[error("proxy signing key is not set")]
    MissingKey,
    #[error("proxy signing salt is not set")]
    MissingSalt,
    #[error("proxy host is not set")]
    MissingHost,
    #[error("proxy URL namespace is not set")]
    MissingNamespace,
    #[error("invalid hex in proxy {field}: {source}")]
    InvalidHex {
        field: &'static str,
        source: hex::FromHexError,
    },
    #[error("invalid signing key: {0}")]
    InvalidKey(#[from] hmac::digest::InvalidLength),
    #[error("invalid encoded source: {0}")]
    InvalidEncoding(String),
}

/// Process-wide signing secrets and proxy location. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningConfig {
    key: Vec<u8>,
    salt: Vec<u8>,
    proxy_host: String,
    namespace: String,
}

impl SigningConfig {
    pub fn new(
        key: Vec<u8>,
        salt: Vec<u8>,
        proxy_host: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            key,
            salt,
            proxy_host: proxy_host.into(),
            namespace: namespace.into(),
        }
    }

    /// Build from the `[proxy]` config section, decoding the hex secrets.
    pub fn from_proxy_config(proxy: &ProxyConfig) -> Result<Self, SignerError> {
        let decode = |field: &'static str, value: &str| {
            hex::decode(value.trim()).map_err(|source| SignerError::InvalidHex { field, source })
        };
        Ok(Self::new(
            decode("key", &proxy.key)?,
            decode("salt", &proxy.salt)?,
            proxy.host.trim(),
            proxy.namespace.trim().trim_matches('/'),
        ))
    }

    pub fn proxy_host(&self) -> &str {
        &self.proxy_host
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

// Secrets stay out of logs and panic messages.
impl std::fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningConfig")
            .field("key", &"<redacted>")
            .field("salt", &"<redacted>")
            .field("proxy_host", &self.proxy_host)
            .field("namespace", &self.namespace)
            .finish()
    }
}

/// Builds and signs proxy URLs.
#[derive(Clone)]
pub struct UrlSigner {
    config: SigningConfig,
    mac: HmacSha256,
    encode_source: bool,
    source_extension: String,
}

impl UrlSigner {
    /// Create a signer. Refuses to initialize with missing secrets or location.
    ///
    /// Sources are base64-encoded by default and get a `.jpeg` extension when
    /// they have none; see [`plain_source`](Self::plain_source) and
    /// [`source_extension`](Self::source_extension).
    pub fn new(config: SigningConfig) -> Result<Self, SignerError> {
        if config.key.is_empty() {
            return Err(SignerError::MissingKey);
        }
        if config.salt.is_empty() {
            return Err(SignerError::MissingSalt);
        }
        if config.proxy_host.is_empty() {
            return Err(SignerError::MissingHost);
        }
        if config.namespace.is_empty() {
            return Err(SignerError::MissingNamespace);
        }
        let mac = HmacSha256::new_from_slice(&config.key)?;
        Ok(Self {
            config,
            mac,
            encode_source: true,
            source_extension: "jpeg".to_string(),
        })
    }

    /// Build a signer straight from the `[proxy]` config section.
    pub fn from_proxy_config(proxy: &ProxyConfig) -> Result<Self, SignerError> {
        Ok(Self::new(SigningConfig::from_proxy_config(proxy)?)?
            .plain_source(proxy.plain_source_url)
            .source_extension(&proxy.source_extension))
    }

    /// Pass sources through unencoded under `plain/` instead of base64.
    pub fn plain_source(mut self, plain: bool) -> Self {
        self.encode_source = !plain;
        self
    }

    /// Extension appended to local sources that lack one.
    pub fn source_extension(mut self, ext: &str) -> Self {
        self.source_extension = ext.trim_start_matches('.').to_string();
        self
    }

    pub fn config(&self) -> &SigningConfig {
        &self.config
    }

    /// Signed URL for `source` with the given options and output extension.
    ///
    /// An empty source yields an empty string.
    pub fn processed_url(
        &self,
        source: &str,
        options: &ProcessingOptions,
        ext: Option<&str>,
    ) -> String {
        if source.is_empty() {
            return String::new();
        }
        let qualified = self.qualify(source);
        let source_segment = if self.encode_source {
            encode_source(&qualified)
        } else {
            format!("plain/{qualified}")
        };
        let mut path = if options.is_empty() {
            format!("/{source_segment}")
        } else {
            format!("/{}/{source_segment}", options.to_path())
        };
        if let Some(ext) = ext {
            let separator = if self.encode_source { '.' } else { '@' };
            path.push(separator);
            path.push_str(ext);
        }
        format!(
            "https://{}/{}{}",
            self.config.proxy_host,
            self.sign_path(&path),
            path
        )
    }

    /// Signed URL for `source` resized to `width`; `w` goes first.
    pub fn resized_url(
        &self,
        source: &str,
        width: u32,
        ext: &str,
        extra: &ProcessingOptions,
    ) -> String {
        let options = extra.prefixed(&ProcessingOptions::new().with("w", width));
        self.processed_url(source, &options, Some(ext))
    }

    /// Signature for a request path: base64url HMAC-SHA256 over `salt ‖ path`.
    pub fn sign_path(&self, path: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(&self.config.salt);
        mac.update(path.as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    /// Turn a site-relative source into a reference the proxy can fetch.
    fn qualify(&self, source: &str) -> String {
        if has_url_scheme(source) {
            return source.to_string();
        }
        let source = source.trim_start_matches('/');
        let source = if has_extension(source) {
            source.to_string()
        } else {
            format!("{source}.{}", self.source_extension)
        };
        format!("{LOCAL_SCHEME}/{}/{source}", self.config.namespace)
    }
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner")
            .field("config", &self.config)
            .field("encode_source", &self.encode_source)
            .field("source_extension", &self.source_extension)
            .finish_non_exhaustive()
    }
}

/// `scheme://…` where scheme is a letter followed by letters, digits, `+`, `-`, `.`.
fn has_url_scheme(source: &str) -> bool {
    let Some((scheme, _)) = source.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn has_extension(source: &str) -> bool {
    let filename = source.rsplit('/').next().unwrap_or(source);
    match filename.rsplit_once('.') {
        Some((base, ext)) => !base.is_empty() && !ext.is_empty() && ext.len() <= MAX_EXTENSION_LEN,
        None => false,
    }
}

/// Base64url-encode (no padding) and split into 16-character segments.
pub fn encode_source(source: &str) -> String {
    let encoded = URL_SAFE_NO_PAD.encode(source.as_bytes());
    // base64 output is ASCII, so byte chunks are valid UTF-8.
    encoded
        .as_bytes()
        .chunks(ENCODED_SEGMENT_LEN)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Inverse of [`encode_source`].
pub fn decode_source(encoded: &str) -> Result<String, SignerError> {
    let joined: String = encoded.split('/').collect();
    let bytes = URL_SAFE_NO_PAD
        .decode(joined.as_bytes())
        .map_err(|e| SignerError::InvalidEncoding(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| SignerError::InvalidEncoding(e.to_string()))
}
