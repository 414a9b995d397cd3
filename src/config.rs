//! Configuration module.
//!
//! Handles loading, validating, and merging `picmark.toml`. Stock defaults
//! are the base layer; the user file is merged on top of them, and finally
//! the deploy-time secrets can be supplied through the environment:
//!
//! ```text
//! stock defaults  →  picmark.toml  →  PICMARK_PROXY_* env vars
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! [proxy]
//! host = "img.example.com"  # Image proxy host (required)
//! namespace = "photos"      # Path prefix of local sources (required)
//! key = "943b…"             # Hex signing key (required)
//! salt = "520f…"            # Hex signing salt (required)
//! plain_source_url = false  # Send sources as plain/… instead of base64
//! source_extension = "jpeg" # Appended to sources without an extension
//! default_quality = 75      # Quality of srcset URLs without a `q` option
//!
//! [images]
//! breakpoints = [320, 480, 640, 800, 960, 1024, 1280]
//! max_width = 1400
//! source_width = 9999
//! density_factors = [2]
//! format = "webp"
//! fallback_format = "jpg"
//!
//! [json_ld]
//! enabled = true
//! author = ""
//! max_items = 10
//! image_width = 1000
//! quality = 80
//!
//! [processing]
//! max_processes = 4         # Omit for auto = CPU cores
//! ```
//!
//! Config files are sparse: override just the values you want. Unknown keys
//! are rejected to catch typos early.

use crate::proxy::resize::{DEFAULT_BREAKPOINTS, MAX_IMAGE_WIDTH, MAX_SOURCE_WIDTH};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "picmark.toml";

/// Environment variables that override `[proxy]` values, with the field each sets.
pub const ENV_OVERRIDES: [(&str, ProxyField); 4] = [
    ("PICMARK_PROXY_HOST", ProxyField::Host),
    ("PICMARK_PROXY_NAMESPACE", ProxyField::Namespace),
    ("PICMARK_PROXY_KEY", ProxyField::Key),
    ("PICMARK_PROXY_SALT", ProxyField::Salt),
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Full configuration loaded from `picmark.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PicmarkConfig {
    /// Image proxy location and signing secrets.
    pub proxy: ProxyConfig,
    /// Responsive breakpoints and output formats.
    pub images: ImagesConfig,
    /// Structured-data summary settings.
    pub json_ld: JsonLdConfig,
    /// Parallel rendering settings.
    pub processing: ProcessingConfig,
}

impl PicmarkConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_quality("proxy.default_quality", self.proxy.default_quality)?;
        check_quality("json_ld.quality", self.json_ld.quality)?;
        check_non_empty("proxy.source_extension", &self.proxy.source_extension)?;
        check_non_empty("images.format", &self.images.format)?;
        check_non_empty("images.fallback_format", &self.images.fallback_format)?;

        let images = &self.images;
        if images.breakpoints.contains(&0) {
            return Err(ConfigError::Validation(
                "images.breakpoints must be non-zero".into(),
            ));
        }
        if images.breakpoints.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::Validation(
                "images.breakpoints must be strictly ascending".into(),
            ));
        }
        if images.max_width == 0 || images.source_width == 0 {
            return Err(ConfigError::Validation(
                "images.max_width and images.source_width must be non-zero".into(),
            ));
        }
        if images.density_factors.iter().any(|&f| f < 2) {
            return Err(ConfigError::Validation(
                "images.density_factors must be 2 or greater".into(),
            ));
        }
        if self.json_ld.image_width == 0 {
            return Err(ConfigError::Validation(
                "json_ld.image_width must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Overlay `PICMARK_PROXY_*` values returned by `lookup`.
    ///
    /// Empty values are ignored so an unset-but-exported variable does not
    /// wipe a configured secret.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for (var, field) in ENV_OVERRIDES {
            let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            tracing::debug!(var, "proxy setting taken from environment");
            *self.proxy.field_mut(field) = value;
        }
    }
}

fn check_quality(name: &str, value: u32) -> Result<(), ConfigError> {
    if (1..=100).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!("{name} must be 1-100")))
    }
}

fn check_non_empty(name: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::Validation(format!("{name} must not be empty")))
    } else {
        Ok(())
    }
}

/// `[proxy]` string fields that can come from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyField {
    Host,
    Namespace,
    Key,
    Salt,
}

/// Image proxy location and signing secrets.
///
/// `key` and `salt` are hex strings. All four string fields are required
/// before a signer can be built; the config itself only checks formats.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyConfig {
    pub host: String,
    pub namespace: String,
    pub key: String,
    pub salt: String,
    /// Send sources as `plain/<source>` instead of base64 segments.
    pub plain_source_url: bool,
    /// Extension appended to local sources that lack one.
    pub source_extension: String,
    /// Quality of srcset URLs whose options carry no `q`.
    pub default_quality: u32,
}

impl ProxyConfig {
    fn field_mut(&mut self, field: ProxyField) -> &mut String {
        match field {
            ProxyField::Host => &mut self.host,
            ProxyField::Namespace => &mut self.namespace,
            ProxyField::Key => &mut self.key,
            ProxyField::Salt => &mut self.salt,
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            namespace: String::new(),
            key: String::new(),
            salt: String::new(),
            plain_source_url: false,
            source_extension: "jpeg".to_string(),
            default_quality: 75,
        }
    }
}

impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |s: &str| if s.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("ProxyConfig")
            .field("host", &self.host)
            .field("namespace", &self.namespace)
            .field("key", &redact(&self.key))
            .field("salt", &redact(&self.salt))
            .field("plain_source_url", &self.plain_source_url)
            .field("source_extension", &self.source_extension)
            .field("default_quality", &self.default_quality)
            .finish()
    }
}

/// Responsive image settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Viewport widths that switch to the next image size, ascending.
    pub breakpoints: Vec<u32>,
    /// Widest rendering of an image; also the width of placeholder dimensions.
    pub max_width: u32,
    /// Assumed source width. No breakpoint or density variant reaches it.
    pub source_width: u32,
    /// High-DPI multipliers added to every srcset.
    pub density_factors: Vec<u32>,
    /// Output format of srcset URLs.
    pub format: String,
    /// Output format of the `<img>` fallback.
    pub fallback_format: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            breakpoints: DEFAULT_BREAKPOINTS.to_vec(),
            max_width: MAX_IMAGE_WIDTH,
            source_width: MAX_SOURCE_WIDTH,
            density_factors: vec![2],
            format: "webp".to_string(),
            fallback_format: "jpg".to_string(),
        }
    }
}

/// Structured-data settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JsonLdConfig {
    pub enabled: bool,
    /// `creator` of every record; omitted when empty.
    pub author: String,
    /// Records beyond this many are dropped.
    pub max_items: usize,
    pub image_width: u32,
    pub quality: u32,
}

impl Default for JsonLdConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            author: String::new(),
            max_items: 10,
            image_width: 1000,
            quality: 80,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of documents rendered in parallel.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, at least 1
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(PicmarkConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<PicmarkConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    Ok(merged.try_into()?)
}

/// Load config from `path` with environment overrides from `lookup`, then validate.
pub fn load_config_with_env(
    path: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<PicmarkConfig, ConfigError> {
    let overlay = load_raw_config(path)?;
    if overlay.is_none() {
        tracing::info!(path = %path.display(), "no config file, using stock defaults");
    }
    let mut config = resolve_config(stock_defaults_value()?, overlay)?;
    config.apply_env_overrides(lookup);
    config.validate()?;
    Ok(config)
}

/// Load config from `path` with overrides from the process environment.
pub fn load_config(path: &Path) -> Result<PicmarkConfig, ConfigError> {
    load_config_with_env(path, |var| std::env::var(var).ok())
}

/// Returns a fully-commented stock `picmark.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# picmark configuration
# =====================
# All settings are optional except the four [proxy] location/secret keys,
# which may instead come from PICMARK_PROXY_HOST, PICMARK_PROXY_NAMESPACE,
# PICMARK_PROXY_KEY and PICMARK_PROXY_SALT.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Image proxy
# ---------------------------------------------------------------------------
[proxy]
# Host serving processed images, without scheme.
host = ""

# Path prefix under which local sources live on the proxy:
# img/1.jpg -> local:///<namespace>/img/1.jpg
namespace = ""

# Signing key and salt, hex-encoded. Must match the proxy's settings.
key = ""
salt = ""

# Send sources as plain/<source>@<ext> instead of base64 segments.
plain_source_url = false

# Extension appended to local sources that have none.
source_extension = "jpeg"

# Quality (1-100) of responsive URLs when a directive sets none.
default_quality = 75

# ---------------------------------------------------------------------------
# Responsive images
# ---------------------------------------------------------------------------
[images]
# Viewport widths (px) that switch to the next image size, ascending.
breakpoints = [320, 480, 640, 800, 960, 1024, 1280]

# Widest rendering of an image (px).
max_width = 1400

# Assumed source width (px). Sizes at or above it are never requested.
source_width = 9999

# High-DPI variants added to every srcset, e.g. [2, 3].
density_factors = [2]

# Output format of responsive URLs and of the <img> fallback.
format = "webp"
fallback_format = "jpg"

# ---------------------------------------------------------------------------
# Structured data (schema.org ImageObject)
# ---------------------------------------------------------------------------
[json_ld]
enabled = true

# Creator name of every image. Left out of the records when empty.
author = ""

# Records beyond this many per document are dropped.
max_items = 10

# Width (px) and quality of the image URL in each record.
image_width = 1000
quality = 80

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum documents rendered in parallel.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn default_config_values() {
        let config = PicmarkConfig::default();
        assert_eq!(config.proxy.source_extension, "jpeg");
        assert_eq!(config.proxy.default_quality, 75);
        assert_eq!(
            config.images.breakpoints,
            vec![320, 480, 640, 800, 960, 1024, 1280]
        );
        assert_eq!(config.images.max_width, 1400);
        assert_eq!(config.images.source_width, 9999);
        assert_eq!(config.json_ld.max_items, 10);
        assert_eq!(config.json_ld.image_width, 1000);
        assert!(config.json_ld.enabled);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[images]
max_width = 1200
"#;
        let config: PicmarkConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.images.max_width, 1200);
        assert_eq!(config.images.format, "webp");
        assert_eq!(config.proxy.default_quality, 75);
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let proxy = ProxyConfig {
            key: "deadbeef".into(),
            salt: "cafebabe".into(),
            ..ProxyConfig::default()
        };
        let debug = format!("{proxy:?}");
        assert!(!debug.contains("deadbeef"));
        assert!(!debug.contains("cafebabe"));
        assert!(debug.contains("<redacted>"));
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config_with_env(&tmp.path().join("picmark.toml"), no_env).unwrap();
        assert_eq!(config, PicmarkConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("picmark.toml");
        fs::write(
            &path,
            r#"
[proxy]
host = "img.example.com"
namespace = "photos"

[json_ld]
author = "Jane Doe"
"#,
        )
        .unwrap();

        let config = load_config_with_env(&path, no_env).unwrap();
        assert_eq!(config.proxy.host, "img.example.com");
        assert_eq!(config.proxy.namespace, "photos");
        assert_eq!(config.json_ld.author, "Jane Doe");
        // Unspecified values should be defaults
        assert_eq!(config.json_ld.quality, 80);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("picmark.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();
        let result = load_config_with_env(&path, no_env);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("picmark.toml");
        fs::write(
            &path,
            r#"
[proxy]
default_quality = 200
"#,
        )
        .unwrap();
        let result = load_config_with_env(&path, no_env);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // Environment overrides
    // =========================================================================

    #[test]
    fn env_overrides_proxy_secrets() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("picmark.toml");
        fs::write(
            &path,
            r#"
[proxy]
host = "from-file.example.com"
key = "00"
"#,
        )
        .unwrap();

        let config = load_config_with_env(&path, |var| match var {
            "PICMARK_PROXY_KEY" => Some("abcd".to_string()),
            "PICMARK_PROXY_SALT" => Some("ef01".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.proxy.host, "from-file.example.com");
        assert_eq!(config.proxy.key, "abcd");
        assert_eq!(config.proxy.salt, "ef01");
    }

    #[test]
    fn empty_env_value_is_ignored() {
        let mut config = PicmarkConfig::default();
        config.proxy.host = "kept.example.com".into();
        config.apply_env_overrides(|var| (var == "PICMARK_PROXY_HOST").then(|| "  ".to_string()));
        assert_eq!(config.proxy.host, "kept.example.com");
    }

    #[test]
    fn every_proxy_field_has_an_env_var() {
        let mut config = PicmarkConfig::default();
        config.apply_env_overrides(|var| Some(var.to_lowercase()));
        assert_eq!(config.proxy.host, "picmark_proxy_host");
        assert_eq!(config.proxy.namespace, "picmark_proxy_namespace");
        assert_eq!(config.proxy.key, "picmark_proxy_key");
        assert_eq!(config.proxy.salt, "picmark_proxy_salt");
    }

    // =========================================================================
    // Processing config tests
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
    }

    #[test]
    fn effective_threads_clamped() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let many = ProcessingConfig {
            max_processes: Some(99999),
        };
        assert_eq!(effective_threads(&many), cores);
        let zero = ProcessingConfig {
            max_processes: Some(0),
        };
        assert_eq!(effective_threads(&zero), 1);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[json_ld]
quality = 80
max_items = 10
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[json_ld]
quality = 60
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let json_ld = merged.get("json_ld").unwrap();
        assert_eq!(json_ld.get("quality").unwrap().as_integer(), Some(60));
        assert_eq!(json_ld.get("max_items").unwrap().as_integer(), Some(10));
    }

    #[test]
    fn merge_toml_arrays_replace() {
        let base: toml::Value = toml::from_str("breakpoints = [320, 480, 640]").unwrap();
        let overlay: toml::Value = toml::from_str("breakpoints = [500]").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("breakpoints").unwrap().as_array().unwrap().len(), 1);
    }

    // =========================================================================
    // Unknown key rejection tests
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result: Result<PicmarkConfig, _> = toml::from_str(
            r#"
[images]
breakpoint = [320]
"#,
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<PicmarkConfig, _> = toml::from_str("[imgproxy]\nhost = \"x\"\n");
        assert!(result.is_err());
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(PicmarkConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_quality_bounds() {
        let mut config = PicmarkConfig::default();
        config.proxy.default_quality = 100;
        assert!(config.validate().is_ok());
        config.proxy.default_quality = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("proxy.default_quality"));

        let mut config = PicmarkConfig::default();
        config.json_ld.quality = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_breakpoints_order() {
        let mut config = PicmarkConfig::default();
        config.images.breakpoints = vec![320, 320];
        assert!(config.validate().is_err());
        config.images.breakpoints = vec![640, 320];
        assert!(config.validate().is_err());
        config.images.breakpoints = vec![0, 320];
        assert!(config.validate().is_err());
        config.images.breakpoints = vec![];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_widths_and_factors() {
        let mut config = PicmarkConfig::default();
        config.images.max_width = 0;
        assert!(config.validate().is_err());

        let mut config = PicmarkConfig::default();
        config.images.density_factors = vec![1];
        assert!(config.validate().is_err());

        let mut config = PicmarkConfig::default();
        config.images.format = " ".into();
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // stock_config_toml tests
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: PicmarkConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, PicmarkConfig::default());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        for section in ["[proxy]", "[images]", "[json_ld]", "[processing]"] {
            assert!(content.contains(section), "missing {section}");
        }
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value().unwrap();
        assert!(val.is_table());
        for section in ["proxy", "images", "json_ld", "processing"] {
            assert!(val.get(section).is_some(), "missing {section}");
        }
    }
}
