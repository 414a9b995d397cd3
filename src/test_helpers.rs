//! Shared test utilities for the picmark test suite.
//!
//! Provides a fixed signing setup (so expected URLs can be written down
//! literally), attribute-map construction, and config fixtures.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let signer = test_signer();
//! let a = attrs(&[("src", "img/1.jpg"), ("ratio", "4:3")]);
//! ```

use crate::config::{PicmarkConfig, ProxyConfig};
use crate::proxy::{SigningConfig, UrlSigner};
use crate::scanner::AttributeMap;

pub const TEST_HOST: &str = "img.example.com";
pub const TEST_NAMESPACE: &str = "photos";
pub const TEST_KEY_HEX: &str = "943b421c9eb07c830af81030552c86009268de4e532ba2ee2eab8247c6da0881";
pub const TEST_SALT_HEX: &str = "520f986b998545b4785e0defbc4f3c1203f22de2374a3d53cb7a7fe9fea309c5";

// =========================================================================
// Signing
// =========================================================================

pub fn test_signing_config() -> SigningConfig {
    SigningConfig::new(
        hex::decode(TEST_KEY_HEX).unwrap(),
        hex::decode(TEST_SALT_HEX).unwrap(),
        TEST_HOST,
        TEST_NAMESPACE,
    )
}

/// Signer over the test secrets, base64 sources, `.jpeg` default extension.
pub fn test_signer() -> UrlSigner {
    UrlSigner::new(test_signing_config()).unwrap()
}

// =========================================================================
// Config fixtures
// =========================================================================

pub fn test_proxy_config() -> ProxyConfig {
    ProxyConfig {
        host: TEST_HOST.into(),
        namespace: TEST_NAMESPACE.into(),
        key: TEST_KEY_HEX.into(),
        salt: TEST_SALT_HEX.into(),
        ..ProxyConfig::default()
    }
}

/// Stock config with the test proxy filled in.
pub fn test_config() -> PicmarkConfig {
    PicmarkConfig {
        proxy: test_proxy_config(),
        ..PicmarkConfig::default()
    }
}

// =========================================================================
// Attributes
// =========================================================================

/// Build an attribute map from literal pairs.
pub fn attrs(pairs: &[(&str, &str)]) -> AttributeMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
