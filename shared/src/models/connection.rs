//! Storefront connection model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported storefront platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformKind {
    WooCommerce,
    Shopify,
}

impl PlatformKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WooCommerce => "woocommerce",
            Self::Shopify => "shopify",
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PlatformKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "woocommerce" => Ok(Self::WooCommerce),
            "shopify" => Ok(Self::Shopify),
            other => Err(format!("unknown platform kind: {other}")),
        }
    }
}

/// API credentials for a storefront (opaque to the engine)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCredentials {
    /// Consumer key / access token
    pub key: String,
    /// Consumer secret (empty for token-auth platforms)
    #[serde(default)]
    pub secret: String,
}

/// A configured storefront integration
///
/// Created and disabled by the external setup flow. Read-only to the
/// engine except for `last_synced_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub platform: PlatformKind,
    /// Base URL of the store (e.g. "https://shop.example.com")
    pub store_url: String,
    pub credentials: ApiCredentials,
    /// Ledger warehouse/location this store sells from
    pub location_id: Option<String>,
    pub enabled: bool,
    /// Millis of the last completed sync batch
    pub last_synced_at: Option<i64>,
    pub created_at: i64,
}
