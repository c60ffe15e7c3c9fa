//! Ledger configuration with TOML file support.

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use equishare_core::tokenization::MIN_TOTAL_TOKENS_FLOOR;
use equishare_storage_impl::PageRequest;

/// Configuration for the tokenization ledger.
///
/// Can be loaded from a TOML file via [`LedgerConfig::from_file`] or built
/// programmatically. Missing keys take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Smallest supply a tokenization may be created with.
    #[serde(default = "default_min_total_tokens")]
    pub min_total_tokens: u64,

    /// How long an operation waits for a busy tokenization, in milliseconds.
    /// Zero waits indefinitely.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Highest nonce tried when a hash anchor collides.
    #[serde(default = "default_max_anchor_nonce")]
    pub max_anchor_nonce: u32,

    /// Page size used when a listing does not ask for one.
    #[serde(default = "default_page_limit")]
    pub default_page_limit: u32,

    /// Upper bound applied to requested page sizes.
    #[serde(default = "default_max_page_limit")]
    pub max_page_limit: u32,

    #[serde(default)]
    pub pricing: PricingConfig,

    #[serde(default)]
    pub rating: RatingConfig,
}

/// Parameters of the step pricing rule
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Premium over the initial price once any token has been sold, in percent.
    #[serde(default = "default_premium_percent")]
    pub premium_percent: u32,
}

/// Parameters of the risk rating engine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingConfig {
    /// Youngest age, in whole years, scored as ideal.
    #[serde(default = "default_ideal_age_min")]
    pub ideal_age_min: u32,

    /// Oldest age, in whole years, scored as ideal.
    #[serde(default = "default_ideal_age_max")]
    pub ideal_age_max: u32,
}

fn default_min_total_tokens() -> u64 {
    MIN_TOTAL_TOKENS_FLOOR
}

fn default_lock_timeout_ms() -> u64 {
    5_000
}

fn default_max_anchor_nonce() -> u32 {
    16
}

fn default_page_limit() -> u32 {
    20
}

fn default_max_page_limit() -> u32 {
    100
}

fn default_premium_percent() -> u32 {
    10
}

fn default_ideal_age_min() -> u32 {
    4
}

fn default_ideal_age_max() -> u32 {
    12
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            min_total_tokens: default_min_total_tokens(),
            lock_timeout_ms: default_lock_timeout_ms(),
            max_anchor_nonce: default_max_anchor_nonce(),
            default_page_limit: default_page_limit(),
            max_page_limit: default_max_page_limit(),
            pricing: PricingConfig::default(),
            rating: RatingConfig::default(),
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            premium_percent: default_premium_percent(),
        }
    }
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            ideal_age_min: default_ideal_age_min(),
            ideal_age_max: default_ideal_age_max(),
        }
    }
}

impl LedgerConfig {
    /// Load and validate configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).context("Failed to parse ledger config")?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize ledger config")
    }

    /// Reject combinations no ledger can run with
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.min_total_tokens >= MIN_TOTAL_TOKENS_FLOOR,
            "min_total_tokens must be at least {}, got {}",
            MIN_TOTAL_TOKENS_FLOOR,
            self.min_total_tokens
        );
        ensure!(self.default_page_limit > 0, "default_page_limit must be positive");
        ensure!(self.max_page_limit > 0, "max_page_limit must be positive");
        ensure!(
            self.default_page_limit <= self.max_page_limit,
            "default_page_limit ({}) exceeds max_page_limit ({})",
            self.default_page_limit,
            self.max_page_limit
        );
        ensure!(
            self.rating.ideal_age_min <= self.rating.ideal_age_max,
            "rating.ideal_age_min ({}) exceeds rating.ideal_age_max ({})",
            self.rating.ideal_age_min,
            self.rating.ideal_age_max
        );
        Ok(())
    }

    /// Lock wait bound handed to the lock manager
    pub fn lock_timeout(&self) -> Option<u64> {
        match self.lock_timeout_ms {
            0 => None,
            ms => Some(ms),
        }
    }

    /// Resolve a listing request: a missing limit takes the default and any
    /// limit is clamped to `1..=max_page_limit`
    pub fn page_request(&self, page: Option<u32>, limit: Option<u32>) -> PageRequest {
        let limit = limit
            .unwrap_or(self.default_page_limit)
            .clamp(1, self.max_page_limit);
        PageRequest::new(page.unwrap_or(1).max(1), limit)
    }
}
