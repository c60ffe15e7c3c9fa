use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::id::{HolderId, OfferId, TokenizationId};

/// Status of a sell offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Active,
    Expired,
    Cancelled,
}

impl OfferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Active => "active",
            OfferStatus::Expired => "expired",
            OfferStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OfferStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(OfferStatus::Active),
            "expired" => Ok(OfferStatus::Expired),
            "cancelled" => Ok(OfferStatus::Cancelled),
            _ => Err(format!("Unknown offer status: {}", s)),
        }
    }
}

/// Holder-initiated, time-bounded intent to sell held tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,

    pub tokenization_id: TokenizationId,

    pub seller_id: HolderId,

    pub quantity: u64,

    /// Asking price per token in minor currency units
    pub unit_price: u64,

    /// Stored status. Expiry is never written back; see [`Offer::status_at`].
    pub status: OfferStatus,

    pub created_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,

    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Offer {
    /// Status as observed at `now`: an active offer past its expiry reads as expired
    pub fn status_at(&self, now: DateTime<Utc>) -> OfferStatus {
        match self.status {
            OfferStatus::Active if now >= self.expires_at => OfferStatus::Expired,
            status => status,
        }
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status_at(now) == OfferStatus::Active
    }
}
