use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;
use crate::id::{AssetId, HolderId, TokenizationId};
use crate::insurance::InsuranceInfo;

/// Lowest allowed minimum owner percentage: the original owner always keeps control
pub const MIN_OWNER_PERCENTAGE_FLOOR: u8 = 51;

/// Smallest supply any tokenization may have. Configuration can only raise it.
pub const MIN_TOTAL_TOKENS_FLOOR: u64 = 100;

/// Lifecycle status of a tokenization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizationStatus {
    /// Created, not yet open for sale
    Pending,
    /// Open for buys and offers
    Active,
    /// Temporarily halted
    Suspended,
    /// Permanently closed
    Closed,
}

impl TokenizationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenizationStatus::Pending => "pending",
            TokenizationStatus::Active => "active",
            TokenizationStatus::Suspended => "suspended",
            TokenizationStatus::Closed => "closed",
        }
    }

    /// Whether an externally driven move from `self` to `next` is allowed.
    /// Re-asserting the current status is always allowed.
    pub fn can_transition_to(&self, next: TokenizationStatus) -> bool {
        use TokenizationStatus::*;
        if *self == next {
            return true;
        }
        matches!(
            (*self, next),
            (Pending, Active)
                | (Pending, Closed)
                | (Active, Suspended)
                | (Active, Closed)
                | (Suspended, Active)
                | (Suspended, Closed)
        )
    }
}

impl fmt::Display for TokenizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenizationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TokenizationStatus::Pending),
            "active" => Ok(TokenizationStatus::Active),
            "suspended" => Ok(TokenizationStatus::Suspended),
            "closed" => Ok(TokenizationStatus::Closed),
            _ => Err(format!("Unknown tokenization status: {}", s)),
        }
    }
}

/// Ten-level ordinal risk grade, best first
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskRating {
    AAA,
    AA,
    A,
    BBB,
    BB,
    B,
    CCC,
    CC,
    C,
    D,
}

impl RiskRating {
    /// All grades from highest to lowest
    pub const ALL: [RiskRating; 10] = [
        RiskRating::AAA,
        RiskRating::AA,
        RiskRating::A,
        RiskRating::BBB,
        RiskRating::BB,
        RiskRating::B,
        RiskRating::CCC,
        RiskRating::CC,
        RiskRating::C,
        RiskRating::D,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskRating::AAA => "AAA",
            RiskRating::AA => "AA",
            RiskRating::A => "A",
            RiskRating::BBB => "BBB",
            RiskRating::BB => "BB",
            RiskRating::B => "B",
            RiskRating::CCC => "CCC",
            RiskRating::CC => "CC",
            RiskRating::C => "C",
            RiskRating::D => "D",
        }
    }
}

impl fmt::Display for RiskRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskRating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RiskRating::ALL
            .iter()
            .find(|rating| rating.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Unknown risk rating: {}", s))
    }
}

/// Request to tokenize an asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTokenization {
    /// The asset being tokenized
    pub asset_id: AssetId,

    /// The original owner, credited with the locked tokens
    pub issuer_id: HolderId,

    /// Fixed supply
    pub total_tokens: u64,

    /// Initial unit price in minor currency units
    pub price_initial: u64,

    /// Share of the supply that stays with the issuer
    pub min_owner_percentage: u8,

    /// Upper bound on the share that may ever trade publicly
    pub max_publicly_tradable_percentage: u8,

    /// Forbid offers that would take a controlling holder below the minimum
    pub control_lock: bool,

    pub insurance: Option<InsuranceInfo>,
}

impl NewTokenization {
    /// Check every issuance invariant, reporting the first violation
    pub fn validate(&self, min_total_tokens: u64) -> Result<(), LedgerError> {
        if self.total_tokens < min_total_tokens {
            return Err(LedgerError::validation(format!(
                "total_tokens must be at least {}, got {}",
                min_total_tokens, self.total_tokens
            )));
        }

        if self.min_owner_percentage < MIN_OWNER_PERCENTAGE_FLOOR
            || self.min_owner_percentage > 100
        {
            return Err(LedgerError::validation(format!(
                "minimum owner percentage must be between {} and 100, got {}",
                MIN_OWNER_PERCENTAGE_FLOOR, self.min_owner_percentage
            )));
        }

        let combined =
            u16::from(self.min_owner_percentage) + u16::from(self.max_publicly_tradable_percentage);
        if combined > 100 {
            return Err(LedgerError::validation(format!(
                "minimum owner percentage plus maximum publicly tradable percentage \
                 must not exceed 100, got {}",
                combined
            )));
        }

        if self.price_initial == 0 {
            return Err(LedgerError::validation("price_initial must be positive"));
        }

        if let Some(insurance) = &self.insurance {
            insurance.validate().map_err(LedgerError::Validation)?;
        }

        Ok(())
    }
}

/// Split a supply into `(locked_for_owner, available_for_sale)`.
///
/// The locked share is rounded down, so the owner never receives more than
/// `min_owner_percentage` of the supply.
pub fn split_supply(total_tokens: u64, min_owner_percentage: u8) -> (u64, u64) {
    let locked = (u128::from(total_tokens) * u128::from(min_owner_percentage) / 100) as u64;
    (locked, total_tokens - locked)
}

/// Cap-table header binding an asset to a fixed-supply ownership structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokenization {
    /// Unique identifier for this tokenization
    pub id: TokenizationId,

    /// The tokenized asset (at most one tokenization per asset)
    pub asset_id: AssetId,

    /// The original owner credited at issuance
    pub issuer_id: HolderId,

    /// Fixed supply
    pub total_tokens: u64,

    /// Tokens kept by the original owner
    pub tokens_locked_owner: u64,

    /// Tokens offered for public sale
    pub tokens_available_for_sale: u64,

    /// Tokens sold from the public pool so far
    pub tokens_sold: u64,

    /// Initial unit price in minor currency units
    pub price_initial: u64,

    pub min_owner_percentage: u8,

    pub max_publicly_tradable_percentage: u8,

    pub control_lock: bool,

    pub status: TokenizationStatus,

    /// Grade computed once at creation time
    pub risk_rating: RiskRating,

    pub insurance: Option<InsuranceInfo>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Tokenization {
    /// Tokens still purchasable from the public pool
    pub fn tokens_remaining(&self) -> u64 {
        self.tokens_available_for_sale.saturating_sub(self.tokens_sold)
    }

    pub fn is_active(&self) -> bool {
        self.status == TokenizationStatus::Active
    }

    /// Share of the total supply represented by `quantity`, in percent
    pub fn percentage_of(&self, quantity: u64) -> f64 {
        if self.total_tokens == 0 {
            return 0.0;
        }
        (quantity as f64 * 100.0) / self.total_tokens as f64
    }

    /// Whether holding `quantity` tokens meets the minimum owner percentage.
    /// Exact integer comparison.
    pub fn meets_owner_minimum(&self, quantity: u64) -> bool {
        u128::from(quantity) * 100
            >= u128::from(self.min_owner_percentage) * u128::from(self.total_tokens)
    }

    /// Check the header invariants that must hold at all times
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.tokens_locked_owner + self.tokens_available_for_sale != self.total_tokens {
            return Err(format!(
                "locked ({}) + available ({}) != total ({})",
                self.tokens_locked_owner, self.tokens_available_for_sale, self.total_tokens
            ));
        }
        if self.tokens_sold > self.tokens_available_for_sale {
            return Err(format!(
                "sold ({}) exceeds available ({})",
                self.tokens_sold, self.tokens_available_for_sale
            ));
        }
        Ok(())
    }
}
