use equishare_core::error::LedgerError;
use equishare_core::tokenization::Tokenization;

use crate::config::PricingConfig;

/// Unit price quoted for the next primary sale of a tokenization
pub trait PricingStrategy: Send + Sync {
    /// Current unit price in minor currency units
    fn current_price(&self, tokenization: &Tokenization) -> Result<u64, LedgerError>;
}

/// The initial price until the first sale, then a fixed premium over it.
///
/// The premium is applied in integer minor units and rounded down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPricing {
    premium_percent: u32,
}

impl StepPricing {
    pub fn new(premium_percent: u32) -> Self {
        Self { premium_percent }
    }

    pub fn from_config(config: &PricingConfig) -> Self {
        Self::new(config.premium_percent)
    }
}

impl Default for StepPricing {
    fn default() -> Self {
        Self::from_config(&PricingConfig::default())
    }
}

impl PricingStrategy for StepPricing {
    fn current_price(&self, tokenization: &Tokenization) -> Result<u64, LedgerError> {
        if tokenization.tokens_sold == 0 {
            return Ok(tokenization.price_initial);
        }
        let stepped = u128::from(tokenization.price_initial)
            * (100 + u128::from(self.premium_percent))
            / 100;
        u64::try_from(stepped).map_err(|_| {
            LedgerError::validation(format!(
                "current price of {} overflows",
                tokenization.id
            ))
        })
    }
}
