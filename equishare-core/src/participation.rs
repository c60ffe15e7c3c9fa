use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::id::{HolderId, TokenizationId};

/// A holder's cumulative position in one tokenization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participation {
    pub tokenization_id: TokenizationId,

    pub investor_id: HolderId,

    /// Tokens currently held
    pub quantity: u64,

    /// `quantity` as a percentage of the total supply
    pub percentage: f64,

    /// Cumulative value invested, in minor currency units
    pub value_invested: u64,

    pub first_acquired_at: DateTime<Utc>,

    pub last_acquired_at: DateTime<Utc>,
}

impl Participation {
    /// Open a position from a first acquisition
    pub fn open(
        tokenization_id: TokenizationId,
        investor_id: HolderId,
        total_tokens: u64,
        at: DateTime<Utc>,
    ) -> Self {
        let mut position = Self {
            tokenization_id,
            investor_id,
            quantity: 0,
            percentage: 0.0,
            value_invested: 0,
            first_acquired_at: at,
            last_acquired_at: at,
        };
        position.recompute_percentage(total_tokens);
        position
    }

    /// Merge a signed delta into the position. Quantity and invested value are
    /// additive; the percentage is recomputed from the new quantity. The row
    /// is kept even when the quantity drops to zero.
    pub fn merge(
        &mut self,
        delta_quantity: i64,
        delta_value: i64,
        total_tokens: u64,
        at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let quantity = apply_delta(self.quantity, delta_quantity).ok_or_else(|| {
            LedgerError::validation(format!(
                "position of {} would go out of range: {} {:+}",
                self.investor_id, self.quantity, delta_quantity
            ))
        })?;
        let value_invested = apply_delta(self.value_invested, delta_value).ok_or_else(|| {
            LedgerError::validation(format!(
                "invested value of {} would go out of range: {} {:+}",
                self.investor_id, self.value_invested, delta_value
            ))
        })?;

        self.quantity = quantity;
        self.value_invested = value_invested;
        if delta_quantity > 0 {
            self.last_acquired_at = at;
        }
        self.recompute_percentage(total_tokens);
        Ok(())
    }

    fn recompute_percentage(&mut self, total_tokens: u64) {
        self.percentage = if total_tokens == 0 {
            0.0
        } else {
            (self.quantity as f64 * 100.0) / total_tokens as f64
        };
    }
}

fn apply_delta(current: u64, delta: i64) -> Option<u64> {
    if delta >= 0 {
        current.checked_add(delta.unsigned_abs())
    } else {
        current.checked_sub(delta.unsigned_abs())
    }
}
