use chrono::{DateTime, Utc};

use equishare_core::error::LedgerError;
use equishare_core::id::{HolderId, TokenizationId};
use equishare_core::participation::Participation;
use equishare_core::tokenization::Tokenization;
use equishare_storage_impl::LedgerBatch;

use crate::context::LedgerContext;

/// Per-holder positions in each tokenization
pub struct ParticipationBook {
    ctx: LedgerContext,
}

impl ParticipationBook {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    /// Merge a signed delta into the holder's position and stage the result
    /// in `batch`. A holder without a position gets a new row.
    ///
    /// A row already staged in the same batch takes precedence over the
    /// stored one.
    pub fn upsert(
        &self,
        batch: &mut LedgerBatch,
        tokenization: &Tokenization,
        investor_id: HolderId,
        delta_quantity: i64,
        delta_value: i64,
        at: DateTime<Utc>,
    ) -> Result<Participation, LedgerError> {
        let staged = batch
            .participations
            .iter()
            .rev()
            .find(|p| p.tokenization_id == tokenization.id && p.investor_id == investor_id)
            .cloned();
        let existing = match staged {
            Some(position) => Some(position),
            None => self.ctx.storage.get_participation(&tokenization.id, &investor_id)?,
        };

        let mut position = existing.unwrap_or_else(|| {
            Participation::open(tokenization.id, investor_id, tokenization.total_tokens, at)
        });
        position.merge(delta_quantity, delta_value, tokenization.total_tokens, at)?;

        batch.upsert_participation(position.clone());
        Ok(position)
    }

    /// Position of a single holder, if any
    pub fn position(
        &self,
        tokenization_id: &TokenizationId,
        investor_id: &HolderId,
    ) -> Result<Option<Participation>, LedgerError> {
        Ok(self.ctx.storage.get_participation(tokenization_id, investor_id)?)
    }

    /// All holders in first-acquisition order, including emptied positions
    pub fn list_holders(
        &self,
        tokenization_id: &TokenizationId,
    ) -> Result<Vec<Participation>, LedgerError> {
        Ok(self.ctx.storage.list_participations(tokenization_id)?)
    }

    /// Number of holders currently holding at least one token
    pub fn investor_count(&self, tokenization_id: &TokenizationId) -> Result<u64, LedgerError> {
        let holders = self.list_holders(tokenization_id)?;
        Ok(holders.iter().filter(|p| p.quantity > 0).count() as u64)
    }
}

/// Convert an unsigned amount into a signed delta
pub(crate) fn signed(amount: u64, what: &str) -> Result<i64, LedgerError> {
    i64::try_from(amount)
        .map_err(|_| LedgerError::validation(format!("{} of {} is out of range", what, amount)))
}
