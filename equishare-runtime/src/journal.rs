use chrono::{DateTime, Utc};

use equishare_core::error::LedgerError;
use equishare_core::id::TokenizationId;
use equishare_core::transaction::{HashAnchor, PendingTransaction, Transaction};
use equishare_storage_impl::LedgerBatch;

use crate::context::LedgerContext;

/// Append-only, hash-anchored record of every supply-affecting event
pub struct TransactionJournal {
    ctx: LedgerContext,
}

impl TransactionJournal {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    /// Stage `pending` in `batch` as a sealed journal entry.
    ///
    /// The entry is written when the batch is committed; it is never changed
    /// afterwards.
    pub fn append(
        &self,
        pending: PendingTransaction,
        at: DateTime<Utc>,
        batch: &mut LedgerBatch,
    ) -> Result<Transaction, LedgerError> {
        let transaction = self.seal(pending, at, batch)?;
        batch.append_transaction(transaction.clone());
        Ok(transaction)
    }

    /// Assign an id, total value and a unique hash anchor.
    ///
    /// The anchor must be unused both in the journal and in `staged`. On a
    /// collision the anchor is re-derived with nonces `1..=max_anchor_nonce`.
    pub fn seal(
        &self,
        pending: PendingTransaction,
        at: DateTime<Utc>,
        staged: &LedgerBatch,
    ) -> Result<Transaction, LedgerError> {
        let total_value = pending.total_value().ok_or_else(|| {
            LedgerError::validation(format!(
                "total value of {} tokens at {} overflows",
                pending.quantity, pending.unit_price
            ))
        })?;

        let hash_anchor = self.unique_anchor(&pending, at.timestamp(), staged)?;

        Ok(Transaction {
            id: self.ctx.ids.next_id("transaction"),
            tokenization_id: pending.tokenization_id,
            seller_id: pending.seller_id,
            buyer_id: pending.buyer_id,
            quantity: pending.quantity,
            unit_price: pending.unit_price,
            total_value,
            kind: pending.kind,
            hash_anchor,
            created_at: at,
        })
    }

    fn unique_anchor(
        &self,
        pending: &PendingTransaction,
        unix_timestamp: i64,
        staged: &LedgerBatch,
    ) -> Result<HashAnchor, LedgerError> {
        for nonce in 0..=self.ctx.config.max_anchor_nonce {
            let anchor = HashAnchor::compute_with_nonce(
                &pending.tokenization_id,
                &pending.buyer_id,
                pending.quantity,
                unix_timestamp,
                nonce,
            )?;
            if !staged.has_anchor(&anchor) && !self.ctx.storage.anchor_exists(&anchor)? {
                return Ok(anchor);
            }
            log::debug!("Hash anchor {} already used, retrying with nonce {}", anchor, nonce + 1);
        }

        Err(LedgerError::conflict(format!(
            "no unique hash anchor for {} after {} retries",
            pending.tokenization_id, self.ctx.config.max_anchor_nonce
        )))
    }

    /// Journal entries of a tokenization in append order
    pub fn list_by_tokenization(
        &self,
        tokenization_id: &TokenizationId,
    ) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self.ctx.storage.list_transactions(tokenization_id)?)
    }
}
