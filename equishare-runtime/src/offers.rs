use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use equishare_core::error::LedgerError;
use equishare_core::id::{HolderId, OfferId, TokenizationId};
use equishare_core::locks::LockKey;
use equishare_core::offer::{Offer, OfferStatus};
use equishare_storage_impl::LedgerBatch;

use crate::context::LedgerContext;
use crate::ledger::TokenizationLedger;
use crate::participation::ParticipationBook;

/// A holder's request to list tokens for sale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOffer {
    pub tokenization_id: TokenizationId,
    pub seller_id: HolderId,
    pub quantity: u64,
    /// Asking price per token in minor currency units
    pub unit_price: u64,
    /// Days until the offer expires
    pub valid_days: u32,
}

/// Holder sell offers. Offers are recorded only; nothing matches them
/// against buyers.
pub struct OfferBoard {
    ctx: LedgerContext,
    ledger: Arc<TokenizationLedger>,
    book: Arc<ParticipationBook>,
}

impl OfferBoard {
    pub fn new(
        ctx: LedgerContext,
        ledger: Arc<TokenizationLedger>,
        book: Arc<ParticipationBook>,
    ) -> Self {
        Self { ctx, ledger, book }
    }

    pub fn create(&self, request: NewOffer) -> Result<Offer, LedgerError> {
        if request.quantity == 0 {
            return Err(LedgerError::validation("quantity must be positive"));
        }
        if request.unit_price == 0 {
            return Err(LedgerError::validation("unit_price must be positive"));
        }
        if request.valid_days == 0 {
            return Err(LedgerError::validation("valid_days must be at least 1"));
        }

        let _guard = self.ctx.lock(LockKey::Tokenization(request.tokenization_id), "create_offer")?;
        let tokenization = self.ledger.get(&request.tokenization_id)?;
        if !tokenization.is_active() {
            return Err(LedgerError::validation(format!(
                "tokenization {} is not active (status: {})",
                tokenization.id, tokenization.status
            )));
        }

        let position = self
            .book
            .position(&tokenization.id, &request.seller_id)?
            .ok_or_else(|| {
                LedgerError::validation(format!(
                    "{} holds no tokens of {}",
                    request.seller_id, tokenization.id
                ))
            })?;
        // Tokens already listed in the seller's live offers are spoken for
        let now = self.ctx.clock.now();
        let listed: u64 = self
            .ctx
            .storage
            .list_offers(&tokenization.id)?
            .iter()
            .filter(|o| o.seller_id == request.seller_id && o.status_at(now) == OfferStatus::Active)
            .map(|o| o.quantity)
            .sum();
        let unlisted = position.quantity.saturating_sub(listed);
        if unlisted < request.quantity {
            return Err(LedgerError::validation(format!(
                "{} holds {} tokens with {} already offered, cannot offer {}",
                request.seller_id, position.quantity, listed, request.quantity
            )));
        }

        // A controlling holder may not offer their way below the minimum
        if tokenization.control_lock
            && tokenization.meets_owner_minimum(position.quantity)
            && !tokenization.meets_owner_minimum(unlisted - request.quantity)
        {
            return Err(LedgerError::validation(format!(
                "offer would take {} below the minimum owner percentage of {}%",
                request.seller_id, tokenization.min_owner_percentage
            )));
        }

        let offer = Offer {
            id: self.ctx.ids.next_id("offer"),
            tokenization_id: tokenization.id,
            seller_id: request.seller_id,
            quantity: request.quantity,
            unit_price: request.unit_price,
            status: OfferStatus::Active,
            created_at: now,
            expires_at: now + Duration::days(i64::from(request.valid_days)),
            cancelled_at: None,
        };

        let mut batch = LedgerBatch::new();
        batch.insert_offer(offer.clone());
        self.ctx.commit(batch)?;

        log::info!(
            "Offer {} by {}: {} tokens of {} at {} until {}",
            offer.id,
            offer.seller_id,
            offer.quantity,
            offer.tokenization_id,
            offer.unit_price,
            offer.expires_at
        );
        Ok(offer)
    }

    /// Look up an offer, reporting its status as of now
    pub fn get(&self, id: &OfferId) -> Result<Offer, LedgerError> {
        let offer = self.find(id)?;
        Ok(observed(offer, self.ctx.clock.now()))
    }

    /// Offers of a tokenization in creation order, statuses as of now
    pub fn list(&self, tokenization_id: &TokenizationId) -> Result<Vec<Offer>, LedgerError> {
        self.ledger.get(tokenization_id)?;
        let now = self.ctx.clock.now();
        Ok(self
            .ctx
            .storage
            .list_offers(tokenization_id)?
            .into_iter()
            .map(|offer| observed(offer, now))
            .collect())
    }

    /// Withdraw an active offer. Only its seller may cancel it.
    pub fn cancel(&self, id: &OfferId, seller_id: &HolderId) -> Result<Offer, LedgerError> {
        let tokenization_id = self.find(id)?.tokenization_id;

        let _guard = self.ctx.lock(LockKey::Tokenization(tokenization_id), "cancel_offer")?;
        let offer = self.find(id)?;
        if &offer.seller_id != seller_id {
            return Err(LedgerError::validation(format!(
                "offer {} does not belong to {}",
                id, seller_id
            )));
        }

        let now = self.ctx.clock.now();
        let status = offer.status_at(now);
        if status != OfferStatus::Active {
            return Err(LedgerError::validation(format!(
                "offer {} is not active (status: {})",
                id, status
            )));
        }

        let mut cancelled = offer;
        cancelled.status = OfferStatus::Cancelled;
        cancelled.cancelled_at = Some(now);

        let mut batch = LedgerBatch::new();
        batch.update_offer(cancelled.clone());
        self.ctx.commit(batch)?;

        log::info!("Offer {} cancelled by {}", id, seller_id);
        Ok(cancelled)
    }

    fn find(&self, id: &OfferId) -> Result<Offer, LedgerError> {
        self.ctx
            .storage
            .get_offer(id)?
            .ok_or_else(|| LedgerError::not_found(format!("offer {} does not exist", id)))
    }
}

/// The offer as a reader sees it at `now`; the stored row is not touched
fn observed(mut offer: Offer, now: DateTime<Utc>) -> Offer {
    offer.status = offer.status_at(now);
    offer
}
