use std::sync::Arc;

use equishare_core::asset::AssetRegistry;
use equishare_core::error::LedgerError;
use equishare_core::id::{AssetId, TokenizationId};
use equishare_core::locks::LockKey;
use equishare_core::tokenization::{split_supply, NewTokenization, Tokenization, TokenizationStatus};
use equishare_core::transaction::{PendingTransaction, TransactionKind};
use equishare_storage_impl::{LedgerBatch, TokenizationFilter};

use crate::context::LedgerContext;
use crate::journal::TransactionJournal;
use crate::participation::{signed, ParticipationBook};
use crate::pricing::PricingStrategy;
use crate::rating::RiskRatingEngine;

/// Creates tokenizations and owns their headers
pub struct TokenizationLedger {
    ctx: LedgerContext,
    assets: Arc<dyn AssetRegistry>,
    rating: RiskRatingEngine,
    pricing: Arc<dyn PricingStrategy>,
    journal: Arc<TransactionJournal>,
    book: Arc<ParticipationBook>,
}

impl TokenizationLedger {
    pub fn new(
        ctx: LedgerContext,
        assets: Arc<dyn AssetRegistry>,
        rating: RiskRatingEngine,
        pricing: Arc<dyn PricingStrategy>,
        journal: Arc<TransactionJournal>,
        book: Arc<ParticipationBook>,
    ) -> Self {
        Self {
            ctx,
            assets,
            rating,
            pricing,
            journal,
            book,
        }
    }

    /// Tokenize an asset.
    ///
    /// Writes the header (status `pending`), the issuance journal entry and
    /// the issuer's position in one batch.
    pub fn create(&self, request: NewTokenization) -> Result<Tokenization, LedgerError> {
        request.validate(self.ctx.config.min_total_tokens)?;

        let asset = self
            .assets
            .find_by_id(&request.asset_id)?
            .ok_or_else(|| {
                LedgerError::not_found(format!("asset {} does not exist", request.asset_id))
            })?;
        let now = self.ctx.clock.now();
        let risk_rating = self.rating.compute(&asset, now.date_naive());

        let _guard = self.ctx.lock(LockKey::Asset(request.asset_id), "create_tokenization")?;

        if let Some(existing) = self.ctx.storage.get_tokenization_by_asset(&request.asset_id)? {
            return Err(LedgerError::conflict(format!(
                "asset {} is already tokenized as {} ({})",
                request.asset_id, existing.id, existing.status
            )));
        }

        let (tokens_locked_owner, tokens_available_for_sale) =
            split_supply(request.total_tokens, request.min_owner_percentage);
        let tokenization = Tokenization {
            id: self.ctx.ids.next_id("tokenization"),
            asset_id: request.asset_id,
            issuer_id: request.issuer_id,
            total_tokens: request.total_tokens,
            tokens_locked_owner,
            tokens_available_for_sale,
            tokens_sold: 0,
            price_initial: request.price_initial,
            min_owner_percentage: request.min_owner_percentage,
            max_publicly_tradable_percentage: request.max_publicly_tradable_percentage,
            control_lock: request.control_lock,
            status: TokenizationStatus::Pending,
            risk_rating,
            insurance: request.insurance,
            created_at: now,
            updated_at: now,
        };

        let mut batch = LedgerBatch::new();
        batch.insert_tokenization(tokenization.clone());
        let issuance = self.journal.append(
            PendingTransaction {
                tokenization_id: tokenization.id,
                seller_id: None,
                buyer_id: tokenization.issuer_id,
                quantity: tokens_locked_owner,
                unit_price: tokenization.price_initial,
                kind: TransactionKind::Issuance,
            },
            now,
            &mut batch,
        )?;
        self.book.upsert(
            &mut batch,
            &tokenization,
            tokenization.issuer_id,
            signed(issuance.quantity, "issued quantity")?,
            signed(issuance.total_value, "issuance value")?,
            now,
        )?;
        self.ctx.commit(batch)?;

        log::info!(
            "Tokenized asset {} as {}: {} tokens, {} locked to owner, rated {}",
            tokenization.asset_id,
            tokenization.id,
            tokenization.total_tokens,
            tokenization.tokens_locked_owner,
            tokenization.risk_rating
        );
        Ok(tokenization)
    }

    pub fn get(&self, id: &TokenizationId) -> Result<Tokenization, LedgerError> {
        self.ctx
            .storage
            .get_tokenization(id)?
            .ok_or_else(|| LedgerError::not_found(format!("tokenization {} does not exist", id)))
    }

    pub fn get_by_asset(&self, asset_id: &AssetId) -> Result<Tokenization, LedgerError> {
        self.ctx
            .storage
            .get_tokenization_by_asset(asset_id)?
            .ok_or_else(|| {
                LedgerError::not_found(format!("asset {} has no tokenization", asset_id))
            })
    }

    /// Newest first. A missing `limit` takes the configured default; any
    /// limit is clamped to the configured maximum.
    pub fn list(
        &self,
        page: Option<u32>,
        limit: Option<u32>,
        filter: &TokenizationFilter,
    ) -> Result<(Vec<Tokenization>, u64), LedgerError> {
        let request = self.ctx.config.page_request(page, limit);
        Ok(self.ctx.storage.list_tokenizations(filter, request)?)
    }

    /// Move a tokenization to `status`. Re-asserting the current status
    /// changes nothing.
    pub fn update_status(
        &self,
        id: &TokenizationId,
        status: TokenizationStatus,
    ) -> Result<Tokenization, LedgerError> {
        let _guard = self.ctx.lock(LockKey::Tokenization(*id), "update_status")?;
        let current = self.get(id)?;

        if current.status == status {
            return Ok(current);
        }
        if !current.status.can_transition_to(status) {
            return Err(LedgerError::validation(format!(
                "tokenization {} cannot move from {} to {}",
                id, current.status, status
            )));
        }

        let mut updated = current.clone();
        updated.status = status;
        updated.updated_at = self.ctx.clock.now();

        let mut batch = LedgerBatch::new();
        batch.update_tokenization(updated.clone());
        self.ctx.commit(batch)?;

        log::info!("Tokenization {} moved from {} to {}", id, current.status, status);
        Ok(updated)
    }

    /// Unit price quoted for the next primary sale
    pub fn current_price(&self, tokenization: &Tokenization) -> Result<u64, LedgerError> {
        self.pricing.current_price(tokenization)
    }
}
