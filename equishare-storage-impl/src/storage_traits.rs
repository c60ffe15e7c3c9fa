use equishare_core::error::StorageError;
use equishare_core::id::{AssetId, HolderId, OfferId, TokenizationId};
use equishare_core::offer::Offer;
use equishare_core::participation::Participation;
use equishare_core::tokenization::{RiskRating, Tokenization, TokenizationStatus};
use equishare_core::transaction::{HashAnchor, Transaction};

/// Filters for listing tokenizations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenizationFilter {
    pub status: Option<TokenizationStatus>,
    pub risk_rating: Option<RiskRating>,
}

impl TokenizationFilter {
    pub fn matches(&self, tokenization: &Tokenization) -> bool {
        self.status.map_or(true, |s| s == tokenization.status)
            && self.risk_rating.map_or(true, |r| r == tokenization.risk_rating)
    }
}

/// A 1-based page of results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    /// Number of rows to skip; page 0 is treated as page 1
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.limit)
    }
}

/// A write to a tokenization header
#[derive(Debug, Clone, PartialEq)]
pub enum TokenizationWrite {
    /// New header; fails if the id or the asset is already present
    Insert(Tokenization),
    /// Replacement of an existing header; fails if it does not exist
    Update(Tokenization),
}

/// A write to an offer
#[derive(Debug, Clone, PartialEq)]
pub enum OfferWrite {
    /// New offer; fails if the id is already present
    Insert(Offer),
    /// Replacement of an existing offer; fails if it does not exist
    Update(Offer),
}

/// Every write produced by one ledger operation.
///
/// A batch is committed all-or-nothing: either every write is visible
/// afterwards or none is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerBatch {
    pub tokenizations: Vec<TokenizationWrite>,

    /// Journal entries, appended in order
    pub transactions: Vec<Transaction>,

    /// Full participation rows after merging, upserted by (tokenization, investor)
    pub participations: Vec<Participation>,

    pub offers: Vec<OfferWrite>,
}

impl LedgerBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_tokenization(&mut self, tokenization: Tokenization) -> &mut Self {
        self.tokenizations.push(TokenizationWrite::Insert(tokenization));
        self
    }

    pub fn update_tokenization(&mut self, tokenization: Tokenization) -> &mut Self {
        self.tokenizations.push(TokenizationWrite::Update(tokenization));
        self
    }

    pub fn append_transaction(&mut self, transaction: Transaction) -> &mut Self {
        self.transactions.push(transaction);
        self
    }

    pub fn upsert_participation(&mut self, participation: Participation) -> &mut Self {
        self.participations.push(participation);
        self
    }

    pub fn insert_offer(&mut self, offer: Offer) -> &mut Self {
        self.offers.push(OfferWrite::Insert(offer));
        self
    }

    pub fn update_offer(&mut self, offer: Offer) -> &mut Self {
        self.offers.push(OfferWrite::Update(offer));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tokenizations.is_empty()
            && self.transactions.is_empty()
            && self.participations.is_empty()
            && self.offers.is_empty()
    }

    /// Whether a journal entry with this anchor is already staged
    pub fn has_anchor(&self, anchor: &HashAnchor) -> bool {
        self.transactions.iter().any(|t| &t.hash_anchor == anchor)
    }

    /// Ids of the tokenizations inserted by this batch
    pub(crate) fn inserted_tokenization_ids(&self) -> impl Iterator<Item = &TokenizationId> {
        self.tokenizations.iter().filter_map(|w| match w {
            TokenizationWrite::Insert(t) => Some(&t.id),
            TokenizationWrite::Update(_) => None,
        })
    }
}

/// Persistence for tokenization headers, the transaction journal,
/// participations and offers
pub trait LedgerStorage: Send + Sync {
    /// Get a tokenization by id
    fn get_tokenization(&self, id: &TokenizationId) -> Result<Option<Tokenization>, StorageError>;

    /// Get the tokenization of an asset
    fn get_tokenization_by_asset(
        &self,
        asset_id: &AssetId,
    ) -> Result<Option<Tokenization>, StorageError>;

    /// List tokenizations newest first
    ///
    /// # Returns
    /// The requested page and the total number of matching rows
    fn list_tokenizations(
        &self,
        filter: &TokenizationFilter,
        page: PageRequest,
    ) -> Result<(Vec<Tokenization>, u64), StorageError>;

    /// Journal entries of a tokenization in append order
    fn list_transactions(
        &self,
        tokenization_id: &TokenizationId,
    ) -> Result<Vec<Transaction>, StorageError>;

    /// Whether a journal entry with this anchor exists
    fn anchor_exists(&self, anchor: &HashAnchor) -> Result<bool, StorageError>;

    /// Get a single holder's position
    fn get_participation(
        &self,
        tokenization_id: &TokenizationId,
        investor_id: &HolderId,
    ) -> Result<Option<Participation>, StorageError>;

    /// All positions in a tokenization, in first-acquisition order
    fn list_participations(
        &self,
        tokenization_id: &TokenizationId,
    ) -> Result<Vec<Participation>, StorageError>;

    /// Get an offer by id
    fn get_offer(&self, id: &OfferId) -> Result<Option<Offer>, StorageError>;

    /// Offers of a tokenization in creation order
    fn list_offers(&self, tokenization_id: &TokenizationId) -> Result<Vec<Offer>, StorageError>;

    /// Apply every write in `batch` atomically
    ///
    /// # Returns
    /// * `Ok(())` - All writes are visible
    /// * `Err` - Nothing was written
    fn commit(&self, batch: LedgerBatch) -> Result<(), StorageError>;
}
