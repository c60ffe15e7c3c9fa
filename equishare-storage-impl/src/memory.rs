use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use equishare_core::asset::{Asset, AssetRegistry};
use equishare_core::error::StorageError;
use equishare_core::id::{AssetId, HolderId, OfferId, TokenizationId, TransactionId};
use equishare_core::offer::Offer;
use equishare_core::participation::Participation;
use equishare_core::tokenization::Tokenization;
use equishare_core::transaction::{HashAnchor, Transaction};

use crate::storage_traits::{
    LedgerBatch, LedgerStorage, OfferWrite, PageRequest, TokenizationFilter, TokenizationWrite,
};

#[derive(Debug, Default)]
struct Tables {
    tokenizations: HashMap<TokenizationId, Tokenization>,
    /// Insertion order, oldest first
    tokenization_order: Vec<TokenizationId>,
    by_asset: HashMap<AssetId, TokenizationId>,

    transactions: Vec<Transaction>,
    transaction_ids: HashSet<TransactionId>,
    anchors: HashSet<HashAnchor>,

    participations: HashMap<(TokenizationId, HolderId), Participation>,
    participation_order: Vec<(TokenizationId, HolderId)>,

    offers: HashMap<OfferId, Offer>,
    offer_order: Vec<OfferId>,
}

impl Tables {
    /// Check every write in the batch against the current tables and against
    /// the writes before it. Nothing is modified.
    fn validate(&self, batch: &LedgerBatch) -> Result<(), StorageError> {
        let mut new_ids: HashSet<TokenizationId> = HashSet::new();
        let mut new_assets: HashSet<AssetId> = HashSet::new();

        for write in &batch.tokenizations {
            match write {
                TokenizationWrite::Insert(t) => {
                    if self.tokenizations.contains_key(&t.id) || !new_ids.insert(t.id) {
                        return Err(StorageError::DuplicateKey(format!(
                            "tokenization {} already exists",
                            t.id
                        )));
                    }
                    if self.by_asset.contains_key(&t.asset_id) || !new_assets.insert(t.asset_id) {
                        return Err(StorageError::DuplicateKey(format!(
                            "asset {} is already tokenized",
                            t.asset_id
                        )));
                    }
                }
                TokenizationWrite::Update(t) => {
                    let existing_asset = match self.tokenizations.get(&t.id) {
                        Some(existing) => Some(existing.asset_id),
                        None if new_ids.contains(&t.id) => None,
                        None => {
                            return Err(StorageError::NotFound(format!(
                                "tokenization {} does not exist",
                                t.id
                            )))
                        }
                    };
                    if existing_asset.map_or(false, |asset| asset != t.asset_id) {
                        return Err(StorageError::Other(format!(
                            "tokenization {} cannot change its asset",
                            t.id
                        )));
                    }
                }
            }
        }

        let mut new_anchors: HashSet<&HashAnchor> = HashSet::new();
        let mut new_transaction_ids: HashSet<TransactionId> = HashSet::new();
        for transaction in &batch.transactions {
            if self.anchors.contains(&transaction.hash_anchor)
                || !new_anchors.insert(&transaction.hash_anchor)
            {
                return Err(StorageError::DuplicateKey(format!(
                    "hash anchor {} already journaled",
                    transaction.hash_anchor
                )));
            }
            if self.transaction_ids.contains(&transaction.id)
                || !new_transaction_ids.insert(transaction.id)
            {
                return Err(StorageError::DuplicateKey(format!(
                    "transaction {} already journaled",
                    transaction.id
                )));
            }
        }

        let inserted: HashSet<&TokenizationId> = batch.inserted_tokenization_ids().collect();
        for participation in &batch.participations {
            if !self.tokenizations.contains_key(&participation.tokenization_id)
                && !inserted.contains(&participation.tokenization_id)
            {
                return Err(StorageError::NotFound(format!(
                    "tokenization {} does not exist",
                    participation.tokenization_id
                )));
            }
        }

        let mut new_offers: HashSet<OfferId> = HashSet::new();
        for write in &batch.offers {
            match write {
                OfferWrite::Insert(offer) => {
                    if self.offers.contains_key(&offer.id) || !new_offers.insert(offer.id) {
                        return Err(StorageError::DuplicateKey(format!(
                            "offer {} already exists",
                            offer.id
                        )));
                    }
                }
                OfferWrite::Update(offer) => {
                    if !self.offers.contains_key(&offer.id) && !new_offers.contains(&offer.id) {
                        return Err(StorageError::NotFound(format!(
                            "offer {} does not exist",
                            offer.id
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    fn apply(&mut self, batch: LedgerBatch) {
        for write in batch.tokenizations {
            match write {
                TokenizationWrite::Insert(t) => {
                    self.tokenization_order.push(t.id);
                    self.by_asset.insert(t.asset_id, t.id);
                    self.tokenizations.insert(t.id, t);
                }
                TokenizationWrite::Update(t) => {
                    self.tokenizations.insert(t.id, t);
                }
            }
        }

        for transaction in batch.transactions {
            self.anchors.insert(transaction.hash_anchor.clone());
            self.transaction_ids.insert(transaction.id);
            self.transactions.push(transaction);
        }

        for participation in batch.participations {
            let key = (participation.tokenization_id, participation.investor_id);
            if self.participations.insert(key, participation).is_none() {
                self.participation_order.push(key);
            }
        }

        for write in batch.offers {
            match write {
                OfferWrite::Insert(offer) => {
                    self.offer_order.push(offer.id);
                    self.offers.insert(offer.id, offer);
                }
                OfferWrite::Update(offer) => {
                    self.offers.insert(offer.id, offer);
                }
            }
        }
    }
}

/// Ledger storage kept entirely in process memory
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    tables: RwLock<Tables>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StorageError> {
        self.tables
            .read()
            .map_err(|e| StorageError::Other(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StorageError> {
        self.tables
            .write()
            .map_err(|e| StorageError::Other(format!("Failed to acquire write lock: {}", e)))
    }
}

impl LedgerStorage for InMemoryStorage {
    fn get_tokenization(&self, id: &TokenizationId) -> Result<Option<Tokenization>, StorageError> {
        Ok(self.read()?.tokenizations.get(id).cloned())
    }

    fn get_tokenization_by_asset(
        &self,
        asset_id: &AssetId,
    ) -> Result<Option<Tokenization>, StorageError> {
        let tables = self.read()?;
        Ok(tables
            .by_asset
            .get(asset_id)
            .and_then(|id| tables.tokenizations.get(id))
            .cloned())
    }

    fn list_tokenizations(
        &self,
        filter: &TokenizationFilter,
        page: PageRequest,
    ) -> Result<(Vec<Tokenization>, u64), StorageError> {
        let tables = self.read()?;
        let matching: Vec<&Tokenization> = tables
            .tokenization_order
            .iter()
            .rev()
            .filter_map(|id| tables.tokenizations.get(id))
            .filter(|t| filter.matches(t))
            .collect();

        let total = matching.len() as u64;
        let rows = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .cloned()
            .collect();
        Ok((rows, total))
    }

    fn list_transactions(
        &self,
        tokenization_id: &TokenizationId,
    ) -> Result<Vec<Transaction>, StorageError> {
        Ok(self
            .read()?
            .transactions
            .iter()
            .filter(|t| &t.tokenization_id == tokenization_id)
            .cloned()
            .collect())
    }

    fn anchor_exists(&self, anchor: &HashAnchor) -> Result<bool, StorageError> {
        Ok(self.read()?.anchors.contains(anchor))
    }

    fn get_participation(
        &self,
        tokenization_id: &TokenizationId,
        investor_id: &HolderId,
    ) -> Result<Option<Participation>, StorageError> {
        Ok(self
            .read()?
            .participations
            .get(&(*tokenization_id, *investor_id))
            .cloned())
    }

    fn list_participations(
        &self,
        tokenization_id: &TokenizationId,
    ) -> Result<Vec<Participation>, StorageError> {
        let tables = self.read()?;
        Ok(tables
            .participation_order
            .iter()
            .filter(|(tok, _)| tok == tokenization_id)
            .filter_map(|key| tables.participations.get(key))
            .cloned()
            .collect())
    }

    fn get_offer(&self, id: &OfferId) -> Result<Option<Offer>, StorageError> {
        Ok(self.read()?.offers.get(id).cloned())
    }

    fn list_offers(&self, tokenization_id: &TokenizationId) -> Result<Vec<Offer>, StorageError> {
        let tables = self.read()?;
        Ok(tables
            .offer_order
            .iter()
            .filter_map(|id| tables.offers.get(id))
            .filter(|offer| &offer.tokenization_id == tokenization_id)
            .cloned()
            .collect())
    }

    fn commit(&self, batch: LedgerBatch) -> Result<(), StorageError> {
        let mut tables = self.write()?;
        tables.validate(&batch)?;
        tables.apply(batch);
        Ok(())
    }
}

/// Asset registry backed by a map, for embedding and tests
#[derive(Debug, Default)]
pub struct InMemoryAssetRegistry {
    assets: RwLock<HashMap<AssetId, Asset>>,
}

impl InMemoryAssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace an asset
    pub fn insert(&self, asset: Asset) -> Result<(), StorageError> {
        let mut assets = self
            .assets
            .write()
            .map_err(|e| StorageError::Other(format!("Failed to acquire write lock: {}", e)))?;
        assets.insert(asset.id, asset);
        Ok(())
    }
}

impl AssetRegistry for InMemoryAssetRegistry {
    fn find_by_id(&self, id: &AssetId) -> Result<Option<Asset>, StorageError> {
        let assets = self
            .assets
            .read()
            .map_err(|e| StorageError::Other(format!("Failed to acquire read lock: {}", e)))?;
        Ok(assets.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use equishare_core::tokenization::{RiskRating, TokenizationStatus};
    use equishare_core::transaction::TransactionKind;

    fn tokenization(label: &str) -> Tokenization {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Tokenization {
            id: TokenizationId::from_label(label),
            asset_id: AssetId::from_label(&format!("{}-asset", label)),
            issuer_id: HolderId::from_label("owner"),
            total_tokens: 1000,
            tokens_locked_owner: 600,
            tokens_available_for_sale: 400,
            tokens_sold: 0,
            price_initial: 100,
            min_owner_percentage: 60,
            max_publicly_tradable_percentage: 40,
            control_lock: true,
            status: TokenizationStatus::Pending,
            risk_rating: RiskRating::AA,
            insurance: None,
            created_at: at,
            updated_at: at,
        }
    }

    fn transaction(tok: &Tokenization, label: &str, anchor_ts: i64) -> Transaction {
        let buyer = HolderId::from_label(label);
        Transaction {
            id: TransactionId::from_label(label),
            tokenization_id: tok.id,
            seller_id: None,
            buyer_id: buyer,
            quantity: 10,
            unit_price: 100,
            total_value: 1000,
            kind: TransactionKind::DirectSale,
            hash_anchor: HashAnchor::compute(&tok.id, &buyer, 10, anchor_ts).unwrap(),
            created_at: tok.created_at,
        }
    }

    #[test]
    fn test_commit_and_read_back() {
        let storage = InMemoryStorage::new();
        let tok = tokenization("a");
        let tx = transaction(&tok, "buyer", 1);
        let position = Participation::open(tok.id, tx.buyer_id, tok.total_tokens, tok.created_at);

        let mut batch = LedgerBatch::new();
        batch
            .insert_tokenization(tok.clone())
            .append_transaction(tx.clone())
            .upsert_participation(position.clone());
        storage.commit(batch).unwrap();

        assert_eq!(storage.get_tokenization(&tok.id).unwrap(), Some(tok.clone()));
        assert_eq!(storage.get_tokenization_by_asset(&tok.asset_id).unwrap(), Some(tok.clone()));
        assert_eq!(storage.list_transactions(&tok.id).unwrap(), vec![tx.clone()]);
        assert!(storage.anchor_exists(&tx.hash_anchor).unwrap());
        assert_eq!(
            storage.get_participation(&tok.id, &tx.buyer_id).unwrap(),
            Some(position)
        );
    }

    #[test]
    fn test_failed_batch_leaves_no_trace() {
        let storage = InMemoryStorage::new();
        let tok = tokenization("a");
        let tx = transaction(&tok, "buyer", 1);
        let mut batch = LedgerBatch::new();
        batch.insert_tokenization(tok.clone()).append_transaction(tx.clone());
        storage.commit(batch).unwrap();

        // Counter update followed by a duplicate anchor: the whole batch must be rejected
        let mut sold = tok.clone();
        sold.tokens_sold = 10;
        let mut duplicate = transaction(&tok, "buyer", 1);
        duplicate.id = TransactionId::from_label("another id");
        let mut batch = LedgerBatch::new();
        batch.update_tokenization(sold).append_transaction(duplicate);

        let err = storage.commit(batch).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateKey(_)));
        assert_eq!(storage.get_tokenization(&tok.id).unwrap().unwrap().tokens_sold, 0);
        assert_eq!(storage.list_transactions(&tok.id).unwrap().len(), 1);
    }

    #[test]
    fn test_one_tokenization_per_asset() {
        let storage = InMemoryStorage::new();
        let tok = tokenization("a");
        let mut batch = LedgerBatch::new();
        batch.insert_tokenization(tok.clone());
        storage.commit(batch).unwrap();

        let mut again = tokenization("b");
        again.asset_id = tok.asset_id;
        let mut batch = LedgerBatch::new();
        batch.insert_tokenization(again.clone());
        assert!(matches!(storage.commit(batch), Err(StorageError::DuplicateKey(_))));
        assert!(storage.get_tokenization(&again.id).unwrap().is_none());
    }

    #[test]
    fn test_update_requires_existing_rows() {
        let storage = InMemoryStorage::new();
        let mut batch = LedgerBatch::new();
        batch.update_tokenization(tokenization("ghost"));
        assert!(matches!(storage.commit(batch), Err(StorageError::NotFound(_))));

        let tok = tokenization("a");
        let mut batch = LedgerBatch::new();
        batch.upsert_participation(Participation::open(
            tok.id,
            HolderId::from_label("x"),
            1000,
            tok.created_at,
        ));
        assert!(matches!(storage.commit(batch), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_list_tokenizations_pages_newest_first() {
        let storage = InMemoryStorage::new();
        for label in ["a", "b", "c", "d", "e"] {
            let mut tok = tokenization(label);
            if label == "c" {
                tok.status = TokenizationStatus::Active;
            }
            let mut batch = LedgerBatch::new();
            batch.insert_tokenization(tok);
            storage.commit(batch).unwrap();
        }

        let (page, total) = storage
            .list_tokenizations(&TokenizationFilter::default(), PageRequest::new(1, 2))
            .unwrap();
        assert_eq!(total, 5);
        assert_eq!(
            page.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![TokenizationId::from_label("e"), TokenizationId::from_label("d")]
        );

        let (page, _) = storage
            .list_tokenizations(&TokenizationFilter::default(), PageRequest::new(3, 2))
            .unwrap();
        assert_eq!(page.len(), 1);

        let filter = TokenizationFilter {
            status: Some(TokenizationStatus::Active),
            risk_rating: None,
        };
        let (page, total) = storage.list_tokenizations(&filter, PageRequest::new(1, 10)).unwrap();
        assert_eq!(total, 1);
        assert_eq!(page[0].id, TokenizationId::from_label("c"));
    }

    #[test]
    fn test_asset_registry() {
        let registry = InMemoryAssetRegistry::new();
        let asset = Asset {
            id: AssetId::from_label("mare"),
            status: equishare_core::asset::AssetStatus::Active,
            birth_date: None,
            sex: equishare_core::asset::Sex::Female,
        };
        registry.insert(asset.clone()).unwrap();
        assert_eq!(registry.find_by_id(&asset.id).unwrap(), Some(asset));
        assert_eq!(registry.find_by_id(&AssetId::from_label("unknown")).unwrap(), None);
    }
}
