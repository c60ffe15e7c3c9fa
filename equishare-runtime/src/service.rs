use anyhow::{anyhow, Result as AnyResult};
use std::sync::Arc;

use equishare_core::asset::AssetRegistry;
use equishare_core::clock::{Clock, SystemClock};
use equishare_core::error::{ErrorKind, LedgerError};
use equishare_core::id::{
    AssetId, HolderId, IdGenerator, OfferId, SequentialIdGenerator, TokenizationId,
};
use equishare_core::locks::LockManager;
use equishare_core::tokenization::{NewTokenization, Tokenization, TokenizationStatus};
use equishare_storage_impl::{InProcessLockManager, LedgerStorage, TokenizationFilter};

use crate::config::LedgerConfig;
use crate::context::LedgerContext;
use crate::executor::{BuyOrder, OrderExecutor};
use crate::journal::TransactionJournal;
use crate::ledger::TokenizationLedger;
use crate::offers::{NewOffer, OfferBoard};
use crate::participation::ParticipationBook;
use crate::pricing::{PricingStrategy, StepPricing};
use crate::rating::RiskRatingEngine;
use crate::views::{OfferView, ParticipationView, TokenizationView, TransactionView};

/// Operations exposed to the surrounding application
pub trait TokenizationRuntime: Send + Sync {
    /// Tokenize a registered asset
    ///
    /// # Returns
    /// * `Ok(view)` - The new tokenization, status `pending`
    /// * `Err(LedgerError::Validation)` - The request breaks an issuance rule
    /// * `Err(LedgerError::NotFound)` - The asset is not registered
    /// * `Err(LedgerError::Conflict)` - The asset is already tokenized
    fn create_tokenization(
        &self,
        request: NewTokenization,
    ) -> Result<TokenizationView, LedgerError>;

    fn get_tokenization(&self, id: &TokenizationId) -> Result<TokenizationView, LedgerError>;

    fn get_by_asset_id(&self, asset_id: &AssetId) -> Result<TokenizationView, LedgerError>;

    /// List tokenizations newest first
    ///
    /// # Parameters
    /// * `page` - 1-based page number, defaults to 1
    /// * `limit` - Page size, defaults to the configured page size
    /// * `filter` - Optional status and rating filters
    ///
    /// # Returns
    /// The page and the total number of matching tokenizations
    fn list_tokenizations(
        &self,
        page: Option<u32>,
        limit: Option<u32>,
        filter: &TokenizationFilter,
    ) -> Result<(Vec<TokenizationView>, u64), LedgerError>;

    fn update_status(
        &self,
        id: &TokenizationId,
        status: TokenizationStatus,
    ) -> Result<TokenizationView, LedgerError>;

    /// Journal entries in append order
    fn list_transactions(
        &self,
        tokenization_id: &TokenizationId,
    ) -> Result<Vec<TransactionView>, LedgerError>;

    /// Holder positions in first-acquisition order
    fn list_holders(
        &self,
        tokenization_id: &TokenizationId,
    ) -> Result<Vec<ParticipationView>, LedgerError>;

    /// Buy from the public pool at the current price
    fn execute_buy_order(&self, order: BuyOrder) -> Result<TransactionView, LedgerError>;

    fn create_offer(&self, request: NewOffer) -> Result<OfferView, LedgerError>;

    fn get_offer(&self, id: &OfferId) -> Result<OfferView, LedgerError>;

    fn list_offers(&self, tokenization_id: &TokenizationId) -> Result<Vec<OfferView>, LedgerError>;

    fn cancel_offer(&self, id: &OfferId, seller_id: &HolderId) -> Result<OfferView, LedgerError>;
}

/// The tokenization ledger with all of its components wired together
pub struct TokenizationService {
    ctx: LedgerContext,
    ledger: Arc<TokenizationLedger>,
    journal: Arc<TransactionJournal>,
    book: Arc<ParticipationBook>,
    executor: OrderExecutor,
    offers: OfferBoard,
}

impl TokenizationService {
    pub fn builder() -> TokenizationServiceBuilder {
        TokenizationServiceBuilder::default()
    }

    pub fn context(&self) -> &LedgerContext {
        &self.ctx
    }

    pub fn ledger(&self) -> &TokenizationLedger {
        &self.ledger
    }

    pub fn journal(&self) -> &TransactionJournal {
        &self.journal
    }

    pub fn participations(&self) -> &ParticipationBook {
        &self.book
    }

    pub fn executor(&self) -> &OrderExecutor {
        &self.executor
    }

    pub fn offers(&self) -> &OfferBoard {
        &self.offers
    }

    fn view(&self, tokenization: &Tokenization) -> Result<TokenizationView, LedgerError> {
        let price_current = self.ledger.current_price(tokenization)?;
        let investor_count = self.book.investor_count(&tokenization.id)?;
        Ok(TokenizationView::new(tokenization, price_current, investor_count))
    }
}

/// Log a failed operation at a level matching its kind. Storage causes are
/// logged here and never reach the caller.
fn observe<T>(operation: &str, result: Result<T, LedgerError>) -> Result<T, LedgerError> {
    if let Err(err) = &result {
        match err {
            LedgerError::Persistence(cause) => {
                log::error!("{} failed: {}: {}", operation, err, cause)
            }
            _ if err.kind() == ErrorKind::NotFound => log::debug!("{}: {}", operation, err),
            _ => log::warn!("{} rejected: {}", operation, err),
        }
    }
    result
}

impl TokenizationRuntime for TokenizationService {
    fn create_tokenization(
        &self,
        request: NewTokenization,
    ) -> Result<TokenizationView, LedgerError> {
        observe(
            "create_tokenization",
            self.ledger.create(request).and_then(|t| self.view(&t)),
        )
    }

    fn get_tokenization(&self, id: &TokenizationId) -> Result<TokenizationView, LedgerError> {
        observe(
            "get_tokenization",
            self.ledger.get(id).and_then(|t| self.view(&t)),
        )
    }

    fn get_by_asset_id(&self, asset_id: &AssetId) -> Result<TokenizationView, LedgerError> {
        observe(
            "get_by_asset_id",
            self.ledger.get_by_asset(asset_id).and_then(|t| self.view(&t)),
        )
    }

    fn list_tokenizations(
        &self,
        page: Option<u32>,
        limit: Option<u32>,
        filter: &TokenizationFilter,
    ) -> Result<(Vec<TokenizationView>, u64), LedgerError> {
        let result = self.ledger.list(page, limit, filter).and_then(|(rows, total)| {
            let views = rows
                .iter()
                .map(|t| self.view(t))
                .collect::<Result<Vec<_>, _>>()?;
            Ok((views, total))
        });
        observe("list_tokenizations", result)
    }

    fn update_status(
        &self,
        id: &TokenizationId,
        status: TokenizationStatus,
    ) -> Result<TokenizationView, LedgerError> {
        observe(
            "update_status",
            self.ledger.update_status(id, status).and_then(|t| self.view(&t)),
        )
    }

    fn list_transactions(
        &self,
        tokenization_id: &TokenizationId,
    ) -> Result<Vec<TransactionView>, LedgerError> {
        let result = self.ledger.get(tokenization_id).and_then(|_| {
            let entries = self.journal.list_by_tokenization(tokenization_id)?;
            Ok(entries.iter().map(TransactionView::from).collect())
        });
        observe("list_transactions", result)
    }

    fn list_holders(
        &self,
        tokenization_id: &TokenizationId,
    ) -> Result<Vec<ParticipationView>, LedgerError> {
        let result = self.ledger.get(tokenization_id).and_then(|_| {
            let holders = self.book.list_holders(tokenization_id)?;
            Ok(holders.iter().map(ParticipationView::from).collect())
        });
        observe("list_holders", result)
    }

    fn execute_buy_order(&self, order: BuyOrder) -> Result<TransactionView, LedgerError> {
        observe(
            "execute_buy_order",
            self.executor.execute_buy(order).map(|t| TransactionView::from(&t)),
        )
    }

    fn create_offer(&self, request: NewOffer) -> Result<OfferView, LedgerError> {
        observe(
            "create_offer",
            self.offers.create(request).map(|o| OfferView::from(&o)),
        )
    }

    fn get_offer(&self, id: &OfferId) -> Result<OfferView, LedgerError> {
        observe("get_offer", self.offers.get(id).map(|o| OfferView::from(&o)))
    }

    fn list_offers(&self, tokenization_id: &TokenizationId) -> Result<Vec<OfferView>, LedgerError> {
        observe(
            "list_offers",
            self.offers
                .list(tokenization_id)
                .map(|offers| offers.iter().map(OfferView::from).collect()),
        )
    }

    fn cancel_offer(&self, id: &OfferId, seller_id: &HolderId) -> Result<OfferView, LedgerError> {
        observe(
            "cancel_offer",
            self.offers.cancel(id, seller_id).map(|o| OfferView::from(&o)),
        )
    }
}

/// Wires a [`TokenizationService`] from explicitly supplied collaborators.
///
/// Storage and the asset registry are required; everything else has a
/// default (in-process locks, wall clock, time-seeded ids, step pricing
/// from the configuration).
#[derive(Default)]
pub struct TokenizationServiceBuilder {
    storage: Option<Arc<dyn LedgerStorage>>,
    assets: Option<Arc<dyn AssetRegistry>>,
    locks: Option<Arc<dyn LockManager>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    pricing: Option<Arc<dyn PricingStrategy>>,
    config: LedgerConfig,
}

impl TokenizationServiceBuilder {
    pub fn storage(mut self, storage: Arc<dyn LedgerStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn asset_registry(mut self, assets: Arc<dyn AssetRegistry>) -> Self {
        self.assets = Some(assets);
        self
    }

    pub fn lock_manager(mut self, locks: Arc<dyn LockManager>) -> Self {
        self.locks = Some(locks);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn pricing(mut self, pricing: Arc<dyn PricingStrategy>) -> Self {
        self.pricing = Some(pricing);
        self
    }

    pub fn config(mut self, config: LedgerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> AnyResult<TokenizationService> {
        self.config.validate()?;
        let storage = self
            .storage
            .ok_or_else(|| anyhow!("a ledger storage backend is required"))?;
        let assets = self
            .assets
            .ok_or_else(|| anyhow!("an asset registry is required"))?;
        let pricing = self.pricing.unwrap_or_else(|| {
            Arc::new(StepPricing::from_config(&self.config.pricing)) as Arc<dyn PricingStrategy>
        });
        let rating = RiskRatingEngine::new(&self.config.rating);

        let ctx = LedgerContext {
            storage,
            locks: self
                .locks
                .unwrap_or_else(|| Arc::new(InProcessLockManager::new()) as Arc<dyn LockManager>),
            clock: self
                .clock
                .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>),
            ids: self.ids.unwrap_or_else(|| {
                Arc::new(SequentialIdGenerator::from_system_time()) as Arc<dyn IdGenerator>
            }),
            config: Arc::new(self.config),
        };

        let journal = Arc::new(TransactionJournal::new(ctx.clone()));
        let book = Arc::new(ParticipationBook::new(ctx.clone()));
        let ledger = Arc::new(TokenizationLedger::new(
            ctx.clone(),
            assets,
            rating,
            pricing,
            Arc::clone(&journal),
            Arc::clone(&book),
        ));
        let executor = OrderExecutor::new(
            ctx.clone(),
            Arc::clone(&ledger),
            Arc::clone(&journal),
            Arc::clone(&book),
        );
        let offers = OfferBoard::new(ctx.clone(), Arc::clone(&ledger), Arc::clone(&book));

        log::debug!("Tokenization service ready");
        Ok(TokenizationService {
            ctx,
            ledger,
            journal,
            book,
            executor,
            offers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use chrono::{TimeZone, Utc};
    use equishare_core::asset::{Asset, AssetStatus, Sex};
    use equishare_core::clock::ManualClock;
    use equishare_core::error::StorageError;
    use equishare_core::offer::{Offer, OfferStatus};
    use equishare_core::participation::Participation;
    use equishare_core::transaction::{HashAnchor, Transaction};
    use equishare_storage_impl::{
        InMemoryAssetRegistry, InMemoryStorage, LedgerBatch, PageRequest, SqliteStorage,
    };
    use std::thread;

    fn buy(
        tokenization_id: TokenizationId,
        buyer: &str,
        quantity: u64,
        max_price: u64,
    ) -> BuyOrder {
        BuyOrder {
            tokenization_id,
            buyer_id: HolderId::from_label(buyer),
            quantity,
            max_price,
        }
    }

    #[test]
    fn test_issue_activate_and_buy() {
        let fixture = Fixture::new();
        let service = &fixture.service;

        let created = service.create_tokenization(fixture.request()).unwrap();
        assert_eq!(created.tokens_locked_owner, 600);
        assert_eq!(created.tokens_available_for_sale, 400);
        assert_eq!(created.price_current, 100);
        assert_eq!(created.investor_count, 1);
        assert_eq!(created.id.len(), 64);

        let id = fixture.tokenization_id();
        service.update_status(&id, TokenizationStatus::Active).unwrap();

        let sale = service.execute_buy_order(buy(id, "buyer", 100, 200)).unwrap();
        assert_eq!(sale.quantity, 100);
        assert_eq!(sale.unit_price, 100);
        assert_eq!(sale.total_value, 10_000);

        let view = service.get_tokenization(&id).unwrap();
        assert_eq!(view.tokens_sold, 100);
        assert_eq!(view.tokens_remaining, 300);
        assert_eq!(view.price_current, 110);
        assert_eq!(view.investor_count, 2);
        assert_eq!(service.get_by_asset_id(&fixture.asset_id).unwrap(), view);

        let holders = service.list_holders(&id).unwrap();
        let buyer = holders
            .iter()
            .find(|h| h.investor_id == HolderId::from_label("buyer").to_hex())
            .unwrap();
        assert_eq!(buyer.quantity, 100);
        assert_eq!(buyer.percentage, 10.0);

        let journal = service.list_transactions(&id).unwrap();
        assert_eq!(journal.len(), 2);
        assert_eq!(journal[1], sale);
    }

    #[test]
    fn test_oversized_buy_changes_nothing() {
        let fixture = Fixture::with_active_tokenization();
        let service = &fixture.service;
        let id = fixture.tokenization_id();
        let before = service.get_tokenization(&id).unwrap();

        let err = service
            .execute_buy_order(buy(id, "whale", 401, 1_000))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("requested 401, remaining 400"), "{}", err);

        assert_eq!(service.get_tokenization(&id).unwrap(), before);
        assert_eq!(service.list_transactions(&id).unwrap().len(), 1);
        assert_eq!(service.list_holders(&id).unwrap().len(), 1);
    }

    #[test]
    fn test_minority_owner_share_is_rejected() {
        let fixture = Fixture::new();
        let mut request = fixture.request();
        request.min_owner_percentage = 50;
        request.max_publicly_tradable_percentage = 50;

        let err = fixture.service.create_tokenization(request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("minimum owner percentage"), "{}", err);
        assert_eq!(
            fixture.service.get_by_asset_id(&fixture.asset_id).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_concurrent_buys_never_oversell() {
        let fixture = Fixture::with_active_tokenization();
        let id = fixture.tokenization_id();
        let (buyers, attempts, quantity) = (8, 10, 7u64);

        let outcomes: Vec<Result<TransactionView, LedgerError>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..buyers)
                .map(|b| {
                    let service = &fixture.service;
                    scope.spawn(move || {
                        (0..attempts)
                            .map(|_| {
                                let buyer = format!("buyer-{}", b);
                                service.execute_buy_order(buy(id, &buyer, quantity, 1_000))
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        let sold: u64 = outcomes
            .iter()
            .filter_map(|o| o.as_ref().ok())
            .map(|t| t.quantity)
            .sum();
        assert_eq!(sold, 400 / quantity * quantity);
        for failure in outcomes.iter().filter_map(|o| o.as_ref().err()) {
            assert_eq!(failure.kind(), ErrorKind::Validation);
        }

        let tokenization = fixture.tokenization();
        assert_eq!(tokenization.tokens_sold, sold);
        assert!(tokenization.check_invariants().is_ok());

        let held: u64 = fixture
            .service
            .participations()
            .list_holders(&id)
            .unwrap()
            .iter()
            .filter(|p| p.investor_id != fixture.issuer)
            .map(|p| p.quantity)
            .sum();
        assert_eq!(held, sold);
    }

    /// Reports every anchor as unused, so a colliding entry reaches commit
    struct ForgetfulAnchors(Arc<InMemoryStorage>);

    impl LedgerStorage for ForgetfulAnchors {
        fn get_tokenization(
            &self,
            id: &TokenizationId,
        ) -> Result<Option<Tokenization>, StorageError> {
            self.0.get_tokenization(id)
        }

        fn get_tokenization_by_asset(
            &self,
            asset_id: &AssetId,
        ) -> Result<Option<Tokenization>, StorageError> {
            self.0.get_tokenization_by_asset(asset_id)
        }

        fn list_tokenizations(
            &self,
            filter: &TokenizationFilter,
            page: PageRequest,
        ) -> Result<(Vec<Tokenization>, u64), StorageError> {
            self.0.list_tokenizations(filter, page)
        }

        fn list_transactions(
            &self,
            tokenization_id: &TokenizationId,
        ) -> Result<Vec<Transaction>, StorageError> {
            self.0.list_transactions(tokenization_id)
        }

        fn anchor_exists(&self, _anchor: &HashAnchor) -> Result<bool, StorageError> {
            Ok(false)
        }

        fn get_participation(
            &self,
            tokenization_id: &TokenizationId,
            investor_id: &HolderId,
        ) -> Result<Option<Participation>, StorageError> {
            self.0.get_participation(tokenization_id, investor_id)
        }

        fn list_participations(
            &self,
            tokenization_id: &TokenizationId,
        ) -> Result<Vec<Participation>, StorageError> {
            self.0.list_participations(tokenization_id)
        }

        fn get_offer(&self, id: &OfferId) -> Result<Option<Offer>, StorageError> {
            self.0.get_offer(id)
        }

        fn list_offers(
            &self,
            tokenization_id: &TokenizationId,
        ) -> Result<Vec<Offer>, StorageError> {
            self.0.list_offers(tokenization_id)
        }

        fn commit(&self, batch: LedgerBatch) -> Result<(), StorageError> {
            self.0.commit(batch)
        }
    }

    #[test]
    fn test_failed_commit_rolls_back_the_whole_buy() {
        let storage = Arc::new(InMemoryStorage::new());
        let fixture = Fixture::with_storage(
            LedgerConfig::default(),
            Arc::new(ForgetfulAnchors(Arc::clone(&storage))),
            storage,
        );
        fixture.create_active_tokenization();
        let id = fixture.tokenization_id();
        let service = &fixture.service;

        service.execute_buy_order(buy(id, "bob", 5, 1_000)).unwrap();
        let before = service.get_tokenization(&id).unwrap();

        // Same buyer, quantity and second: the anchor collides at commit
        let err = service.execute_buy_order(buy(id, "bob", 5, 1_000)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert_eq!(err.to_string(), "persistence failure");

        assert_eq!(service.get_tokenization(&id).unwrap(), before);
        assert_eq!(service.list_transactions(&id).unwrap().len(), 2);
        let bob = fixture
            .service
            .participations()
            .position(&id, &HolderId::from_label("bob"))
            .unwrap()
            .unwrap();
        assert_eq!(bob.quantity, 5);
    }

    #[test]
    fn test_lock_timeout_is_a_persistence_error() {
        let fixture = Fixture::with_config(LedgerConfig {
            lock_timeout_ms: 10,
            ..Default::default()
        });
        fixture.create_active_tokenization();
        let id = fixture.tokenization_id();

        let ctx = fixture.context();
        let _held = ctx
            .lock(equishare_core::locks::LockKey::Tokenization(id), "test")
            .unwrap();
        let err = fixture
            .service
            .execute_buy_order(buy(id, "bob", 1, 1_000))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert_eq!(fixture.tokenization().tokens_sold, 0);
    }

    #[test]
    fn test_offers_through_the_runtime() {
        let fixture = Fixture::with_active_tokenization();
        let service = &fixture.service;
        let id = fixture.tokenization_id();
        service.execute_buy_order(buy(id, "seller", 30, 1_000)).unwrap();

        let offer = service
            .create_offer(NewOffer {
                tokenization_id: id,
                seller_id: HolderId::from_label("seller"),
                quantity: 10,
                unit_price: 125,
                valid_days: 2,
            })
            .unwrap();
        assert_eq!(offer.status, OfferStatus::Active);
        assert_eq!(offer.expires_at, "2024-06-03T12:00:00.000Z");

        let offer_id = OfferId::from_hex(&offer.id).unwrap();
        assert_eq!(service.get_offer(&offer_id).unwrap(), offer);
        assert_eq!(service.list_offers(&id).unwrap(), vec![offer.clone()]);

        let cancelled = service
            .cancel_offer(&offer_id, &HolderId::from_label("seller"))
            .unwrap();
        assert_eq!(cancelled.status, OfferStatus::Cancelled);
        assert!(cancelled.cancelled_at.is_some());

        // Offers never move tokens
        assert_eq!(service.get_tokenization(&id).unwrap().tokens_sold, 30);
    }

    #[test]
    fn test_reads_of_unknown_tokenizations() {
        let fixture = Fixture::new();
        let service = &fixture.service;
        let missing = TokenizationId::from_label("missing");

        assert_eq!(service.get_tokenization(&missing).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(
            service.get_by_asset_id(&fixture.asset_id).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(service.list_transactions(&missing).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(service.list_holders(&missing).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(service.list_offers(&missing).unwrap_err().kind(), ErrorKind::NotFound);

        let (page, total) = service
            .list_tokenizations(None, None, &TokenizationFilter::default())
            .unwrap();
        assert!(page.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn test_builder_requires_storage_and_registry() {
        assert!(TokenizationService::builder().build().is_err());
        assert!(TokenizationService::builder()
            .storage(Arc::new(InMemoryStorage::new()))
            .build()
            .is_err());

        let invalid = LedgerConfig {
            max_page_limit: 0,
            ..Default::default()
        };
        assert!(TokenizationService::builder()
            .storage(Arc::new(InMemoryStorage::new()))
            .asset_registry(Arc::new(InMemoryAssetRegistry::new()))
            .config(invalid)
            .build()
            .is_err());
    }

    #[test]
    fn test_sqlite_backed_service_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("equishare.db");
        let assets = Arc::new(InMemoryAssetRegistry::new());
        let asset_id = AssetId::from_label("stallion");
        assets
            .insert(Asset {
                id: asset_id,
                status: AssetStatus::Active,
                birth_date: None,
                sex: Sex::Male,
            })
            .unwrap();
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()));

        let build = || {
            TokenizationService::builder()
                .storage(Arc::new(SqliteStorage::new(&path).unwrap()))
                .asset_registry(assets.clone())
                .clock(clock.clone())
                .id_generator(Arc::new(SequentialIdGenerator::new(b"sqlite")))
                .build()
                .unwrap()
        };

        let (created, sale) = {
            let service = build();
            let created = service
                .create_tokenization(NewTokenization {
                    asset_id,
                    issuer_id: HolderId::from_label("breeder"),
                    total_tokens: 500,
                    price_initial: 2_000,
                    min_owner_percentage: 75,
                    max_publicly_tradable_percentage: 25,
                    control_lock: false,
                    insurance: None,
                })
                .unwrap();
            // 20 + 10 + 10
            assert_eq!(created.risk_rating, equishare_core::tokenization::RiskRating::BBB);
            let id = TokenizationId::from_hex(&created.id).unwrap();
            service.update_status(&id, TokenizationStatus::Active).unwrap();
            let sale = service.execute_buy_order(buy(id, "investor", 25, 2_000)).unwrap();
            (created, sale)
        };

        let service = build();
        let id = TokenizationId::from_hex(&created.id).unwrap();
        let view = service.get_tokenization(&id).unwrap();
        assert_eq!(view.tokens_locked_owner, 375);
        assert_eq!(view.tokens_sold, 25);
        assert_eq!(view.price_current, 2_200);
        assert_eq!(view.status, TokenizationStatus::Active);
        assert_eq!(view.created_at, created.created_at);
        assert_eq!(service.list_transactions(&id).unwrap().last(), Some(&sale));
        assert_eq!(service.list_holders(&id).unwrap().len(), 2);
    }
}
