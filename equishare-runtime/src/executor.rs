use serde::{Deserialize, Serialize};
use std::sync::Arc;

use equishare_core::error::LedgerError;
use equishare_core::id::{HolderId, TokenizationId};
use equishare_core::locks::LockKey;
use equishare_core::transaction::{PendingTransaction, Transaction, TransactionKind};
use equishare_storage_impl::LedgerBatch;

use crate::context::LedgerContext;
use crate::journal::TransactionJournal;
use crate::ledger::TokenizationLedger;
use crate::participation::{signed, ParticipationBook};

/// A buy from the public pool of a tokenization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyOrder {
    pub tokenization_id: TokenizationId,
    pub buyer_id: HolderId,
    pub quantity: u64,
    /// Highest unit price the buyer accepts, in minor currency units
    pub max_price: u64,
}

/// Executes primary sales against a tokenization's available supply
pub struct OrderExecutor {
    ctx: LedgerContext,
    ledger: Arc<TokenizationLedger>,
    journal: Arc<TransactionJournal>,
    book: Arc<ParticipationBook>,
}

impl OrderExecutor {
    pub fn new(
        ctx: LedgerContext,
        ledger: Arc<TokenizationLedger>,
        journal: Arc<TransactionJournal>,
        book: Arc<ParticipationBook>,
    ) -> Self {
        Self {
            ctx,
            ledger,
            journal,
            book,
        }
    }

    /// Sell `order.quantity` tokens from the public pool at the current price.
    ///
    /// The sold counter, the journal entry and the buyer's position are
    /// committed together or not at all.
    pub fn execute_buy(&self, order: BuyOrder) -> Result<Transaction, LedgerError> {
        if order.quantity == 0 {
            return Err(LedgerError::validation("quantity must be positive"));
        }

        let _guard = self.ctx.lock(LockKey::Tokenization(order.tokenization_id), "execute_buy")?;
        let tokenization = self.ledger.get(&order.tokenization_id)?;

        if !tokenization.is_active() {
            return Err(LedgerError::validation(format!(
                "tokenization {} is not active (status: {})",
                tokenization.id, tokenization.status
            )));
        }

        let remaining = tokenization.tokens_remaining();
        if order.quantity > remaining {
            return Err(LedgerError::validation(format!(
                "insufficient supply: requested {}, remaining {}",
                order.quantity, remaining
            )));
        }

        let unit_price = self.ledger.current_price(&tokenization)?;
        if order.max_price < unit_price {
            return Err(LedgerError::validation(format!(
                "current price {} exceeds max price {}",
                unit_price, order.max_price
            )));
        }

        let now = self.ctx.clock.now();
        let mut updated = tokenization.clone();
        updated.tokens_sold += order.quantity;
        updated.updated_at = now;

        let mut batch = LedgerBatch::new();
        batch.update_tokenization(updated);
        let transaction = self.journal.append(
            PendingTransaction {
                tokenization_id: tokenization.id,
                seller_id: None,
                buyer_id: order.buyer_id,
                quantity: order.quantity,
                unit_price,
                kind: TransactionKind::DirectSale,
            },
            now,
            &mut batch,
        )?;
        self.book.upsert(
            &mut batch,
            &tokenization,
            order.buyer_id,
            signed(transaction.quantity, "quantity")?,
            signed(transaction.total_value, "total value")?,
            now,
        )?;
        self.ctx.commit(batch)?;

        log::info!(
            "Sold {} tokens of {} to {} at {} ({} remaining)",
            transaction.quantity,
            tokenization.id,
            order.buyer_id,
            unit_price,
            remaining - order.quantity
        );
        Ok(transaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use equishare_core::error::ErrorKind;
    use equishare_core::tokenization::TokenizationStatus;
    use equishare_storage_impl::LedgerStorage;

    fn order(fixture: &Fixture, buyer: &str, quantity: u64, max_price: u64) -> BuyOrder {
        BuyOrder {
            tokenization_id: fixture.tokenization_id(),
            buyer_id: HolderId::from_label(buyer),
            quantity,
            max_price,
        }
    }

    #[test]
    fn test_first_buy_then_premium() {
        let fixture = Fixture::with_active_tokenization();
        let executor = fixture.executor();

        let first = executor.execute_buy(order(&fixture, "alice", 100, 200)).unwrap();
        assert_eq!(first.unit_price, 100);
        assert_eq!(first.total_value, 10_000);
        assert_eq!(first.kind, TransactionKind::DirectSale);
        assert_eq!(first.seller_id, None);

        let second = executor.execute_buy(order(&fixture, "alice", 10, 200)).unwrap();
        assert_eq!(second.unit_price, 110);

        let tokenization = fixture.tokenization();
        assert_eq!(tokenization.tokens_sold, 110);
        let alice = fixture
            .storage
            .get_participation(&tokenization.id, &HolderId::from_label("alice"))
            .unwrap()
            .unwrap();
        assert_eq!(alice.quantity, 110);
        assert_eq!(alice.value_invested, 11_100);
        assert_eq!(alice.percentage, 11.0);
    }

    #[test]
    fn test_rejections_leave_state_unchanged() {
        let fixture = Fixture::with_active_tokenization();
        let executor = fixture.executor();
        executor.execute_buy(order(&fixture, "alice", 1, 100)).unwrap();
        let before = fixture.tokenization();
        let journal_before = fixture.storage.list_transactions(&before.id).unwrap();

        let cases = [
            (order(&fixture, "bob", 0, 1_000), "quantity must be positive"),
            (order(&fixture, "bob", 400, 1_000), "insufficient supply"),
            // Price is 110 after the first sale
            (order(&fixture, "bob", 1, 109), "exceeds max price"),
        ];
        for (request, message) in cases {
            let err = executor.execute_buy(request).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
            assert!(err.to_string().contains(message), "{}", err);
        }

        assert_eq!(fixture.tokenization(), before);
        assert_eq!(fixture.storage.list_transactions(&before.id).unwrap(), journal_before);
        assert!(fixture
            .storage
            .get_participation(&before.id, &HolderId::from_label("bob"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_only_active_tokenizations_sell() {
        let fixture = Fixture::new();
        let created = fixture.ledger().create(fixture.request()).unwrap();
        let request = BuyOrder {
            tokenization_id: created.id,
            buyer_id: HolderId::from_label("bob"),
            quantity: 1,
            max_price: 1_000,
        };

        let err = fixture.executor().execute_buy(request.clone()).unwrap_err();
        assert!(err.to_string().contains("not active"), "{}", err);

        fixture.ledger().update_status(&created.id, TokenizationStatus::Active).unwrap();
        fixture.ledger().update_status(&created.id, TokenizationStatus::Suspended).unwrap();
        assert_eq!(
            fixture.executor().execute_buy(request.clone()).unwrap_err().kind(),
            ErrorKind::Validation
        );

        let mut missing = request;
        missing.tokenization_id = TokenizationId::from_label("missing");
        assert_eq!(
            fixture.executor().execute_buy(missing).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_sequential_buys_accumulate() {
        let fixture = Fixture::with_active_tokenization();
        let executor = fixture.executor();
        let (n, q) = (12u64, 7u64);
        for _ in 0..n {
            executor.execute_buy(order(&fixture, "carol", q, 1_000)).unwrap();
        }

        let tokenization = fixture.tokenization();
        assert_eq!(tokenization.tokens_sold, n * q);
        let carol = fixture
            .storage
            .get_participation(&tokenization.id, &HolderId::from_label("carol"))
            .unwrap()
            .unwrap();
        assert_eq!(carol.quantity, n * q);

        // Same buyer, quantity and second: every entry still has its own anchor
        let journal = fixture.storage.list_transactions(&tokenization.id).unwrap();
        let mut anchors: Vec<_> = journal.iter().map(|t| t.hash_anchor.clone()).collect();
        anchors.sort();
        anchors.dedup();
        assert_eq!(anchors.len(), journal.len());
    }

    #[test]
    fn test_selling_out_exactly() {
        let fixture = Fixture::with_active_tokenization();
        let executor = fixture.executor();
        executor.execute_buy(order(&fixture, "dave", 400, 1_000)).unwrap();
        assert_eq!(fixture.tokenization().tokens_remaining(), 0);

        let err = executor.execute_buy(order(&fixture, "erin", 1, 1_000)).unwrap_err();
        assert!(err.to_string().contains("requested 1, remaining 0"), "{}", err);
    }
}
