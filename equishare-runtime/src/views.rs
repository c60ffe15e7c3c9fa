use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use equishare_core::insurance::InsuranceInfo;
use equishare_core::offer::{Offer, OfferStatus};
use equishare_core::participation::Participation;
use equishare_core::tokenization::{RiskRating, Tokenization, TokenizationStatus};
use equishare_core::transaction::{Transaction, TransactionKind};

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serializable tokenization with its derived figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenizationView {
    pub id: String,
    pub asset_id: String,
    pub issuer_id: String,
    pub total_tokens: u64,
    pub tokens_locked_owner: u64,
    pub tokens_available_for_sale: u64,
    pub tokens_sold: u64,
    pub tokens_remaining: u64,
    pub price_initial: u64,
    pub price_current: u64,
    pub min_owner_percentage: u8,
    pub max_publicly_tradable_percentage: u8,
    pub control_lock: bool,
    pub status: TokenizationStatus,
    pub risk_rating: RiskRating,
    pub insurance: Option<InsuranceInfo>,
    pub investor_count: u64,
    pub created_at: String,
    pub updated_at: String,
}

impl TokenizationView {
    pub fn new(tokenization: &Tokenization, price_current: u64, investor_count: u64) -> Self {
        Self {
            id: tokenization.id.to_hex(),
            asset_id: tokenization.asset_id.to_hex(),
            issuer_id: tokenization.issuer_id.to_hex(),
            total_tokens: tokenization.total_tokens,
            tokens_locked_owner: tokenization.tokens_locked_owner,
            tokens_available_for_sale: tokenization.tokens_available_for_sale,
            tokens_sold: tokenization.tokens_sold,
            tokens_remaining: tokenization.tokens_remaining(),
            price_initial: tokenization.price_initial,
            price_current,
            min_owner_percentage: tokenization.min_owner_percentage,
            max_publicly_tradable_percentage: tokenization.max_publicly_tradable_percentage,
            control_lock: tokenization.control_lock,
            status: tokenization.status,
            risk_rating: tokenization.risk_rating,
            insurance: tokenization.insurance.clone(),
            investor_count,
            created_at: timestamp(&tokenization.created_at),
            updated_at: timestamp(&tokenization.updated_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionView {
    pub id: String,
    pub tokenization_id: String,
    pub seller_id: Option<String>,
    pub buyer_id: String,
    pub quantity: u64,
    pub unit_price: u64,
    pub total_value: u64,
    pub kind: TransactionKind,
    pub hash_anchor: String,
    pub created_at: String,
}

impl From<&Transaction> for TransactionView {
    fn from(transaction: &Transaction) -> Self {
        Self {
            id: transaction.id.to_hex(),
            tokenization_id: transaction.tokenization_id.to_hex(),
            seller_id: transaction.seller_id.map(|id| id.to_hex()),
            buyer_id: transaction.buyer_id.to_hex(),
            quantity: transaction.quantity,
            unit_price: transaction.unit_price,
            total_value: transaction.total_value,
            kind: transaction.kind,
            hash_anchor: transaction.hash_anchor.to_string(),
            created_at: timestamp(&transaction.created_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipationView {
    pub tokenization_id: String,
    pub investor_id: String,
    pub quantity: u64,
    pub percentage: f64,
    pub value_invested: u64,
    pub first_acquired_at: String,
    pub last_acquired_at: String,
}

impl From<&Participation> for ParticipationView {
    fn from(participation: &Participation) -> Self {
        Self {
            tokenization_id: participation.tokenization_id.to_hex(),
            investor_id: participation.investor_id.to_hex(),
            quantity: participation.quantity,
            percentage: participation.percentage,
            value_invested: participation.value_invested,
            first_acquired_at: timestamp(&participation.first_acquired_at),
            last_acquired_at: timestamp(&participation.last_acquired_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferView {
    pub id: String,
    pub tokenization_id: String,
    pub seller_id: String,
    pub quantity: u64,
    pub unit_price: u64,
    /// Status as observed when the view was built
    pub status: OfferStatus,
    pub created_at: String,
    pub expires_at: String,
    pub cancelled_at: Option<String>,
}

impl From<&Offer> for OfferView {
    fn from(offer: &Offer) -> Self {
        Self {
            id: offer.id.to_hex(),
            tokenization_id: offer.tokenization_id.to_hex(),
            seller_id: offer.seller_id.to_hex(),
            quantity: offer.quantity,
            unit_price: offer.unit_price,
            status: offer.status,
            created_at: timestamp(&offer.created_at),
            expires_at: timestamp(&offer.expires_at),
            cancelled_at: offer.cancelled_at.as_ref().map(timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use equishare_core::id::{HolderId, TokenizationId, TransactionId};
    use equishare_core::transaction::HashAnchor;

    #[test]
    fn test_transaction_view_json() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let tokenization_id = TokenizationId::from_label("tok");
        let buyer = HolderId::from_label("buyer");
        let transaction = Transaction {
            id: TransactionId::from_label("tx"),
            tokenization_id,
            seller_id: None,
            buyer_id: buyer,
            quantity: 100,
            unit_price: 110,
            total_value: 11_000,
            kind: TransactionKind::DirectSale,
            hash_anchor: HashAnchor::compute(&tokenization_id, &buyer, 100, at.timestamp())
                .unwrap(),
            created_at: at,
        };

        let json = serde_json::to_value(TransactionView::from(&transaction)).unwrap();
        assert_eq!(json["id"].as_str().unwrap().len(), 64);
        assert_eq!(json["buyer_id"], serde_json::json!(buyer.to_hex()));
        assert_eq!(json["seller_id"], serde_json::Value::Null);
        assert_eq!(json["kind"], "direct_sale");
        assert_eq!(json["created_at"], "2024-06-01T12:00:00.000Z");
        assert!(json["hash_anchor"].as_str().unwrap().starts_with("0x"));
    }
}
