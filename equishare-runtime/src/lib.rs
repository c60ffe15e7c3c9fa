pub mod config;
pub mod context;
pub mod executor;
pub mod journal;
pub mod ledger;
pub mod offers;
pub mod participation;
pub mod pricing;
pub mod rating;
pub mod service;
pub mod views;

// Re-export the main types for convenience
pub use config::{LedgerConfig, PricingConfig, RatingConfig};
pub use context::LedgerContext;
pub use executor::{BuyOrder, OrderExecutor};
pub use journal::TransactionJournal;
pub use ledger::TokenizationLedger;
pub use offers::{NewOffer, OfferBoard};
pub use participation::ParticipationBook;
pub use pricing::{PricingStrategy, StepPricing};
pub use rating::{grade_for_score, RiskRatingEngine};
pub use service::{TokenizationRuntime, TokenizationService, TokenizationServiceBuilder};
pub use views::{OfferView, ParticipationView, TokenizationView, TransactionView};
