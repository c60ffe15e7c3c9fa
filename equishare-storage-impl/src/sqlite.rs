#![cfg(feature = "sqlite")]

use crate::storage_traits::{
    LedgerBatch, LedgerStorage, OfferWrite, PageRequest, TokenizationFilter, TokenizationWrite,
};
use anyhow::Context;
use chrono::{DateTime, TimeZone, Utc};
use equishare_core::error::StorageError;
use equishare_core::id::{AssetId, HolderId, ObjectId, OfferId, TokenizationId};
use equishare_core::insurance::InsuranceInfo;
use equishare_core::offer::{Offer, OfferStatus};
use equishare_core::participation::Participation;
use equishare_core::tokenization::{RiskRating, Tokenization, TokenizationStatus};
use equishare_core::transaction::{HashAnchor, Transaction, TransactionKind};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow},
    Row,
};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};
use tokio::runtime::Runtime;

/// SQL query constants to avoid repetition
mod sql {
    pub const CREATE_TOKENIZATIONS_TABLE: &str = r#"
        CREATE TABLE IF NOT EXISTS tokenizations (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id BLOB NOT NULL UNIQUE,
            asset_id BLOB NOT NULL UNIQUE,
            issuer_id BLOB NOT NULL,
            total_tokens INTEGER NOT NULL,
            tokens_locked_owner INTEGER NOT NULL,
            tokens_available_for_sale INTEGER NOT NULL,
            tokens_sold INTEGER NOT NULL,
            price_initial INTEGER NOT NULL,
            min_owner_percentage INTEGER NOT NULL,
            max_publicly_tradable_percentage INTEGER NOT NULL,
            control_lock INTEGER NOT NULL,
            status TEXT NOT NULL,
            risk_rating TEXT NOT NULL,
            insurance TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
    "#;

    pub const CREATE_TRANSACTIONS_TABLE: &str = r#"
        CREATE TABLE IF NOT EXISTS transactions (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id BLOB NOT NULL UNIQUE,
            tokenization_id BLOB NOT NULL REFERENCES tokenizations(id),
            seller_id BLOB,
            buyer_id BLOB NOT NULL,
            quantity INTEGER NOT NULL,
            unit_price INTEGER NOT NULL,
            total_value INTEGER NOT NULL,
            kind TEXT NOT NULL,
            hash_anchor TEXT NOT NULL UNIQUE,
            created_at INTEGER NOT NULL
        )
    "#;

    pub const CREATE_PARTICIPATIONS_TABLE: &str = r#"
        CREATE TABLE IF NOT EXISTS participations (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            tokenization_id BLOB NOT NULL REFERENCES tokenizations(id),
            investor_id BLOB NOT NULL,
            quantity INTEGER NOT NULL,
            percentage REAL NOT NULL,
            value_invested INTEGER NOT NULL,
            first_acquired_at INTEGER NOT NULL,
            last_acquired_at INTEGER NOT NULL,
            UNIQUE (tokenization_id, investor_id)
        )
    "#;

    pub const CREATE_OFFERS_TABLE: &str = r#"
        CREATE TABLE IF NOT EXISTS offers (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id BLOB NOT NULL UNIQUE,
            tokenization_id BLOB NOT NULL REFERENCES tokenizations(id),
            seller_id BLOB NOT NULL,
            quantity INTEGER NOT NULL,
            unit_price INTEGER NOT NULL,
            status TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL,
            cancelled_at INTEGER
        )
    "#;

    pub const CREATE_INDEXES: [&str; 3] = [
        "CREATE INDEX IF NOT EXISTS idx_transactions_tokenization ON transactions(tokenization_id)",
        "CREATE INDEX IF NOT EXISTS idx_participations_tokenization ON participations(tokenization_id)",
        "CREATE INDEX IF NOT EXISTS idx_offers_tokenization ON offers(tokenization_id)",
    ];

    pub const TOKENIZATION_COLUMNS: &str = r#"
        id, asset_id, issuer_id, total_tokens, tokens_locked_owner,
        tokens_available_for_sale, tokens_sold, price_initial, min_owner_percentage,
        max_publicly_tradable_percentage, control_lock, status, risk_rating, insurance,
        created_at, updated_at
    "#;

    pub const INSERT_TOKENIZATION: &str = r#"
        INSERT INTO tokenizations (
            id, asset_id, issuer_id, total_tokens, tokens_locked_owner,
            tokens_available_for_sale, tokens_sold, price_initial, min_owner_percentage,
            max_publicly_tradable_percentage, control_lock, status, risk_rating, insurance,
            created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    "#;

    pub const UPDATE_TOKENIZATION: &str = r#"
        UPDATE tokenizations
        SET tokens_sold = ?, status = ?, insurance = ?, updated_at = ?
        WHERE id = ? AND asset_id = ?
    "#;

    pub const COUNT_TOKENIZATIONS: &str = r#"
        SELECT COUNT(*) FROM tokenizations
        WHERE (? IS NULL OR status = ?) AND (? IS NULL OR risk_rating = ?)
    "#;

    pub const INSERT_TRANSACTION: &str = r#"
        INSERT INTO transactions (
            id, tokenization_id, seller_id, buyer_id, quantity, unit_price,
            total_value, kind, hash_anchor, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    "#;

    pub const LIST_TRANSACTIONS: &str = r#"
        SELECT id, tokenization_id, seller_id, buyer_id, quantity, unit_price,
               total_value, kind, hash_anchor, created_at
        FROM transactions
        WHERE tokenization_id = ?
        ORDER BY seq ASC
    "#;

    pub const ANCHOR_EXISTS: &str = "SELECT 1 FROM transactions WHERE hash_anchor = ? LIMIT 1";

    pub const UPSERT_PARTICIPATION: &str = r#"
        INSERT INTO participations (
            tokenization_id, investor_id, quantity, percentage, value_invested,
            first_acquired_at, last_acquired_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (tokenization_id, investor_id) DO UPDATE SET
            quantity = excluded.quantity,
            percentage = excluded.percentage,
            value_invested = excluded.value_invested,
            last_acquired_at = excluded.last_acquired_at
    "#;

    pub const PARTICIPATION_COLUMNS: &str = r#"
        tokenization_id, investor_id, quantity, percentage, value_invested,
        first_acquired_at, last_acquired_at
    "#;

    pub const INSERT_OFFER: &str = r#"
        INSERT INTO offers (
            id, tokenization_id, seller_id, quantity, unit_price, status,
            created_at, expires_at, cancelled_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
    "#;

    pub const UPDATE_OFFER: &str = r#"
        UPDATE offers SET status = ?, cancelled_at = ? WHERE id = ?
    "#;

    pub const OFFER_COLUMNS: &str = r#"
        id, tokenization_id, seller_id, quantity, unit_price, status,
        created_at, expires_at, cancelled_at
    "#;
}

/// A SQLite-based implementation of [`LedgerStorage`] using sqlx.
///
/// Every batch is applied inside one database transaction.
pub struct SqliteStorage {
    pool: SqlitePool,
    rt: Arc<Runtime>,
    db_path: Option<PathBuf>,
}

impl SqliteStorage {
    /// Open (or create) a database file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db_path = path.as_ref().to_path_buf();
        let db_url = format!("sqlite:{}", db_path.to_string_lossy());
        let options = SqliteConnectOptions::from_str(&db_url)
            .with_context(|| format!("Invalid database URL: {}", db_url))?
            .create_if_missing(true);
        Self::connect(options, 5, Some(db_path))
    }

    /// A private in-memory database, gone when the storage is dropped
    pub fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("Invalid in-memory database URL")?;
        // Every connection to :memory: is a separate database
        Self::connect(options, 1, None)
    }

    fn connect(
        options: SqliteConnectOptions,
        max_connections: u32,
        db_path: Option<PathBuf>,
    ) -> Result<Self, StorageError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map(Arc::new)?;

        let options = options.foreign_keys(true);
        let pool = rt
            .block_on(async {
                SqlitePoolOptions::new()
                    .max_connections(max_connections)
                    .connect_with(options)
                    .await
            })
            .context("Failed to connect to database")?;

        rt.block_on(Self::initialize_schema(&pool))
            .context("Failed to initialize database schema")?;

        if let Some(path) = &db_path {
            log::debug!("Opened ledger database at {}", path.display());
        }

        Ok(Self { pool, rt, db_path })
    }

    /// Creates the necessary tables in the database
    async fn initialize_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        for statement in [
            sql::CREATE_TOKENIZATIONS_TABLE,
            sql::CREATE_TRANSACTIONS_TABLE,
            sql::CREATE_PARTICIPATIONS_TABLE,
            sql::CREATE_OFFERS_TABLE,
        ] {
            sqlx::query(statement).execute(pool).await?;
        }
        for statement in sql::CREATE_INDEXES {
            sqlx::query(statement).execute(pool).await?;
        }
        Ok(())
    }

    /// Path of the database file, `None` for in-memory databases
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    async fn insert_tokenization(
        conn: &mut SqliteConnection,
        t: &Tokenization,
    ) -> Result<(), StorageError> {
        let insurance = t.insurance.as_ref().map(serde_json::to_string).transpose()?;
        sqlx::query(sql::INSERT_TOKENIZATION)
            .bind(t.id.bytes())
            .bind(t.asset_id.bytes())
            .bind(t.issuer_id.bytes())
            .bind(to_sql(t.total_tokens)?)
            .bind(to_sql(t.tokens_locked_owner)?)
            .bind(to_sql(t.tokens_available_for_sale)?)
            .bind(to_sql(t.tokens_sold)?)
            .bind(to_sql(t.price_initial)?)
            .bind(i64::from(t.min_owner_percentage))
            .bind(i64::from(t.max_publicly_tradable_percentage))
            .bind(t.control_lock)
            .bind(t.status.as_str())
            .bind(t.risk_rating.as_str())
            .bind(insurance)
            .bind(t.created_at.timestamp_millis())
            .bind(t.updated_at.timestamp_millis())
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Only the mutable columns of a header are written back
    async fn update_tokenization(
        conn: &mut SqliteConnection,
        t: &Tokenization,
    ) -> Result<(), StorageError> {
        let insurance = t.insurance.as_ref().map(serde_json::to_string).transpose()?;
        let result = sqlx::query(sql::UPDATE_TOKENIZATION)
            .bind(to_sql(t.tokens_sold)?)
            .bind(t.status.as_str())
            .bind(insurance)
            .bind(t.updated_at.timestamp_millis())
            .bind(t.id.bytes())
            .bind(t.asset_id.bytes())
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!(
                "tokenization {} does not exist",
                t.id
            )));
        }
        Ok(())
    }

    async fn insert_transaction(
        conn: &mut SqliteConnection,
        t: &Transaction,
    ) -> Result<(), StorageError> {
        sqlx::query(sql::INSERT_TRANSACTION)
            .bind(t.id.bytes())
            .bind(t.tokenization_id.bytes())
            .bind(t.seller_id.as_ref().map(|id| id.bytes()))
            .bind(t.buyer_id.bytes())
            .bind(to_sql(t.quantity)?)
            .bind(to_sql(t.unit_price)?)
            .bind(to_sql(t.total_value)?)
            .bind(t.kind.as_str())
            .bind(t.hash_anchor.as_str())
            .bind(t.created_at.timestamp_millis())
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn upsert_participation(
        conn: &mut SqliteConnection,
        p: &Participation,
    ) -> Result<(), StorageError> {
        sqlx::query(sql::UPSERT_PARTICIPATION)
            .bind(p.tokenization_id.bytes())
            .bind(p.investor_id.bytes())
            .bind(to_sql(p.quantity)?)
            .bind(p.percentage)
            .bind(to_sql(p.value_invested)?)
            .bind(p.first_acquired_at.timestamp_millis())
            .bind(p.last_acquired_at.timestamp_millis())
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn write_offer(
        conn: &mut SqliteConnection,
        write: &OfferWrite,
    ) -> Result<(), StorageError> {
        match write {
            OfferWrite::Insert(o) => {
                sqlx::query(sql::INSERT_OFFER)
                    .bind(o.id.bytes())
                    .bind(o.tokenization_id.bytes())
                    .bind(o.seller_id.bytes())
                    .bind(to_sql(o.quantity)?)
                    .bind(to_sql(o.unit_price)?)
                    .bind(o.status.as_str())
                    .bind(o.created_at.timestamp_millis())
                    .bind(o.expires_at.timestamp_millis())
                    .bind(o.cancelled_at.map(|at| at.timestamp_millis()))
                    .execute(&mut *conn)
                    .await?;
            }
            OfferWrite::Update(o) => {
                let result = sqlx::query(sql::UPDATE_OFFER)
                    .bind(o.status.as_str())
                    .bind(o.cancelled_at.map(|at| at.timestamp_millis()))
                    .bind(o.id.bytes())
                    .execute(&mut *conn)
                    .await?;
                if result.rows_affected() == 0 {
                    return Err(StorageError::NotFound(format!("offer {} does not exist", o.id)));
                }
            }
        }
        Ok(())
    }
}

impl LedgerStorage for SqliteStorage {
    fn get_tokenization(&self, id: &TokenizationId) -> Result<Option<Tokenization>, StorageError> {
        self.rt.block_on(async {
            let query = format!(
                "SELECT {} FROM tokenizations WHERE id = ?",
                sql::TOKENIZATION_COLUMNS
            );
            let row = sqlx::query(&query)
                .bind(id.bytes())
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("Failed to fetch tokenization {}", id))?;
            row.as_ref().map(row_to_tokenization).transpose()
        })
    }

    fn get_tokenization_by_asset(
        &self,
        asset_id: &AssetId,
    ) -> Result<Option<Tokenization>, StorageError> {
        self.rt.block_on(async {
            let query = format!(
                "SELECT {} FROM tokenizations WHERE asset_id = ?",
                sql::TOKENIZATION_COLUMNS
            );
            let row = sqlx::query(&query)
                .bind(asset_id.bytes())
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("Failed to fetch tokenization of asset {}", asset_id))?;
            row.as_ref().map(row_to_tokenization).transpose()
        })
    }

    fn list_tokenizations(
        &self,
        filter: &TokenizationFilter,
        page: PageRequest,
    ) -> Result<(Vec<Tokenization>, u64), StorageError> {
        let status = filter.status.map(|s| s.as_str());
        let rating = filter.risk_rating.map(|r| r.as_str());
        let offset = i64::try_from(page.offset()).map_err(|_| {
            StorageError::Other(format!("Page offset out of range: {}", page.offset()))
        })?;

        self.rt.block_on(async {
            let total: i64 = sqlx::query(sql::COUNT_TOKENIZATIONS)
                .bind(status)
                .bind(status)
                .bind(rating)
                .bind(rating)
                .fetch_one(&self.pool)
                .await
                .context("Failed to count tokenizations")?
                .try_get(0)?;

            let query = format!(
                "SELECT {} FROM tokenizations
                 WHERE (? IS NULL OR status = ?) AND (? IS NULL OR risk_rating = ?)
                 ORDER BY seq DESC
                 LIMIT ? OFFSET ?",
                sql::TOKENIZATION_COLUMNS
            );
            let rows = sqlx::query(&query)
                .bind(status)
                .bind(status)
                .bind(rating)
                .bind(rating)
                .bind(i64::from(page.limit))
                .bind(offset)
                .fetch_all(&self.pool)
                .await
                .context("Failed to list tokenizations")?;

            let tokenizations = rows
                .iter()
                .map(row_to_tokenization)
                .collect::<Result<Vec<_>, _>>()?;
            Ok((tokenizations, from_sql(total, "count")?))
        })
    }

    fn list_transactions(
        &self,
        tokenization_id: &TokenizationId,
    ) -> Result<Vec<Transaction>, StorageError> {
        self.rt.block_on(async {
            let rows = sqlx::query(sql::LIST_TRANSACTIONS)
                .bind(tokenization_id.bytes())
                .fetch_all(&self.pool)
                .await
                .with_context(|| format!("Failed to list transactions of {}", tokenization_id))?;
            rows.iter().map(row_to_transaction).collect()
        })
    }

    fn anchor_exists(&self, anchor: &HashAnchor) -> Result<bool, StorageError> {
        self.rt.block_on(async {
            let row = sqlx::query(sql::ANCHOR_EXISTS)
                .bind(anchor.as_str())
                .fetch_optional(&self.pool)
                .await
                .context("Failed to look up hash anchor")?;
            Ok(row.is_some())
        })
    }

    fn get_participation(
        &self,
        tokenization_id: &TokenizationId,
        investor_id: &HolderId,
    ) -> Result<Option<Participation>, StorageError> {
        self.rt.block_on(async {
            let query = format!(
                "SELECT {} FROM participations WHERE tokenization_id = ? AND investor_id = ?",
                sql::PARTICIPATION_COLUMNS
            );
            let row = sqlx::query(&query)
                .bind(tokenization_id.bytes())
                .bind(investor_id.bytes())
                .fetch_optional(&self.pool)
                .await
                .context("Failed to fetch participation")?;
            row.as_ref().map(row_to_participation).transpose()
        })
    }

    fn list_participations(
        &self,
        tokenization_id: &TokenizationId,
    ) -> Result<Vec<Participation>, StorageError> {
        self.rt.block_on(async {
            let query = format!(
                "SELECT {} FROM participations WHERE tokenization_id = ? ORDER BY seq ASC",
                sql::PARTICIPATION_COLUMNS
            );
            let rows = sqlx::query(&query)
                .bind(tokenization_id.bytes())
                .fetch_all(&self.pool)
                .await
                .with_context(|| format!("Failed to list participations of {}", tokenization_id))?;
            rows.iter().map(row_to_participation).collect()
        })
    }

    fn get_offer(&self, id: &OfferId) -> Result<Option<Offer>, StorageError> {
        self.rt.block_on(async {
            let query = format!("SELECT {} FROM offers WHERE id = ?", sql::OFFER_COLUMNS);
            let row = sqlx::query(&query)
                .bind(id.bytes())
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("Failed to fetch offer {}", id))?;
            row.as_ref().map(row_to_offer).transpose()
        })
    }

    fn list_offers(&self, tokenization_id: &TokenizationId) -> Result<Vec<Offer>, StorageError> {
        self.rt.block_on(async {
            let query = format!(
                "SELECT {} FROM offers WHERE tokenization_id = ? ORDER BY seq ASC",
                sql::OFFER_COLUMNS
            );
            let rows = sqlx::query(&query)
                .bind(tokenization_id.bytes())
                .fetch_all(&self.pool)
                .await
                .with_context(|| format!("Failed to list offers of {}", tokenization_id))?;
            rows.iter().map(row_to_offer).collect()
        })
    }

    fn commit(&self, batch: LedgerBatch) -> Result<(), StorageError> {
        if batch.is_empty() {
            return Ok(());
        }

        self.rt.block_on(async {
            // Dropping `tx` on any error below rolls everything back
            let mut tx = self.pool.begin().await?;

            for write in &batch.tokenizations {
                match write {
                    TokenizationWrite::Insert(t) => Self::insert_tokenization(&mut tx, t).await?,
                    TokenizationWrite::Update(t) => Self::update_tokenization(&mut tx, t).await?,
                }
            }
            for transaction in &batch.transactions {
                Self::insert_transaction(&mut tx, transaction).await?;
            }
            for participation in &batch.participations {
                Self::upsert_participation(&mut tx, participation).await?;
            }
            for write in &batch.offers {
                Self::write_offer(&mut tx, write).await?;
            }

            tx.commit().await?;
            Ok(())
        })
    }
}

fn to_sql(value: u64) -> Result<i64, StorageError> {
    i64::try_from(value).map_err(|_| {
        StorageError::Serialization(format!("Value out of range for storage: {}", value))
    })
}

fn from_sql(value: i64, column: &str) -> Result<u64, StorageError> {
    u64::try_from(value).map_err(|_| {
        StorageError::Serialization(format!("Negative value in {}: {}", column, value))
    })
}

fn get_u64(row: &SqliteRow, column: &str) -> Result<u64, StorageError> {
    from_sql(row.try_get(column)?, column)
}

fn get_u8(row: &SqliteRow, column: &str) -> Result<u8, StorageError> {
    let value: i64 = row.try_get(column)?;
    u8::try_from(value).map_err(|_| {
        StorageError::Serialization(format!("Value out of range in {}: {}", column, value))
    })
}

fn get_id(row: &SqliteRow, column: &str) -> Result<ObjectId, StorageError> {
    let bytes: Vec<u8> = row.try_get(column)?;
    ObjectId::from_slice(&bytes)
}

fn get_time(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, StorageError> {
    let millis: i64 = row.try_get(column)?;
    millis_to_time(millis, column)
}

fn millis_to_time(millis: i64, column: &str) -> Result<DateTime<Utc>, StorageError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| {
            StorageError::Serialization(format!("Invalid timestamp in {}: {}", column, millis))
        })
}

fn parse_column<T: FromStr<Err = String>>(
    row: &SqliteRow,
    column: &str,
) -> Result<T, StorageError> {
    let value: String = row.try_get(column)?;
    value.parse().map_err(StorageError::Serialization)
}

fn row_to_tokenization(row: &SqliteRow) -> Result<Tokenization, StorageError> {
    let insurance: Option<String> = row.try_get("insurance")?;
    let insurance = insurance
        .map(|json| serde_json::from_str::<InsuranceInfo>(&json))
        .transpose()?;

    Ok(Tokenization {
        id: get_id(row, "id")?,
        asset_id: get_id(row, "asset_id")?,
        issuer_id: get_id(row, "issuer_id")?,
        total_tokens: get_u64(row, "total_tokens")?,
        tokens_locked_owner: get_u64(row, "tokens_locked_owner")?,
        tokens_available_for_sale: get_u64(row, "tokens_available_for_sale")?,
        tokens_sold: get_u64(row, "tokens_sold")?,
        price_initial: get_u64(row, "price_initial")?,
        min_owner_percentage: get_u8(row, "min_owner_percentage")?,
        max_publicly_tradable_percentage: get_u8(row, "max_publicly_tradable_percentage")?,
        control_lock: row.try_get("control_lock")?,
        status: parse_column::<TokenizationStatus>(row, "status")?,
        risk_rating: parse_column::<RiskRating>(row, "risk_rating")?,
        insurance,
        created_at: get_time(row, "created_at")?,
        updated_at: get_time(row, "updated_at")?,
    })
}

fn row_to_transaction(row: &SqliteRow) -> Result<Transaction, StorageError> {
    let seller: Option<Vec<u8>> = row.try_get("seller_id")?;
    let anchor: String = row.try_get("hash_anchor")?;

    Ok(Transaction {
        id: get_id(row, "id")?,
        tokenization_id: get_id(row, "tokenization_id")?,
        seller_id: seller.map(|bytes| ObjectId::from_slice(&bytes)).transpose()?,
        buyer_id: get_id(row, "buyer_id")?,
        quantity: get_u64(row, "quantity")?,
        unit_price: get_u64(row, "unit_price")?,
        total_value: get_u64(row, "total_value")?,
        kind: parse_column::<TransactionKind>(row, "kind")?,
        hash_anchor: HashAnchor::parse(&anchor)?,
        created_at: get_time(row, "created_at")?,
    })
}

fn row_to_participation(row: &SqliteRow) -> Result<Participation, StorageError> {
    Ok(Participation {
        tokenization_id: get_id(row, "tokenization_id")?,
        investor_id: get_id(row, "investor_id")?,
        quantity: get_u64(row, "quantity")?,
        percentage: row.try_get("percentage")?,
        value_invested: get_u64(row, "value_invested")?,
        first_acquired_at: get_time(row, "first_acquired_at")?,
        last_acquired_at: get_time(row, "last_acquired_at")?,
    })
}

fn row_to_offer(row: &SqliteRow) -> Result<Offer, StorageError> {
    let cancelled_at: Option<i64> = row.try_get("cancelled_at")?;

    Ok(Offer {
        id: get_id(row, "id")?,
        tokenization_id: get_id(row, "tokenization_id")?,
        seller_id: get_id(row, "seller_id")?,
        quantity: get_u64(row, "quantity")?,
        unit_price: get_u64(row, "unit_price")?,
        status: parse_column::<OfferStatus>(row, "status")?,
        created_at: get_time(row, "created_at")?,
        expires_at: get_time(row, "expires_at")?,
        cancelled_at: cancelled_at
            .map(|millis| millis_to_time(millis, "cancelled_at"))
            .transpose()?,
    })
}
