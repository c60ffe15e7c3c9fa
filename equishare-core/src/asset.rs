use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::id::AssetId;

/// Registry status of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Active,
    Inactive,
    Retired,
    Deceased,
}

/// Sex as recorded by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Female,
    Male,
    Unknown,
}

/// The attributes of a registered asset that the ledger consumes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Registry identifier
    pub id: AssetId,

    /// Current registry status
    pub status: AssetStatus,

    /// Date of birth, if known
    pub birth_date: Option<NaiveDate>,

    /// Recorded sex
    pub sex: Sex,
}

impl Asset {
    /// Age in whole years on the given date, or `None` when the birth date is
    /// unknown or lies in the future
    pub fn age_in_years(&self, on: NaiveDate) -> Option<u32> {
        let born = self.birth_date?;
        let mut years = on.year() - born.year();
        if (on.month(), on.day()) < (born.month(), born.day()) {
            years -= 1;
        }
        u32::try_from(years).ok()
    }
}

/// Read contract of the external asset registry
pub trait AssetRegistry: Send + Sync {
    /// Resolve an asset by id
    ///
    /// # Returns
    /// * `Ok(Some(asset))` - The asset exists
    /// * `Ok(None)` - No asset with this id is registered
    /// * `Err` - The registry could not be queried
    fn find_by_id(&self, id: &AssetId) -> Result<Option<Asset>, StorageError>;
}
