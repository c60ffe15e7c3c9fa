use chrono::NaiveDate;
use std::ops::RangeInclusive;

use equishare_core::asset::{Asset, AssetStatus, Sex};
use equishare_core::tokenization::RiskRating;

use crate::config::RatingConfig;

/// Lowest score of each grade, best grade first. Anything below the last
/// band is `D`.
const BANDS: [(u32, RiskRating); 9] = [
    (55, RiskRating::AAA),
    (50, RiskRating::AA),
    (45, RiskRating::A),
    (40, RiskRating::BBB),
    (35, RiskRating::BB),
    (30, RiskRating::B),
    (25, RiskRating::CCC),
    (20, RiskRating::CC),
    (10, RiskRating::C),
];

/// Deterministic grading of an asset from its registry attributes.
///
/// The grade is computed once when an asset is tokenized and never revisited.
#[derive(Debug, Clone)]
pub struct RiskRatingEngine {
    ideal_age: RangeInclusive<u32>,
}

impl Default for RiskRatingEngine {
    fn default() -> Self {
        Self::new(&RatingConfig::default())
    }
}

impl RiskRatingEngine {
    pub fn new(config: &RatingConfig) -> Self {
        Self {
            ideal_age: config.ideal_age_min..=config.ideal_age_max,
        }
    }

    /// Score the asset as of the given date
    pub fn score(&self, asset: &Asset, as_of: NaiveDate) -> u32 {
        let status = if asset.status == AssetStatus::Active { 20 } else { 0 };

        // Unknown age scores like an age outside the ideal range
        let age = match asset.age_in_years(as_of) {
            Some(age) if self.ideal_age.contains(&age) => 20,
            _ => 10,
        };

        let sex = match asset.sex {
            Sex::Female => 15,
            Sex::Male => 10,
            Sex::Unknown => 0,
        };

        status + age + sex
    }

    pub fn compute(&self, asset: &Asset, as_of: NaiveDate) -> RiskRating {
        grade_for_score(self.score(asset, as_of))
    }
}

/// Map a score onto its grade
pub fn grade_for_score(score: u32) -> RiskRating {
    BANDS
        .iter()
        .find(|(floor, _)| score >= *floor)
        .map(|(_, grade)| *grade)
        .unwrap_or(RiskRating::D)
}
