use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// Date-range filter for listing queries.
///
/// Always passed explicitly with the query; there is no ambient
/// process-wide selection. Bounds are inclusive at both ends.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
pub enum DateRange {
    #[serde(rename = "1d")]
    #[strum(serialize = "1d")]
    LastDay,
    #[serde(rename = "7d")]
    #[strum(serialize = "7d")]
    LastWeek,
    #[serde(rename = "30d")]
    #[strum(serialize = "30d")]
    LastMonth,
    #[serde(rename = "90d")]
    #[strum(serialize = "90d")]
    LastQuarter,
    #[serde(rename = "1y")]
    #[strum(serialize = "1y")]
    LastYear,
    #[default]
    #[serde(rename = "all")]
    #[strum(serialize = "all")]
    All,
}

impl DateRange {
    /// Inclusive `[start, end]` bounds relative to `now`, or `None` for
    /// `All`.
    pub fn bounds(&self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let days = match self {
            Self::LastDay => 1,
            Self::LastWeek => 7,
            Self::LastMonth => 30,
            Self::LastQuarter => 90,
            Self::LastYear => 365,
            Self::All => return None,
        };
        Some((now - Duration::days(days), now))
    }

    /// Whether `at` falls within the range, bounds included.
    pub fn contains(&self, at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.bounds(now) {
            Some((start, end)) => at >= start && at <= end,
            None => true,
        }
    }
}
