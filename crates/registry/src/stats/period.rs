//! Fixed-width lookback windows for period reports.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::RegistryRecord;

/// A report period, measured backwards from the time of the request.
///
/// Periods are fixed lengths, not calendar units: a monthly report always
/// covers the last 30 days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriod {
    /// The last day.
    Daily,
    /// The last 7 days.
    Weekly,
    /// The last 30 days.
    Monthly,
    /// The last 365 days.
    Yearly,
}

impl ReportPeriod {
    /// Length of the lookback.
    #[must_use]
    pub fn lookback(self) -> Duration {
        match self {
            Self::Daily => Duration::days(1),
            Self::Weekly => Duration::days(7),
            Self::Monthly => Duration::days(30),
            Self::Yearly => Duration::days(365),
        }
    }

    /// The inclusive window `[now - lookback, now]`.
    #[must_use]
    pub fn window(self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (now - self.lookback(), now)
    }

    /// Whether a timestamp falls inside the window ending at `now`.
    #[must_use]
    pub fn contains(self, now: DateTime<Utc>, at: DateTime<Utc>) -> bool {
        let (start, end) = self.window(now);
        start <= at && at <= end
    }

    /// Keep the records created inside the window ending at `now`.
    #[must_use]
    pub fn filter(self, records: &[RegistryRecord], now: DateTime<Utc>) -> Vec<RegistryRecord> {
        records
            .iter()
            .filter(|r| self.contains(now, r.created_at))
            .cloned()
            .collect()
    }

    /// Report heading, e.g. "Weekly Registry Report".
    #[must_use]
    pub fn title(self) -> String {
        let name = match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
            Self::Yearly => "Yearly",
        };
        format!("{name} Registry Report")
    }

    /// File name without extension for a report generated at `now`.
    #[must_use]
    pub fn file_stem(self, now: DateTime<Utc>) -> String {
        match self {
            Self::Daily => format!("daily_report_{}", now.format("%Y%m%d")),
            Self::Weekly => format!("weekly_report_{}", now.format("%Y%m%d")),
            Self::Monthly => format!("monthly_report_{}", now.format("%Y%m")),
            Self::Yearly => format!("yearly_report_{}", now.format("%Y")),
        }
    }

    /// "YYYY-MM-DD to YYYY-MM-DD" for the window ending at `now`.
    #[must_use]
    pub fn range_label(self, now: DateTime<Utc>) -> String {
        let (start, end) = self.window(now);
        format!("{} to {}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"))
    }
}

impl std::fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
            Self::Yearly => write!(f, "yearly"),
        }
    }
}

impl FromStr for ReportPeriod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" => Ok(Self::Daily),
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            "yearly" | "year" => Ok(Self::Yearly),
            _ => Err(Error::ConfigValidation {
                message: format!("unknown report period '{s}'"),
            }),
        }
    }
}
