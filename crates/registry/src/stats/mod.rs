//! Aggregate statistics over registry entries.
//!
//! The aggregator counts records per bucket along a fixed set of
//! [`Dimension`]s. Every record lands in exactly one bucket per dimension,
//! so the counts of each dimension always sum to the number of records.

mod period;

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::debug;

use crate::error::{Error, Result};
use crate::record::{yes_no, Choice, RegistryRecord};

pub use period::ReportPeriod;

/// Bucket label used when a record has no value for a categorical field.
pub const UNSET: &str = "";

/// How a dimension turns a record into a bucket label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionKind {
    /// One bucket per distinct value, plus the unset bucket.
    Categorical,
    /// Exactly `Yes` and `No`; a missing answer counts as `No`.
    Boolean,
    /// `Has <X>` or `No <X>` depending on whether a value is present.
    Presence,
}

/// An aggregation axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// Gender.
    Gender,
    /// Social grant type.
    Grant,
    /// Residential area type.
    AreaType,
    /// Population group.
    Race,
    /// Ward number.
    Ward,
    /// Disability flag.
    Disability,
    /// Recovering-service-user flag.
    RecoveringServiceUser,
    /// Cooperative-member flag.
    CooperativeMember,
    /// Whether a contact number is present.
    Contact,
    /// Whether a signature is attached.
    Signature,
    /// Whether a physical address is present.
    Address,
}

impl Dimension {
    /// Every dimension, in dashboard order.
    pub const ALL: [Self; 11] = [
        Self::Gender,
        Self::Grant,
        Self::AreaType,
        Self::Race,
        Self::Ward,
        Self::Disability,
        Self::RecoveringServiceUser,
        Self::CooperativeMember,
        Self::Contact,
        Self::Signature,
        Self::Address,
    ];

    /// The selector name accepted on the command line.
    #[must_use]
    pub fn selector(self) -> &'static str {
        match self {
            Self::Gender => "gender",
            Self::Grant => "grant",
            Self::AreaType => "tish",
            Self::Race => "race",
            Self::Ward => "ward",
            Self::Disability => "disability",
            Self::RecoveringServiceUser => "recovering",
            Self::CooperativeMember => "cooperative",
            Self::Contact => "contact",
            Self::Signature => "signature",
            Self::Address => "address",
        }
    }

    /// Key used for this dimension in the dashboard JSON object.
    #[must_use]
    pub fn json_key(self) -> &'static str {
        match self {
            Self::Gender => "gender_counts",
            Self::Grant => "grant_counts",
            Self::AreaType => "tish_counts",
            Self::Race => "race_counts",
            Self::Ward => "ward_counts",
            Self::Disability => "disability_counts",
            Self::RecoveringServiceUser => "recovering_counts",
            Self::CooperativeMember => "cooperative_counts",
            Self::Contact => "contact_counts",
            Self::Signature => "signature_counts",
            Self::Address => "address_counts",
        }
    }

    /// Human-readable heading used in reports.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Gender => "Gender",
            Self::Grant => "Social Grant",
            Self::AreaType => "Area Type",
            Self::Race => "Race",
            Self::Ward => "Ward",
            Self::Disability => "Disability",
            Self::RecoveringServiceUser => "Service Users",
            Self::CooperativeMember => "Cooperative Members",
            Self::Contact => "Contact Number",
            Self::Signature => "Signature",
            Self::Address => "Physical Address",
        }
    }

    /// How this dimension buckets records.
    #[must_use]
    pub fn kind(self) -> DimensionKind {
        match self {
            Self::Gender | Self::Grant | Self::AreaType | Self::Race | Self::Ward => {
                DimensionKind::Categorical
            }
            Self::Disability | Self::RecoveringServiceUser | Self::CooperativeMember => {
                DimensionKind::Boolean
            }
            Self::Contact | Self::Signature | Self::Address => DimensionKind::Presence,
        }
    }

    /// The fixed bucket labels of a two-bucket dimension, positive first.
    #[must_use]
    pub fn fixed_buckets(self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::Disability | Self::RecoveringServiceUser | Self::CooperativeMember => {
                Some(("Yes", "No"))
            }
            Self::Contact => Some(("Has Contact", "No Contact")),
            Self::Signature => Some(("Has Signature", "No Signature")),
            Self::Address => Some(("Has Address", "No Address")),
            _ => None,
        }
    }

    /// The bucket a record falls into along this dimension.
    #[must_use]
    pub fn bucket(self, record: &RegistryRecord) -> &str {
        fn presence(dim: Dimension, present: bool) -> &'static str {
            match dim.fixed_buckets() {
                Some((has, _)) if present => has,
                Some((_, no)) => no,
                None => UNSET,
            }
        }

        match self {
            Self::Gender => record.gender.label(),
            Self::Grant => record.social_grant.map_or(UNSET, Choice::label),
            Self::AreaType => record.area_type.map_or(UNSET, Choice::label),
            Self::Race => record.race.map_or(UNSET, Choice::label),
            Self::Ward => record.ward_no.trim(),
            Self::Disability => yes_no(record.disability),
            Self::RecoveringServiceUser => yes_no(record.recovering_service_user),
            Self::CooperativeMember => yes_no(record.cooperative_member),
            Self::Contact => presence(self, record.has_contact()),
            Self::Signature => presence(self, record.has_signature()),
            Self::Address => presence(self, record.has_address()),
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.selector())
    }
}

impl FromStr for Dimension {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        let found = match name.as_str() {
            "gender" => Self::Gender,
            "grant" | "social_grant" => Self::Grant,
            "tish" | "tish_area" | "area_type" => Self::AreaType,
            "race" => Self::Race,
            "ward" | "ward_no" => Self::Ward,
            "disability" => Self::Disability,
            "recovering" | "recovering_service_user" => Self::RecoveringServiceUser,
            "cooperative" | "cooperative_member" => Self::CooperativeMember,
            "contact" | "contact_number" => Self::Contact,
            "signature" => Self::Signature,
            "address" | "physical_address" => Self::Address,
            _ => {
                return Err(Error::UnknownDimension {
                    name: s.to_string(),
                })
            }
        };
        Ok(found)
    }
}

/// Label to count for one dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryCounts(BTreeMap<String, u64>);

impl CategoryCounts {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one to a bucket, creating it if needed.
    pub fn increment(&mut self, label: &str) {
        *self.0.entry(label.to_string()).or_insert(0) += 1;
    }

    /// Make sure a bucket exists, even with a zero count.
    pub fn ensure(&mut self, label: &str) {
        self.0.entry(label.to_string()).or_insert(0);
    }

    /// Count for a bucket; zero when absent.
    #[must_use]
    pub fn get(&self, label: &str) -> u64 {
        self.0.get(label).copied().unwrap_or(0)
    }

    /// Whether a bucket exists.
    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.0.contains_key(label)
    }

    /// Sum over all buckets.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Number of buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no buckets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Bucket labels in sorted order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `(label, count)` pairs in sorted label order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// `(label, count)` pairs, largest count first, ties by label.
    #[must_use]
    pub fn by_count(&self) -> Vec<(&str, u64)> {
        let mut pairs: Vec<_> = self.iter().collect();
        pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        pairs
    }
}

impl<'a> FromIterator<(&'a str, u64)> for CategoryCounts {
    fn from_iter<I: IntoIterator<Item = (&'a str, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

/// Counts per dimension plus the number of records aggregated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateReport {
    dimensions: Vec<(Dimension, CategoryCounts)>,
    total_count: u64,
}

impl AggregateReport {
    /// Number of records the report was computed over.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Counts for one dimension, if it was requested.
    #[must_use]
    pub fn counts(&self, dimension: Dimension) -> Option<&CategoryCounts> {
        self.dimensions
            .iter()
            .find(|(d, _)| *d == dimension)
            .map(|(_, c)| c)
    }

    /// Requested dimensions and their counts, in request order.
    pub fn iter(&self) -> impl Iterator<Item = (Dimension, &CategoryCounts)> {
        self.dimensions.iter().map(|(d, c)| (*d, c))
    }

    /// Requested dimensions, in request order.
    pub fn dimensions(&self) -> impl Iterator<Item = Dimension> + '_ {
        self.dimensions.iter().map(|(d, _)| *d)
    }
}

impl Serialize for AggregateReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.dimensions.len() + 1))?;
        for (dimension, counts) in &self.dimensions {
            map.serialize_entry(dimension.json_key(), counts)?;
        }
        map.serialize_entry("total_participants", &self.total_count)?;
        map.end()
    }
}

/// Count `records` along each of `dimensions`.
///
/// Duplicate dimensions are counted once, at their first position. Two-bucket
/// dimensions always carry both of their labels, even with zero counts.
#[must_use]
pub fn aggregate(records: &[RegistryRecord], dimensions: &[Dimension]) -> AggregateReport {
    let mut seen = Vec::with_capacity(dimensions.len());
    for dimension in dimensions {
        if !seen.contains(dimension) {
            seen.push(*dimension);
        }
    }

    let dimensions = seen
        .into_iter()
        .map(|dimension| {
            let mut counts = CategoryCounts::new();
            if let Some((yes, no)) = dimension.fixed_buckets() {
                counts.ensure(yes);
                counts.ensure(no);
            }
            for record in records {
                counts.increment(dimension.bucket(record));
            }
            (dimension, counts)
        })
        .collect();

    debug!("Aggregated {} records", records.len());
    AggregateReport {
        dimensions,
        total_count: records.len() as u64,
    }
}

/// Parse dimension selectors, rejecting any unknown name.
///
/// # Errors
///
/// Returns [`Error::UnknownDimension`] for the first unsupported selector.
pub fn parse_dimensions<S: AsRef<str>>(selectors: &[S]) -> Result<Vec<Dimension>> {
    selectors.iter().map(|s| s.as_ref().parse()).collect()
}

/// Aggregate over dimensions named by selector.
///
/// # Errors
///
/// Returns [`Error::UnknownDimension`] before counting anything if a selector
/// is not supported.
pub fn aggregate_selectors<S: AsRef<str>>(
    records: &[RegistryRecord],
    selectors: &[S],
) -> Result<AggregateReport> {
    let dimensions = parse_dimensions(selectors)?;
    Ok(aggregate(records, &dimensions))
}

/// The full dashboard: every dimension.
#[must_use]
pub fn dashboard(records: &[RegistryRecord]) -> AggregateReport {
    aggregate(records, &Dimension::ALL)
}
