//! Registry entry types.
//!
//! This module defines the beneficiary record kept by the registry, the
//! closed sets of choices its categorical fields accept, and the field
//! validation applied before a record is stored.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::signature::SignatureImage;

/// A closed set of labelled choices for a record field.
pub trait Choice: Sized + Copy + 'static {
    /// Name of the field the choice belongs to, used in error messages.
    const FIELD: &'static str;

    /// Every valid choice, in display order.
    fn all() -> &'static [Self];

    /// The stored label for this choice.
    fn label(self) -> &'static str;
}

/// Parse a choice label, ignoring case and surrounding whitespace.
///
/// # Errors
///
/// Returns [`Error::Validation`] if the label matches no choice.
pub fn parse_choice<T: Choice>(value: &str) -> Result<T> {
    let wanted = value.trim();
    T::all()
        .iter()
        .copied()
        .find(|c| c.label().eq_ignore_ascii_case(wanted))
        .ok_or_else(|| {
            let valid: Vec<_> = T::all().iter().map(|c| c.label()).collect();
            Error::validation(
                T::FIELD,
                format!("unknown choice '{wanted}' (expected one of: {})", valid.join(", ")),
            )
        })
}

/// Gender as recorded on the registry form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    /// Male.
    Male,
    /// Female.
    Female,
    /// Any other gender.
    Other,
}

impl Choice for Gender {
    const FIELD: &'static str = "gender";

    fn all() -> &'static [Self] {
        &[Self::Male, Self::Female, Self::Other]
    }

    fn label(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Other => "Other",
        }
    }
}

/// Population group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Race {
    /// Black.
    Black,
    /// White.
    White,
    /// Colored.
    Colored,
    /// Indian.
    Indian,
    /// Other.
    Other,
}

impl Choice for Race {
    const FIELD: &'static str = "race";

    fn all() -> &'static [Self] {
        &[
            Self::Black,
            Self::White,
            Self::Colored,
            Self::Indian,
            Self::Other,
        ]
    }

    fn label(self) -> &'static str {
        match self {
            Self::Black => "Black",
            Self::White => "White",
            Self::Colored => "Colored",
            Self::Indian => "Indian",
            Self::Other => "Other",
        }
    }
}

/// Type of residential area (the "TISH" area).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AreaType {
    /// Hostel.
    Hostel,
    /// Township.
    Township,
    /// Informal settlement.
    #[serde(rename = "Informal Settlement")]
    InformalSettlement,
}

impl Choice for AreaType {
    const FIELD: &'static str = "area_type";

    fn all() -> &'static [Self] {
        &[Self::Hostel, Self::Township, Self::InformalSettlement]
    }

    fn label(self) -> &'static str {
        match self {
            Self::Hostel => "Hostel",
            Self::Township => "Township",
            Self::InformalSettlement => "Informal Settlement",
        }
    }
}

/// Social grant received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SocialGrant {
    /// No social grant.
    #[serde(rename = "None")]
    NoGrant,
    /// Child Support Grant.
    #[serde(rename = "CSG")]
    ChildSupport,
    /// Social Relief of Distress.
    #[serde(rename = "SRD")]
    SocialReliefOfDistress,
    /// Older Persons Grant.
    #[serde(rename = "Older Persons")]
    OlderPersons,
    /// Disability Grant.
    Disability,
    /// Foster Care Grant.
    #[serde(rename = "Foster Care")]
    FosterCare,
    /// Any other grant.
    Other,
}

impl Choice for SocialGrant {
    const FIELD: &'static str = "social_grant";

    fn all() -> &'static [Self] {
        &[
            Self::NoGrant,
            Self::ChildSupport,
            Self::SocialReliefOfDistress,
            Self::OlderPersons,
            Self::Disability,
            Self::FosterCare,
            Self::Other,
        ]
    }

    fn label(self) -> &'static str {
        match self {
            Self::NoGrant => "None",
            Self::ChildSupport => "CSG",
            Self::SocialReliefOfDistress => "SRD",
            Self::OlderPersons => "Older Persons",
            Self::Disability => "Disability",
            Self::FosterCare => "Foster Care",
            Self::Other => "Other",
        }
    }
}

impl SocialGrant {
    /// Long description shown on forms.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::NoGrant => "No Social Grant",
            Self::ChildSupport => "Child Support Grant",
            Self::SocialReliefOfDistress => "Social Relief Distress",
            Self::OlderPersons => "Older Persons Grant",
            Self::Disability => "Disability Grant",
            Self::FosterCare => "Foster Care Grant",
            Self::Other => "Other Grant",
        }
    }
}

macro_rules! choice_traits {
    ($($ty:ty),*) => {$(
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                parse_choice(s)
            }
        }
    )*};
}

choice_traits!(Gender, Race, AreaType, SocialGrant);

/// Render an optional flag the way reports show it.
#[must_use]
pub fn yes_no(flag: Option<bool>) -> &'static str {
    if flag.unwrap_or(false) {
        "Yes"
    } else {
        "No"
    }
}

/// A beneficiary entry in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryRecord {
    /// Identifier assigned by the store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Given names.
    pub names: String,
    /// Surname.
    pub surname: String,
    /// ID number or date of birth.
    pub id_no_or_dob: String,
    /// Gender.
    pub gender: Gender,

    /// Residential address.
    #[serde(default)]
    pub physical_address: String,
    /// Type of residential area.
    #[serde(default)]
    pub area_type: Option<AreaType>,
    /// Ward number.
    #[serde(default)]
    pub ward_no: String,

    /// Contact telephone number.
    #[serde(default)]
    pub contact_number: String,
    /// Population group.
    #[serde(default)]
    pub race: Option<Race>,

    /// Has a disability. `None` means the question was not answered.
    #[serde(default)]
    pub disability: Option<bool>,
    /// Is a recovering service user.
    #[serde(default)]
    pub recovering_service_user: Option<bool>,
    /// Social grant received.
    #[serde(default)]
    pub social_grant: Option<SocialGrant>,
    /// Is a cooperative member.
    #[serde(default)]
    pub cooperative_member: Option<bool>,

    /// Rendered signature, if one was captured.
    #[serde(default)]
    pub signature: Option<SignatureImage>,

    /// When the entry was created.
    pub created_at: DateTime<Utc>,
    /// When the entry was last modified.
    pub updated_at: DateTime<Utc>,
}

impl RegistryRecord {
    /// Create a new, unsaved record with the required fields and form defaults.
    #[must_use]
    pub fn new(
        names: impl Into<String>,
        surname: impl Into<String>,
        id_no_or_dob: impl Into<String>,
        gender: Gender,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            names: names.into(),
            surname: surname.into(),
            id_no_or_dob: id_no_or_dob.into(),
            gender,
            physical_address: String::new(),
            area_type: None,
            ward_no: String::new(),
            contact_number: String::new(),
            race: None,
            disability: Some(false),
            recovering_service_user: Some(false),
            social_grant: Some(SocialGrant::NoGrant),
            cooperative_member: Some(false),
            signature: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// "Names Surname".
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.names, self.surname)
    }

    /// Whether a contact number was supplied.
    #[must_use]
    pub fn has_contact(&self) -> bool {
        !self.contact_number.trim().is_empty()
    }

    /// Whether a physical address was supplied.
    #[must_use]
    pub fn has_address(&self) -> bool {
        !self.physical_address.trim().is_empty()
    }

    /// Whether a signature image is attached.
    #[must_use]
    pub fn has_signature(&self) -> bool {
        self.signature.as_ref().is_some_and(|s| !s.png.is_empty())
    }

    /// Apply a signature submission.
    pub fn apply_signature(&mut self, update: SignatureUpdate) {
        match update {
            SignatureUpdate::Keep => {}
            SignatureUpdate::Replace(image) => self.signature = image,
            SignatureUpdate::Clear => self.signature = None,
        }
    }

    /// Check the fields a form submission must satisfy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first offending field.
    pub fn validate(&self, contact_pattern: Option<&Regex>) -> Result<()> {
        require_text("names", &self.names)?;
        require_text("surname", &self.surname)?;
        require_text("id_no_or_dob", &self.id_no_or_dob)?;

        if self.area_type.is_none() {
            return Err(Error::validation("area_type", "an area type is required"));
        }

        if let Some(pattern) = contact_pattern {
            let contact = self.contact_number.trim();
            if !contact.is_empty() && !pattern.is_match(contact) {
                return Err(Error::validation(
                    "contact_number",
                    format!("'{contact}' is not a valid contact number"),
                ));
            }
        }

        Ok(())
    }
}

fn require_text(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::validation(field, "this field is required"))
    } else {
        Ok(())
    }
}

/// What an edit does to the stored signature.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SignatureUpdate {
    /// No strokes were submitted; leave the stored image alone.
    #[default]
    Keep,
    /// Strokes were submitted; store their rendering, or nothing if they
    /// had nothing to draw.
    Replace(Option<SignatureImage>),
    /// Remove the stored image.
    Clear,
}

/// A partial update to a record; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordChanges {
    /// New given names.
    pub names: Option<String>,
    /// New surname.
    pub surname: Option<String>,
    /// New ID number or date of birth.
    pub id_no_or_dob: Option<String>,
    /// New gender.
    pub gender: Option<Gender>,
    /// New address.
    pub physical_address: Option<String>,
    /// New area type.
    pub area_type: Option<AreaType>,
    /// New ward number.
    pub ward_no: Option<String>,
    /// New contact number.
    pub contact_number: Option<String>,
    /// New population group.
    pub race: Option<Race>,
    /// New disability flag.
    pub disability: Option<bool>,
    /// New recovering-service-user flag.
    pub recovering_service_user: Option<bool>,
    /// New social grant.
    pub social_grant: Option<SocialGrant>,
    /// New cooperative-member flag.
    pub cooperative_member: Option<bool>,
}

impl RecordChanges {
    /// Whether applying these changes would modify nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the changes to a record.
    pub fn apply_to(self, record: &mut RegistryRecord) {
        if let Some(v) = self.names {
            record.names = v;
        }
        if let Some(v) = self.surname {
            record.surname = v;
        }
        if let Some(v) = self.id_no_or_dob {
            record.id_no_or_dob = v;
        }
        if let Some(v) = self.gender {
            record.gender = v;
        }
        if let Some(v) = self.physical_address {
            record.physical_address = v;
        }
        if self.area_type.is_some() {
            record.area_type = self.area_type;
        }
        if let Some(v) = self.ward_no {
            record.ward_no = v;
        }
        if let Some(v) = self.contact_number {
            record.contact_number = v;
        }
        if self.race.is_some() {
            record.race = self.race;
        }
        if self.disability.is_some() {
            record.disability = self.disability;
        }
        if self.recovering_service_user.is_some() {
            record.recovering_service_user = self.recovering_service_user;
        }
        if self.social_grant.is_some() {
            record.social_grant = self.social_grant;
        }
        if self.cooperative_member.is_some() {
            record.cooperative_member = self.cooperative_member;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_record() -> RegistryRecord {
        let mut record = RegistryRecord::new("Thandi", "Nkosi", "9001015800087", Gender::Female);
        record.area_type = Some(AreaType::Township);
        record
    }

    fn contact_regex() -> Regex {
        Regex::new(r"^\+?[0-9 ]{7,15}$").unwrap()
    }

    #[test]
    fn test_choice_labels() {
        assert_eq!(AreaType::InformalSettlement.to_string(), "Informal Settlement");
        assert_eq!(SocialGrant::NoGrant.to_string(), "None");
        assert_eq!(SocialGrant::ChildSupport.to_string(), "CSG");
        assert_eq!(SocialGrant::OlderPersons.description(), "Older Persons Grant");
    }

    #[test]
    fn test_parse_choice_case_insensitive() {
        assert_eq!("male".parse::<Gender>().unwrap(), Gender::Male);
        assert_eq!(
            " informal settlement ".parse::<AreaType>().unwrap(),
            AreaType::InformalSettlement
        );
        assert_eq!("srd".parse::<SocialGrant>().unwrap(), SocialGrant::SocialReliefOfDistress);
        assert_eq!("Colored".parse::<Race>().unwrap(), Race::Colored);
    }

    #[test]
    fn test_parse_choice_unknown() {
        let err = "Martian".parse::<Race>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("race"));
        assert!(msg.contains("Martian"));
        assert!(msg.contains("Indian"));
    }

    #[test]
    fn test_choice_serde_uses_labels() {
        let json = serde_json::to_string(&SocialGrant::OlderPersons).unwrap();
        assert_eq!(json, "\"Older Persons\"");
        let parsed: AreaType = serde_json::from_str("\"Informal Settlement\"").unwrap();
        assert_eq!(parsed, AreaType::InformalSettlement);
    }

    #[test]
    fn test_serde_labels_match_choice_labels() {
        for grant in SocialGrant::all() {
            let json = serde_json::to_string(grant).unwrap();
            assert_eq!(json, format!("\"{}\"", grant.label()));
        }
        for area in AreaType::all() {
            let json = serde_json::to_string(area).unwrap();
            assert_eq!(json, format!("\"{}\"", area.label()));
        }
    }

    #[test]
    fn test_new_record_defaults() {
        let record = RegistryRecord::new("A", "B", "C", Gender::Male);
        assert!(record.id.is_none());
        assert_eq!(record.social_grant, Some(SocialGrant::NoGrant));
        assert_eq!(record.disability, Some(false));
        assert!(!record.has_signature());
        assert!(!record.has_contact());
        assert_eq!(record.full_name(), "A B");
    }

    #[test]
    fn test_yes_no() {
        assert_eq!(yes_no(Some(true)), "Yes");
        assert_eq!(yes_no(Some(false)), "No");
        assert_eq!(yes_no(None), "No");
    }

    #[test]
    fn test_validate_ok() {
        let mut record = valid_record();
        record.contact_number = "+27 82 555 0101".to_string();
        assert!(record.validate(Some(&contact_regex())).is_ok());
    }

    #[test]
    fn test_validate_required_fields() {
        let mut record = valid_record();
        record.surname = "   ".to_string();
        let err = record.validate(None).unwrap_err();
        assert!(err.to_string().contains("surname"));

        let mut record = valid_record();
        record.area_type = None;
        let err = record.validate(None).unwrap_err();
        assert!(err.to_string().contains("area_type"));
    }

    #[test]
    fn test_validate_contact_pattern() {
        let mut record = valid_record();
        record.contact_number = "call me".to_string();
        assert!(record.validate(Some(&contact_regex())).is_err());
        assert!(record.validate(None).is_ok());

        record.contact_number = String::new();
        assert!(record.validate(Some(&contact_regex())).is_ok());
    }

    #[test]
    fn test_signature_updates() {
        let image = SignatureImage {
            png: vec![1, 2, 3],
            width: 10,
            height: 10,
            stroke_digest: "abc".to_string(),
        };
        let mut record = valid_record();

        record.apply_signature(SignatureUpdate::Replace(Some(image.clone())));
        assert!(record.has_signature());

        record.apply_signature(SignatureUpdate::Keep);
        assert_eq!(record.signature.as_ref(), Some(&image));

        // A new submission with nothing to draw must not keep the old image.
        record.apply_signature(SignatureUpdate::Replace(None));
        assert!(!record.has_signature());

        record.apply_signature(SignatureUpdate::Replace(Some(image)));
        record.apply_signature(SignatureUpdate::Clear);
        assert!(record.signature.is_none());
    }

    #[test]
    fn test_record_changes() {
        let mut record = valid_record();
        let changes = RecordChanges {
            surname: Some("Dlamini".to_string()),
            race: Some(Race::Black),
            disability: Some(true),
            ..Default::default()
        };
        assert!(!changes.is_empty());
        changes.apply_to(&mut record);

        assert_eq!(record.surname, "Dlamini");
        assert_eq!(record.names, "Thandi");
        assert_eq!(record.race, Some(Race::Black));
        assert_eq!(record.disability, Some(true));
        assert!(RecordChanges::default().is_empty());
    }

    #[test]
    fn test_record_json() {
        let record = valid_record();
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"area_type\":\"Township\""));
        assert!(!json.contains("\"id\""));
        let parsed: RegistryRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }
}
