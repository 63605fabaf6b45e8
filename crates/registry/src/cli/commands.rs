//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand, ValueEnum};

use crate::export::ExportFormat;
use crate::record::{parse_choice, AreaType, Choice, Gender, Race, RecordChanges, SocialGrant};
use crate::signature::Background;
use crate::stats::ReportPeriod;
use crate::storage::RecordFilter;

fn parse_label<T: Choice>(value: &str) -> Result<T, String> {
    parse_choice(value).map_err(|e| e.to_string())
}

fn parse_yes_no(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Ok(true),
        "no" | "n" | "false" | "0" => Ok(false),
        other => Err(format!("expected yes or no, got '{other}'")),
    }
}

/// Record fields shared by `add` and `edit`.
#[derive(Debug, Clone, Default, Args)]
pub struct RecordFields {
    /// Given names
    #[arg(long)]
    pub names: Option<String>,

    /// Surname
    #[arg(long)]
    pub surname: Option<String>,

    /// ID number or date of birth
    #[arg(long = "id-no", value_name = "ID_OR_DOB")]
    pub id_no_or_dob: Option<String>,

    /// Gender (Male, Female, Other)
    #[arg(long, value_parser = parse_label::<Gender>)]
    pub gender: Option<Gender>,

    /// Physical address
    #[arg(long)]
    pub address: Option<String>,

    /// Area type (Hostel, Township, Informal Settlement)
    #[arg(long = "area", value_parser = parse_label::<AreaType>)]
    pub area_type: Option<AreaType>,

    /// Ward number
    #[arg(long)]
    pub ward: Option<String>,

    /// Contact number
    #[arg(long)]
    pub contact: Option<String>,

    /// Race (Black, White, Colored, Indian, Other)
    #[arg(long, value_parser = parse_label::<Race>)]
    pub race: Option<Race>,

    /// Has a disability (yes/no)
    #[arg(long, value_parser = parse_yes_no)]
    pub disability: Option<bool>,

    /// Is a recovering service user (yes/no)
    #[arg(long, value_parser = parse_yes_no)]
    pub recovering: Option<bool>,

    /// Social grant (None, CSG, SRD, Older Persons, Disability, Foster Care, Other)
    #[arg(long, value_parser = parse_label::<SocialGrant>)]
    pub grant: Option<SocialGrant>,

    /// Is a cooperative member (yes/no)
    #[arg(long, value_parser = parse_yes_no)]
    pub cooperative: Option<bool>,
}

impl RecordFields {
    /// The fields given on the command line as a partial update.
    #[must_use]
    pub fn to_changes(&self) -> RecordChanges {
        RecordChanges {
            names: self.names.clone(),
            surname: self.surname.clone(),
            id_no_or_dob: self.id_no_or_dob.clone(),
            gender: self.gender,
            physical_address: self.address.clone(),
            area_type: self.area_type,
            ward_no: self.ward.clone(),
            contact_number: self.contact.clone(),
            race: self.race,
            disability: self.disability,
            recovering_service_user: self.recovering,
            social_grant: self.grant,
            cooperative_member: self.cooperative,
        }
    }
}

/// Add command arguments.
#[derive(Debug, Args)]
pub struct AddCommand {
    /// Entry fields
    #[command(flatten)]
    pub fields: RecordFields,

    /// File of signature-pad stroke JSON ("-" for stdin)
    #[arg(short, long, value_name = "FILE")]
    pub signature: Option<PathBuf>,
}

/// Edit command arguments.
#[derive(Debug, Args)]
pub struct EditCommand {
    /// Entry ID
    pub id: i64,

    /// Fields to change
    #[command(flatten)]
    pub fields: RecordFields,

    /// Replace the signature with strokes from FILE ("-" for stdin)
    #[arg(short, long, value_name = "FILE", conflicts_with = "clear_signature")]
    pub signature: Option<PathBuf>,

    /// Remove the stored signature
    #[arg(long)]
    pub clear_signature: bool,
}

/// Delete command arguments.
#[derive(Debug, Args)]
pub struct DeleteCommand {
    /// Entry ID
    pub id: i64,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Show command arguments.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Entry ID
    pub id: i64,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,

    /// Also write the signature image to this PNG file
    #[arg(long, value_name = "PNG")]
    pub signature_out: Option<PathBuf>,
}

/// Filters for selecting entries.
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Match names, surname, ID/DOB or contact number
    #[arg(short = 'S', long)]
    pub search: Option<String>,

    /// Only this gender
    #[arg(long, value_parser = parse_label::<Gender>)]
    pub gender: Option<Gender>,

    /// Only this social grant
    #[arg(long, value_parser = parse_label::<SocialGrant>)]
    pub grant: Option<SocialGrant>,

    /// Only this area type
    #[arg(long = "area", value_parser = parse_label::<AreaType>)]
    pub area_type: Option<AreaType>,

    /// Only this race
    #[arg(long, value_parser = parse_label::<Race>)]
    pub race: Option<Race>,

    /// Only this ward
    #[arg(long)]
    pub ward: Option<String>,

    /// Only entries with (yes) or without (no) a disability
    #[arg(long, value_parser = parse_yes_no)]
    pub disability: Option<bool>,

    /// Only recovering service users (yes) or others (no)
    #[arg(long, value_parser = parse_yes_no)]
    pub recovering: Option<bool>,

    /// Only cooperative members (yes) or others (no)
    #[arg(long, value_parser = parse_yes_no)]
    pub cooperative: Option<bool>,

    /// Maximum number of entries
    #[arg(short, long)]
    pub limit: Option<usize>,
}

impl FilterArgs {
    /// Convert to a storage filter.
    #[must_use]
    pub fn to_filter(&self) -> RecordFilter {
        RecordFilter {
            search: self.search.clone(),
            gender: self.gender,
            social_grant: self.grant,
            area_type: self.area_type,
            race: self.race,
            ward_no: self.ward.clone(),
            disability: self.disability,
            recovering_service_user: self.recovering,
            cooperative_member: self.cooperative,
            created_since: None,
            created_until: None,
            limit: self.limit,
        }
    }

    /// Convert to a storage filter restricted to a report period's window.
    #[must_use]
    pub fn to_period_filter(&self, period: ReportPeriod, now: DateTime<Utc>) -> RecordFilter {
        let (since, until) = period.window(now);
        RecordFilter {
            created_since: Some(since),
            created_until: Some(until),
            ..self.to_filter()
        }
    }
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Entry filters
    #[command(flatten)]
    pub filters: FilterArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Export command arguments.
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// Document format
    #[arg(value_enum)]
    pub format: FormatArg,

    /// Entry filters
    #[command(flatten)]
    pub filters: FilterArgs,

    /// Output file (defaults to the configured output directory)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Report command arguments.
#[derive(Debug, Args)]
pub struct ReportCommand {
    /// Report period
    #[arg(value_enum)]
    pub period: PeriodArg,

    /// Entry filters
    #[command(flatten)]
    pub filters: FilterArgs,

    /// Document format
    #[arg(short, long, value_enum, default_value = "csv")]
    pub format: FormatArg,

    /// Output file (defaults to a dated name in the output directory)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Dashboard command arguments.
#[derive(Debug, Args)]
pub struct DashboardCommand {
    /// Only these dimensions (e.g. gender, grant, tish); all when omitted
    #[arg(short, long = "dimension", value_name = "NAME")]
    pub dimensions: Vec<String>,

    /// Print counts as tables instead of JSON
    #[arg(short, long)]
    pub table: bool,
}

/// Signature commands.
#[derive(Debug, Subcommand)]
pub enum SignatureCommand {
    /// Render stroke JSON to a PNG preview
    Render {
        /// File of stroke JSON ("-" for stdin)
        input: PathBuf,

        /// Output PNG file
        #[arg(short, long, default_value = "signature.png")]
        output: PathBuf,

        /// Canvas fill (defaults to the configured background)
        #[arg(short, long, value_enum)]
        background: Option<BackgroundArg>,
    },
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One line per entry
    Plain,
    /// Formatted table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// Document format argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Comma-separated values
    Csv,
    /// PDF document
    Pdf,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => Self::Csv,
            FormatArg::Pdf => Self::Pdf,
        }
    }
}

/// Report period argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PeriodArg {
    /// Last day
    Daily,
    /// Last 7 days
    Weekly,
    /// Last 30 days
    Monthly,
    /// Last 365 days
    Yearly,
}

impl From<PeriodArg> for ReportPeriod {
    fn from(arg: PeriodArg) -> Self {
        match arg {
            PeriodArg::Daily => Self::Daily,
            PeriodArg::Weekly => Self::Weekly,
            PeriodArg::Monthly => Self::Monthly,
            PeriodArg::Yearly => Self::Yearly,
        }
    }
}

/// Canvas background argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackgroundArg {
    /// Transparent canvas
    Transparent,
    /// Solid white canvas
    OpaqueWhite,
}

impl From<BackgroundArg> for Background {
    fn from(arg: BackgroundArg) -> Self {
        match arg {
            BackgroundArg::Transparent => Self::Transparent,
            BackgroundArg::OpaqueWhite => Self::OpaqueWhite,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yes_no() {
        assert_eq!(parse_yes_no("Yes"), Ok(true));
        assert_eq!(parse_yes_no("n"), Ok(false));
        assert!(parse_yes_no("maybe").is_err());
    }

    #[test]
    fn test_parse_label() {
        assert_eq!(parse_label::<SocialGrant>("csg"), Ok(SocialGrant::ChildSupport));
        let err = parse_label::<Gender>("robot").unwrap_err();
        assert!(err.contains("gender"));
    }

    #[test]
    fn test_record_fields_to_changes() {
        let fields = RecordFields {
            surname: Some("Sithole".to_string()),
            grant: Some(SocialGrant::FosterCare),
            recovering: Some(true),
            ..RecordFields::default()
        };
        let changes = fields.to_changes();
        assert_eq!(changes.surname.as_deref(), Some("Sithole"));
        assert_eq!(changes.social_grant, Some(SocialGrant::FosterCare));
        assert_eq!(changes.recovering_service_user, Some(true));
        assert!(changes.names.is_none());
        assert!(RecordFields::default().to_changes().is_empty());
    }

    #[test]
    fn test_filter_args_to_filter() {
        let args = FilterArgs {
            search: Some("moloi".to_string()),
            area_type: Some(AreaType::Township),
            limit: Some(5),
            ..FilterArgs::default()
        };
        let filter = args.to_filter();
        assert_eq!(filter.search.as_deref(), Some("moloi"));
        assert_eq!(filter.area_type, Some(AreaType::Township));
        assert_eq!(filter.limit, Some(5));
        assert!(FilterArgs::default().to_filter().is_empty());
    }

    #[test]
    fn test_period_window_on_filter() {
        let args = FilterArgs {
            gender: Some(Gender::Female),
            ..FilterArgs::default()
        };
        let now = chrono::Utc::now();
        let filter = args.to_period_filter(ReportPeriod::Weekly, now);
        assert_eq!(filter.gender, Some(Gender::Female));
        assert_eq!(filter.created_until, Some(now));
        assert_eq!(filter.created_since, Some(now - chrono::Duration::days(7)));
    }

    #[test]
    fn test_arg_conversions() {
        assert_eq!(ExportFormat::from(FormatArg::Pdf), ExportFormat::Pdf);
        assert_eq!(ReportPeriod::from(PeriodArg::Yearly), ReportPeriod::Yearly);
        assert_eq!(
            Background::from(BackgroundArg::OpaqueWhite),
            Background::OpaqueWhite
        );
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Table);
    }
}
