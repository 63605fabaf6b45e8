//! Command-line interface for the registry.
//!
//! This module provides the CLI structure for the `regctl` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AddCommand, BackgroundArg, ConfigCommand, DashboardCommand, DeleteCommand, EditCommand,
    ExportCommand, FilterArgs, FormatArg, ListCommand, OutputFormat, PeriodArg, RecordFields,
    ReportCommand, ShowCommand, SignatureCommand, StatusCommand,
};

use crate::logging::Verbosity;

/// regctl - Community registry records, signatures and reports
///
/// Capture beneficiary entries with hand-drawn signatures, search them,
/// and produce CSV/PDF exports, period reports and dashboard counts.
#[derive(Debug, Parser)]
#[command(name = "regctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add a registry entry
    Add(AddCommand),

    /// Change an existing entry
    Edit(EditCommand),

    /// Delete an entry
    Delete(DeleteCommand),

    /// Show one entry
    Show(ShowCommand),

    /// List and search entries
    List(ListCommand),

    /// Export entries as CSV or PDF
    Export(ExportCommand),

    /// Produce a report for a recent period
    Report(ReportCommand),

    /// Show aggregate counts
    Dashboard(DashboardCommand),

    /// Work with signature strokes
    #[command(subcommand)]
    Signature(SignatureCommand),

    /// Show database status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AreaType, Gender, SocialGrant};
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "regctl");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(parse(&["regctl", "status"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["regctl", "-v", "status"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["regctl", "-vv", "status"]).verbosity(), Verbosity::Trace);
        assert_eq!(parse(&["regctl", "-q", "-v", "status"]).verbosity(), Verbosity::Quiet);
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["regctl", "-c", "/custom/config.toml", "status"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_add() {
        let cli = parse(&[
            "regctl",
            "add",
            "--names",
            "Lindiwe",
            "--surname",
            "Mahlangu",
            "--id-no",
            "1990-04-01",
            "--gender",
            "female",
            "--area",
            "informal settlement",
            "--grant",
            "Older Persons",
            "--disability",
            "yes",
            "--signature",
            "strokes.json",
        ]);
        let Command::Add(add) = cli.command else {
            panic!("expected add");
        };
        assert_eq!(add.fields.names.as_deref(), Some("Lindiwe"));
        assert_eq!(add.fields.gender, Some(Gender::Female));
        assert_eq!(add.fields.area_type, Some(AreaType::InformalSettlement));
        assert_eq!(add.fields.grant, Some(SocialGrant::OlderPersons));
        assert_eq!(add.fields.disability, Some(true));
        assert_eq!(add.signature, Some(PathBuf::from("strokes.json")));
    }

    #[test]
    fn test_parse_add_rejects_unknown_choice() {
        let result = Cli::try_parse_from(["regctl", "add", "--gender", "unknown"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_edit_signature_flags_conflict() {
        let cli = parse(&["regctl", "edit", "4", "--clear-signature"]);
        assert!(matches!(cli.command, Command::Edit(EditCommand { id: 4, clear_signature: true, .. })));

        let result =
            Cli::try_parse_from(["regctl", "edit", "4", "--clear-signature", "-s", "x.json"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_list_filters() {
        let cli = parse(&[
            "regctl", "list", "-S", "dube", "--grant", "srd", "--limit", "5", "-f", "json",
        ]);
        let Command::List(list) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(list.filters.search.as_deref(), Some("dube"));
        assert_eq!(list.filters.grant, Some(SocialGrant::SocialReliefOfDistress));
        assert_eq!(list.filters.limit, Some(5));
        assert_eq!(list.format, OutputFormat::Json);
    }

    #[test]
    fn test_parse_export_and_report() {
        let cli = parse(&["regctl", "export", "pdf", "-o", "out.pdf", "--gender", "male"]);
        let Command::Export(export) = cli.command else {
            panic!("expected export");
        };
        assert_eq!(export.format, FormatArg::Pdf);
        assert_eq!(export.output, Some(PathBuf::from("out.pdf")));
        assert_eq!(export.filters.gender, Some(Gender::Male));

        let cli = parse(&["regctl", "report", "weekly"]);
        let Command::Report(report) = cli.command else {
            panic!("expected report");
        };
        assert_eq!(report.period, PeriodArg::Weekly);
        assert_eq!(report.format, FormatArg::Csv);
        assert!(report.filters.to_filter().is_empty());

        let cli = parse(&["regctl", "report", "monthly", "--area", "hostel", "-S", "dube"]);
        let Command::Report(report) = cli.command else {
            panic!("expected report");
        };
        assert_eq!(report.filters.area_type, Some(AreaType::Hostel));
        assert_eq!(report.filters.search.as_deref(), Some("dube"));
    }

    #[test]
    fn test_parse_dashboard_dimensions() {
        let cli = parse(&["regctl", "dashboard", "-d", "gender", "-d", "tish"]);
        let Command::Dashboard(dashboard) = cli.command else {
            panic!("expected dashboard");
        };
        assert_eq!(dashboard.dimensions, vec!["gender", "tish"]);
        assert!(!dashboard.table);
    }

    #[test]
    fn test_parse_signature_render() {
        let cli = parse(&[
            "regctl",
            "signature",
            "render",
            "pad.json",
            "--background",
            "opaque-white",
        ]);
        let Command::Signature(SignatureCommand::Render {
            input,
            output,
            background,
        }) = cli.command
        else {
            panic!("expected signature render");
        };
        assert_eq!(input, PathBuf::from("pad.json"));
        assert_eq!(output, PathBuf::from("signature.png"));
        assert_eq!(background, Some(BackgroundArg::OpaqueWhite));
    }

    #[test]
    fn test_parse_delete_and_config() {
        let cli = parse(&["regctl", "delete", "9", "--yes"]);
        assert!(matches!(cli.command, Command::Delete(DeleteCommand { id: 9, yes: true })));

        let cli = parse(&["regctl", "config", "validate", "--file", "c.toml"]);
        assert!(matches!(cli.command, Command::Config(ConfigCommand::Validate { .. })));
    }
}
