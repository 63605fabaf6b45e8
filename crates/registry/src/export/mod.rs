//! Document output: CSV tables, PDF tables and dashboard JSON.

pub mod csv;
pub mod dashboard;
pub mod pdf;

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::config::Config;
use crate::signature::RasterImage;
use crate::stats::{Dimension, UNSET};

/// File name for a full CSV listing.
pub const RECORDS_CSV: &str = "registry.csv";

/// File name for a full PDF listing.
pub const RECORDS_PDF: &str = "registry.pdf";

/// Dimensions summarized at the top of period reports.
pub const PERIOD_DIMENSIONS: [Dimension; 7] = [
    Dimension::Gender,
    Dimension::Grant,
    Dimension::AreaType,
    Dimension::Race,
    Dimension::Disability,
    Dimension::RecoveringServiceUser,
    Dimension::CooperativeMember,
];

/// Output format for exports and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Comma-separated values.
    #[default]
    Csv,
    /// Portable Document Format.
    Pdf,
}

impl ExportFormat {
    /// File extension without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Pdf => "pdf",
        }
    }

    /// Default file name for a full listing.
    #[must_use]
    pub fn records_file_name(self) -> &'static str {
        match self {
            Self::Csv => RECORDS_CSV,
            Self::Pdf => RECORDS_PDF,
        }
    }
}

/// Presentation settings for PDF documents.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Organization name printed in the header.
    pub organization_name: Option<String>,
    /// Logo drawn in the header.
    pub logo: Option<RasterImage>,
    /// Embed signature thumbnails.
    pub include_signatures: bool,
    /// Table rows per page.
    pub rows_per_page: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            organization_name: None,
            logo: None,
            include_signatures: true,
            rows_per_page: 18,
        }
    }
}

impl ExportOptions {
    /// Build options from configuration, loading the logo if one is set.
    ///
    /// A logo that cannot be read is skipped with a warning.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let logo = config.export.logo_path.as_deref().and_then(load_logo);
        Self {
            organization_name: config
                .export
                .organization_name
                .clone()
                .filter(|name| !name.trim().is_empty()),
            logo,
            include_signatures: config.export.include_signatures,
            rows_per_page: config.export.rows_per_page.max(1),
        }
    }
}

fn load_logo(path: &Path) -> Option<RasterImage> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Cannot read logo {}: {}", path.display(), e);
            return None;
        }
    };
    match RasterImage::from_png(&bytes) {
        Ok(image) => Some(image),
        Err(e) => {
            warn!("Ignoring logo {}: {}", path.display(), e);
            None
        }
    }
}

/// Where to write an export: the explicit path, or `file_name` inside the
/// configured output directory.
#[must_use]
pub fn resolve_output_path(config: &Config, explicit: Option<&Path>, file_name: &str) -> PathBuf {
    explicit.map_or_else(|| config.output_dir().join(file_name), Path::to_path_buf)
}

/// The label shown for a bucket in documents.
#[must_use]
pub fn display_bucket(label: &str) -> &str {
    if label == UNSET {
        "(not set)"
    } else {
        label
    }
}
