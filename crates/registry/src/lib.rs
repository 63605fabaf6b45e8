//! `community_registry` - Beneficiary records with signature capture and reporting
//!
//! This library keeps a registry of beneficiary entries in `SQLite`, renders
//! hand-drawn signature strokes to images, aggregates entries into
//! categorical counts, and writes CSV, PDF and JSON outputs.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod record;
pub mod signature;
pub mod stats;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use record::{RecordChanges, RegistryRecord, SignatureUpdate};
pub use signature::{rasterize, render_signature, RasterImage, RasterOptions, SignatureImage, Stroke};
pub use stats::{aggregate, AggregateReport, CategoryCounts, Dimension, ReportPeriod};
pub use storage::{RecordFilter, Storage, StorageStats};
