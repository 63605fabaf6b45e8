//! `SQLite` schema definitions for the registry.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the registry entries table.
pub const CREATE_ENTRIES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS registry_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    names TEXT NOT NULL,
    surname TEXT NOT NULL,
    id_no_or_dob TEXT NOT NULL,
    gender TEXT NOT NULL,
    physical_address TEXT NOT NULL DEFAULT '',
    tish_area TEXT,
    ward_no TEXT NOT NULL DEFAULT '',
    contact_number TEXT NOT NULL DEFAULT '',
    race TEXT,
    disability INTEGER,
    recovering_service_user INTEGER,
    social_grant TEXT,
    cooperative_member INTEGER,
    signature_png BLOB,
    signature_width INTEGER,
    signature_height INTEGER,
    signature_digest TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create an index on `created_at` for period queries.
pub const CREATE_CREATED_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_entries_created ON registry_entries(created_at DESC)
";

/// SQL statement to create an index on `gender` for filtering.
pub const CREATE_GENDER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_entries_gender ON registry_entries(gender)
";

/// SQL statement to create an index on `social_grant` for filtering.
pub const CREATE_GRANT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_entries_grant ON registry_entries(social_grant)
";

/// SQL statement to create an index on `tish_area` for filtering.
pub const CREATE_AREA_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_entries_area ON registry_entries(tish_area)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_ENTRIES_TABLE,
    CREATE_CREATED_INDEX,
    CREATE_GENDER_INDEX,
    CREATE_GRANT_INDEX,
    CREATE_AREA_INDEX,
    CREATE_METADATA_TABLE,
];

/// Column list shared by every `SELECT` that reads a full entry.
pub const ENTRY_COLUMNS: &str = "id, names, surname, id_no_or_dob, gender, physical_address, \
     tish_area, ward_no, contact_number, race, disability, recovering_service_user, \
     social_grant, cooperative_member, signature_png, signature_width, signature_height, \
     signature_digest, created_at, updated_at";
