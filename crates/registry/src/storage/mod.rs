//! Storage layer for the registry.
//!
//! This module provides `SQLite`-based persistent storage for registry
//! entries: create, read, update and delete, plus filtered queries and
//! time-window lookups used by reports.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::record::{parse_choice, AreaType, Choice, Gender, Race, RegistryRecord, SocialGrant};
use crate::signature::SignatureImage;

use schema::ENTRY_COLUMNS;

/// Storage engine for registry entries.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

/// Criteria for selecting entries. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Case-insensitive substring of names, surname, ID/DOB or contact number.
    pub search: Option<String>,
    /// Exact gender.
    pub gender: Option<Gender>,
    /// Exact social grant.
    pub social_grant: Option<SocialGrant>,
    /// Exact area type.
    pub area_type: Option<AreaType>,
    /// Exact population group.
    pub race: Option<Race>,
    /// Exact ward number.
    pub ward_no: Option<String>,
    /// Disability flag; `Some(false)` also matches unanswered.
    pub disability: Option<bool>,
    /// Recovering-service-user flag; `Some(false)` also matches unanswered.
    pub recovering_service_user: Option<bool>,
    /// Cooperative-member flag; `Some(false)` also matches unanswered.
    pub cooperative_member: Option<bool>,
    /// Created at or after this time.
    pub created_since: Option<DateTime<Utc>>,
    /// Created at or before this time.
    pub created_until: Option<DateTime<Utc>>,
    /// Maximum number of entries returned.
    pub limit: Option<usize>,
}

impl RecordFilter {
    /// A filter that matches every entry.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether no criteria are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn to_sql(&self) -> (String, Vec<Value>) {
        let mut clauses: Vec<String> = Vec::new();
        let mut args: Vec<Value> = Vec::new();

        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(search));
            clauses.push(
                r"(names LIKE ? ESCAPE '\' OR surname LIKE ? ESCAPE '\' OR id_no_or_dob LIKE ? ESCAPE '\' OR contact_number LIKE ? ESCAPE '\')"
                    .to_string(),
            );
            for _ in 0..4 {
                args.push(Value::Text(pattern.clone()));
            }
        }
        if let Some(gender) = self.gender {
            clauses.push("gender = ?".to_string());
            args.push(Value::Text(gender.label().to_string()));
        }
        if let Some(grant) = self.social_grant {
            clauses.push("social_grant = ?".to_string());
            args.push(Value::Text(grant.label().to_string()));
        }
        if let Some(area) = self.area_type {
            clauses.push("tish_area = ?".to_string());
            args.push(Value::Text(area.label().to_string()));
        }
        if let Some(race) = self.race {
            clauses.push("race = ?".to_string());
            args.push(Value::Text(race.label().to_string()));
        }
        if let Some(ward) = &self.ward_no {
            clauses.push("TRIM(ward_no) = ?".to_string());
            args.push(Value::Text(ward.trim().to_string()));
        }
        for (column, flag) in [
            ("disability", self.disability),
            ("recovering_service_user", self.recovering_service_user),
            ("cooperative_member", self.cooperative_member),
        ] {
            match flag {
                Some(true) => clauses.push(format!("{column} = 1")),
                Some(false) => clauses.push(format!("COALESCE({column}, 0) = 0")),
                None => {}
            }
        }
        if let Some(since) = self.created_since {
            clauses.push("created_at >= ?".to_string());
            args.push(Value::Text(encode_time(since)));
        }
        if let Some(until) = self.created_until {
            clauses.push("created_at <= ?".to_string());
            args.push(Value::Text(encode_time(until)));
        }

        let mut sql = format!("SELECT {ENTRY_COLUMNS} FROM registry_entries");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            args.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        }
        (sql, args)
    }
}

fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Timestamps are stored in a fixed-width UTC form so that text comparison
/// orders them correctly.
fn encode_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_time(column: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            warn!("Unreadable timestamp '{}' in column {}", text, column);
            rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e))
        })
}

fn decode_choice<T: Choice>(value: Option<String>) -> Option<T> {
    let value = value?;
    if value.trim().is_empty() {
        return None;
    }
    match parse_choice(&value) {
        Ok(choice) => Some(choice),
        Err(_) => {
            warn!("Unknown {} value '{}' in database, treating as unset", T::FIELD, value);
            None
        }
    }
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a new entry and return its assigned ID.
    ///
    /// Any `id` already on the record is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert(&self, record: &RegistryRecord) -> Result<i64> {
        let signature = record.signature.as_ref();
        self.conn.execute(
            r"
            INSERT INTO registry_entries (
                names, surname, id_no_or_dob, gender, physical_address, tish_area,
                ward_no, contact_number, race, disability, recovering_service_user,
                social_grant, cooperative_member, signature_png, signature_width,
                signature_height, signature_digest, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
            ",
            params![
                record.names,
                record.surname,
                record.id_no_or_dob,
                record.gender.label(),
                record.physical_address,
                record.area_type.map(Choice::label),
                record.ward_no,
                record.contact_number,
                record.race.map(Choice::label),
                record.disability,
                record.recovering_service_user,
                record.social_grant.map(Choice::label),
                record.cooperative_member,
                signature.map(|s| s.png.as_slice()),
                signature.map(|s| s.width),
                signature.map(|s| s.height),
                signature.map(|s| s.stroke_digest.as_str()),
                encode_time(record.created_at),
                encode_time(record.updated_at),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted registry entry with id {}", id);
        Ok(id)
    }

    /// Overwrite an existing entry, refreshing its `updated_at`.
    ///
    /// Returns `false` if no entry has the record's ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the record has no ID or the database operation fails.
    pub fn update(&self, record: &mut RegistryRecord) -> Result<bool> {
        let id = record
            .id
            .ok_or_else(|| Error::validation("id", "cannot update an entry that was never saved"))?;
        record.updated_at = Utc::now();

        let signature = record.signature.as_ref();
        let affected = self.conn.execute(
            r"
            UPDATE registry_entries SET
                names = ?1, surname = ?2, id_no_or_dob = ?3, gender = ?4,
                physical_address = ?5, tish_area = ?6, ward_no = ?7, contact_number = ?8,
                race = ?9, disability = ?10, recovering_service_user = ?11,
                social_grant = ?12, cooperative_member = ?13, signature_png = ?14,
                signature_width = ?15, signature_height = ?16, signature_digest = ?17,
                updated_at = ?18
            WHERE id = ?19
            ",
            params![
                record.names,
                record.surname,
                record.id_no_or_dob,
                record.gender.label(),
                record.physical_address,
                record.area_type.map(Choice::label),
                record.ward_no,
                record.contact_number,
                record.race.map(Choice::label),
                record.disability,
                record.recovering_service_user,
                record.social_grant.map(Choice::label),
                record.cooperative_member,
                signature.map(|s| s.png.as_slice()),
                signature.map(|s| s.width),
                signature.map(|s| s.height),
                signature.map(|s| s.stroke_digest.as_str()),
                encode_time(record.updated_at),
                id,
            ],
        )?;

        debug!("Updated registry entry {} ({} row(s))", id, affected);
        Ok(affected > 0)
    }

    /// Get an entry by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, id: i64) -> Result<Option<RegistryRecord>> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM registry_entries WHERE id = ?1");
        let result = self
            .conn
            .query_row(&sql, [id], Self::row_to_record)
            .optional()?;
        Ok(result)
    }

    /// Get an entry by its ID, failing if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordNotFound`] if there is no such entry.
    pub fn require(&self, id: i64) -> Result<RegistryRecord> {
        self.get(id)?.ok_or(Error::RecordNotFound { id })
    }

    /// Delete an entry by ID.
    ///
    /// Returns `true` if an entry was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM registry_entries WHERE id = ?1", [id])?;
        if affected > 0 {
            info!("Deleted registry entry {}", id);
        }
        Ok(affected > 0)
    }

    /// Entries matching a filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn query(&self, filter: &RecordFilter) -> Result<Vec<RegistryRecord>> {
        let (sql, args) = filter.to_sql();
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(args.iter()), Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        debug!("Query matched {} entries", records.len());
        Ok(records)
    }

    /// Entries created inside `[since, until]`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn created_between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<RegistryRecord>> {
        self.query(&RecordFilter {
            created_since: Some(since),
            created_until: Some(until),
            ..RecordFilter::default()
        })
    }

    /// Count total entries in storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM registry_entries", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let total_entries = self.count()?;

        let signed_entries: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM registry_entries WHERE signature_png IS NOT NULL",
            [],
            |row| row.get(0),
        )?;

        let oldest: Option<String> = self
            .conn
            .query_row(
                "SELECT created_at FROM registry_entries ORDER BY created_at ASC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let newest: Option<String> = self
            .conn
            .query_row(
                "SELECT created_at FROM registry_entries ORDER BY created_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_entries,
            signed_entries,
            oldest_entry: oldest.as_deref().map(|t| decode_time(0, t)).transpose()?,
            newest_entry: newest.as_deref().map(|t| decode_time(0, t)).transpose()?,
            db_size_bytes,
        })
    }

    /// Convert a database row to a record.
    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<RegistryRecord> {
        let gender_str: String = row.get(4)?;
        let gender = parse_choice(&gender_str).unwrap_or_else(|_| {
            warn!("Unknown gender '{}', defaulting to Other", gender_str);
            Gender::Other
        });

        let png: Option<Vec<u8>> = row.get(14)?;
        let signature = match png {
            Some(png) if !png.is_empty() => Some(SignatureImage {
                png,
                width: row.get::<_, Option<u32>>(15)?.unwrap_or(0),
                height: row.get::<_, Option<u32>>(16)?.unwrap_or(0),
                stroke_digest: row.get::<_, Option<String>>(17)?.unwrap_or_default(),
            }),
            _ => None,
        };

        let created_at: String = row.get(18)?;
        let updated_at: String = row.get(19)?;

        Ok(RegistryRecord {
            id: Some(row.get(0)?),
            names: row.get(1)?,
            surname: row.get(2)?,
            id_no_or_dob: row.get(3)?,
            gender,
            physical_address: row.get(5)?,
            area_type: decode_choice(row.get(6)?),
            ward_no: row.get(7)?,
            contact_number: row.get(8)?,
            race: decode_choice(row.get(9)?),
            disability: row.get(10)?,
            recovering_service_user: row.get(11)?,
            social_grant: decode_choice(row.get(12)?),
            cooperative_member: row.get(13)?,
            signature,
            created_at: decode_time(18, &created_at)?,
            updated_at: decode_time(19, &updated_at)?,
        })
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Total number of entries stored.
    pub total_entries: i64,
    /// Entries with a signature image.
    pub signed_entries: i64,
    /// Creation time of the oldest entry.
    pub oldest_entry: Option<DateTime<Utc>>,
    /// Creation time of the newest entry.
    pub newest_entry: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
