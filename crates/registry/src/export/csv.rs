//! CSV output for record listings and period reports.

use std::io::Write;

use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use tracing::debug;

use crate::error::Result;
use crate::record::{yes_no, Choice, RegistryRecord};
use crate::stats::{aggregate, ReportPeriod};

use super::{display_bucket, PERIOD_DIMENSIONS};

/// Header of the detail table, in column order.
pub const DETAIL_HEADERS: [&str; 14] = [
    "Names",
    "Surname",
    "ID/DOB",
    "Gender",
    "Disability",
    "Physical Address",
    "Area Type",
    "Ward No",
    "Contact Number",
    "Race",
    "Service User",
    "Social Grant",
    "Cooperative Member",
    "Created Date",
];

fn detail_row(record: &RegistryRecord) -> [String; 14] {
    [
        record.names.clone(),
        record.surname.clone(),
        record.id_no_or_dob.clone(),
        record.gender.label().to_string(),
        yes_no(record.disability).to_string(),
        record.physical_address.clone(),
        record.area_type.map(Choice::label).unwrap_or_default().to_string(),
        record.ward_no.clone(),
        record.contact_number.clone(),
        record.race.map(Choice::label).unwrap_or_default().to_string(),
        yes_no(record.recovering_service_user).to_string(),
        record.social_grant.map(Choice::label).unwrap_or_default().to_string(),
        yes_no(record.cooperative_member).to_string(),
        record.created_at.format("%Y-%m-%d %H:%M").to_string(),
    ]
}

/// Write records as a CSV table with a header row.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_records<W: Write>(out: W, records: &[RegistryRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(DETAIL_HEADERS)?;
    for record in records {
        writer.write_record(detail_row(record))?;
    }
    writer.flush()?;
    debug!("Wrote {} records as CSV", records.len());
    Ok(())
}

/// Write a period report: a summary block followed by the entries.
///
/// `records` should already be limited to the period; the summary counts
/// whatever it is given.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_period_report<W: Write>(
    out: W,
    period: ReportPeriod,
    now: DateTime<Utc>,
    records: &[RegistryRecord],
) -> Result<()> {
    let mut writer = WriterBuilder::new().flexible(true).from_writer(out);
    let report = aggregate(records, &PERIOD_DIMENSIONS);

    writer.write_record([period.title()])?;
    writer.write_record(["Period".to_string(), period.range_label(now)])?;
    writer.write_record(["Total Entries".to_string(), report.total_count().to_string()])?;
    writer.write_record([""])?;

    for (dimension, counts) in report.iter() {
        writer.write_record([format!("{} Distribution", dimension.title())])?;
        for (label, count) in counts.by_count() {
            writer.write_record([format!("  {}", display_bucket(label)), count.to_string()])?;
        }
    }

    writer.write_record([""])?;
    writer.write_record(["Detailed Entries"])?;
    writer.write_record(DETAIL_HEADERS)?;
    for record in records {
        writer.write_record(detail_row(record))?;
    }
    writer.flush()?;

    debug!(
        "Wrote {} report with {} entries as CSV",
        period,
        records.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AreaType, Gender, SocialGrant};
    use chrono::TimeZone;

    fn read_rows(bytes: &[u8]) -> Vec<Vec<String>> {
        csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(false)
            .from_reader(bytes)
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    fn sample() -> Vec<RegistryRecord> {
        let mut a = RegistryRecord::new("Thabo", "Mbeki", "7001015009081", Gender::Male);
        a.area_type = Some(AreaType::InformalSettlement);
        a.social_grant = Some(SocialGrant::SocialReliefOfDistress);
        a.physical_address = "12 Main Road, Soweto".to_string();
        a.disability = Some(true);
        a.created_at = Utc.with_ymd_and_hms(2024, 6, 9, 14, 5, 0).unwrap();

        let mut b = RegistryRecord::new("Naledi", "Pandor", "1965-12-07", Gender::Female);
        b.cooperative_member = None;
        b.social_grant = None;
        b.created_at = Utc.with_ymd_and_hms(2024, 6, 8, 9, 30, 0).unwrap();

        vec![a, b]
    }

    #[test]
    fn test_write_records() {
        let mut out = Vec::new();
        write_records(&mut out, &sample()).unwrap();

        let rows = read_rows(&out);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], DETAIL_HEADERS.map(str::to_string).to_vec());
        assert_eq!(rows[1][0], "Thabo");
        assert_eq!(rows[1][4], "Yes");
        assert_eq!(rows[1][5], "12 Main Road, Soweto");
        assert_eq!(rows[1][6], "Informal Settlement");
        assert_eq!(rows[1][11], "SRD");
        assert_eq!(rows[1][13], "2024-06-09 14:05");
        assert_eq!(rows[2][6], "");
        assert_eq!(rows[2][11], "");
        assert_eq!(rows[2][12], "No");
    }

    #[test]
    fn test_write_records_empty() {
        let mut out = Vec::new();
        write_records(&mut out, &[]).unwrap();
        assert_eq!(read_rows(&out).len(), 1);
    }

    #[test]
    fn test_write_period_report() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let mut out = Vec::new();
        write_period_report(&mut out, ReportPeriod::Weekly, now, &sample()).unwrap();

        let rows = read_rows(&out);
        assert_eq!(rows[0], vec!["Weekly Registry Report"]);
        assert_eq!(rows[1], vec!["Period", "2024-06-03 to 2024-06-10"]);
        assert_eq!(rows[2], vec!["Total Entries", "2"]);

        let gender = rows
            .iter()
            .position(|r| r[0] == "Gender Distribution")
            .unwrap();
        assert_eq!(rows[gender + 1][1], "1");

        // An unset grant is reported under a readable label.
        assert!(rows.iter().any(|r| r[0] == "  (not set)" && r[1] == "1"));

        let detail = rows.iter().position(|r| r[0] == "Detailed Entries").unwrap();
        assert_eq!(rows[detail + 1][0], "Names");
        assert_eq!(rows.len(), detail + 4);
    }
}
