//! PDF tables of registry entries.
//!
//! Documents are A4 landscape. Every page repeats the header (title,
//! organization, export time, logo) and the column headings, then as many
//! rows as fit. Signature cells show the stored image as a thumbnail.
//! Period reports start with a page of distribution counts.
//!
//! Text is set in the standard Helvetica fonts, so anything outside
//! printable ASCII is replaced before it is written.

use chrono::{DateTime, Utc};
use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref, Str};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::record::{yes_no, Choice, RegistryRecord};
use crate::signature::RasterImage;
use crate::stats::{aggregate, AggregateReport, ReportPeriod};

use super::{display_bucket, ExportOptions, PERIOD_DIMENSIONS};

const PAGE_WIDTH: f32 = 842.0;
const PAGE_HEIGHT: f32 = 595.0;
const MARGIN: f32 = 28.0;
const HEADER_HEIGHT: f32 = 72.0;
const FOOTER_HEIGHT: f32 = 20.0;

const TITLE_SIZE: f32 = 16.0;
const SUBTITLE_SIZE: f32 = 9.0;
const HEADING_SIZE: f32 = 7.5;
const BODY_SIZE: f32 = 7.0;

const HEADING_ROW_HEIGHT: f32 = 16.0;
const TEXT_ROW_HEIGHT: f32 = 14.0;
const SIGNED_ROW_HEIGHT: f32 = 24.0;
const CELL_PADDING: f32 = 2.0;
const LOGO_HEIGHT: f32 = 40.0;
const LOGO_MAX_WIDTH: f32 = 120.0;

/// Average Helvetica glyph width as a fraction of the font size.
const GLYPH_WIDTH: f32 = 0.5;

const REGULAR: Name<'static> = Name(b"F1");
const BOLD: Name<'static> = Name(b"F2");
const LOGO: &str = "Logo";

/// Column headings and relative widths (millimetres at print scale).
const COLUMNS: [(&str, f32); 15] = [
    ("No.", 8.0),
    ("Names", 24.0),
    ("Surname", 24.0),
    ("ID No./DoB", 25.0),
    ("Gender", 14.0),
    ("Disability", 18.0),
    ("Address", 31.0),
    ("TISH Area", 28.0),
    ("Ward", 11.0),
    ("Contact", 24.0),
    ("Race", 14.0),
    ("Recovering", 18.0),
    ("Grant", 22.0),
    ("Cooperative", 18.0),
    ("Sign", 25.0),
];

/// Index of the signature column.
const SIGN_COLUMN: usize = 14;

/// Render records as a paginated table.
///
/// # Errors
///
/// Returns an error if an embedded image is too large to describe.
pub fn render_records(
    records: &[RegistryRecord],
    options: &ExportOptions,
    generated_at: DateTime<Utc>,
) -> Result<Vec<u8>> {
    render("Registry Report", None, records, options, generated_at)
}

/// Render a period report: a summary page followed by the entry table.
///
/// `records` should already be limited to the period.
///
/// # Errors
///
/// Returns an error if an embedded image is too large to describe.
pub fn render_period_report(
    period: ReportPeriod,
    now: DateTime<Utc>,
    records: &[RegistryRecord],
    options: &ExportOptions,
) -> Result<Vec<u8>> {
    let summary = Summary {
        range: period.range_label(now),
        report: aggregate(records, &PERIOD_DIMENSIONS),
    };
    render(&period.title(), Some(&summary), records, options, now)
}

/// An embedded signature and its pixel size.
#[derive(Clone, Copy)]
struct Thumbnail {
    id: Ref,
    size: (f32, f32),
}

struct Summary {
    range: String,
    report: AggregateReport,
}

/// Page-independent settings shared while drawing.
struct Layout<'a> {
    title: &'a str,
    options: &'a ExportOptions,
    generated_at: DateTime<Utc>,
    columns: Vec<(f32, f32)>,
    row_height: f32,
    rows_per_page: usize,
    page_count: usize,
    has_logo: bool,
}

fn render(
    title: &str,
    summary: Option<&Summary>,
    records: &[RegistryRecord],
    options: &ExportOptions,
    generated_at: DateTime<Utc>,
) -> Result<Vec<u8>> {
    let mut doc = Document::new();

    let logo = match &options.logo {
        Some(image) => Some(doc.add_image(image)?),
        None => None,
    };

    let mut thumbnails: Vec<Option<Thumbnail>> = Vec::with_capacity(records.len());
    for record in records {
        thumbnails.push(signature_thumbnail(&mut doc, record, options)?);
    }

    let row_height = if options.include_signatures {
        SIGNED_ROW_HEIGHT
    } else {
        TEXT_ROW_HEIGHT
    };
    let rows_per_page = options.rows_per_page.clamp(1, max_rows(row_height));
    let table_pages = records.len().div_ceil(rows_per_page).max(1);

    let layout = Layout {
        title,
        options,
        generated_at,
        columns: column_positions(),
        row_height,
        rows_per_page,
        page_count: table_pages + usize::from(summary.is_some()),
        has_logo: logo.is_some(),
    };

    let mut page_number = 0;
    if let Some(summary) = summary {
        page_number += 1;
        let mut content = Content::new();
        draw_header(&mut content, &layout, page_number);
        draw_summary(&mut content, summary);
        doc.add_page(content, &named_images(logo, &[]));
    }

    let mut start = 0;
    for _ in 0..table_pages {
        page_number += 1;
        let end = (start + rows_per_page).min(records.len());

        let mut content = Content::new();
        draw_header(&mut content, &layout, page_number);
        let images = draw_table(&mut content, &layout, &records[start..end], &thumbnails[start..end], start);
        doc.add_page(content, &named_images(logo, &images));

        start = end;
    }

    debug!(
        "Rendered PDF '{}' with {} entries on {} page(s)",
        title,
        records.len(),
        layout.page_count
    );
    Ok(doc.finish())
}

fn signature_thumbnail(
    doc: &mut Document,
    record: &RegistryRecord,
    options: &ExportOptions,
) -> Result<Option<Thumbnail>> {
    if !options.include_signatures {
        return Ok(None);
    }
    let Some(signature) = record.signature.as_ref().filter(|s| !s.png.is_empty()) else {
        return Ok(None);
    };
    match signature.decode() {
        Ok(image) => {
            let id = doc.add_image(&image)?;
            Ok(Some(Thumbnail {
                id,
                size: pixel_size(&image),
            }))
        }
        Err(e) => {
            warn!(
                "Skipping unreadable signature for entry {}: {}",
                record.id.unwrap_or_default(),
                e
            );
            Ok(None)
        }
    }
}

fn named_images(logo: Option<Ref>, thumbnails: &[(String, Ref)]) -> Vec<(String, Ref)> {
    let mut images: Vec<(String, Ref)> = logo.map(|id| (LOGO.to_string(), id)).into_iter().collect();
    images.extend_from_slice(thumbnails);
    images
}

/// Most table rows that fit below the header at the given row height.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn max_rows(row_height: f32) -> usize {
    let available = PAGE_HEIGHT - 2.0 * MARGIN - HEADER_HEIGHT - FOOTER_HEIGHT - HEADING_ROW_HEIGHT;
    ((available / row_height).floor() as usize).max(1)
}

/// Left edge and width of every column, scaled to the printable width.
fn column_positions() -> Vec<(f32, f32)> {
    let total: f32 = COLUMNS.iter().map(|(_, w)| w).sum();
    let scale = (PAGE_WIDTH - 2.0 * MARGIN) / total;

    let mut x = MARGIN;
    COLUMNS
        .iter()
        .map(|(_, w)| {
            let width = w * scale;
            let column = (x, width);
            x += width;
            column
        })
        .collect()
}

fn draw_header(content: &mut Content, layout: &Layout<'_>, page_number: usize) {
    let top = PAGE_HEIGHT - MARGIN;
    let mut y = top - TITLE_SIZE;
    draw_text(content, BOLD, TITLE_SIZE, MARGIN, y, layout.title);

    if let Some(name) = &layout.options.organization_name {
        y -= SUBTITLE_SIZE + 6.0;
        draw_text(content, BOLD, SUBTITLE_SIZE + 1.0, MARGIN, y, name);
    }

    y -= SUBTITLE_SIZE + 5.0;
    let exported = format!(
        "Exported: {}",
        layout.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    draw_text(content, REGULAR, SUBTITLE_SIZE, MARGIN, y, &exported);

    if layout.has_logo {
        if let Some(logo) = &layout.options.logo {
            let (w, h) = fit_box(pixel_size(logo), LOGO_MAX_WIDTH, LOGO_HEIGHT);
            draw_image(content, LOGO, PAGE_WIDTH - MARGIN - w, top - h, w, h);
        }
    }

    let footer = format!("Page {page_number} of {}", layout.page_count);
    draw_text(
        content,
        REGULAR,
        BODY_SIZE,
        PAGE_WIDTH - MARGIN - text_width(&footer, BODY_SIZE),
        MARGIN,
        &footer,
    );
}

/// Draw one page of the table, returning the images it references.
fn draw_table(
    content: &mut Content,
    layout: &Layout<'_>,
    records: &[RegistryRecord],
    thumbnails: &[Option<Thumbnail>],
    offset: usize,
) -> Vec<(String, Ref)> {
    let left = MARGIN;
    let right = PAGE_WIDTH - MARGIN;
    let top = PAGE_HEIGHT - MARGIN - HEADER_HEIGHT;

    // Heading band.
    content.set_fill_gray(0.85);
    content.rect(left, top - HEADING_ROW_HEIGHT, right - left, HEADING_ROW_HEIGHT);
    content.fill_nonzero();
    content.set_fill_gray(0.0);

    for ((heading, _), &(x, width)) in COLUMNS.iter().zip(&layout.columns) {
        let label = fit_text(heading, width, HEADING_SIZE);
        let centered = x + (width - text_width(&label, HEADING_SIZE)) / 2.0;
        draw_text(
            content,
            BOLD,
            HEADING_SIZE,
            centered,
            baseline(top, HEADING_ROW_HEIGHT, HEADING_SIZE),
            &label,
        );
    }

    let mut images = Vec::new();
    let mut row_top = top - HEADING_ROW_HEIGHT;

    if records.is_empty() {
        draw_text(
            content,
            REGULAR,
            BODY_SIZE,
            left + CELL_PADDING,
            baseline(row_top, layout.row_height, BODY_SIZE),
            "No entries",
        );
        row_top -= layout.row_height;
    }

    for (i, (record, thumbnail)) in records.iter().zip(thumbnails).enumerate() {
        let cells = table_cells(record, offset + i + 1);
        let text_y = baseline(row_top, layout.row_height, BODY_SIZE);

        for (column, (cell, &(x, width))) in cells.iter().zip(&layout.columns).enumerate() {
            if column == SIGN_COLUMN {
                if let Some(thumbnail) = thumbnail {
                    let name = format!("Sig{}", offset + i);
                    let (w, h) = fit_box(
                        thumbnail.size,
                        width - 2.0 * CELL_PADDING,
                        layout.row_height - 2.0 * CELL_PADDING,
                    );
                    draw_image(
                        content,
                        &name,
                        x + (width - w) / 2.0,
                        row_top - layout.row_height + (layout.row_height - h) / 2.0,
                        w,
                        h,
                    );
                    images.push((name, thumbnail.id));
                    continue;
                }
            }
            let text = fit_text(cell, width, BODY_SIZE);
            let centered = matches!(column, 0 | 5 | 11 | 13);
            let text_x = if centered {
                x + (width - text_width(&text, BODY_SIZE)) / 2.0
            } else {
                x + CELL_PADDING
            };
            draw_text(content, REGULAR, BODY_SIZE, text_x, text_y, &text);
        }
        row_top -= layout.row_height;
    }

    // Grid.
    content.set_line_width(0.5);
    let mut y = top;
    content.move_to(left, y);
    content.line_to(right, y);
    y -= HEADING_ROW_HEIGHT;
    for _ in 0..=records.len().max(1) {
        content.move_to(left, y);
        content.line_to(right, y);
        y -= layout.row_height;
    }
    for &(x, _) in &layout.columns {
        content.move_to(x, top);
        content.line_to(x, row_top);
    }
    content.move_to(right, top);
    content.line_to(right, row_top);
    content.stroke();

    images
}

fn table_cells(record: &RegistryRecord, number: usize) -> [String; 15] {
    let signature = if record.has_signature() { "Yes" } else { "" };
    [
        number.to_string(),
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
        signature.to_string(),
    ]
}

#[allow(clippy::cast_precision_loss)]
fn draw_summary(content: &mut Content, summary: &Summary) {
    let top = PAGE_HEIGHT - MARGIN - HEADER_HEIGHT;
    let bottom = MARGIN + FOOTER_HEIGHT;
    let line = SUBTITLE_SIZE + 4.0;

    let mut y = top;
    draw_text(content, BOLD, SUBTITLE_SIZE + 1.0, MARGIN, y, &format!("Period: {}", summary.range));
    y -= line;
    let total = format!("Total Entries: {}", summary.report.total_count());
    draw_text(content, BOLD, SUBTITLE_SIZE + 1.0, MARGIN, y, &total);

    let column_top = y - 2.0 * line;
    let column_width = (PAGE_WIDTH - 2.0 * MARGIN) / 3.0;
    let mut x = MARGIN;
    y = column_top;

    for (dimension, counts) in summary.report.iter() {
        let needed = line * (counts.len() as f32 + 2.0);
        if y - needed < bottom && y < column_top {
            x += column_width;
            y = column_top;
        }

        draw_text(
            content,
            BOLD,
            SUBTITLE_SIZE,
            x,
            y,
            &format!("{} Distribution", dimension.title()),
        );
        y -= line;
        for (label, count) in counts.by_count() {
            let text = format!("{}: {}", display_bucket(label), count);
            draw_text(content, REGULAR, SUBTITLE_SIZE, x + 10.0, y, &text);
            y -= line;
        }
        y -= line;
    }
}

fn baseline(row_top: f32, row_height: f32, size: f32) -> f32 {
    row_top - row_height / 2.0 - size / 3.0
}

fn draw_text(content: &mut Content, font: Name<'_>, size: f32, x: f32, y: f32, text: &str) {
    let safe = sanitize(text);
    content.begin_text();
    content.set_font(font, size);
    content.next_line(x, y);
    content.show(Str(safe.as_bytes()));
    content.end_text();
}

fn draw_image(content: &mut Content, name: &str, x: f32, y: f32, width: f32, height: f32) {
    content.save_state();
    content.transform([width, 0.0, 0.0, height, x, y]);
    content.x_object(Name(name.as_bytes()));
    content.restore_state();
}

#[allow(clippy::cast_precision_loss)]
fn pixel_size(image: &RasterImage) -> (f32, f32) {
    (image.width() as f32, image.height() as f32)
}

/// Largest size with the aspect ratio of `size` that fits the box.
fn fit_box(size: (f32, f32), max_width: f32, max_height: f32) -> (f32, f32) {
    let (w, h) = size;
    if w <= 0.0 || h <= 0.0 {
        return (0.0, 0.0);
    }
    let scale = (max_width / w).min(max_height / h);
    (w * scale, h * scale)
}

/// Replace characters the standard fonts cannot show.
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c,
            '\t' | '\n' | '\r' => ' ',
            _ => '?',
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * GLYPH_WIDTH
}

/// Shorten text to fit a cell, marking the cut with "..".
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn fit_text(text: &str, width: f32, size: f32) -> String {
    let text = sanitize(text.trim());
    let room = ((width - 2.0 * CELL_PADDING) / (size * GLYPH_WIDTH)).floor().max(0.0) as usize;
    if text.chars().count() <= room {
        return text;
    }
    let keep = room.saturating_sub(2);
    let mut short: String = text.chars().take(keep).collect();
    short.push_str("..");
    short
}

/// Object allocation and page bookkeeping for one PDF file.
struct Document {
    pdf: Pdf,
    next_id: i32,
    catalog_id: Ref,
    tree_id: Ref,
    regular_id: Ref,
    bold_id: Ref,
    pages: Vec<Ref>,
}

impl Document {
    fn new() -> Self {
        let mut pdf = Pdf::new();
        let catalog_id = Ref::new(1);
        let tree_id = Ref::new(2);
        let regular_id = Ref::new(3);
        let bold_id = Ref::new(4);

        pdf.type1_font(regular_id).base_font(Name(b"Helvetica"));
        pdf.type1_font(bold_id).base_font(Name(b"Helvetica-Bold"));

        Self {
            pdf,
            next_id: 5,
            catalog_id,
            tree_id,
            regular_id,
            bold_id,
            pages: Vec::new(),
        }
    }

    fn alloc(&mut self) -> Ref {
        let id = Ref::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Embed an RGBA image as an RGB image with a soft mask.
    fn add_image(&mut self, image: &RasterImage) -> Result<Ref> {
        let width = i32::try_from(image.width())
            .map_err(|_| Error::pdf(format!("image width {} is too large", image.width())))?;
        let height = i32::try_from(image.height())
            .map_err(|_| Error::pdf(format!("image height {} is too large", image.height())))?;

        let (rgb, alpha) = image.rgb_and_alpha();
        let image_id = self.alloc();
        let mask_id = self.alloc();

        let mut xobject = self.pdf.image_xobject(image_id, &rgb);
        xobject.width(width);
        xobject.height(height);
        xobject.color_space().device_rgb();
        xobject.bits_per_component(8);
        xobject.s_mask(mask_id);
        xobject.finish();

        let mut mask = self.pdf.image_xobject(mask_id, &alpha);
        mask.width(width);
        mask.height(height);
        mask.color_space().device_gray();
        mask.bits_per_component(8);
        mask.finish();

        Ok(image_id)
    }

    fn add_page(&mut self, content: Content, images: &[(String, Ref)]) {
        let page_id = self.alloc();
        let content_id = self.alloc();

        let mut page = self.pdf.page(page_id);
        page.media_box(Rect::new(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT));
        page.parent(self.tree_id);
        page.contents(content_id);

        let mut resources = page.resources();
        resources
            .fonts()
            .pair(REGULAR, self.regular_id)
            .pair(BOLD, self.bold_id);
        if !images.is_empty() {
            let mut xobjects = resources.x_objects();
            for (name, id) in images {
                xobjects.pair(Name(name.as_bytes()), *id);
            }
            xobjects.finish();
        }
        resources.finish();
        page.finish();

        self.pdf.stream(content_id, &content.finish());
        self.pages.push(page_id);
    }

    fn finish(mut self) -> Vec<u8> {
        self.pdf.catalog(self.catalog_id).pages(self.tree_id);
        let count = i32::try_from(self.pages.len()).unwrap_or(i32::MAX);
        self.pdf
            .pages(self.tree_id)
            .kids(self.pages.iter().copied())
            .count(count);
        self.pdf.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AreaType, Gender};
    use crate::signature::{render_signature, RasterOptions};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    fn record(names: &str) -> RegistryRecord {
        let mut record = RegistryRecord::new(names, "Dube", "8101015009087", Gender::Female);
        record.area_type = Some(AreaType::Hostel);
        record.created_at = now();
        record
    }

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    fn page_count(pdf: &[u8]) -> usize {
        count(pdf, b"/Type /Page") - count(pdf, b"/Type /Pages")
    }

    #[test]
    fn test_render_records_basic() {
        let records = vec![record("Zodwa"), record("Palesa")];
        let pdf = render_records(&records, &ExportOptions::default(), now()).unwrap();

        assert!(pdf.starts_with(b"%PDF-"));
        assert_eq!(page_count(&pdf), 1);
        assert!(count(&pdf, b"(Zodwa)") == 1);
        assert!(count(&pdf, b"(Registry Report)") == 1);
        assert!(count(&pdf, b"(TISH Area)") == 1);
        assert!(count(&pdf, b"(Exported: 2024-06-10 12:00 UTC)") == 1);
    }

    #[test]
    fn test_render_empty_has_one_page() {
        let pdf = render_records(&[], &ExportOptions::default(), now()).unwrap();
        assert_eq!(page_count(&pdf), 1);
        assert_eq!(count(&pdf, b"(No entries)"), 1);
    }

    #[test]
    fn test_paginates() {
        let records: Vec<_> = (0..7).map(|i| record(&format!("Person{i}"))).collect();
        let options = ExportOptions {
            rows_per_page: 3,
            ..ExportOptions::default()
        };
        let pdf = render_records(&records, &options, now()).unwrap();
        assert_eq!(page_count(&pdf), 3);
        assert_eq!(count(&pdf, b"(Page 3 of 3)"), 1);
    }

    #[test]
    fn test_rows_per_page_capped_to_fit() {
        let records: Vec<_> = (0..40).map(|i| record(&format!("P{i}"))).collect();
        let options = ExportOptions {
            rows_per_page: 1000,
            ..ExportOptions::default()
        };
        let pdf = render_records(&records, &options, now()).unwrap();
        assert!(page_count(&pdf) > 1);
    }

    #[test]
    fn test_signatures_embedded() {
        let mut signed = record("Signed");
        signed.signature = render_signature(
            r#"[[{"x":0,"y":0},{"x":30,"y":10}]]"#,
            &RasterOptions::default(),
        )
        .unwrap();
        let records = vec![signed, record("Unsigned")];

        let pdf = render_records(&records, &ExportOptions::default(), now()).unwrap();
        // Image plus its soft mask.
        assert_eq!(count(&pdf, b"/Subtype /Image"), 2);
        assert_eq!(count(&pdf, b"/Sig0 Do"), 1);

        let without = ExportOptions {
            include_signatures: false,
            ..ExportOptions::default()
        };
        let pdf = render_records(&records, &without, now()).unwrap();
        assert_eq!(count(&pdf, b"/Subtype /Image"), 0);
        assert_eq!(count(&pdf, b"(Yes)"), 1);
    }

    #[test]
    fn test_logo_and_organization() {
        let options = ExportOptions {
            organization_name: Some("Ward 12 Forum".to_string()),
            logo: Some(RasterImage::new(20, 10, [0, 128, 0, 255])),
            ..ExportOptions::default()
        };
        let records: Vec<_> = (0..4).map(|i| record(&format!("P{i}"))).collect();
        let options = ExportOptions {
            rows_per_page: 2,
            ..options
        };
        let pdf = render_records(&records, &options, now()).unwrap();

        assert_eq!(count(&pdf, b"(Ward 12 Forum)"), 2);
        // Embedded once, drawn on each page.
        assert_eq!(count(&pdf, b"/Subtype /Image"), 2);
        assert_eq!(count(&pdf, b"/Logo Do"), 2);
    }

    #[test]
    fn test_period_report_has_summary_page() {
        let records = vec![record("A"), record("B")];
        let pdf =
            render_period_report(ReportPeriod::Monthly, now(), &records, &ExportOptions::default())
                .unwrap();

        assert_eq!(page_count(&pdf), 2);
        assert_eq!(count(&pdf, b"(Monthly Registry Report)"), 2);
        assert_eq!(count(&pdf, b"(Period: 2024-05-11 to 2024-06-10)"), 1);
        assert_eq!(count(&pdf, b"(Total Entries: 2)"), 1);
        assert_eq!(count(&pdf, b"(Gender Distribution)"), 1);
        assert_eq!(count(&pdf, b"(Female: 2)"), 1);
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("Zo\u{eb} Ndlovu"), "Zo? Ndlovu");
        assert_eq!(sanitize("a\tb"), "a b");
    }

    #[test]
    fn test_fit_text() {
        assert_eq!(fit_text("Short", 100.0, 7.0), "Short");
        let long = fit_text("A very long physical address that will not fit", 40.0, 7.0);
        assert!(long.ends_with(".."));
        assert!(text_width(&long, 7.0) <= 40.0);
    }

    #[test]
    fn test_fit_box_keeps_aspect() {
        let (w, h) = fit_box((400.0, 150.0), 50.0, 20.0);
        assert!((w / h - 400.0 / 150.0).abs() < 1e-3);
        assert!(w <= 50.0 && h <= 20.0);
        assert_eq!(fit_box((0.0, 10.0), 5.0, 5.0), (0.0, 0.0));
    }

    #[test]
    fn test_columns_span_printable_width() {
        let columns = column_positions();
        assert_eq!(columns.len(), COLUMNS.len());
        let (last_x, last_w) = columns[columns.len() - 1];
        assert!((last_x + last_w - (PAGE_WIDTH - MARGIN)).abs() < 0.01);
    }
}
