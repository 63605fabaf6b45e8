//! `regctl` - CLI for the community registry
//!
//! This binary manages registry entries and produces exports, period reports
//! and dashboard counts from the local database.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::fs::{self, File};
use std::io::{self, BufRead, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};
use tracing::{debug, info, warn};

use community_registry::cli::{
    AddCommand, Cli, Command, ConfigCommand, DashboardCommand, DeleteCommand, EditCommand,
    ExportCommand, ListCommand, OutputFormat, ReportCommand, ShowCommand, SignatureCommand,
};
use community_registry::export::{self, ExportFormat, ExportOptions};
use community_registry::record::{yes_no, Choice, RegistryRecord, SignatureUpdate, SocialGrant};
use community_registry::signature::{parse_strokes, render_strokes, RasterOptions, SignatureImage};
use community_registry::stats::{aggregate, parse_dimensions, AggregateReport, Dimension, ReportPeriod};
use community_registry::{init_logging, Config, RecordFilter, Storage};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Validation must work on a file that would fail to load.
    if let Command::Config(ConfigCommand::Validate { file }) = &cli.command {
        let path = file
            .clone()
            .or_else(|| cli.config.clone())
            .unwrap_or_else(Config::default_config_path);
        return handle_config_validate(&path);
    }

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;
    debug!("Using database {}", config.database_path().display());

    match cli.command {
        Command::Add(cmd) => handle_add(&config, &cmd),
        Command::Edit(cmd) => handle_edit(&config, &cmd),
        Command::Delete(cmd) => handle_delete(&config, &cmd),
        Command::Show(cmd) => handle_show(&config, &cmd),
        Command::List(cmd) => handle_list(&config, &cmd),
        Command::Export(cmd) => handle_export(&config, &cmd),
        Command::Report(cmd) => handle_report(&config, &cmd),
        Command::Dashboard(cmd) => handle_dashboard(&config, &cmd),
        Command::Signature(cmd) => handle_signature(&config, cmd),
        Command::Status(cmd) => handle_status(&config, cmd.json),
        Command::Config(cmd) => handle_config(&config, &cmd),
    }
}

fn open_storage(config: &Config) -> Result<Storage> {
    let path = config.database_path();
    Storage::open(&path).with_context(|| format!("cannot open registry at {}", path.display()))
}

/// Read text from a file, or from stdin when the path is `-`.
fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn create_output(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    File::create(path).with_context(|| format!("failed to create {}", path.display()))
}

fn render_signature_file(path: &Path, options: &RasterOptions) -> Result<Option<SignatureImage>> {
    let strokes = parse_strokes(&read_input(path)?);
    let image = render_strokes(&strokes, options)?;
    if image.is_none() {
        warn!(
            "Signature in {} has nothing to draw; no image will be stored",
            path.display()
        );
    }
    Ok(image)
}

fn handle_add(config: &Config, cmd: &AddCommand) -> Result<()> {
    let fields = &cmd.fields;
    let (Some(names), Some(surname), Some(id_no), Some(gender)) = (
        fields.names.clone(),
        fields.surname.clone(),
        fields.id_no_or_dob.clone(),
        fields.gender,
    ) else {
        bail!("add requires --names, --surname, --id-no and --gender");
    };

    let mut record = RegistryRecord::new(names, surname, id_no, gender);
    fields.to_changes().apply_to(&mut record);

    if let Some(path) = &cmd.signature {
        let image = render_signature_file(path, &config.raster_options())?;
        record.apply_signature(SignatureUpdate::Replace(image));
    }

    record.validate(config.contact_regex()?.as_ref())?;

    let storage = open_storage(config)?;
    let id = storage.insert(&record)?;
    info!("Added registry entry {}", id);
    println!("Added entry {id}: {}", record.full_name());
    Ok(())
}

fn handle_edit(config: &Config, cmd: &EditCommand) -> Result<()> {
    let storage = open_storage(config)?;
    let mut record = storage.require(cmd.id)?;

    let changes = cmd.fields.to_changes();
    let update = if cmd.clear_signature {
        SignatureUpdate::Clear
    } else if let Some(path) = &cmd.signature {
        SignatureUpdate::Replace(render_signature_file(path, &config.raster_options())?)
    } else {
        SignatureUpdate::Keep
    };

    if changes.is_empty() && update == SignatureUpdate::Keep {
        bail!("nothing to change for entry {}", cmd.id);
    }

    changes.apply_to(&mut record);
    record.apply_signature(update);
    record.validate(config.contact_regex()?.as_ref())?;

    if !storage.update(&mut record)? {
        bail!("entry {} disappeared while editing", cmd.id);
    }
    println!("Updated entry {}: {}", cmd.id, record.full_name());
    Ok(())
}

fn handle_delete(config: &Config, cmd: &DeleteCommand) -> Result<()> {
    let storage = open_storage(config)?;
    let record = storage.require(cmd.id)?;

    if !cmd.yes {
        print!("Delete entry {} ({})? [y/N] ", cmd.id, record.full_name());
        io::stdout().flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        if !matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    if storage.delete(cmd.id)? {
        println!("Deleted entry {}.", cmd.id);
    }
    Ok(())
}

fn handle_show(config: &Config, cmd: &ShowCommand) -> Result<()> {
    let storage = open_storage(config)?;
    let record = storage.require(cmd.id)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        let label = |choice: Option<&'static str>| choice.unwrap_or("-");
        println!("Entry {}", cmd.id);
        println!("--------");
        println!("Names:            {}", record.names);
        println!("Surname:          {}", record.surname);
        println!("ID No./DoB:       {}", record.id_no_or_dob);
        println!("Gender:           {}", record.gender);
        println!("Address:          {}", record.physical_address);
        println!("Area type:        {}", label(record.area_type.map(Choice::label)));
        println!("Ward:             {}", record.ward_no);
        println!("Contact:          {}", record.contact_number);
        println!("Race:             {}", label(record.race.map(Choice::label)));
        println!("Disability:       {}", yes_no(record.disability));
        println!("Service user:     {}", yes_no(record.recovering_service_user));
        println!("Social grant:     {}", label(record.social_grant.map(SocialGrant::description)));
        println!("Cooperative:      {}", yes_no(record.cooperative_member));
        println!("Signature:        {}", yes_no(Some(record.has_signature())));
        println!("Created:          {}", record.created_at.format("%Y-%m-%d %H:%M"));
        println!("Updated:          {}", record.updated_at.format("%Y-%m-%d %H:%M"));
    }

    if let Some(path) = &cmd.signature_out {
        let Some(signature) = &record.signature else {
            bail!("entry {} has no signature", cmd.id);
        };
        create_output(path)?.write_all(&signature.png)?;
        println!("Wrote signature to {}", path.display());
    }
    Ok(())
}

fn handle_list(config: &Config, cmd: &ListCommand) -> Result<()> {
    let storage = open_storage(config)?;
    let records = storage.query(&cmd.filters.to_filter())?;

    match cmd.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&records)?);
            return Ok(());
        }
        OutputFormat::Plain => {
            for record in &records {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    record.id.unwrap_or_default(),
                    record.full_name(),
                    record.id_no_or_dob,
                    record.gender,
                    record.area_type.map_or("", Choice::label),
                );
            }
        }
        OutputFormat::Table => {
            if records.is_empty() {
                println!("No entries found.");
            } else {
                println!("{}", records_table(&records));
            }
        }
    }

    let summary = aggregate(
        &records,
        &[Dimension::Gender, Dimension::Grant, Dimension::AreaType],
    );
    println!("{}", summary_line(&summary));
    Ok(())
}

fn records_table(records: &[RegistryRecord]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("ID").add_attribute(Attribute::Bold),
        Cell::new("Names").add_attribute(Attribute::Bold),
        Cell::new("Surname").add_attribute(Attribute::Bold),
        Cell::new("ID/DOB"),
        Cell::new("Gender"),
        Cell::new("Area"),
        Cell::new("Ward"),
        Cell::new("Grant"),
        Cell::new("Contact"),
        Cell::new("Signed"),
        Cell::new("Created"),
    ]);

    for record in records {
        table.add_row(vec![
            Cell::new(record.id.unwrap_or_default()).set_alignment(CellAlignment::Right),
            Cell::new(&record.names),
            Cell::new(&record.surname),
            Cell::new(&record.id_no_or_dob),
            Cell::new(record.gender),
            Cell::new(record.area_type.map_or("", Choice::label)),
            Cell::new(&record.ward_no),
            Cell::new(record.social_grant.map_or("", Choice::label)),
            Cell::new(&record.contact_number),
            Cell::new(yes_no(Some(record.has_signature()))),
            Cell::new(record.created_at.format("%Y-%m-%d %H:%M")),
        ]);
    }
    table
}

fn summary_line(report: &AggregateReport) -> String {
    let mut parts = vec![format!("Total: {}", report.total_count())];
    for (dimension, counts) in report.iter() {
        let buckets: Vec<String> = counts
            .by_count()
            .into_iter()
            .map(|(label, count)| format!("{} {count}", export::display_bucket(label)))
            .collect();
        if !buckets.is_empty() {
            parts.push(format!("{}: {}", dimension.title(), buckets.join(", ")));
        }
    }
    parts.join(" | ")
}

fn write_document(
    config: &Config,
    format: ExportFormat,
    path: &Path,
    records: &[RegistryRecord],
    period: Option<ReportPeriod>,
) -> Result<()> {
    let now = Utc::now();
    match format {
        ExportFormat::Csv => {
            let out = BufWriter::new(create_output(path)?);
            match period {
                Some(period) => export::csv::write_period_report(out, period, now, records)?,
                None => export::csv::write_records(out, records)?,
            }
        }
        ExportFormat::Pdf => {
            let options = ExportOptions::from_config(config);
            let bytes = match period {
                Some(period) => export::pdf::render_period_report(period, now, records, &options)?,
                None => export::pdf::render_records(records, &options, now)?,
            };
            create_output(path)?.write_all(&bytes)?;
        }
    }
    info!("Wrote {} entries to {}", records.len(), path.display());
    Ok(())
}

fn handle_export(config: &Config, cmd: &ExportCommand) -> Result<()> {
    let format = ExportFormat::from(cmd.format);
    let storage = open_storage(config)?;
    let records = storage.query(&cmd.filters.to_filter())?;

    let path = export::resolve_output_path(config, cmd.output.as_deref(), format.records_file_name());
    write_document(config, format, &path, &records, None)?;
    println!("Exported {} entries to {}", records.len(), path.display());
    Ok(())
}

fn handle_report(config: &Config, cmd: &ReportCommand) -> Result<()> {
    let period = ReportPeriod::from(cmd.period);
    let format = ExportFormat::from(cmd.format);
    let now = Utc::now();

    let storage = open_storage(config)?;
    let records = storage.query(&cmd.filters.to_period_filter(period, now))?;

    let file_name = format!("{}.{}", period.file_stem(now), format.extension());
    let path = export::resolve_output_path(config, cmd.output.as_deref(), &file_name);
    write_document(config, format, &path, &records, Some(period))?;

    println!(
        "{} ({}): {} entries written to {}",
        period.title(),
        period.range_label(now),
        records.len(),
        path.display()
    );
    Ok(())
}

fn handle_dashboard(config: &Config, cmd: &DashboardCommand) -> Result<()> {
    // Reject bad selectors before touching the database.
    let dimensions = if cmd.dimensions.is_empty() {
        Dimension::ALL.to_vec()
    } else {
        parse_dimensions(&cmd.dimensions)?
    };

    let storage = open_storage(config)?;
    let records = storage.query(&RecordFilter::all())?;
    let report = aggregate(&records, &dimensions);

    if !cmd.table {
        export::dashboard::write_json(io::stdout().lock(), &report)?;
        return Ok(());
    }

    println!("Total participants: {}", report.total_count());
    for (dimension, counts) in report.iter() {
        let mut table = Table::new();
        table
            .load_preset(ASCII_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new(dimension.title()).add_attribute(Attribute::Bold),
            Cell::new("Count"),
        ]);
        for (label, count) in counts.by_count() {
            table.add_row(vec![
                Cell::new(export::display_bucket(label)),
                Cell::new(count).set_alignment(CellAlignment::Right),
            ]);
        }
        println!();
        println!("{table}");
    }
    Ok(())
}

fn handle_signature(config: &Config, cmd: SignatureCommand) -> Result<()> {
    match cmd {
        SignatureCommand::Render {
            input,
            output,
            background,
        } => {
            let mut options = config.raster_options();
            if let Some(background) = background {
                options = options.with_background(background.into());
            }

            let Some(image) = render_signature_file(&input, &options)? else {
                bail!("{} contains no drawable strokes", input.display());
            };
            create_output(&output)?.write_all(&image.png)?;
            println!(
                "Wrote {}x{} signature to {}",
                image.width,
                image.height,
                output.display()
            );
        }
    }
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> Result<()> {
    let storage = open_storage(config)?;
    let stats = storage.stats()?;
    let format_time =
        |t: Option<DateTime<Utc>>| t.map(|t| t.format("%Y-%m-%d %H:%M").to_string());

    if json {
        let status = serde_json::json!({
            "database_path": storage.path(),
            "total_entries": stats.total_entries,
            "signed_entries": stats.signed_entries,
            "oldest_entry": stats.oldest_entry,
            "newest_entry": stats.newest_entry,
            "db_size_bytes": stats.db_size_bytes,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("regctl status");
        println!("-------------");
        println!("Database:      {}", storage.path().display());
        println!("Entries:       {}", stats.total_entries);
        println!("Signed:        {}", stats.signed_entries);
        println!(
            "Oldest entry:  {}",
            format_time(stats.oldest_entry).unwrap_or_else(|| "-".to_string())
        );
        println!(
            "Newest entry:  {}",
            format_time(stats.newest_entry).unwrap_or_else(|| "-".to_string())
        );
        println!("Size:          {} bytes", stats.db_size_bytes);
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: &ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if *json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                let or_unset = |value: Option<String>| value.unwrap_or_else(|| "(not set)".to_string());
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Signature]");
                println!(
                    "  Canvas:             {}x{}",
                    config.signature.canvas_width, config.signature.canvas_height
                );
                println!("  Margin:             {}", config.signature.margin);
                println!("  Background:         {}", config.signature.background);
                println!();
                println!("[Export]");
                println!("  Output directory:   {}", config.output_dir().display());
                println!(
                    "  Organization:       {}",
                    or_unset(config.export.organization_name.clone())
                );
                println!(
                    "  Logo:               {}",
                    or_unset(
                        config
                            .export
                            .logo_path
                            .as_ref()
                            .map(|p| p.display().to_string())
                    )
                );
                println!("  Signatures in PDF:  {}", config.export.include_signatures);
                println!("  Rows per page:      {}", config.export.rows_per_page);
                println!();
                println!("[Validation]");
                println!(
                    "  Contact pattern:    {}",
                    or_unset(config.validation.contact_number_pattern.clone())
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.clone().unwrap_or_else(Config::default_config_path);
            handle_config_validate(&path)?;
        }
    }
    Ok(())
}

fn handle_config_validate(path: &Path) -> Result<()> {
    println!("Validating configuration: {}", path.display());
    if !path.exists() {
        println!("File not found; defaults and environment would be used.");
    }
    match Config::load_from(Some(path.to_path_buf())) {
        Ok(_) => {
            println!("Configuration is valid.");
            Ok(())
        }
        Err(e) => bail!("configuration error: {e}"),
    }
}
