//! Command handlers. Each fetches the source once, ingests, and writes
//! plain-text (or CSV/JSON) output to the given writer.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::Utc;
use salesmap_core::{
    ingest, render_map, summarize, write_csv, FilterQuery, Ingestion, MapView, Record,
    SubmissionForm, KNOWN_CATEGORIES,
};
use salesmap_sheets::RecordSource;

async fn load(source: &dyn RecordSource) -> anyhow::Result<Ingestion> {
    let rows = source.fetch_all().await?;
    Ok(ingest(&rows))
}

fn fmt_sales(sales: Option<f64>) -> String {
    sales.map_or_else(|| "\u{2014}".to_string(), |s| format!("{s:.2}"))
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max - 3).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Print the filtered records as a table.
///
/// # Errors
///
/// Returns an error if the source fetch or the write fails.
pub(crate) async fn run_list<W: Write>(
    source: &dyn RecordSource,
    query: &FilterQuery,
    out: &mut W,
) -> anyhow::Result<()> {
    let ingestion = load(source).await?;
    let records = query.apply(&ingestion.records);

    if records.is_empty() {
        writeln!(out, "no records match the current filters")?;
        return Ok(());
    }

    writeln!(
        out,
        "{:<28}{:<12}{:>12}{:>11}{:>12}  {:<16}TIMESTAMP",
        "NAME", "CATEGORY", "SALES", "LAT", "LNG", "ADDED BY"
    )?;
    for record in &records {
        write_row(out, record)?;
    }
    writeln!(out, "\n{} of {} records", records.len(), ingestion.records.len())?;
    Ok(())
}

fn write_row<W: Write>(out: &mut W, record: &Record) -> std::io::Result<()> {
    let timestamp = record.recorded_at.map_or_else(
        || "\u{2014}".to_string(),
        |ts| ts.format("%Y-%m-%d %H:%M").to_string(),
    );
    writeln!(
        out,
        "{:<28}{:<12}{:>12}{:>11.5}{:>12.5}  {:<16}{}",
        truncate(&record.name, 26),
        truncate(&record.category, 11),
        fmt_sales(record.sales),
        record.latitude,
        record.longitude,
        truncate(&record.added_by, 15),
        timestamp
    )
}

/// Print location count and total sales per category.
///
/// # Errors
///
/// Returns an error if the source fetch or the write fails.
pub(crate) async fn run_summary<W: Write>(
    source: &dyn RecordSource,
    query: &FilterQuery,
    out: &mut W,
) -> anyhow::Result<()> {
    let ingestion = load(source).await?;
    let records = query.apply(&ingestion.records);
    let groups = summarize(&records);

    if groups.is_empty() {
        writeln!(out, "no records match the current filters")?;
        return Ok(());
    }

    writeln!(out, "{:<16}{:>8}{:>16}", "CATEGORY", "COUNT", "TOTAL SALES")?;
    for group in &groups {
        writeln!(
            out,
            "{:<16}{:>8}{:>16.2}",
            group.category, group.count, group.total_sales
        )?;
    }
    let total: f64 = groups.iter().map(|g| g.total_sales).sum();
    writeln!(out, "{:<16}{:>8}{:>16.2}", "TOTAL", records.len(), total)?;
    Ok(())
}

/// Print the rendered map layer and legend as pretty JSON.
///
/// # Errors
///
/// Returns an error if the source fetch, serialization, or write fails.
pub(crate) async fn run_map<W: Write>(
    source: &dyn RecordSource,
    query: &FilterQuery,
    view: MapView,
    out: &mut W,
) -> anyhow::Result<()> {
    let ingestion = load(source).await?;
    let records = query.apply(&ingestion.records);
    let render = render_map(&records, view);
    serde_json::to_writer_pretty(&mut *out, &render)?;
    writeln!(out)?;
    Ok(())
}

/// Write the filtered records as CSV.
///
/// # Errors
///
/// Returns an error if the source fetch or the CSV write fails.
pub(crate) async fn run_export<W: Write>(
    source: &dyn RecordSource,
    query: &FilterQuery,
    out: &mut W,
) -> anyhow::Result<()> {
    let ingestion = load(source).await?;
    let records = query.apply(&ingestion.records);
    write_csv(&records, out)?;
    tracing::info!(records = records.len(), "csv export written");
    Ok(())
}

/// Write the filtered records as CSV to `path`, replacing any existing file.
///
/// The destination is only created once the records are in hand, so a failed
/// fetch leaves an existing file untouched.
///
/// # Errors
///
/// Returns an error if the source fetch, file creation, or write fails.
pub(crate) async fn run_export_to_file(
    source: &dyn RecordSource,
    query: &FilterQuery,
    path: &Path,
) -> anyhow::Result<()> {
    let ingestion = load(source).await?;
    let records = query.apply(&ingestion.records);

    let mut writer = BufWriter::new(File::create(path)?);
    write_csv(&records, &mut writer)?;
    writer.flush()?;
    tracing::info!(records = records.len(), path = %path.display(), "csv export written");
    eprintln!("exported to {}", path.display());
    Ok(())
}

/// Validate `form` and append it to the source.
///
/// # Errors
///
/// Returns an error if validation fails or the source rejects the append.
pub(crate) async fn run_add<W: Write>(
    source: &dyn RecordSource,
    form: &SubmissionForm,
    out: &mut W,
) -> anyhow::Result<()> {
    let record = form.validate()?;
    source.append(&record, Utc::now()).await?;
    writeln!(
        out,
        "added {} ({}) at {}, {}",
        record.name, record.category, record.latitude, record.longitude
    )?;
    Ok(())
}

/// Report what ingestion made of the source.
///
/// # Errors
///
/// Returns an error if the source fetch or the write fails.
pub(crate) async fn run_check<W: Write>(
    source: &dyn RecordSource,
    out: &mut W,
) -> anyhow::Result<()> {
    let rows = source.fetch_all().await?;
    let ingestion = ingest(&rows);

    writeln!(out, "source:       {}", source.describe())?;
    writeln!(out, "data rows:    {}", rows.len().saturating_sub(1))?;
    writeln!(out, "records:      {}", ingestion.records.len())?;
    writeln!(out, "dropped rows: {}", ingestion.dropped_rows.len())?;
    if !ingestion.dropped_rows.is_empty() {
        let listed: Vec<String> = ingestion
            .dropped_rows
            .iter()
            .map(ToString::to_string)
            .collect();
        writeln!(out, "  missing coordinates at data rows {}", listed.join(", "))?;
    }

    let unknown: BTreeSet<&str> = ingestion
        .records
        .iter()
        .map(|r| r.category.as_str())
        .filter(|c| !KNOWN_CATEGORIES.contains(c))
        .collect();
    if !unknown.is_empty() {
        let listed: Vec<&str> = unknown.into_iter().collect();
        writeln!(out, "unlisted categories: {}", listed.join(", "))?;
    }
    Ok(())
}
