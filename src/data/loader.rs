use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};

use super::model::{EvalError, MeasurementTable};

/// Header names resolved once at load time.
pub const INFUSION_COLUMN: &str = "Infusion";
pub const INJECTION_COLUMN: &str = "Injection";

// ---------------------------------------------------------------------------
// Folder discovery
// ---------------------------------------------------------------------------

/// List candidate measurement files in a folder: `.xlsx` or `.csv`, name not
/// containing "result" (any case) and not starting with a dot. Sorted by
/// name; an unreadable folder simply yields nothing.
pub fn discover_files(dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter_map(|e| e.file_name().into_string().ok())
                .filter(|name| is_measurement_file(name))
                .collect()
        })
        .unwrap_or_default();
    files.sort();
    files
}

fn is_measurement_file(name: &str) -> bool {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    matches!(ext.as_str(), "xlsx" | "csv")
        && !name.to_lowercase().contains("result")
        && !name.starts_with('.')
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Parse one measurement file into its channel columns. Dispatch by
/// extension; any parse failure is an `UnreadableFile`, a readable table
/// without an Infusion column an `UnsupportedFile`.
pub fn load_table(path: &Path) -> Result<MeasurementTable, EvalError> {
    let file = file_label(path);
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let columns = match ext.as_str() {
        "xlsx" => read_xlsx_columns(path),
        "csv" => read_csv_columns(path),
        other => Err(anyhow::anyhow!("unsupported file extension: .{other}")),
    }
    .map_err(|e| EvalError::UnreadableFile {
        file: file.clone(),
        reason: format!("{e:#}"),
    })?;

    table_from_columns(columns, file)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Resolve the named channels from the parsed columns. The Infusion column
/// is required; Injection is optional (one-port file).
fn table_from_columns(
    mut columns: Vec<(String, Vec<Option<f64>>)>,
    file: String,
) -> Result<MeasurementTable, EvalError> {
    let infusion = take_column(&mut columns, INFUSION_COLUMN)
        .ok_or(EvalError::UnsupportedFile { file })?;
    let injection = take_column(&mut columns, INJECTION_COLUMN);

    Ok(MeasurementTable { infusion, injection })
}

fn take_column(
    columns: &mut Vec<(String, Vec<Option<f64>>)>,
    name: &str,
) -> Option<Vec<Option<f64>>> {
    let idx = columns.iter().position(|(n, _)| n == name)?;
    Some(columns.swap_remove(idx).1)
}

// ---------------------------------------------------------------------------
// XLSX loader
// ---------------------------------------------------------------------------

/// Read the first worksheet: header row followed by data rows. Cells outside
/// a row's extent and non-numeric cells become `None`.
fn read_xlsx_columns(path: &Path) -> Result<Vec<(String, Vec<Option<f64>>)>> {
    let mut workbook = open_workbook_auto(path).context("opening workbook")?;
    let range = workbook
        .worksheet_range_at(0)
        .context("workbook has no sheets")?
        .context("reading first sheet")?;

    let mut rows = range.rows();
    let header = rows.next().context("sheet is empty")?;
    let names: Vec<String> = header.iter().map(cell_to_name).collect();

    let mut columns: Vec<Vec<Option<f64>>> = vec![Vec::new(); names.len()];
    for row in rows {
        for (i, col) in columns.iter_mut().enumerate() {
            col.push(row.get(i).and_then(cell_to_f64));
        }
    }

    Ok(names.into_iter().zip(columns).collect())
}

fn cell_to_name(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

fn cell_to_f64(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => parse_number_cell(s),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one reading per data row.
/// Short rows and non-numeric cells become `None`.
fn read_csv_columns(path: &Path) -> Result<Vec<(String, Vec<Option<f64>>)>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;

    let names: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if names.is_empty() {
        bail!("CSV has no header row");
    }

    let mut columns: Vec<Vec<Option<f64>>> = vec![Vec::new(); names.len()];
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        for (i, col) in columns.iter_mut().enumerate() {
            col.push(record.get(i).and_then(parse_number_cell));
        }
    }

    Ok(names.into_iter().zip(columns).collect())
}

/// Numeric cell text, tolerating comma decimals from localized exports.
fn parse_number_cell(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    t.replace(',', ".").parse::<f64>().ok()
}
