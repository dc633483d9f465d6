//! CSV and XLSX export of zone readings.
//!
//! Both encodings are produced from the same [`ExportRow`] cells, so a
//! spreadsheet and a CSV download of the same query hold identical values.

use std::fmt;
use std::str::FromStr;

use rust_xlsxwriter::{Format, Workbook};
use tracing::{debug, info};

use envlog_types::Reading;

use crate::error::{ExportError, Result};
use crate::filter::{raw_date, raw_hour};

/// Column headers, in output order.
pub const EXPORT_COLUMNS: [&str; 6] = ["date", "hour", "temperature", "humidity", "timestamp", "zone"];

/// Column width hints for the XLSX sheet, matching [`EXPORT_COLUMNS`].
const COLUMN_WIDTHS: [f64; 6] = [12.0, 8.0, 13.0, 11.0, 28.0, 8.0];

const SHEET_NAME: &str = "readings";

/// Supported export encodings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
}

impl ExportFormat {
    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    /// MIME type for HTTP responses.
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" => Ok(ExportFormat::Xlsx),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A single exported value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    fn number(value: Option<f64>) -> Self {
        value.map_or(Cell::Empty, Cell::Number)
    }

    /// The CSV field text.
    pub fn to_field(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
            Cell::Empty => String::new(),
        }
    }
}

/// One exported reading.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub date: String,
    pub hour: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub timestamp: String,
    pub zone: String,
}

impl ExportRow {
    /// Project a reading. Dates and hours are sliced from the raw timestamp
    /// even when it does not parse.
    pub fn from_reading(reading: &Reading) -> Self {
        let raw = reading.effective_timestamp().unwrap_or_default();
        Self {
            date: raw_date(raw).to_string(),
            hour: raw_hour(raw).to_string(),
            temperature: reading.temperature_value(),
            humidity: reading.humidity_value(),
            timestamp: raw.to_string(),
            zone: reading.zone().to_string(),
        }
    }

    /// Cells in [`EXPORT_COLUMNS`] order.
    pub fn cells(&self) -> [Cell; 6] {
        [
            Cell::Text(self.date.clone()),
            Cell::Text(self.hour.clone()),
            Cell::number(self.temperature),
            Cell::number(self.humidity),
            Cell::Text(self.timestamp.clone()),
            Cell::Text(self.zone.clone()),
        ]
    }
}

/// Select and project the readings of `zone`, optionally restricted to raw
/// timestamps starting with `month`.
///
/// Unlike the grid and [`HistoryFilter`](crate::HistoryFilter), readings whose
/// timestamp does not parse are kept: an unfiltered export has one row per
/// stored record of the zone.
pub fn export_rows<'a, I>(readings: I, zone: &str, month: Option<&str>) -> Vec<ExportRow>
where
    I: IntoIterator<Item = &'a Reading>,
{
    let month = month.map(str::trim).filter(|m| !m.is_empty());
    readings
        .into_iter()
        .filter(|r| r.in_zone(zone))
        .filter(|r| {
            month.is_none_or(|m| r.effective_timestamp().unwrap_or_default().starts_with(m))
        })
        .map(ExportRow::from_reading)
        .collect()
}

/// Encode rows as CSV with a header line.
pub fn to_csv(rows: &[ExportRow]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_COLUMNS)?;
    for row in rows {
        writer.write_record(row.cells().iter().map(Cell::to_field))?;
    }
    writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

/// Encode rows as a single-sheet XLSX workbook.
pub fn to_xlsx(rows: &[ExportRow], sheet: &str) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet)?;

    for (col, (header, width)) in EXPORT_COLUMNS.iter().zip(COLUMN_WIDTHS).enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, *header, &bold)?;
        worksheet.set_column_width(col, width)?;
    }

    for (index, row) in rows.iter().enumerate() {
        let row_num = index as u32 + 1;
        for (col, cell) in row.cells().iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Text(s) => {
                    worksheet.write_string(row_num, col, s)?;
                }
                Cell::Number(n) => {
                    worksheet.write_number(row_num, col, *n)?;
                }
                Cell::Empty => {}
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Encode rows in `format`.
pub fn render(rows: &[ExportRow], format: ExportFormat, month: Option<&str>) -> Result<Vec<u8>> {
    let bytes = match format {
        ExportFormat::Csv => to_csv(rows)?,
        ExportFormat::Xlsx => to_xlsx(rows, &sheet_name(month))?,
    };
    info!("Exported {} rows as {} ({} bytes)", rows.len(), format, bytes.len());
    Ok(bytes)
}

/// Worksheet name: `readings`, or `readings_<month>` when filtered.
pub fn sheet_name(month: Option<&str>) -> String {
    match month.map(str::trim).filter(|m| !m.is_empty()) {
        // Excel caps sheet names at 31 characters
        Some(m) => format!("{SHEET_NAME}_{}", sanitize(m)).chars().take(31).collect(),
        None => SHEET_NAME.to_string(),
    }
}

/// Download filename: `readings_<zone>[_<month>].<ext>`.
pub fn export_filename(zone: &str, month: Option<&str>, format: ExportFormat) -> String {
    let mut name = format!("readings_{}", sanitize(zone));
    if let Some(m) = month.map(str::trim).filter(|m| !m.is_empty()) {
        name.push('_');
        name.push_str(&sanitize(m));
    }
    let filename = format!("{name}.{}", format.extension());
    debug!("Export filename {}", filename);
    filename
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
