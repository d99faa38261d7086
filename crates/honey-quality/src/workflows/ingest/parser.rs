use std::io::Read;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::warn;

use super::mapping::{self, ANALYST, BATCH_ID, COLLECTION_DATE, LAB_ID, SAMPLE_ID};
use super::normalizer::normalize_header;
use crate::workflows::quality::domain::SampleRecord;
use crate::workflows::quality::repository::SourceError;

/// Parse a lab export into sample records, in file order.
///
/// Rows without a `sample_id` get `row-<n>`; rows without a `batch_id` inherit
/// `default_batch`. Short rows leave their trailing columns unset and cells past
/// the header are ignored, so a ragged row is left to validation rather than
/// failing the whole file.
pub(crate) fn parse_records<R: Read>(
    reader: R,
    default_batch: &str,
) -> Result<Vec<SampleRecord>, SourceError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .map_err(|source| SourceError::Csv { row: 0, source })?
        .iter()
        .map(normalize_header)
        .collect();

    let mut records = Vec::new();
    for (index, row) in csv_reader.records().enumerate() {
        let row_number = index + 1;
        let row = row.map_err(|source| SourceError::Csv {
            row: row_number,
            source,
        })?;

        if row.len() != headers.len() {
            warn!(
                row = row_number,
                expected = headers.len(),
                found = row.len(),
                "row field count does not match the header"
            );
        }

        let mut record = SampleRecord::new(default_batch, format!("row-{row_number}"));
        for (column, cell) in headers.iter().zip(row.iter()) {
            if cell.is_empty() {
                continue;
            }
            apply_cell(&mut record, column, cell);
        }
        records.push(record);
    }

    Ok(records)
}

fn apply_cell(record: &mut SampleRecord, column: &str, cell: &str) {
    if mapping::is_identity_column(column) {
        match column {
            BATCH_ID => record.batch_id = cell.to_string(),
            SAMPLE_ID => record.sample_id = cell.to_string(),
            LAB_ID => record.lab_id = Some(cell.to_string()),
            ANALYST => record.analyst = Some(cell.to_string()),
            COLLECTION_DATE => match parse_datetime(cell) {
                Some(collected_at) => record.collected_at = Some(collected_at),
                None => {
                    record
                        .attributes
                        .insert(column.to_string(), cell.to_string());
                }
            },
            _ => {}
        }
        return;
    }

    match cell.parse::<f64>() {
        Ok(value) => {
            record.measurements.insert(column.to_string(), value);
        }
        Err(_) => {
            record
                .attributes
                .insert(column.to_string(), cell.to_string());
        }
    }
}

pub(crate) fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}
