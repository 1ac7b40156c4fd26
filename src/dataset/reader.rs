//! CSV and Excel readers feeding the ingestor.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::error::AgentError;

type Raw = (Vec<String>, Vec<Vec<Option<String>>>);

pub fn read_csv(path: &Path) -> Result<Raw, AgentError> {
    let unreadable = |e: csv::Error| AgentError::unreadable(path.display().to_string(), e.to_string());
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(unreadable)?;
    let headers = rdr
        .headers()
        .map_err(unreadable)?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(unreadable)?;
        rows.push(record.iter().map(cell).collect());
    }
    Ok((headers, rows))
}

pub fn read_excel(path: &Path) -> Result<Raw, AgentError> {
    let display = path.display().to_string();
    let mut workbook =
        open_workbook_auto(path).map_err(|e| AgentError::unreadable(&display, e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AgentError::unreadable(&display, "workbook has no sheets"))?
        .map_err(|e| AgentError::unreadable(&display, e.to_string()))?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = match rows_iter.next() {
        Some(row) => row
            .iter()
            .enumerate()
            .map(|(i, c)| match c {
                Data::Empty => format!("column_{i}"),
                other => other.to_string(),
            })
            .collect(),
        None => {
            return Err(AgentError::unreadable(&display, "sheet is empty"));
        }
    };
    let rows = rows_iter
        .map(|row| {
            row.iter()
                .map(|c| match c {
                    Data::Empty => None,
                    other => Some(other.to_string()),
                })
                .collect()
        })
        .collect();
    Ok((headers, rows))
}

fn cell(raw: &str) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}
