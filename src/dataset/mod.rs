//! File ingestor: tabular loading, column type inference, and profiling.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::AgentError;

mod reader;

/// Cell values the profiler treats as missing, mirroring common NA markers
/// in exported spreadsheets.
const NA_MARKERS: &[&str] = &["", "na", "n/a", "nan", "null", "none"];

const SAMPLE_ROWS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    Int,
    Float,
    Bool,
    Text,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::Int => write!(f, "int64"),
            DType::Float => write!(f, "float64"),
            DType::Bool => write!(f, "bool"),
            DType::Text => write!(f, "object"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub dtype: DType,
    pub missing: usize,
}

/// An in-memory tabular dataset. Loaded once per session; the orchestration
/// layer never mutates it after construction.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub path: PathBuf,
    pub columns: Vec<Column>,
    rows: Vec<Vec<Option<String>>>,
}

impl Dataset {
    /// Load a dataset from a CSV or Excel file, dispatching on extension.
    pub fn load(path: &Path) -> Result<Self, AgentError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        let (headers, rows) = match ext.as_str() {
            "csv" => reader::read_csv(path)?,
            "xlsx" | "xls" => reader::read_excel(path)?,
            other => {
                return Err(AgentError::unreadable(
                    path.display().to_string(),
                    format!("unsupported extension '.{other}' (expected .csv, .xlsx or .xls)"),
                ))
            }
        };
        Self::from_raw(path.to_path_buf(), headers, rows)
    }

    /// Build a dataset from already-parsed headers and cells, inferring a
    /// dtype and missing count per column.
    pub fn from_raw(
        path: PathBuf,
        headers: Vec<String>,
        mut rows: Vec<Vec<Option<String>>>,
    ) -> Result<Self, AgentError> {
        if headers.is_empty() {
            return Err(AgentError::unreadable(
                path.display().to_string(),
                "no columns found",
            ));
        }
        // Ragged rows are padded (or truncated) to the header width.
        for row in &mut rows {
            row.resize(headers.len(), None);
        }
        let columns = headers
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let cells: Vec<&str> = rows
                    .iter()
                    .filter_map(|r| r[i].as_deref())
                    .filter(|s| !is_missing(s))
                    .collect();
                let missing = rows.len() - cells.len();
                Column { name, dtype: infer_dtype(&cells), missing }
            })
            .collect();
        Ok(Self { path, columns, rows })
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    fn cell(&self, row: usize, col: usize) -> &str {
        self.rows[row][col].as_deref().unwrap_or("")
    }

    /// Textual profile handed to the prompt builder: shape, one descriptor
    /// per column, missing-value counts, numeric summaries, sample rows.
    pub fn profile(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Dataset: {}\n", self.path.display()));
        out.push_str(&format!(
            "Shape: {} rows, {} columns\n\n",
            self.n_rows(),
            self.n_cols()
        ));

        out.push_str("Data Types:\n");
        for col in &self.columns {
            out.push_str(&format!("- {}: {}\n", col.name, col.dtype));
        }
        out.push('\n');

        out.push_str("Missing Values:\n");
        for col in &self.columns {
            let pct = if self.n_rows() == 0 {
                0.0
            } else {
                col.missing as f64 / self.n_rows() as f64 * 100.0
            };
            out.push_str(&format!("- {}: {} ({:.2}%)\n", col.name, col.missing, pct));
        }
        out.push('\n');

        let numeric: Vec<(usize, &Column)> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c.dtype, DType::Int | DType::Float))
            .map(|(i, c)| (i, c))
            .collect();
        if !numeric.is_empty() {
            out.push_str("Numeric Summary:\n");
            for (i, col) in numeric {
                if let Some(s) = self.numeric_summary(i) {
                    out.push_str(&format!(
                        "- {}: count={}, mean={:.4}, min={}, max={}\n",
                        col.name, s.count, s.mean, s.min, s.max
                    ));
                }
            }
            out.push('\n');
        }

        out.push_str(&format!("First {} rows:\n", SAMPLE_ROWS.min(self.n_rows())));
        let names: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        out.push_str(&names.join(" | "));
        out.push('\n');
        for r in 0..self.n_rows().min(SAMPLE_ROWS) {
            let cells: Vec<&str> = (0..self.n_cols()).map(|c| self.cell(r, c)).collect();
            out.push_str(&cells.join(" | "));
            out.push('\n');
        }
        out
    }

    fn numeric_summary(&self, col: usize) -> Option<NumericSummary> {
        let values: Vec<f64> = self
            .rows
            .iter()
            .filter_map(|r| r[col].as_deref())
            .filter(|s| !is_missing(s))
            .filter_map(|s| s.trim().parse::<f64>().ok())
            .collect();
        if values.is_empty() {
            return None;
        }
        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        Some(NumericSummary { count, mean, min, max })
    }
}

struct NumericSummary {
    count: usize,
    mean: f64,
    min: f64,
    max: f64,
}

/// Bare filenames are also looked up under the configured data directory,
/// so `--file sales.csv` finds `data/sales.csv`.
pub fn resolve_input(data_dir: &Path, file: &Path) -> PathBuf {
    if file.exists() || file.is_absolute() {
        return file.to_path_buf();
    }
    let candidate = data_dir.join(file);
    if candidate.exists() {
        candidate
    } else {
        file.to_path_buf()
    }
}

fn is_missing(cell: &str) -> bool {
    NA_MARKERS.contains(&cell.trim().to_ascii_lowercase().as_str())
}

fn infer_dtype(cells: &[&str]) -> DType {
    if cells.is_empty() {
        return DType::Text;
    }
    if cells.iter().all(|c| c.trim().parse::<i64>().is_ok()) {
        return DType::Int;
    }
    if cells.iter().all(|c| c.trim().parse::<f64>().is_ok()) {
        return DType::Float;
    }
    if cells
        .iter()
        .all(|c| c.trim().eq_ignore_ascii_case("true") || c.trim().eq_ignore_ascii_case("false"))
    {
        return DType::Bool;
    }
    DType::Text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(vals: &[&str]) -> Vec<Option<String>> {
        vals.iter()
            .map(|v| if v.is_empty() { None } else { Some(v.to_string()) })
            .collect()
    }

    #[test]
    fn infers_column_types() {
        let ds = Dataset::from_raw(
            PathBuf::from("t.csv"),
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            vec![
                cells(&["1", "1.5", "true", "x"]),
                cells(&["2", "2", "false", "y"]),
            ],
        )
        .unwrap();
        assert_eq!(ds.columns[0].dtype, DType::Int);
        assert_eq!(ds.columns[1].dtype, DType::Float);
        assert_eq!(ds.columns[2].dtype, DType::Bool);
        assert_eq!(ds.columns[3].dtype, DType::Text);
    }

    #[test]
    fn counts_missing_cells() {
        let ds = Dataset::from_raw(
            PathBuf::from("t.csv"),
            vec!["a".into()],
            vec![cells(&["1"]), cells(&[""]), cells(&["NA"])],
        )
        .unwrap();
        assert_eq!(ds.columns[0].missing, 2);
    }

    #[test]
    fn profile_has_one_descriptor_per_column() {
        let ds = Dataset::from_raw(
            PathBuf::from("t.csv"),
            vec!["a".into(), "b".into(), "c".into()],
            vec![cells(&["1", "2", "3"])],
        )
        .unwrap();
        let profile = ds.profile();
        let dtypes = profile
            .split("Data Types:\n")
            .nth(1)
            .and_then(|s| s.split("\n\n").next())
            .unwrap();
        assert_eq!(dtypes.lines().filter(|l| l.starts_with("- ")).count(), 3);
    }

    #[test]
    fn zero_columns_is_unreadable() {
        let err = Dataset::from_raw(PathBuf::from("t.csv"), vec![], vec![]).unwrap_err();
        assert!(matches!(err, AgentError::UnreadableFile { .. }));
    }

    #[test]
    fn bare_filenames_resolve_against_the_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sales.csv"), "a\n1\n").unwrap();

        let resolved = resolve_input(dir.path(), Path::new("sales.csv"));
        assert_eq!(resolved, dir.path().join("sales.csv"));

        // Existing and absent paths pass through untouched.
        let missing = resolve_input(dir.path(), Path::new("absent.csv"));
        assert_eq!(missing, PathBuf::from("absent.csv"));
    }
}
