//! File ingestor behavior on real files.

use std::io::Write;

use anyhow::Result;
use tempfile::NamedTempFile;

use dsagent::dataset::{DType, Dataset};
use dsagent::error::AgentError;

fn temp_csv(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn loads_csv_and_infers_types() -> Result<()> {
    let file = temp_csv("name,age,score\nalice,34,1.5\nbob,29,2.0\n");
    let ds = Dataset::load(file.path())?;

    assert_eq!(ds.n_rows(), 2);
    assert_eq!(ds.n_cols(), 3);
    assert_eq!(ds.columns[0].dtype, DType::Text);
    assert_eq!(ds.columns[1].dtype, DType::Int);
    assert_eq!(ds.columns[2].dtype, DType::Float);
    Ok(())
}

#[test]
fn profile_has_one_descriptor_per_column() -> Result<()> {
    let file = temp_csv("a,b,c,d\n1,2,3,4\n5,6,7,8\n");
    let ds = Dataset::load(file.path())?;

    let profile = ds.profile();
    let descriptors = profile
        .split("Data Types:\n")
        .nth(1)
        .and_then(|s| s.split("\n\n").next())
        .map(|s| s.lines().filter(|l| l.starts_with("- ")).count())
        .unwrap();
    assert_eq!(descriptors, ds.n_cols());
    assert!(profile.contains("Shape: 2 rows, 4 columns"));
    Ok(())
}

#[test]
fn profile_reports_missing_values() -> Result<()> {
    let file = temp_csv("a,b\n1,\n2,x\n3,NA\n");
    let ds = Dataset::load(file.path())?;

    assert_eq!(ds.columns[0].missing, 0);
    assert_eq!(ds.columns[1].missing, 2);
    assert!(ds.profile().contains("- b: 2 (66.67%)"));
    Ok(())
}

#[test]
fn unsupported_extension_is_unreadable() {
    let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    file.write_all(b"a,b\n1,2\n").unwrap();

    let err = Dataset::load(file.path()).unwrap_err();
    assert!(matches!(err, AgentError::UnreadableFile { .. }));
    assert!(err.to_string().contains("unsupported extension"));
}

#[test]
fn missing_file_is_unreadable() {
    let err = Dataset::load(std::path::Path::new("does/not/exist.csv")).unwrap_err();
    assert!(matches!(err, AgentError::UnreadableFile { .. }));
}

#[test]
fn malformed_csv_is_unreadable() {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    // Invalid UTF-8 in a record
    file.write_all(b"a,b\n\xff\xfe,1\n").unwrap();

    let err = Dataset::load(file.path()).unwrap_err();
    assert!(matches!(err, AgentError::UnreadableFile { .. }));
}

#[test]
fn empty_excel_is_unreadable() {
    let mut file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
    file.write_all(b"not a workbook").unwrap();

    let err = Dataset::load(file.path()).unwrap_err();
    assert!(matches!(err, AgentError::UnreadableFile { .. }));
}
