//! Profile handler: ingest and describe the dataset without a model call.

use std::path::Path;

use anyhow::Result;

use crate::config::Config;
use crate::dataset::{resolve_input, Dataset};
use crate::printer::TextPrinter;

pub fn run(cfg: &Config, file: &Path) -> Result<()> {
    let dataset = Dataset::load(&resolve_input(&cfg.data_path(), file))?;
    TextPrinter::heading("Dataset profile");
    TextPrinter::plain(&dataset.profile());
    Ok(())
}
