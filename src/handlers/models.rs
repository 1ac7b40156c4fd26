//! Model listing handler: what the configured key can see.

use anyhow::Result;

use crate::config::{Config, SUPPORTED_MODELS};
use crate::llm::LlmClient;
use crate::printer::TextPrinter;

pub async fn run(cfg: &Config) -> Result<()> {
    let client = LlmClient::from_config(cfg)?;
    let models = client.list_models().await?;
    for model in &models {
        if SUPPORTED_MODELS.contains(&model.as_str()) {
            println!("* {model}");
        } else {
            println!("  {model}");
        }
    }
    TextPrinter::note("models marked * can be passed to --model");
    Ok(())
}
