use crate::cli::utils::output_document;
use crate::cli::OutputFormat;
use crate::config::AppConfig;

/// Print the workflow policy after presets, policy file and env overrides
pub fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    output_document(&output_format, &config.workflow)
}
