//! Models command - list the catalog.

use crate::cli::Output;
use crate::config::Settings;
use crate::models::{is_reasoning_model, ModelRegistry, ProviderConfig, DEFAULT_MODEL_ID};
use anyhow::Result;

/// Run the models command.
pub fn run_models(available_only: bool, settings: &Settings) -> Result<()> {
    let registry = ModelRegistry::from_settings(settings, ProviderConfig::from_env());
    let models = registry.available_models();

    Output::header("Models");
    println!();

    let mut shown = 0;
    for model in models.iter().filter(|m| m.enabled || !available_only) {
        let identifier = model.identifier();
        Output::model_row(
            model,
            is_reasoning_model(&identifier),
            &registry.tool_call_model(&identifier),
        );
        shown += 1;
    }

    println!();
    if shown == 0 {
        Output::warning("No model has a configured provider. Run 'parley doctor' for details.");
    } else {
        let enabled = models.iter().filter(|m| m.enabled).count();
        Output::info(&format!("{} of {} models available. Default: {}", enabled, models.len(), DEFAULT_MODEL_ID));
    }

    Ok(())
}
