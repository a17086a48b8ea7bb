//! Doctor command - verify provider credentials and configuration.

use crate::cli::Output;
use crate::config::{Settings, ToolSettings};
use crate::models::{split_identifier, ProviderConfig, DEFAULT_MODEL_ID, PROVIDER_IDS};
use console::style;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Parley Doctor");
    println!();
    println!("Checking providers, tools and configuration...\n");

    let mut checks = Vec::new();
    let providers = ProviderConfig::from_env();

    println!("{}", style("Providers").bold());
    let provider_checks = check_providers(&providers);
    for check in &provider_checks {
        check.print();
    }
    checks.extend(provider_checks);

    println!();

    println!("{}", style("Tools").bold());
    let tool_checks = check_tools(&settings.tools.clone().with_env_fallback());
    for check in &tool_checks {
        check.print();
    }
    checks.extend(tool_checks);

    println!();

    println!("{}", style("Configuration").bold());
    let config_checks = vec![check_config_file(), check_prompts_dir(settings)];
    for check in &config_checks {
        check.print();
    }
    checks.extend(config_checks);

    println!();

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Parley.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!(
            "All checks passed with {} warning(s).",
            warnings
        ));
    } else {
        Output::success("All checks passed! Parley is ready to use.");
    }

    Ok(())
}

/// Environment variables each provider needs.
fn provider_env_vars(provider_id: &str) -> &'static str {
    match provider_id {
        "openai" => "OPENAI_API_KEY",
        "anthropic" => "ANTHROPIC_API_KEY",
        "google" => "GOOGLE_GENERATIVE_AI_API_KEY",
        "groq" => "GROQ_API_KEY",
        "ollama" => "OLLAMA_BASE_URL",
        "azure" => "AZURE_API_KEY and AZURE_RESOURCE_NAME",
        "deepseek" => "DEEPSEEK_API_KEY",
        "openai-compatible" => "OPENAI_COMPATIBLE_API_KEY and OPENAI_COMPATIBLE_API_BASE_URL",
        "openrouter" => "OPENROUTER_API_KEY",
        "xai" => "XAI_API_KEY",
        _ => "unknown provider",
    }
}

fn check_providers(providers: &ProviderConfig) -> Vec<CheckResult> {
    let mut results: Vec<CheckResult> = PROVIDER_IDS
        .iter()
        .filter_map(|id| {
            providers
                .endpoint(id)
                .map(|endpoint| CheckResult::ok(id, &endpoint.api_base))
        })
        .collect();

    if results.is_empty() {
        results.push(CheckResult::error(
            "Providers",
            "none configured",
            "Set at least one provider key, e.g. export GOOGLE_GENERATIVE_AI_API_KEY=...",
        ));
        return results;
    }

    let default_provider = split_identifier(DEFAULT_MODEL_ID)
        .map(|(provider, _)| provider)
        .unwrap_or_default();
    if !providers.is_enabled(default_provider) {
        results.push(CheckResult::warning(
            "Default model",
            &format!("{} is not configured", DEFAULT_MODEL_ID),
            &format!(
                "Requests without a model choice fall back to it; set {}",
                provider_env_vars(default_provider)
            ),
        ));
    }

    let missing: Vec<&str> = PROVIDER_IDS
        .iter()
        .copied()
        .filter(|id| !providers.is_enabled(id))
        .collect();
    if !missing.is_empty() {
        println!(
            "  {} {}",
            style("·").dim(),
            style(format!("not configured: {}", missing.join(", "))).dim()
        );
    }

    results
}

fn check_tools(tools: &ToolSettings) -> Vec<CheckResult> {
    let key_check = |name: &str, key: &Option<String>, purpose: &str, missing: CheckResult| match key {
        Some(_) => CheckResult::ok(name, purpose),
        None => missing,
    };

    vec![
        key_check(
            "TAVILY_API_KEY",
            &tools.tavily_api_key,
            "web search",
            CheckResult::warning(
                "TAVILY_API_KEY",
                "not set, search tool will fail",
                "Get a key at https://tavily.com and export TAVILY_API_KEY=...",
            ),
        ),
        key_check(
            "SERPER_API_KEY",
            &tools.serper_api_key,
            "video search",
            CheckResult::warning(
                "SERPER_API_KEY",
                "not set, videoSearch tool will fail",
                "Get a key at https://serper.dev and export SERPER_API_KEY=...",
            ),
        ),
        key_check(
            "JINA_API_KEY",
            &tools.jina_api_key,
            "page retrieval",
            CheckResult::ok("JINA_API_KEY", "not set, retrieve uses anonymous rate limits"),
        ),
    ]
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: parley config init",
        )
    }
}

fn check_prompts_dir(settings: &Settings) -> CheckResult {
    match &settings.prompts.custom_dir {
        None => CheckResult::ok("Prompts", "built-in"),
        Some(dir) => {
            let path = Settings::expand_path(dir);
            if path.is_dir() {
                CheckResult::ok("Prompts", &format!("{}", path.display()))
            } else {
                CheckResult::error(
                    "Prompts",
                    &format!("{} does not exist", path.display()),
                    "Fix prompts.custom_dir in the config file",
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_ok() {
        let result = CheckResult::ok("test", "passed");
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(result.hint.is_none());
    }

    #[test]
    fn test_no_providers_is_an_error() {
        let results = check_providers(&ProviderConfig::default());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, CheckStatus::Error);
    }

    #[test]
    fn test_missing_default_provider_warns() {
        let providers = ProviderConfig::default().with_endpoint("openai", "https://api.openai.com/v1", "k");
        let results = check_providers(&providers);
        assert_eq!(results[0].status, CheckStatus::Ok);
        assert_eq!(results[1].name, "Default model");
        assert_eq!(results[1].status, CheckStatus::Warning);
    }

    #[test]
    fn test_tool_key_checks() {
        let tools = ToolSettings {
            tavily_api_key: Some("t".to_string()),
            ..ToolSettings::default()
        };
        let results = check_tools(&tools);
        assert_eq!(results[0].status, CheckStatus::Ok);
        assert_eq!(results[1].status, CheckStatus::Warning);
        assert_eq!(results[2].status, CheckStatus::Ok);
    }

    #[test]
    fn test_every_provider_has_env_hint() {
        for id in PROVIDER_IDS {
            assert_ne!(provider_env_vars(id), "unknown provider");
        }
    }
}
