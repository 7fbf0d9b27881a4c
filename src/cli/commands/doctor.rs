//! Doctor command - verify secrets, configuration and index connectivity.

use crate::cli::Output;
use crate::config::{mask, read_secrets_file, Settings, HF_TOKEN, REQUIRED_SECRETS};
use crate::vector_store::{IndexStats, PineconeVectorStore, VectorStore};
use console::style;
use std::collections::HashMap;
use std::path::Path;

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
pub async fn run_doctor(config_path: &Path, settings: &Settings) -> anyhow::Result<()> {
    Output::header("Bible Assistant Doctor");
    println!();
    println!("Checking secrets, configuration and index...\n");

    let mut checks = Vec::new();

    let secrets_path = settings.secrets_path();

    println!("{}", style("Secrets").bold());
    let (file_check, file_secrets) = check_secrets_file(&secrets_path);
    file_check.print();
    checks.push(file_check);

    let lookup = |name: &str| std::env::var(name).ok().or_else(|| file_secrets.get(name).cloned());
    for name in REQUIRED_SECRETS {
        let check = check_secret(name, lookup(name), &secrets_path);
        check.print();
        checks.push(check);
    }
    let hf_check = check_hf_token(lookup(HF_TOKEN));
    hf_check.print();
    checks.push(hf_check);

    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file(config_path);
    config_check.print();
    checks.push(config_check);
    let prompt_check = check_system_prompt(&settings.system_prompt_path());
    prompt_check.print();
    checks.push(prompt_check);

    println!();

    println!("{}", style("Vector Index").bold());
    let index_check = match lookup("PINECONE_API_KEY").filter(|k| !k.trim().is_empty()) {
        Some(api_key) => check_index(settings, &api_key).await,
        None => CheckResult::warning(
            "Index",
            "skipped",
            "Set PINECONE_API_KEY to check the index",
        ),
    };
    index_check.print();
    checks.push(index_check);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before asking questions.",
            errors
        ));
        anyhow::bail!("doctor found {} error(s)", errors);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! The assistant is ready.");
    }

    Ok(())
}

/// Read the secrets file, reporting a malformed file instead of failing.
fn check_secrets_file(path: &Path) -> (CheckResult, HashMap<String, String>) {
    if !path.exists() {
        return (
            CheckResult::ok(
                "Secrets file",
                &format!("{} not present, using the environment", path.display()),
            ),
            HashMap::new(),
        );
    }

    match read_secrets_file(path) {
        Ok(values) => (
            CheckResult::ok(
                "Secrets file",
                &format!("{} ({} entries)", path.display(), values.len()),
            ),
            values,
        ),
        Err(e) => (
            CheckResult::error(
                "Secrets file",
                &format!("{} could not be read: {}", path.display(), e),
                "Use flat KEY = \"value\" lines",
            ),
            HashMap::new(),
        ),
    }
}

fn check_secret(name: &str, value: Option<String>, secrets_path: &Path) -> CheckResult {
    match value {
        Some(v) if !v.trim().is_empty() => {
            CheckResult::ok(name, &format!("configured ({})", mask(&v)))
        }
        Some(_) => CheckResult::error(
            name,
            "empty",
            &format!("Set it in the environment, .env or {}", secrets_path.display()),
        ),
        None => CheckResult::error(
            name,
            "not set",
            &format!("Set it in the environment, .env or {}", secrets_path.display()),
        ),
    }
}

fn check_hf_token(value: Option<String>) -> CheckResult {
    match value {
        Some(v) if !v.trim().is_empty() => {
            CheckResult::ok(HF_TOKEN, &format!("configured ({})", mask(&v)))
        }
        _ => CheckResult::warning(
            HF_TOKEN,
            "not set",
            "Anonymous embedding requests are rate limited",
        ),
    }
}

fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: bible-assistant init (or bible-assistant config edit)",
        )
    }
}

fn check_system_prompt(path: &Path) -> CheckResult {
    match std::fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => CheckResult::warning(
            "System prompt",
            &format!("{} is empty", path.display()),
            "Describe how the assistant should answer",
        ),
        Ok(content) => CheckResult::ok(
            "System prompt",
            &format!("{} ({} chars)", path.display(), content.chars().count()),
        ),
        Err(_) => CheckResult::error(
            "System prompt",
            &format!("{} not found", path.display()),
            "Create with: bible-assistant init",
        ),
    }
}

async fn check_index(settings: &Settings, api_key: &str) -> CheckResult {
    let store = match PineconeVectorStore::new(&settings.vector_store, api_key) {
        Ok(store) => store,
        Err(e) => return CheckResult::error("Index", &e.to_string(), "Check vector_store settings"),
    };

    match store.stats().await {
        Ok(stats) => check_index_stats(
            &stats,
            &settings.vector_store.index_name,
            store.namespace(),
            settings.embedding.dimensions as usize,
        ),
        Err(e) => CheckResult::error(
            "Index",
            &e.to_string(),
            "Check PINECONE_API_KEY and vector_store.index_name",
        ),
    }
}

fn check_index_stats(
    stats: &IndexStats,
    index_name: &str,
    namespace: &str,
    expected_dimensions: usize,
) -> CheckResult {
    let name = format!("Index '{}'", index_name);

    if let Some(dimension) = stats.dimension {
        if dimension != expected_dimensions {
            return CheckResult::error(
                &name,
                &format!(
                    "dimension {} does not match embedding dimension {}",
                    dimension, expected_dimensions
                ),
                "Use the embedding model the index was built with",
            );
        }
    }

    if stats.namespace_vectors == 0 {
        return CheckResult::warning(
            &name,
            &format!("namespace '{}' is empty", namespace),
            "Load the Bible passages into the index",
        );
    }

    CheckResult::ok(
        &name,
        &format!(
            "{} passages in '{}' ({} total)",
            stats.namespace_vectors, namespace, stats.total_vectors
        ),
    )
}
