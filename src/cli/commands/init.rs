//! Init command - interactive first-run setup.

use crate::cli::Output;
use crate::config::{Secrets, Settings, REQUIRED_SECRETS};
use console::style;
use std::io::{self, Write};
use std::path::Path;

/// Written to the system prompt path when no prompt exists yet.
const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a helpful assistant for questions about the Holy Bible.
Answer using only the Bible passages provided in the context.
Quote book, chapter and verse when the passages give them.
If the passages do not answer the question, say that you do not know.
";

/// Template for the secrets file.
const SECRETS_TEMPLATE: &str = "\
# Credentials for the Bible assistant. Environment variables take precedence.
MISTRAL_API_KEY = \"\"
PINECONE_API_KEY = \"\"
PINECONE_ENVIRONMENT = \"\"
# HF_TOKEN = \"\"
";

/// Run the init command for first-time setup.
pub fn run_init(config_path: &Path, settings: &Settings) -> anyhow::Result<()> {
    Output::header("Bible Assistant Setup");
    println!();
    println!("Let's make sure everything is configured correctly.\n");

    println!("{}", style("Step 1: Configuration file").bold().cyan());
    println!();

    if config_path.exists() {
        Output::info(&format!("Config file exists: {}", config_path.display()));
    } else if prompt_continue("Create default configuration file?")? {
        settings.save_to(&config_path.to_path_buf())?;
        Output::success(&format!("Created config file: {}", config_path.display()));
        println!();
        println!("  Edit your config with: {}", style("bible-assistant config edit").green());
    } else {
        Output::info("Skipped config file creation. Using defaults.");
    }

    println!();

    println!("{}", style("Step 2: System prompt").bold().cyan());
    println!();

    let prompt_path = settings.system_prompt_path();
    if write_if_absent(&prompt_path, DEFAULT_SYSTEM_PROMPT)? {
        Output::success(&format!("Created system prompt: {}", prompt_path.display()));
    } else {
        Output::info(&format!("System prompt exists: {}", prompt_path.display()));
    }

    println!();

    println!("{}", style("Step 3: Secrets").bold().cyan());
    println!();

    let secrets_path = settings.secrets_path();
    match Secrets::resolve(Some(&secrets_path)) {
        Ok(_) => Output::success("All required secrets are configured!"),
        Err(e) => {
            Output::warning(&e.to_string());
            println!();
            println!("  The assistant needs:");
            for name in REQUIRED_SECRETS {
                Output::list_item(name);
            }
            println!("  Set them in the environment, a .env file or the secrets file.");
            println!();
            if write_if_absent(&secrets_path, SECRETS_TEMPLATE)? {
                Output::success(&format!("Created secrets template: {}", secrets_path.display()));
            } else {
                Output::info(&format!("Secrets file: {}", secrets_path.display()));
            }
        }
    }

    println!();

    println!("{}", style("Setup Complete!").bold().green());
    println!();
    println!("Next steps:");
    println!("  {} Check secrets and the index", style("bible-assistant doctor").cyan());
    println!("  {} Ask a question", style("bible-assistant ask \"<question>\"").cyan());
    println!("  {} Start a conversation", style("bible-assistant chat").cyan());
    println!();
    println!("For more help: {}", style("bible-assistant --help").cyan());

    Ok(())
}

/// Write `content` to `path` unless the file exists. Returns whether it was written.
fn write_if_absent(path: &Path, content: &str) -> io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(true)
}

/// Prompt user for yes/no confirmation.
fn prompt_continue(message: &str) -> io::Result<bool> {
    print!("{} {} ", style("?").cyan(), message);
    print!("{} ", style("[y/N]").dim());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let answer = input.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_if_absent_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts").join("system_prompt.txt");

        assert!(write_if_absent(&path, DEFAULT_SYSTEM_PROMPT).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_SYSTEM_PROMPT);

        std::fs::write(&path, "Custom prompt").unwrap();
        assert!(!write_if_absent(&path, DEFAULT_SYSTEM_PROMPT).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Custom prompt");
    }

    #[test]
    fn test_secrets_template_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        std::fs::write(&path, SECRETS_TEMPLATE).unwrap();

        let values = crate::config::read_secrets_file(&path).unwrap();
        for name in REQUIRED_SECRETS {
            assert_eq!(values.get(name).map(String::as_str), Some(""));
        }
    }
}
