//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::QueryPipeline;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    show_query: bool,
    no_sources: bool,
    settings: Settings,
) -> Result<()> {
    let secrets = match preflight::check(Operation::Answer, &settings) {
        Ok(secrets) => secrets,
        Err(e) => {
            Output::error(&format!("{}", e));
            Output::info("Run 'bible-assistant doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    };

    let pipeline = QueryPipeline::from_settings(&settings, &secrets)?;

    let spinner = Output::spinner("Finding answer...");
    let result = pipeline.process_query(question).await;
    spinner.finish_and_clear();

    match result {
        Ok(answer) => {
            if show_query {
                Output::kv("Search query", &answer.refined_query);
            }

            println!("\n{}\n", answer.text);

            if !no_sources && !answer.sources.is_empty() {
                Output::header("Sources");
                for (i, source) in answer.sources.iter().enumerate() {
                    Output::passage(i + 1, source);
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Error processing query: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
