//! Interactive chat command.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::llm::Role;
use crate::pipeline::{QueryPipeline, Reply};
use crate::session::{greeting, ChatSession};
use console::style;
use std::io::{self, BufRead, Write};
use tracing::debug;

/// Shown for `help`.
const USER_GUIDE: &str = r#"Getting Started:
  1. Type your question at the prompt
  2. Press Enter
  3. Wait for the response

Tips for better results:
  - Be specific in your questions
  - Include Bible verse references if known
  - Ask one question at a time
  - Use clear, simple language

Example questions:
  - What does John 3:16 mean?
  - Who was Moses?
  - What is the story of creation?
  - Explain the Lord's Prayer

Commands: 'new' starts a new chat, 'history' shows this chat, 'exit' quits."#;

/// Run the interactive chat command.
pub async fn run_chat(settings: Settings) -> anyhow::Result<()> {
    let secrets = match preflight::check(Operation::Answer, &settings) {
        Ok(secrets) => secrets,
        Err(e) => {
            Output::error(&format!("{}", e));
            Output::info("Run 'bible-assistant doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    };

    let pipeline = QueryPipeline::from_settings(&settings, &secrets)?;
    let mut session = ChatSession::new();

    print_banner();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("\n{} ", style("Ask a question about the Bible...").dim());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        match input.to_ascii_lowercase().as_str() {
            "exit" | "quit" => {
                Output::info("Go in peace!");
                break;
            }
            "new" | "clear" => {
                session.clear();
                print_banner();
                continue;
            }
            "help" => {
                Output::header("User Guide");
                println!("{}", USER_GUIDE);
                continue;
            }
            "history" => {
                if session.is_empty() {
                    Output::info("No messages yet.");
                }
                for message in session.messages() {
                    Output::chat_message(message.role, &message.content);
                }
                continue;
            }
            _ => {}
        }

        take_turn(&pipeline, &mut session, input).await;
    }

    Ok(())
}

/// Record the question, answer it, and record the reply.
async fn take_turn(pipeline: &QueryPipeline, session: &mut ChatSession, input: &str) {
    session.update_chat(Role::User, input);

    let spinner = Output::spinner("Finding answer...");
    let reply = pipeline.answer_or_apologize(input).await;
    spinner.finish_and_clear();

    if let Reply::Apology { error } = &reply {
        Output::error(&format!("Error processing query: {}", error));
    }

    if session.update_chat(Role::Assistant, reply.text()) {
        Output::chat_message(Role::Assistant, reply.text());
    }
    debug!("Session {} has {} messages", session.id, session.len());
}

fn print_banner() {
    Output::header("Bible Assistant");
    println!("{}! How can I help you today?", greeting());
    println!(
        "{}",
        style("Type 'help' for the user guide, 'new' for a new chat, 'exit' to quit.").dim()
    );
}
