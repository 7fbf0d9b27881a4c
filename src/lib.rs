//! Bible Assistant - question answering over the Holy Bible
//!
//! A CLI and HTTP chat front end that answers questions about the Bible
//! from passages retrieved out of a vector index.
//!
//! # Overview
//!
//! Each question goes through two chains:
//! - A refinement chain rewrites the question into a focused search query
//! - A retrieval chain finds the nearest passages for that query and asks a
//!   hosted language model to answer from them
//!
//! Chat sessions keep an append-only log of the conversation.
//!
//! # Architecture
//!
//! - `config` - Settings, prompt templates and secrets
//! - `llm` - Chat model abstraction (Mistral)
//! - `embedding` - Embedding generation (Hugging Face)
//! - `vector_store` - Vector index abstraction (Pinecone, in-memory)
//! - `chain` - Refinement and retrieval chains, response normalization
//! - `pipeline` - The two-step query pipeline
//! - `session` - Chat log
//! - `cache` - Bounded response cache
//!
//! # Example
//!
//! ```rust,no_run
//! use bible_assistant::config::{Secrets, Settings};
//! use bible_assistant::pipeline::QueryPipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let secrets = Secrets::resolve(Some(&settings.secrets_path()))?;
//!     let pipeline = QueryPipeline::from_settings(&settings, &secrets)?;
//!
//!     let answer = pipeline.process_query("Who was Moses?").await?;
//!     println!("{}", answer.text);
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod chain;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod session;
pub mod vector_store;

#[cfg(test)]
mod testing;

pub use error::{AssistantError, Result};
