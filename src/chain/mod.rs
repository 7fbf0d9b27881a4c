//! The two chains behind every answer.
//!
//! A question is first rewritten into a search query by the
//! [`RefinementChain`], then answered by the [`RetrievalChain`] from the
//! passages nearest to that query. Both hand back a [`ChainOutput`] that is
//! normalised to text by key.

mod output;
pub mod refinement;
pub mod retrieval;
pub mod retriever;

pub use output::ChainOutput;
pub use refinement::{RefinementChain, REFINED_KEY};
pub use retrieval::{RetrievalChain, RetrievalOutput, RESULT_KEY};
pub use retriever::{stuff_passages, Retriever, DEFAULT_TOP_K};
