//! RAG (Retrieval-Augmented Generation) module.
//!
//! - `TextSplitter`: splits scraped text into bounded, overlapping chunks
//! - `MemoryVectorIndex`: ranks chunk embeddings by cosine similarity
//! - `Retriever` / `EmbeddingRetriever`: picks the chunks relevant to a question

pub mod retriever;
pub mod splitter;
pub mod vector_index;

pub use retriever::{EmbeddingRetriever, RetrievalError, RetrievedPassage, Retriever};
pub use splitter::{SplitterConfig, SplitterError, TextChunk, TextSplitter};
pub use vector_index::MemoryVectorIndex;
