//! AssessRec - hybrid retrieval library for assessment recommendation
//!
//! # Architecture
//!
//! ```text
//! Items -> Embedder -> VectorIndex --save/load--> index dir
//!                          |
//! Query -> Embedder -> shortlist (2k nearest)
//!   |                      |
//!   +-> KeywordExtractor -> fused re-rank -> top-k
//!                                              |
//!                      TrainingCorpus -> RecallEvaluator
//! ```
//!
//! # Example
//!
//! ```ignore
//! use assessrec_lib::{embed::HashEmbedder, item::Item, search::HybridRetriever};
//!
//! let items = vec![
//!     Item::new("https://example.com/java-8", "Java 8 (New) knowledge test"),
//!     Item::new("https://example.com/opq", "Occupational personality questionnaire"),
//! ];
//!
//! let mut retriever = HybridRetriever::new(HashEmbedder::default());
//! retriever.build_index(&items)?;
//! retriever.save_index("models/index".as_ref())?;
//!
//! for hit in retriever.retrieve("Java developer, mid-level", 10, true)? {
//!     println!("{:.3} {}", hit.score, hit.id);
//! }
//! ```

pub mod config;
pub mod dataset;
pub mod embed;
pub mod error;
pub mod eval;
pub mod index;
pub mod item;
pub mod keyword;
pub mod search;

pub use error::{Error, Result};
