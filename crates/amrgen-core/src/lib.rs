//! # amrgen Core
//!
//! Transition-based generation of English sentences from Abstract Meaning
//! Representation graphs.
//!
//! Generation runs in two stages. Stage 1 rewrites the graph into a tree
//! with structural transitions (KEEP, DELETE, SWAP, MERGE). Stage 2 searches
//! bottom-up over word choice, word order and function-word insertion,
//! keeping an n-best beam per vertex and rescoring with a language model.
//! Every decision is scored by an oracle supplied by the caller.
//!
//! ## Example
//!
//! ```rust
//! use amrgen_core::{generate, AmrGraph, Hyperparameters, Resources, TableModel};
//!
//! let mut graph = AmrGraph::new();
//! let sleep = graph.add_vertex("sleep-01");
//! let boy = graph.add_vertex("boy");
//! graph.add_edge(sleep, boy, "ARG0").unwrap();
//!
//! let model = TableModel::default();
//! let generation = generate(
//!     graph,
//!     &model.oracles(),
//!     &Resources::default(),
//!     &Hyperparameters::default(),
//! )
//! .unwrap();
//! assert!(generation.text.ends_with('.'));
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod engine;

// Re-export commonly used types
pub use config::Hyperparameters;
pub use engine::errors::GenError;
pub use engine::generate::{generate, generate_batch, Generation, Generator};
pub use engine::graph::{AmrGraph, EdgeId, VertexId};
pub use engine::lexicon::Resources;
pub use engine::oracle::Oracles;
pub use engine::tables::TableModel;
