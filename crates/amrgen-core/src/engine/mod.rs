//! The generation engine.
//!
//! This module provides:
//! - **errors**: error type of every fallible operation
//! - **graph** / **roles**: the AMR graph arena and role-label helpers
//! - **beam**: bounded candidate lists
//! - **transition**: transitions, partial transition functions, predictions
//! - **oracle**: traits for the classifiers and the language model
//! - **lm**: cached, normalized sentence scoring
//! - **lexicon** / **rules**: lexical tables and hard-coded rules
//! - **structural**: stage 1, graph to tree
//! - **reorder**: permutation scoring
//! - **realize**: stage 2, the realization search
//! - **surface**: yield extraction
//! - **generate**: the pipeline
//! - **tables**: lookup-table oracles

pub mod beam;
pub mod errors;
pub mod generate;
pub mod graph;
pub mod lexicon;
pub mod lm;
pub mod oracle;
pub mod realize;
pub mod reorder;
pub mod roles;
pub mod rules;
pub mod structural;
pub mod surface;
pub mod tables;
pub mod transition;
