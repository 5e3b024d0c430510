//! Generation pipeline: stage 1, stage 2, best hypothesis.
//!
//! [`Generator`] bundles the oracles, lexical resources and hyperparameters
//! of a run with the n-gram cache they share. [`generate`] is the one-shot
//! form for a single graph.
//!
//! ## Parallelism
//!
//! With the `parallel` feature, [`Generator::generate_batch`] realizes
//! independent graphs on the rayon pool. Every graph is still searched
//! single-threaded; the only shared mutable state is the LM cache, which is
//! lock-protected. Results keep input order.

use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::Hyperparameters;
use crate::engine::errors::GenError;
use crate::engine::graph::AmrGraph;
use crate::engine::lexicon::Resources;
use crate::engine::lm::{CacheStats, NgramCache};
use crate::engine::oracle::Oracles;
use crate::engine::realize::RealizationSearch;
use crate::engine::structural::{StructuralProcessor, StructuralReport};
use crate::engine::transition::PartialTransitionFunction;

/// The result of generating one sentence.
#[derive(Debug, Clone)]
pub struct Generation {
    /// The realized sentence; empty if no hypothesis survived
    pub text: String,
    /// Total score of the winning hypothesis
    pub score: f64,
    /// Score without the language model term
    pub score_without_lm: f64,
    /// Decisions of the winning hypothesis
    pub ptf: Arc<PartialTransitionFunction>,
    /// The tree produced by stage 1
    pub graph: AmrGraph,
    pub report: StructuralReport,
}

/// Reusable generation context.
pub struct Generator<'a> {
    oracles: Oracles<'a>,
    resources: &'a Resources,
    params: &'a Hyperparameters,
    cache: NgramCache,
}

impl<'a> Generator<'a> {
    /// Validates the hyperparameters and creates a generator with an empty
    /// LM cache.
    pub fn new(
        oracles: Oracles<'a>,
        resources: &'a Resources,
        params: &'a Hyperparameters,
    ) -> Result<Self, GenError> {
        params.validate()?;
        Ok(Self {
            oracles,
            resources,
            params,
            cache: NgramCache::new(),
        })
    }

    /// Generates a sentence for `graph`.
    pub fn generate(&self, mut graph: AmrGraph) -> Result<Generation, GenError> {
        let span = tracing::info_span!("generate", vertices = graph.vertex_count());
        let _enter = span.enter();

        let report =
            StructuralProcessor::new(self.oracles.structural, self.resources).run(&mut graph)?;
        graph.validate_tree()?;

        let root_list = RealizationSearch::new(
            &graph,
            self.oracles,
            self.resources,
            self.params,
            &self.cache,
        )
        .run()?;

        let generation = match root_list.best() {
            Some(best) => Generation {
                text: best.text.clone(),
                score: best.score,
                score_without_lm: best.score_without_lm,
                ptf: best.ptf.clone(),
                graph,
                report,
            },
            None => {
                tracing::debug!("root has no hypothesis, returning empty text");
                Generation {
                    text: String::new(),
                    score: f64::NEG_INFINITY,
                    score_without_lm: f64::NEG_INFINITY,
                    ptf: Arc::new(PartialTransitionFunction::new()),
                    graph,
                    report,
                }
            }
        };
        tracing::debug!(text = %generation.text, score = generation.score, "generated");
        Ok(generation)
    }

    /// Generates every graph, in parallel with the `parallel` feature.
    /// Results keep input order.
    #[cfg(feature = "parallel")]
    pub fn generate_batch(&self, graphs: Vec<AmrGraph>) -> Vec<Result<Generation, GenError>> {
        graphs.into_par_iter().map(|g| self.generate(g)).collect()
    }

    /// Generates every graph sequentially. Results keep input order.
    #[cfg(not(feature = "parallel"))]
    pub fn generate_batch(&self, graphs: Vec<AmrGraph>) -> Vec<Result<Generation, GenError>> {
        graphs.into_iter().map(|g| self.generate(g)).collect()
    }

    /// Counters of the shared LM cache.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

/// Generates a sentence for one graph.
pub fn generate(
    graph: AmrGraph,
    oracles: &Oracles<'_>,
    resources: &Resources,
    params: &Hyperparameters,
) -> Result<Generation, GenError> {
    Generator::new(*oracles, resources, params)?.generate(graph)
}

/// Generates sentences for several graphs with one shared LM cache.
pub fn generate_batch(
    graphs: Vec<AmrGraph>,
    oracles: &Oracles<'_>,
    resources: &Resources,
    params: &Hyperparameters,
) -> Result<Vec<Result<Generation, GenError>>, GenError> {
    Ok(Generator::new(*oracles, resources, params)?.generate_batch(graphs))
}
