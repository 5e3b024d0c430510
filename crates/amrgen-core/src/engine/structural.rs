//! # Structural Transitions (stage 1)
//!
//! Rewrites the input graph into the tree the realization search walks.
//!
//! ## Execution Model
//!
//! 1. Reentrancies are uncoupled into link vertices
//! 2. Every vertex is queued in bottom-up order
//! 3. For the vertex at the front of the queue the oracle ranks KEEP, DELETE,
//!    SWAP and MERGE; the best *applicable* transition is applied, KEEP if
//!    none is
//! 4. After a SWAP the former parent and the swapped vertex go back to the
//!    front of the queue
//!
//! ## Termination
//!
//! A SWAP of an unordered pair `{v, parent}` happens at most once per pass,
//! and MERGE removes a vertex, so the queue drains for every finite graph.
//!
//! ## Determinism
//!
//! The queue order follows outgoing edge order and oracle ties keep the
//! oracle's order, so the same graph and oracle always give the same tree.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::engine::beam::Scored;
use crate::engine::errors::GenError;
use crate::engine::graph::{AmrGraph, VertexId};
use crate::engine::lexicon::Resources;
use crate::engine::oracle::{StructuralOracle, VertexContext};
use crate::engine::transition::StructuralTransition;

/// What stage 1 did to a graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuralReport {
    /// Link vertices created for reentrant edges
    pub links: Vec<VertexId>,
    /// Transitions applied, in order
    pub applied: Vec<(VertexId, StructuralTransition)>,
    /// `(former parent, swapped vertex)` pairs
    pub swaps: Vec<(VertexId, VertexId)>,
    /// `(kept parent, absorbed vertex)` pairs
    pub merges: Vec<(VertexId, VertexId)>,
}

impl StructuralReport {
    /// Number of applications of one transition.
    pub fn count(&self, transition: StructuralTransition) -> usize {
        self.applied.iter().filter(|(_, t)| *t == transition).count()
    }
}

/// Applies structural transitions to a graph.
pub struct StructuralProcessor<'a> {
    oracle: &'a dyn StructuralOracle,
    resources: &'a Resources,
}

impl<'a> StructuralProcessor<'a> {
    pub fn new(oracle: &'a dyn StructuralOracle, resources: &'a Resources) -> Self {
        Self { oracle, resources }
    }

    /// Runs stage 1 on `graph` in place.
    pub fn run(&self, graph: &mut AmrGraph) -> Result<StructuralReport, GenError> {
        let mut report = StructuralReport {
            links: graph.uncouple_reentrancies(),
            ..Default::default()
        };
        let mut queue: VecDeque<VertexId> = graph.bottom_up_order().into();
        let mut swapped: FxHashSet<(VertexId, VertexId)> = FxHashSet::default();

        while let Some(v) = queue.pop_front() {
            let Some(vertex) = graph.vertex(v) else {
                continue;
            };
            if vertex.removed || vertex.is_link() {
                continue;
            }

            let mut ranked = self.oracle.score_transitions(&VertexContext::new(graph, v));
            ranked.sort_by(|a, b| b.prob.total_cmp(&a.prob));
            let transition = ranked
                .iter()
                .map(|s: &Scored<StructuralTransition>| s.value)
                .find(|&t| self.is_applicable(graph, v, t, &swapped))
                .unwrap_or(StructuralTransition::Keep);

            match transition {
                StructuralTransition::Keep => {}
                StructuralTransition::Delete => {
                    graph.annotation_mut(v)?.deleted = true;
                }
                StructuralTransition::Swap => {
                    let (_, parent) = graph.parent(v).ok_or_else(|| {
                        GenError::Internal(format!("swap of parentless vertex {}", v.0))
                    })?;
                    graph.swap(parent, v)?;
                    swapped.insert(unordered(v, parent));
                    queue.retain(|&q| q != v && q != parent);
                    queue.push_front(v);
                    queue.push_front(parent);
                    report.swaps.push((parent, v));
                    tracing::trace!(vertex = v.0, parent = parent.0, "swap");
                }
                StructuralTransition::Merge => {
                    let (_, parent) = graph.parent(v).ok_or_else(|| {
                        GenError::Internal(format!("merge of parentless vertex {}", v.0))
                    })?;
                    let result = self
                        .merge_result(graph, parent, v)
                        .cloned()
                        .ok_or_else(|| {
                            GenError::Internal(format!("no merge entry for vertex {}", v.0))
                        })?;
                    graph.merge(parent, v, &result)?;
                    report.merges.push((parent, v));
                    tracing::trace!(
                        vertex = v.0,
                        parent = parent.0,
                        concept = %result.concept,
                        "merge"
                    );
                }
            }
            report.applied.push((v, transition));
        }

        tracing::debug!(
            links = report.links.len(),
            keep = report.count(StructuralTransition::Keep),
            delete = report.count(StructuralTransition::Delete),
            swap = report.swaps.len(),
            merge = report.merges.len(),
            "structural pass finished"
        );
        Ok(report)
    }

    fn is_applicable(
        &self,
        graph: &AmrGraph,
        v: VertexId,
        transition: StructuralTransition,
        swapped: &FxHashSet<(VertexId, VertexId)>,
    ) -> bool {
        let Some(vertex) = graph.vertex(v) else {
            return false;
        };
        match transition {
            StructuralTransition::Keep => true,
            StructuralTransition::Delete => self.resources.can_delete(&vertex.instance),
            StructuralTransition::Swap => match graph.parent(v) {
                Some((_, parent)) => {
                    !swapped.contains(&unordered(v, parent))
                        && graph.vertex(parent).map(|p| p.name.is_none()).unwrap_or(false)
                }
                None => false,
            },
            StructuralTransition::Merge => graph
                .parent(v)
                .map(|(_, parent)| self.merge_result(graph, parent, v).is_some())
                .unwrap_or(false),
        }
    }

    fn merge_result(
        &self,
        graph: &AmrGraph,
        parent: VertexId,
        child: VertexId,
    ) -> Option<&'a crate::engine::graph::MergeResult> {
        let parent_concept = &*graph.vertex(parent)?.instance;
        let child_concept = &*graph.vertex(child)?.instance;
        self.resources.merges.get(parent_concept, child_concept)
    }
}

fn unordered(a: VertexId, b: VertexId) -> (VertexId, VertexId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
