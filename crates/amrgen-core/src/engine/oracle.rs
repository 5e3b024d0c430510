//! Scoring oracles consumed by the generation engine.
//!
//! The classifiers and the language model are external collaborators. The
//! engine only sees them through these traits, injected per call via
//! [`Oracles`], so tests can substitute lookup tables
//! ([`crate::engine::tables::TableModel`]).
//!
//! Every oracle returns probabilities in `(0, 1]`; the engine ranks, prunes
//! and takes logarithms. Oracles must be deterministic functions of their
//! input.

use crate::engine::beam::Scored;
use crate::engine::graph::{AmrGraph, Mode, Vertex, VertexId};
use crate::engine::transition::{
    Denominator, Number, RelativePosition, StructuralTransition, Syntax, Tense, Voice,
};

/// Read-only view of a vertex and its neighbourhood handed to oracles.
#[derive(Debug, Clone, Copy)]
pub struct VertexContext<'a> {
    pub graph: &'a AmrGraph,
    pub vertex: VertexId,
}

impl<'a> VertexContext<'a> {
    pub fn new(graph: &'a AmrGraph, vertex: VertexId) -> Self {
        Self { graph, vertex }
    }

    /// The vertex record, if it exists.
    pub fn get(&self) -> Option<&'a Vertex> {
        self.graph.vertex(self.vertex)
    }

    /// Concept of the vertex; empty for unknown ids.
    pub fn concept(&self) -> &'a str {
        self.get().map(|v| &*v.instance).unwrap_or("")
    }

    pub fn name(&self) -> Option<&'a str> {
        self.get().and_then(|v| v.name.as_deref())
    }

    pub fn mode(&self) -> Option<Mode> {
        self.get().and_then(|v| v.mode)
    }

    pub fn is_deleted(&self) -> bool {
        self.get().map(|v| v.annotation.deleted).unwrap_or(false)
    }

    /// Label of the edge from the parent.
    pub fn incoming_label(&self) -> Option<&'a str> {
        self.graph.incoming_label(self.vertex)
    }

    /// Concept of the parent vertex.
    pub fn parent_concept(&self) -> Option<&'a str> {
        let (_, parent) = self.graph.parent(self.vertex)?;
        self.graph.vertex(parent).map(|v| &*v.instance)
    }

    /// `(label, concept)` of every child in edge order.
    pub fn child_roles(&self) -> Vec<(&'a str, &'a str)> {
        let graph = self.graph;
        graph
            .children(self.vertex)
            .filter_map(|(e, c)| {
                let label = &*graph.edge(e)?.label;
                let concept = &*graph.vertex(c)?.instance;
                Some((label, concept))
            })
            .collect()
    }
}

/// One element of a permutation as seen by the reorder classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderItem<'a> {
    /// Edge label; the concept for the vertex's own slot, `inserted` for a
    /// synthetic child
    pub label: &'a str,
    pub concept: &'a str,
    /// Best realization of the item's subtree
    pub realization: &'a str,
    pub inserted: bool,
}

/// Input of an INSERT_BETWEEN decision.
#[derive(Debug, Clone, Copy)]
pub struct InsertionQuery<'a> {
    /// The parent whose slots are being composed
    pub parent: VertexContext<'a>,
    pub child: VertexId,
    pub label: &'a str,
    pub position: RelativePosition,
    /// Text accumulated to the left of the child
    pub from_text: &'a str,
    /// Realization of the child subtree
    pub to_text: &'a str,
}

/// Ranks KEEP / DELETE / SWAP / MERGE for a vertex.
pub trait StructuralOracle: Send + Sync {
    fn score_transitions(&self, ctx: &VertexContext<'_>) -> Vec<Scored<StructuralTransition>>;
}

/// Predicts the syntactic annotation of a vertex.
pub trait SyntaxOracle: Send + Sync {
    fn pos(&self, ctx: &VertexContext<'_>) -> Vec<Scored<String>>;
    fn number(&self, ctx: &VertexContext<'_>, pos: &str) -> Vec<Scored<Number>>;
    fn tense(&self, ctx: &VertexContext<'_>, pos: &str) -> Vec<Scored<Tense>>;
    fn voice(&self, ctx: &VertexContext<'_>, pos: &str) -> Vec<Scored<Voice>>;
}

/// REALIZE: candidate words for a vertex under a syntactic annotation.
pub trait RealizationOracle: Send + Sync {
    fn score_candidates(&self, ctx: &VertexContext<'_>, syntax: &Syntax) -> Vec<Scored<String>>;
}

/// INSERT_CHILD: an optional function word attached under the vertex.
/// `None` means no insertion.
pub trait ChildInsertionOracle: Send + Sync {
    fn score(
        &self,
        ctx: &VertexContext<'_>,
        realization: &str,
        syntax: &Syntax,
    ) -> Vec<Scored<Option<String>>>;
}

/// REORDER: pairwise order probabilities.
pub trait ReorderOracle: Send + Sync {
    /// Probability that `item` is realized before the vertex's own word.
    fn precedes_head(&self, ctx: &VertexContext<'_>, item: &OrderItem<'_>) -> f64;
    /// Probability that `a` precedes `b`, both left of the head.
    fn precedes_left(&self, ctx: &VertexContext<'_>, a: &OrderItem<'_>, b: &OrderItem<'_>) -> f64;
    /// Probability that `a` precedes `b`, both right of the head.
    fn precedes_right(&self, ctx: &VertexContext<'_>, a: &OrderItem<'_>, b: &OrderItem<'_>) -> f64;
}

/// INSERT_BETWEEN: words placed before and after a child phrase.
/// `None` means nothing is inserted on that side.
pub trait InsertionOracle: Send + Sync {
    fn score_before(&self, query: &InsertionQuery<'_>) -> Vec<Scored<Option<String>>>;
    fn score_after(&self, query: &InsertionQuery<'_>) -> Vec<Scored<Option<String>>>;
}

/// Article choice for a noun phrase.
pub trait DenominatorOracle: Send + Sync {
    fn score(&self, ctx: &VertexContext<'_>, phrase: &str) -> Vec<Scored<Denominator>>;
}

/// n-gram language model.
pub trait LanguageModel: Send + Sync {
    /// Total natural-log probability of the tokens. `bounded_left` and
    /// `bounded_right` add sentence start/end context.
    fn log_prob(&self, tokens: &[&str], bounded_left: bool, bounded_right: bool) -> f64;
}

/// The oracles of one generation run.
#[derive(Clone, Copy)]
pub struct Oracles<'a> {
    pub structural: &'a dyn StructuralOracle,
    pub syntax: &'a dyn SyntaxOracle,
    pub realization: &'a dyn RealizationOracle,
    pub child_insertion: &'a dyn ChildInsertionOracle,
    pub reorder: &'a dyn ReorderOracle,
    /// Used for edges with core roles (`ARGn`)
    pub argument_insertion: &'a dyn InsertionOracle,
    /// Used for all other edges
    pub general_insertion: &'a dyn InsertionOracle,
    pub denominator: &'a dyn DenominatorOracle,
    pub language_model: &'a dyn LanguageModel,
}

impl<'a> Oracles<'a> {
    /// Picks the insertion oracle for an edge label.
    pub fn insertion_for(&self, label: &str) -> &'a dyn InsertionOracle {
        if crate::engine::roles::is_core_role(label) {
            self.argument_insertion
        } else {
            self.general_insertion
        }
    }
}
