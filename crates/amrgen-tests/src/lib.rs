//! Shared fixtures for the amrgen integration and property tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use amrgen_core::engine::beam::Scored;
use amrgen_core::engine::lexicon::SuffixRealizer;
use amrgen_core::engine::oracle::{
    InsertionOracle, InsertionQuery, OrderItem, Oracles, ReorderOracle, VertexContext,
};
use amrgen_core::{AmrGraph, Resources, TableModel, VertexId};

const REFERENCE_MODEL: &str = include_str!("../fixtures/reference_model.json");
const REFERENCE_LEXICON: &str = include_str!("../fixtures/reference_lexicon.json");

/// Installs a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// The table model the end-to-end tests are written against.
pub fn reference_model() -> TableModel {
    TableModel::from_json_str(REFERENCE_MODEL).expect("reference model fixture parses")
}

/// Merge table, never-delete list and name table of the reference model.
pub fn reference_resources() -> Resources {
    Resources::from_json_str(REFERENCE_LEXICON, Box::new(SuffixRealizer))
        .expect("reference lexicon fixture parses")
}

/// `(v1 / want-01 :ARG0 (v2 / person :ARG0-of (v4 / develop-02))
///                :ARG1 (v3 / sleep-01 :ARG0 v2))`
pub fn developer_graph() -> AmrGraph {
    let mut g = AmrGraph::new();
    let want = g.add_vertex("want-01");
    let person = g.add_vertex("person");
    let sleep = g.add_vertex("sleep-01");
    let develop = g.add_vertex("develop-02");
    g.add_edge(want, person, "ARG0").expect("edge");
    g.add_edge(want, sleep, "ARG1").expect("edge");
    g.add_edge(person, develop, "ARG0-of").expect("edge");
    g.add_edge(sleep, person, "ARG0").expect("edge");
    g
}

/// `(b / bark-01 :ARG0 (d / dog))`
pub fn dog_graph() -> AmrGraph {
    let mut g = AmrGraph::new();
    let bark = g.add_vertex("bark-01");
    let dog = g.add_vertex("dog");
    g.add_edge(bark, dog, "ARG0").expect("edge");
    g
}

/// `(h / happy :domain (b / boy))`
pub fn happy_graph() -> AmrGraph {
    let mut g = AmrGraph::new();
    let happy = g.add_vertex("happy");
    let boy = g.add_vertex("boy");
    g.add_edge(happy, boy, "domain").expect("edge");
    g
}

/// `(a / and :op1 apple :op2 pear :op3 plum)`
pub fn coordination_graph() -> AmrGraph {
    let mut g = AmrGraph::new();
    let and = g.add_vertex("and");
    for (concept, label) in [("apple", "op1"), ("pear", "op2"), ("plum", "op3")] {
        let v = g.add_vertex(concept);
        g.add_edge(and, v, label).expect("edge");
    }
    g
}

/// A graph built from `(parent index, concept, label)` triples; entry 0 is
/// the root and every parent index must point to an earlier entry.
pub fn tree_from_edges(edges: &[(usize, &str, &str)]) -> AmrGraph {
    let mut g = AmrGraph::new();
    let mut ids: Vec<VertexId> = Vec::with_capacity(edges.len());
    for (i, (parent, concept, label)) in edges.iter().enumerate() {
        let v = g.add_vertex(concept);
        if i > 0 {
            g.add_edge(ids[*parent], v, label).expect("edge");
        }
        ids.push(v);
    }
    g
}

/// Wraps a table model and counts reorder and insertion queries.
pub struct CountingModel {
    pub inner: TableModel,
    pub reorder_calls: AtomicUsize,
    pub insertion_calls: AtomicUsize,
}

impl CountingModel {
    pub fn new(inner: TableModel) -> Self {
        Self {
            inner,
            reorder_calls: AtomicUsize::new(0),
            insertion_calls: AtomicUsize::new(0),
        }
    }

    pub fn oracles(&self) -> Oracles<'_> {
        Oracles {
            reorder: self,
            argument_insertion: self,
            general_insertion: self,
            ..self.inner.oracles()
        }
    }

    pub fn reorder_calls(&self) -> usize {
        self.reorder_calls.load(Ordering::SeqCst)
    }

    pub fn insertion_calls(&self) -> usize {
        self.insertion_calls.load(Ordering::SeqCst)
    }
}

impl ReorderOracle for CountingModel {
    fn precedes_head(&self, ctx: &VertexContext<'_>, item: &OrderItem<'_>) -> f64 {
        self.reorder_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.precedes_head(ctx, item)
    }

    fn precedes_left(&self, ctx: &VertexContext<'_>, a: &OrderItem<'_>, b: &OrderItem<'_>) -> f64 {
        self.reorder_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.precedes_left(ctx, a, b)
    }

    fn precedes_right(&self, ctx: &VertexContext<'_>, a: &OrderItem<'_>, b: &OrderItem<'_>) -> f64 {
        self.reorder_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.precedes_right(ctx, a, b)
    }
}

impl InsertionOracle for CountingModel {
    fn score_before(&self, query: &InsertionQuery<'_>) -> Vec<Scored<Option<String>>> {
        self.insertion_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.oracles().insertion_for(query.label).score_before(query)
    }

    fn score_after(&self, query: &InsertionQuery<'_>) -> Vec<Scored<Option<String>>> {
        self.insertion_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.oracles().insertion_for(query.label).score_after(query)
    }
}
