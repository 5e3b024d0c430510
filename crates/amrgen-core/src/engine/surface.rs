//! Yield extraction: rebuilds the sentence from a partial transition
//! function.
//!
//! The search carries the realized text along with every hypothesis, so this
//! is not needed to produce output. It is the independent check that a
//! partial transition function fully determines its sentence, and it applies
//! the one correction the search cannot make locally: an article recorded
//! for a vertex whose final POS is not a common noun is dropped.

use crate::engine::graph::{AmrGraph, VertexId};
use crate::engine::transition::{
    is_common_noun, join_tokens, Denominator, PartialTransitionFunction, Slot,
};

/// Returns the sentence encoded by `ptf` for the tree under the root.
pub fn extract_yield(graph: &AmrGraph, ptf: &PartialTransitionFunction) -> String {
    if graph.is_empty() {
        return String::new();
    }
    phrase(graph, ptf, graph.root())
}

/// Returns the phrase of the subtree under `v`, without the words its parent
/// inserts around it.
pub fn phrase(graph: &AmrGraph, ptf: &PartialTransitionFunction, v: VertexId) -> String {
    let Some(decisions) = ptf.get(v) else {
        return String::new();
    };
    let own = decisions.realization.as_deref().unwrap_or("");

    let body = match &decisions.reordering {
        Some(order) => {
            let parts: Vec<String> = order
                .iter()
                .map(|slot| match *slot {
                    Slot::Own => own.to_string(),
                    Slot::Inserted => decisions.inserted_child.clone().unwrap_or_default(),
                    Slot::Child(e) => match graph.edge(e) {
                        Some(edge) => wrapped(graph, ptf, edge.to),
                        None => String::new(),
                    },
                })
                .collect();
            join_tokens(parts.iter().map(String::as_str))
        }
        None => own.to_string(),
    };

    let article = match decisions.denominator {
        Some(d) if d != Denominator::None => {
            let noun = decisions.pos.as_deref().map(is_common_noun).unwrap_or(false);
            if noun {
                d.as_str()
            } else {
                ""
            }
        }
        _ => "",
    };
    let punctuation = decisions.punctuation.as_deref().unwrap_or("");
    join_tokens([article, body.as_str(), punctuation])
}

fn wrapped(graph: &AmrGraph, ptf: &PartialTransitionFunction, child: VertexId) -> String {
    let inner = phrase(graph, ptf, child);
    let (before, after) = ptf
        .get(child)
        .map(|d| (d.insert_before.as_deref(), d.insert_after.as_deref()))
        .unwrap_or((None, None));
    join_tokens([before.unwrap_or(""), inner.as_str(), after.unwrap_or("")])
}
