//! Hard-coded linguistic rules applied around the classifiers.
//!
//! - **Article disallow list**: noun phrases that never take an article
//!   (pronouns, numbers, names, phrases already determined by a child)
//! - **Passive auxiliaries**: `is`/`are`/`was`/`were` inserted after the
//!   subject of a `:domain`-governed predicate
//! - **Punctuation**: the token closing a sentence-boundary phrase

use crate::engine::graph::{AmrGraph, Mode, VertexId};
use crate::engine::roles::AMR_UNKNOWN;
use crate::engine::transition::{Number, Tense};

const PRONOUNS: &[&str] = &[
    "i", "you", "he", "she", "it", "we", "they", "this", "that", "these", "those", "everyone",
    "everything", "someone", "something", "anyone", "anything", "nobody", "nothing",
];

/// Child roles whose presence already determines the noun phrase.
const DETERMINING_ROLES: &[&str] = &["poss", "quant"];

/// `:mod` children that act as determiners.
const DETERMINER_MODIFIERS: &[&str] = &[
    "this", "that", "these", "those", "any", "each", "every", "some", "no", "all", "another",
    "other", "such",
];

/// Phrases longer than this get a full stop even when not last.
const SHORT_PHRASE_WORDS: usize = 4;

/// Returns true if the noun phrase headed by `v` must not receive an article.
pub fn article_disallowed(graph: &AmrGraph, v: VertexId) -> bool {
    let Some(vertex) = graph.vertex(v) else {
        return true;
    };
    if vertex.name.is_some() || vertex.is_link() {
        return true;
    }
    let concept = &*vertex.instance;
    if PRONOUNS.contains(&concept) || concept == AMR_UNKNOWN || is_numeric(concept) {
        return true;
    }
    graph.children(v).any(|(e, child)| {
        let Some(edge) = graph.edge(e) else {
            return false;
        };
        let label = &*edge.label;
        if DETERMINING_ROLES.contains(&label) {
            return true;
        }
        label == "mod"
            && graph
                .vertex(child)
                .map(|c| DETERMINER_MODIFIERS.contains(&&*c.instance))
                .unwrap_or(false)
    })
}

fn is_numeric(concept: &str) -> bool {
    !concept.is_empty() && concept.parse::<f64>().is_ok()
}

/// Auxiliary inserted after the subject of a `:domain` predicate.
///
/// | number \ tense | present | past | future |
/// |----------------|---------|------|--------|
/// | singular       | is      | was  | will be|
/// | plural         | are     | were | will be|
///
/// Missing number counts as singular, missing tense as present.
pub fn passive_auxiliary(number: Option<Number>, tense: Option<Tense>) -> &'static str {
    match (number.unwrap_or(Number::Singular), tense.unwrap_or(Tense::Present)) {
        (_, Tense::Future) => "will be",
        (Number::Singular, Tense::Present) => "is",
        (Number::Plural, Tense::Present) => "are",
        (Number::Singular, Tense::Past) => "was",
        (Number::Plural, Tense::Past) => "were",
    }
}

/// Returns true if the sentence headed by `v` is a question: interrogative
/// mode or an `amr-unknown` child.
pub fn is_question(graph: &AmrGraph, v: VertexId) -> bool {
    let interrogative = graph
        .vertex(v)
        .map(|vx| vx.mode == Some(Mode::Interrogative))
        .unwrap_or(false);
    interrogative
        || graph.children(v).any(|(_, c)| {
            graph
                .vertex(c)
                .map(|cv| &*cv.instance == AMR_UNKNOWN)
                .unwrap_or(false)
        })
}

/// Punctuation closing a sentence-boundary phrase of `words` tokens.
pub fn punctuation(question: bool, words: usize, is_last: bool) -> &'static str {
    if question {
        "?"
    } else if words > SHORT_PHRASE_WORDS || is_last {
        "."
    } else {
        ","
    }
}
