//! Transitions, partial transition functions and scored predictions.
//!
//! A *partial transition function* records every decision taken for the
//! vertices of a subtree: syntactic annotation, chosen word, article, the
//! words inserted around the subtree, the synthetic child, the order of the
//! vertex's slots and punctuation. Hypotheses of a parent are built by taking
//! the union of the functions of the child hypotheses they combine, plus the
//! parent's own decisions. Functions are immutable once built and shared
//! through `Arc`.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::engine::errors::GenError;
use crate::engine::graph::{EdgeId, VertexId};

/// Structural transitions applied by stage 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StructuralTransition {
    Keep,
    Delete,
    Swap,
    Merge,
}

impl fmt::Display for StructuralTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Keep => "KEEP",
            Self::Delete => "DELETE",
            Self::Swap => "SWAP",
            Self::Merge => "MERGE",
        };
        f.write_str(name)
    }
}

/// Grammatical number of a noun.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Number {
    Singular,
    Plural,
}

/// Tense of a verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tense {
    Present,
    Past,
    Future,
}

/// Voice of a verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    Active,
    Passive,
}

/// Article placed in front of a noun phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Denominator {
    The,
    A,
    None,
}

impl Denominator {
    /// Surface form; empty for [`Denominator::None`].
    pub fn as_str(self) -> &'static str {
        match self {
            Self::The => "the",
            Self::A => "a",
            Self::None => "",
        }
    }
}

/// Syntactic annotation a realization is conditioned on.
///
/// `number` is only set for nouns, `tense` and `voice` only for verbs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Syntax {
    pub pos: Arc<str>,
    pub number: Option<Number>,
    pub tense: Option<Tense>,
    pub voice: Option<Voice>,
}

impl Syntax {
    pub fn new(pos: &str) -> Self {
        Self {
            pos: Arc::from(pos),
            number: None,
            tense: None,
            voice: None,
        }
    }

    /// Penn tags starting with `NN`, excluding proper nouns.
    pub fn is_common_noun(&self) -> bool {
        is_common_noun(&self.pos)
    }

    pub fn is_noun(&self) -> bool {
        self.pos.starts_with("NN")
    }

    pub fn is_verb(&self) -> bool {
        self.pos.starts_with("VB")
    }
}

/// Returns true for `NN` and `NNS`.
pub fn is_common_noun(pos: &str) -> bool {
    pos == "NN" || pos == "NNS"
}

/// An element of a vertex's realization order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// The vertex's own realization (its instance edge).
    Own,
    /// A child subtree, reached through this edge.
    Child(EdgeId),
    /// The synthetic child proposed by INSERT_CHILD.
    Inserted,
}

/// Side of the head a child is realized on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelativePosition {
    Before,
    After,
}

/// Decisions recorded for one vertex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexDecisions {
    pub pos: Option<Arc<str>>,
    pub number: Option<Number>,
    pub tense: Option<Tense>,
    pub voice: Option<Voice>,
    pub realization: Option<String>,
    pub denominator: Option<Denominator>,
    pub insert_before: Option<String>,
    pub insert_after: Option<String>,
    pub inserted_child: Option<String>,
    pub reordering: Option<Vec<Slot>>,
    pub punctuation: Option<String>,
}

impl VertexDecisions {
    /// Records the syntactic annotation.
    pub fn with_syntax(mut self, syntax: &Syntax) -> Self {
        self.pos = Some(syntax.pos.clone());
        self.number = syntax.number;
        self.tense = syntax.tense;
        self.voice = syntax.voice;
        self
    }

    /// Field-wise union; fails if both sides set a field to different values.
    fn absorb(&mut self, vertex: VertexId, other: &VertexDecisions) -> Result<(), GenError> {
        macro_rules! absorb_field {
            ($($field:ident),*) => {
                $(
                    if matches!((&self.$field, &other.$field), (Some(a), Some(b)) if a != b) {
                        return Err(GenError::Internal(format!(
                            "conflicting {} for vertex {}: {:?} vs {:?}",
                            stringify!($field), vertex.0, self.$field, other.$field
                        )));
                    }
                    if self.$field.is_none() {
                        self.$field = other.$field.clone();
                    }
                )*
            };
        }
        absorb_field!(
            pos,
            number,
            tense,
            voice,
            realization,
            denominator,
            insert_before,
            insert_after,
            inserted_child,
            reordering,
            punctuation
        );
        Ok(())
    }
}

/// The accumulated decisions of a subtree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialTransitionFunction {
    decisions: FxHashMap<VertexId, VertexDecisions>,
}

impl PartialTransitionFunction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decisions recorded for a vertex.
    pub fn get(&self, v: VertexId) -> Option<&VertexDecisions> {
        self.decisions.get(&v)
    }

    /// Returns a copy extended with decisions for one vertex.
    pub fn with(&self, v: VertexId, decisions: VertexDecisions) -> Result<Self, GenError> {
        let mut out = self.clone();
        out.add(v, decisions)?;
        Ok(out)
    }

    fn add(&mut self, v: VertexId, decisions: VertexDecisions) -> Result<(), GenError> {
        match self.decisions.get_mut(&v) {
            Some(existing) => existing.absorb(v, &decisions),
            None => {
                self.decisions.insert(v, decisions);
                Ok(())
            }
        }
    }

    /// Union of two functions. Decisions for the same vertex are merged
    /// field-wise; a field set to different values on both sides is an
    /// internal error.
    pub fn union(&self, other: &PartialTransitionFunction) -> Result<Self, GenError> {
        let (mut out, smaller) = if self.decisions.len() >= other.decisions.len() {
            (self.clone(), other)
        } else {
            (other.clone(), self)
        };
        for (v, d) in &smaller.decisions {
            out.add(*v, d.clone())?;
        }
        Ok(out)
    }

    /// Number of vertices with recorded decisions.
    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    /// Vertices with recorded decisions, in id order.
    pub fn vertices(&self) -> Vec<VertexId> {
        let mut ids: Vec<VertexId> = self.decisions.keys().copied().collect();
        ids.sort();
        ids
    }
}

/// A scored hypothesis: realized text, total score, LM-free score, and the
/// decisions that produced it.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub text: String,
    pub score: f64,
    pub score_without_lm: f64,
    pub ptf: Arc<PartialTransitionFunction>,
}

impl Prediction {
    pub fn new(
        text: String,
        score: f64,
        score_without_lm: f64,
        ptf: PartialTransitionFunction,
    ) -> Self {
        Self {
            text,
            score,
            score_without_lm,
            ptf: Arc::new(ptf),
        }
    }

    /// A prediction with no recorded decisions.
    pub fn leaf(text: &str, score: f64, score_without_lm: f64) -> Self {
        Self::new(text.to_string(), score, score_without_lm, PartialTransitionFunction::new())
    }

    /// Number of whitespace-separated tokens in the text.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Joins non-empty fragments with single spaces.
pub fn join_tokens<'a, I>(parts: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = String::new();
    for part in parts {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(part);
    }
    out
}
