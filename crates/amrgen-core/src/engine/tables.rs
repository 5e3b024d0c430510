//! # Table Oracles
//!
//! Lookup-table implementations of every oracle trait, loadable from JSON.
//!
//! Real deployments plug trained classifiers and an n-gram model in through
//! the traits of [`crate::engine::oracle`]. A [`TableModel`] covers the same
//! surface with hand-written distributions, which makes the engine usable in
//! tests, benchmarks and small demos without any model files.
//!
//! ## Key Lookup
//!
//! Distributions are keyed by concept. Where more context helps, a more
//! specific key is tried first:
//!
//! | table | keys, most specific first |
//! |-------|---------------------------|
//! | `realizations` | `"concept POS"`, `"concept"` |
//! | `head_order` | `"parent-concept label"`, `"label"` |
//! | insertion tables | `"label child-concept"`, `"label"` |
//! | `pair_order` | `"a b"`, or `1 - p("b a")` |
//!
//! Missing entries fall back to: KEEP for structure, the concept stem for
//! realization, 0.5 for order probabilities, and nothing for the other
//! distributions.
//!
//! ## Example
//!
//! ```rust
//! use amrgen_core::engine::tables::TableModel;
//!
//! let model = TableModel::from_json_str(r#"{
//!     "realizations": { "dog": [["dog", 0.9], ["hound", 0.1]] },
//!     "language_model": { "bigrams": { "<s> dog": -0.5 } }
//! }"#).unwrap();
//! let oracles = model.oracles();
//! # let _ = oracles;
//! ```

use std::path::Path;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::engine::beam::Scored;
use crate::engine::errors::GenError;
use crate::engine::lexicon::SuffixRealizer;
use crate::engine::oracle::{
    ChildInsertionOracle, DenominatorOracle, InsertionOracle, InsertionQuery, LanguageModel,
    OrderItem, Oracles, RealizationOracle, ReorderOracle, StructuralOracle, SyntaxOracle,
    VertexContext,
};
use crate::engine::transition::{Denominator, Number, StructuralTransition, Syntax, Tense, Voice};

type Distribution<T> = Vec<(T, f64)>;
type Table<T> = FxHashMap<String, Distribution<T>>;

const SENTENCE_START: &str = "<s>";
const SENTENCE_END: &str = "</s>";

fn scored<T: Clone>(list: Option<&Distribution<T>>) -> Vec<Scored<T>> {
    list.map(|l| l.iter().map(|(v, p)| Scored::new(v.clone(), *p)).collect())
        .unwrap_or_default()
}

/// INSERT_BETWEEN distributions for one class of edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsertionTable {
    pub before: Table<Option<String>>,
    pub after: Table<Option<String>>,
}

impl InsertionTable {
    fn lookup<'t>(
        table: &'t Table<Option<String>>,
        query: &InsertionQuery<'_>,
    ) -> Option<&'t Distribution<Option<String>>> {
        let concept = query
            .parent
            .graph
            .vertex(query.child)
            .map(|v| &*v.instance)
            .unwrap_or("");
        table
            .get(&format!("{} {}", query.label, concept))
            .or_else(|| table.get(query.label))
    }
}

impl InsertionOracle for InsertionTable {
    fn score_before(&self, query: &InsertionQuery<'_>) -> Vec<Scored<Option<String>>> {
        scored(Self::lookup(&self.before, query))
    }

    fn score_after(&self, query: &InsertionQuery<'_>) -> Vec<Scored<Option<String>>> {
        scored(Self::lookup(&self.after, query))
    }
}

/// Bigram language model with unigram back-off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BigramModel {
    /// `"w1 w2"` to log P(w2 | w1); `<s>` and `</s>` mark sentence bounds
    pub bigrams: FxHashMap<String, f64>,
    /// Log P(w)
    pub unigrams: FxHashMap<String, f64>,
    /// Log probability of an unseen unigram
    pub unknown: f64,
    /// Added to the unigram score when a bigram is unseen
    pub backoff: f64,
}

impl Default for BigramModel {
    fn default() -> Self {
        Self {
            bigrams: FxHashMap::default(),
            unigrams: FxHashMap::default(),
            unknown: -6.0,
            backoff: -1.0,
        }
    }
}

impl BigramModel {
    fn unigram(&self, word: &str) -> f64 {
        self.unigrams.get(word).copied().unwrap_or(self.unknown)
    }

    fn bigram(&self, prev: &str, word: &str) -> f64 {
        self.bigrams
            .get(&format!("{} {}", prev, word))
            .copied()
            .unwrap_or_else(|| self.unigram(word) + self.backoff)
    }
}

impl LanguageModel for BigramModel {
    fn log_prob(&self, tokens: &[&str], bounded_left: bool, bounded_right: bool) -> f64 {
        let mut prev = if bounded_left { Some(SENTENCE_START) } else { None };
        let mut total = 0.0;
        for &token in tokens {
            total += match prev {
                Some(p) => self.bigram(p, token),
                None => self.unigram(token),
            };
            prev = Some(token);
        }
        if bounded_right {
            if let Some(p) = prev {
                total += self.bigram(p, SENTENCE_END);
            }
        }
        total
    }
}

/// Every oracle as a lookup table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableModel {
    pub structural: Table<StructuralTransition>,
    pub pos: Table<String>,
    pub number: Table<Number>,
    pub tense: Table<Tense>,
    pub voice: Table<Voice>,
    pub realizations: Table<String>,
    pub child_insertions: Table<Option<String>>,
    pub head_order: FxHashMap<String, f64>,
    pub pair_order: FxHashMap<String, f64>,
    pub argument_insertion: InsertionTable,
    pub general_insertion: InsertionTable,
    pub denominators: Table<Denominator>,
    pub language_model: BigramModel,
}

impl TableModel {
    pub fn from_json_str(json: &str) -> Result<Self, GenError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, GenError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let model = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.as_ref().display(), "loaded table model");
        Ok(model)
    }

    /// Borrows the tables as an oracle bundle.
    pub fn oracles(&self) -> Oracles<'_> {
        Oracles {
            structural: self,
            syntax: self,
            realization: self,
            child_insertion: self,
            reorder: self,
            argument_insertion: &self.argument_insertion,
            general_insertion: &self.general_insertion,
            denominator: self,
            language_model: &self.language_model,
        }
    }

    fn pair(&self, a: &OrderItem<'_>, b: &OrderItem<'_>) -> f64 {
        if let Some(&p) = self.pair_order.get(&format!("{} {}", a.label, b.label)) {
            return p;
        }
        match self.pair_order.get(&format!("{} {}", b.label, a.label)) {
            Some(&p) => 1.0 - p,
            None => 0.5,
        }
    }
}

impl StructuralOracle for TableModel {
    fn score_transitions(&self, ctx: &VertexContext<'_>) -> Vec<Scored<StructuralTransition>> {
        match self.structural.get(ctx.concept()) {
            Some(list) => scored(Some(list)),
            None => vec![Scored::new(StructuralTransition::Keep, 1.0)],
        }
    }
}

impl SyntaxOracle for TableModel {
    fn pos(&self, ctx: &VertexContext<'_>) -> Vec<Scored<String>> {
        scored(self.pos.get(ctx.concept()))
    }

    fn number(&self, ctx: &VertexContext<'_>, _pos: &str) -> Vec<Scored<Number>> {
        scored(self.number.get(ctx.concept()))
    }

    fn tense(&self, ctx: &VertexContext<'_>, _pos: &str) -> Vec<Scored<Tense>> {
        scored(self.tense.get(ctx.concept()))
    }

    fn voice(&self, ctx: &VertexContext<'_>, _pos: &str) -> Vec<Scored<Voice>> {
        scored(self.voice.get(ctx.concept()))
    }
}

impl RealizationOracle for TableModel {
    fn score_candidates(&self, ctx: &VertexContext<'_>, syntax: &Syntax) -> Vec<Scored<String>> {
        let concept = ctx.concept();
        let list = self
            .realizations
            .get(&format!("{} {}", concept, syntax.pos))
            .or_else(|| self.realizations.get(concept));
        match list {
            Some(list) => scored(Some(list)),
            None => vec![Scored::new(SuffixRealizer::stem(concept).to_string(), 1.0)],
        }
    }
}

impl ChildInsertionOracle for TableModel {
    fn score(
        &self,
        ctx: &VertexContext<'_>,
        _realization: &str,
        _syntax: &Syntax,
    ) -> Vec<Scored<Option<String>>> {
        scored(self.child_insertions.get(ctx.concept()))
    }
}

impl ReorderOracle for TableModel {
    fn precedes_head(&self, ctx: &VertexContext<'_>, item: &OrderItem<'_>) -> f64 {
        self.head_order
            .get(&format!("{} {}", ctx.concept(), item.label))
            .or_else(|| self.head_order.get(item.label))
            .copied()
            .unwrap_or(0.5)
    }

    fn precedes_left(&self, _ctx: &VertexContext<'_>, a: &OrderItem<'_>, b: &OrderItem<'_>) -> f64 {
        self.pair(a, b)
    }

    fn precedes_right(
        &self,
        _ctx: &VertexContext<'_>,
        a: &OrderItem<'_>,
        b: &OrderItem<'_>,
    ) -> f64 {
        self.pair(a, b)
    }
}

impl DenominatorOracle for TableModel {
    fn score(&self, ctx: &VertexContext<'_>, _phrase: &str) -> Vec<Scored<Denominator>> {
        scored(self.denominators.get(ctx.concept()))
    }
}
