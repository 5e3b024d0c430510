//! # Realization Search (stage 2)
//!
//! Bottom-up dynamic program over the stage-1 tree. Every vertex gets a
//! [`CandidateList`] of realizations of its subtree; a parent combines the
//! lists of its children.
//!
//! ## Per-vertex Pipeline
//!
//! 1. **Syntax**: POS n-best, then number (nouns) or tense and voice (verbs)
//! 2. **Realize**: candidate words for each syntactic annotation; proper
//!    names come from the name table, links are restricted to the forms the
//!    default realizer allows for their original
//! 3. **Insert child**: an optional synthetic function word
//! 4. **Reorder**: n-best permutations of own slot, children and inserted
//!    child
//! 5. **Compose**: left-to-right walk over the slots with a beam; every child
//!    hypothesis is wrapped in INSERT_BETWEEN words
//! 6. **Denominator**: article for common-noun phrases
//! 7. **Punctuation**: closing token at sentence boundaries
//!
//! ## Scoring
//!
//! `score = LM-free score + w_lm * normalized LM score of the text`, where
//! the LM-free score is the weighted sum of the log probabilities of every
//! decision in the hypothesis (children included). The LM term is always
//! recomputed on the full text of the hypothesis.
//!
//! Oracle failures never abort the search: an empty realization list becomes
//! a placeholder with score [`PLACEHOLDER_SCORE`], and a child without
//! hypotheses contributes nothing to its parent.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::config::Hyperparameters;
use crate::engine::beam::{prune, BeamWidth, CandidateList, Scored};
use crate::engine::errors::GenError;
use crate::engine::graph::{AmrGraph, Edge, EdgeId, Vertex, VertexId};
use crate::engine::lexicon::Resources;
use crate::engine::lm::{NgramCache, SentenceScorer};
use crate::engine::oracle::{InsertionQuery, OrderItem, Oracles, VertexContext};
use crate::engine::reorder::ReorderScorer;
use crate::engine::roles::{self, MULTI_SENTENCE};
use crate::engine::rules;
use crate::engine::transition::{
    is_common_noun, join_tokens, Denominator, PartialTransitionFunction, Prediction,
    RelativePosition, Slot, Syntax, VertexDecisions,
};

/// Natural log of the smallest positive subnormal `f64`; the score of the
/// empty placeholder used when an oracle proposes nothing.
pub const PLACEHOLDER_SCORE: f64 = -744.4400719213812;

/// POS assumed when the syntax oracle proposes nothing.
const FALLBACK_POS: &str = "NN";

/// Label of the inserted child's slot as seen by the reorder oracle.
const INSERTED_LABEL: &str = "inserted";

const TOP_ONE: BeamWidth = BeamWidth::new(1, f64::INFINITY);

/// A realization of a vertex's own slot.
#[derive(Debug, Clone)]
struct OwnCandidate {
    syntax: Option<Syntax>,
    text: String,
    /// Weighted syntax and realization log probabilities
    score: f64,
}

/// Words placed around a child phrase.
#[derive(Debug, Clone)]
struct Insertion {
    before: Option<String>,
    after: Option<String>,
    score: f64,
}

/// The stage 2 search over one tree.
pub struct RealizationSearch<'a> {
    graph: &'a AmrGraph,
    oracles: Oracles<'a>,
    resources: &'a Resources,
    params: &'a Hyperparameters,
    scorer: SentenceScorer<'a>,
    lists: FxHashMap<VertexId, CandidateList>,
}

impl<'a> RealizationSearch<'a> {
    pub fn new(
        graph: &'a AmrGraph,
        oracles: Oracles<'a>,
        resources: &'a Resources,
        params: &'a Hyperparameters,
        cache: &'a NgramCache,
    ) -> Self {
        Self {
            graph,
            oracles,
            resources,
            params,
            scorer: SentenceScorer::new(oracles.language_model, cache, params.article_word_weight),
            lists: FxHashMap::default(),
        }
    }

    /// Realizes every vertex bottom-up and returns the root's list.
    pub fn run(&mut self) -> Result<CandidateList, GenError> {
        for v in self.graph.bottom_up_order() {
            let list = self.process(v)?;
            if list.is_empty() {
                tracing::debug!(vertex = v.0, "no admissible hypothesis");
            } else {
                tracing::trace!(
                    vertex = v.0,
                    hypotheses = list.len(),
                    best = ?list.best().map(|p| p.text.as_str()),
                    "realized vertex"
                );
            }
            self.lists.insert(v, list);
        }
        Ok(self
            .lists
            .get(&self.graph.root())
            .cloned()
            .unwrap_or_else(|| CandidateList::new(self.params.beams.composition)))
    }

    /// The hypotheses computed for a vertex.
    pub fn list(&self, v: VertexId) -> Option<&CandidateList> {
        self.lists.get(&v)
    }

    fn process(&self, v: VertexId) -> Result<CandidateList, GenError> {
        let vertex = self.graph.get(v)?;
        if &*vertex.instance == MULTI_SENTENCE {
            return self.multi_sentence(v);
        }
        let ctx = VertexContext::new(self.graph, v);
        let children: Vec<EdgeId> = self.graph.children(v).map(|(e, _)| e).collect();

        let mut list = CandidateList::new(self.params.beams.composition);
        for own in self.own_candidates(&ctx, vertex) {
            for (inserted, insert_score) in self.child_insertions(&ctx, &own) {
                let slots = initial_slots(vertex.annotation.deleted, &children, inserted.is_some());
                for (order, order_score) in self.orders(&ctx, &slots, &own, inserted.as_deref()) {
                    let mut decisions = VertexDecisions {
                        realization: Some(own.text.clone()),
                        inserted_child: inserted.clone(),
                        reordering: Some(order.clone()),
                        ..Default::default()
                    };
                    if let Some(syntax) = &own.syntax {
                        decisions = decisions.with_syntax(syntax);
                    }
                    let base = own.score + insert_score + order_score;
                    self.compose(
                        &ctx,
                        &own,
                        inserted.as_deref(),
                        &order,
                        base,
                        decisions,
                        &mut list,
                    )?;
                }
            }
        }
        self.finish(&ctx, vertex, list)
    }

    fn syntaxes(&self, ctx: &VertexContext<'_>, vertex: &Vertex) -> Vec<(Syntax, f64)> {
        let w = &self.params.weights;
        let mut tags: Vec<(String, f64)> = match &vertex.pos {
            Some(pos) => vec![(pos.to_string(), 0.0)],
            None => prune(self.oracles.syntax.pos(ctx), self.params.beams.pos)
                .into_iter()
                .map(|s| {
                    let lp = s.log_prob();
                    (s.value, lp)
                })
                .collect(),
        };
        if tags.is_empty() {
            tags.push((FALLBACK_POS.to_string(), 0.0));
        }

        tags.into_iter()
            .map(|(pos, pos_lp)| {
                let mut syntax = Syntax::new(&pos);
                let mut score = w.pos * pos_lp;
                if syntax.is_noun() {
                    if let Some(best) = top(self.oracles.syntax.number(ctx, &pos)) {
                        syntax.number = Some(best.value);
                        score += w.number * best.log_prob();
                    }
                }
                if syntax.is_verb() {
                    if let Some(best) = top(self.oracles.syntax.tense(ctx, &pos)) {
                        syntax.tense = Some(best.value);
                        score += w.tense * best.log_prob();
                    }
                    if let Some(best) = top(self.oracles.syntax.voice(ctx, &pos)) {
                        syntax.voice = Some(best.value);
                        score += w.voice * best.log_prob();
                    }
                }
                (syntax, score)
            })
            .collect()
    }

    fn own_candidates(&self, ctx: &VertexContext<'_>, vertex: &Vertex) -> Vec<OwnCandidate> {
        if vertex.annotation.deleted {
            return vec![OwnCandidate {
                syntax: None,
                text: String::new(),
                score: 0.0,
            }];
        }
        let w = self.params.weights.realization;
        let width = self.params.beams.realization;
        let syntaxes = self.syntaxes(ctx, vertex);
        let mut out = Vec::new();

        if let Some(name) = &vertex.name {
            let mut options = self.resources.proper_names.candidates(&vertex.instance, name);
            if options.is_empty() {
                options.push(Scored::new(self.resources.realizer.name_realization(name), 1.0));
            }
            if let Some((syntax, syntax_score)) = syntaxes.first() {
                for scored in prune(options, width) {
                    out.push(own_candidate(syntax, *syntax_score, w, scored));
                }
            }
        } else if let Some(original) = vertex.annotation.original {
            let allowed = self
                .graph
                .vertex(original)
                .map(|o| self.resources.realizer.link_realizations(o))
                .unwrap_or_default();
            for (syntax, syntax_score) in &syntaxes {
                let filtered: Vec<Scored<String>> = self
                    .oracles
                    .realization
                    .score_candidates(ctx, syntax)
                    .into_iter()
                    .filter(|s| allowed.contains(&s.value))
                    .collect();
                for scored in prune(filtered, width) {
                    out.push(own_candidate(syntax, *syntax_score, w, scored));
                }
            }
            if out.is_empty() && !allowed.is_empty() {
                let p = 1.0 / allowed.len() as f64;
                if let Some((syntax, syntax_score)) = syntaxes.first() {
                    for form in allowed {
                        out.push(own_candidate(syntax, *syntax_score, w, Scored::new(form, p)));
                    }
                }
            }
        } else {
            for (syntax, syntax_score) in &syntaxes {
                let candidates = self.oracles.realization.score_candidates(ctx, syntax);
                for scored in prune(candidates, width) {
                    out.push(own_candidate(syntax, *syntax_score, w, scored));
                }
            }
        }

        if out.is_empty() {
            tracing::debug!(
                vertex = ctx.vertex.0,
                concept = ctx.concept(),
                "no realization, using placeholder"
            );
            out.push(OwnCandidate {
                syntax: syntaxes.into_iter().next().map(|(s, _)| s),
                text: String::new(),
                score: PLACEHOLDER_SCORE,
            });
        }
        out
    }

    fn child_insertions(
        &self,
        ctx: &VertexContext<'_>,
        own: &OwnCandidate,
    ) -> Vec<(Option<String>, f64)> {
        let Some(syntax) = &own.syntax else {
            return vec![(None, 0.0)];
        };
        let ranked = prune(
            self.oracles.child_insertion.score(ctx, &own.text, syntax),
            self.params.beams.child_insertion,
        );
        if ranked.is_empty() {
            return vec![(None, 0.0)];
        }
        let w = self.params.weights.insert_child;
        ranked
            .into_iter()
            .map(|s| {
                let score = w * s.log_prob();
                (non_empty(s.value), score)
            })
            .collect()
    }

    fn orders(
        &self,
        ctx: &VertexContext<'_>,
        slots: &[Slot],
        own: &OwnCandidate,
        inserted: Option<&str>,
    ) -> Vec<(Vec<Slot>, f64)> {
        if slots.len() <= 1 {
            return vec![(slots.to_vec(), 0.0)];
        }
        if slots.len() > self.params.max_reorder_degree {
            tracing::debug!(
                vertex = ctx.vertex.0,
                slots = slots.len(),
                max = self.params.max_reorder_degree,
                "too many slots, keeping identity order"
            );
            return vec![(slots.to_vec(), 0.0)];
        }
        let items: Vec<OrderItem<'_>> = slots
            .iter()
            .map(|&slot| self.order_item(ctx.vertex, slot, own, inserted))
            .collect();
        let head = slots.iter().position(|s| *s == Slot::Own);
        let scorer = ReorderScorer::new(self.oracles.reorder, self.params.beams.reorder);
        let best = scorer.best_orders(ctx, &items, head);
        if best.is_empty() {
            return vec![(slots.to_vec(), 0.0)];
        }
        let w = self.params.weights.reorder;
        best.into_vec()
            .into_iter()
            .map(|(perm, lp)| (perm.iter().map(|&i| slots[i]).collect(), w * lp))
            .collect()
    }

    fn order_item<'s>(
        &'s self,
        v: VertexId,
        slot: Slot,
        own: &'s OwnCandidate,
        inserted: Option<&'s str>,
    ) -> OrderItem<'s> {
        let concept = self.graph.vertex(v).map(|vx| &*vx.instance).unwrap_or("");
        match slot {
            Slot::Own => OrderItem {
                label: concept,
                concept,
                realization: &own.text,
                inserted: false,
            },
            Slot::Inserted => {
                let text = inserted.unwrap_or("");
                OrderItem {
                    label: INSERTED_LABEL,
                    concept: text,
                    realization: text,
                    inserted: true,
                }
            }
            Slot::Child(e) => {
                let edge = self.graph.edge(e);
                let child = edge.map(|e| e.to);
                OrderItem {
                    label: edge.map(|e| &*e.label).unwrap_or(""),
                    concept: child
                        .and_then(|c| self.graph.vertex(c))
                        .map(|c| &*c.instance)
                        .unwrap_or(""),
                    realization: child
                        .and_then(|c| self.lists.get(&c))
                        .and_then(|list| list.best())
                        .map(|p| p.text.as_str())
                        .unwrap_or(""),
                    inserted: false,
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn compose(
        &self,
        ctx: &VertexContext<'_>,
        own: &OwnCandidate,
        inserted: Option<&str>,
        order: &[Slot],
        base: f64,
        decisions: VertexDecisions,
        out: &mut CandidateList,
    ) -> Result<(), GenError> {
        let width = self.params.beams.composition;
        let start = PartialTransitionFunction::new().with(ctx.vertex, decisions)?;
        let empty = Prediction::new(String::new(), 0.0, 0.0, start);
        let mut beam = CandidateList::singleton(width, empty);
        let head = order.iter().position(|s| *s == Slot::Own);

        for (i, slot) in order.iter().enumerate() {
            let mut next = CandidateList::new(width);
            match *slot {
                Slot::Own | Slot::Inserted => {
                    let word = match slot {
                        Slot::Own => own.text.as_str(),
                        _ => inserted.unwrap_or(""),
                    };
                    for prev in &beam {
                        let text = join_tokens([prev.text.as_str(), word]);
                        next.insert_or_merge(self.hypothesis(
                            text,
                            prev.score_without_lm,
                            prev.ptf.clone(),
                            false,
                        ));
                    }
                }
                Slot::Child(e) => {
                    let edge = self.graph.get_edge(e)?;
                    let Some(children) = self.lists.get(&edge.to).filter(|l| !l.is_empty()) else {
                        continue;
                    };
                    let position = match head {
                        Some(h) if i > h => RelativePosition::After,
                        _ => RelativePosition::Before,
                    };
                    for prev in &beam {
                        for child in children {
                            for ins in self.between(ctx, own, edge, position, prev, child) {
                                let text = join_tokens([
                                    prev.text.as_str(),
                                    ins.before.as_deref().unwrap_or(""),
                                    child.text.as_str(),
                                    ins.after.as_deref().unwrap_or(""),
                                ]);
                                let no_lm =
                                    prev.score_without_lm + child.score_without_lm + ins.score;
                                let mut ptf = prev.ptf.union(&child.ptf)?;
                                if ins.before.is_some() || ins.after.is_some() {
                                    ptf = ptf.with(
                                        edge.to,
                                        VertexDecisions {
                                            insert_before: ins.before,
                                            insert_after: ins.after,
                                            ..Default::default()
                                        },
                                    )?;
                                }
                                let hyp = self.hypothesis(text, no_lm, Arc::new(ptf), false);
                                next.insert_or_merge(hyp);
                            }
                        }
                    }
                }
            }
            beam = next;
        }

        for hyp in beam.into_vec() {
            let no_lm = hyp.score_without_lm + base;
            out.insert_or_merge(self.hypothesis(hyp.text, no_lm, hyp.ptf, false));
        }
        Ok(())
    }

    fn between(
        &self,
        ctx: &VertexContext<'_>,
        own: &OwnCandidate,
        edge: &Edge,
        position: RelativePosition,
        prev: &Prediction,
        child: &Prediction,
    ) -> Vec<Insertion> {
        if child.text.trim().is_empty() {
            return vec![Insertion {
                before: None,
                after: None,
                score: 0.0,
            }];
        }
        let label = &*edge.label;
        let query = InsertionQuery {
            parent: *ctx,
            child: edge.to,
            label,
            position,
            from_text: &prev.text,
            to_text: &child.text,
        };
        let oracle = self.oracles.insertion_for(label);
        let w = &self.params.weights;
        let (w_before, w_after) = if roles::is_core_role(label) {
            (w.insert_arg_before, w.insert_arg_after)
        } else {
            (w.insert_before, w.insert_after)
        };
        let width = self.params.beams.insertion;

        let befores = insertion_options(oracle.score_before(&query), width);
        let afters = if label == "domain" && position == RelativePosition::Before {
            let number = child.ptf.get(edge.to).and_then(|d| d.number);
            let tense = own.syntax.as_ref().and_then(|s| s.tense);
            vec![(Some(rules::passive_auxiliary(number, tense).to_string()), 0.0)]
        } else {
            insertion_options(oracle.score_after(&query), width)
        };

        let mut out = Vec::with_capacity(befores.len() * afters.len());
        for (before, lp_before) in &befores {
            for (after, lp_after) in &afters {
                out.push(Insertion {
                    before: before.clone(),
                    after: after.clone(),
                    score: w_before * lp_before + w_after * lp_after,
                });
            }
        }
        out
    }

    /// Applies the article and punctuation decisions to a vertex list.
    fn finish(
        &self,
        ctx: &VertexContext<'_>,
        vertex: &Vertex,
        list: CandidateList,
    ) -> Result<CandidateList, GenError> {
        let v = ctx.vertex;
        let boundary = self.graph.is_sentence_boundary(v);
        let articles = !vertex.annotation.deleted && !rules::article_disallowed(self.graph, v);
        if !articles && !boundary {
            return Ok(list);
        }
        let question = boundary && rules::is_question(self.graph, v);
        let is_last = boundary && self.is_last_sentence(v);
        let w = &self.params.weights;

        let mut out = CandidateList::new(self.params.beams.composition);
        for hyp in list.into_vec() {
            let mut text = hyp.text;
            let mut no_lm = hyp.score_without_lm;
            let mut ptf = hyp.ptf;

            let common_noun = ptf
                .get(v)
                .and_then(|d| d.pos.as_deref())
                .map(is_common_noun)
                .unwrap_or(false);
            if articles && common_noun && !text.is_empty() {
                let ranked = prune(
                    self.oracles.denominator.score(ctx, &text),
                    self.params.beams.denominator,
                );
                if let Some(winner) = ranked.first() {
                    no_lm += w.denominator * winner.log_prob();
                    if winner.value != Denominator::None {
                        text = join_tokens([winner.value.as_str(), text.as_str()]);
                    }
                    ptf = Arc::new(ptf.with(
                        v,
                        VertexDecisions {
                            denominator: Some(winner.value),
                            ..Default::default()
                        },
                    )?);
                }
            }

            if boundary && !text.is_empty() {
                let words = text.split_whitespace().count();
                let mark = rules::punctuation(question, words, is_last);
                text = join_tokens([text.as_str(), mark]);
                ptf = Arc::new(ptf.with(
                    v,
                    VertexDecisions {
                        punctuation: Some(mark.to_string()),
                        ..Default::default()
                    },
                )?);
            }
            out.insert_or_merge(self.hypothesis(text, no_lm, ptf, boundary));
        }
        Ok(out)
    }

    fn multi_sentence(&self, v: VertexId) -> Result<CandidateList, GenError> {
        let width = self.params.beams.composition;
        let sentences = sentence_order(self.graph, v);
        let decisions = VertexDecisions {
            realization: Some(String::new()),
            reordering: Some(sentences.iter().map(|(e, _)| Slot::Child(*e)).collect()),
            ..Default::default()
        };
        let start = PartialTransitionFunction::new().with(v, decisions)?;
        let empty = Prediction::new(String::new(), 0.0, 0.0, start);
        let mut beam = CandidateList::singleton(width, empty);
        for (_, child) in sentences {
            let Some(sentence) = self.lists.get(&child).filter(|l| !l.is_empty()) else {
                continue;
            };
            let mut next = CandidateList::new(width);
            for prev in &beam {
                for hyp in sentence {
                    let text = join_tokens([prev.text.as_str(), hyp.text.as_str()]);
                    let no_lm = prev.score_without_lm + hyp.score_without_lm;
                    let ptf = prev.ptf.union(&hyp.ptf)?;
                    next.insert_or_merge(self.hypothesis(text, no_lm, Arc::new(ptf), true));
                }
            }
            beam = next;
        }
        Ok(beam)
    }

    fn is_last_sentence(&self, v: VertexId) -> bool {
        match self.graph.parent(v) {
            None => true,
            Some((_, parent)) => sentence_order(self.graph, parent)
                .last()
                .map(|(_, c)| *c == v)
                .unwrap_or(true),
        }
    }

    fn hypothesis(
        &self,
        text: String,
        score_without_lm: f64,
        ptf: Arc<PartialTransitionFunction>,
        bounded: bool,
    ) -> Prediction {
        let lm = self.scorer.score(&text, bounded, bounded);
        Prediction {
            score: score_without_lm + self.params.weights.language_model * lm,
            score_without_lm,
            text,
            ptf,
        }
    }
}

/// Children of a multi-sentence vertex in `snt` order; other labels follow
/// in edge order.
pub fn sentence_order(graph: &AmrGraph, v: VertexId) -> Vec<(EdgeId, VertexId)> {
    let mut children: Vec<(EdgeId, VertexId)> = graph.children(v).collect();
    children.sort_by_key(|(e, _)| {
        graph
            .edge(*e)
            .and_then(|edge| roles::snt_index(&edge.label))
            .unwrap_or(u32::MAX)
    });
    children
}

fn initial_slots(deleted: bool, children: &[EdgeId], inserted: bool) -> Vec<Slot> {
    let mut slots = Vec::with_capacity(children.len() + 2);
    if !deleted {
        slots.push(Slot::Own);
    }
    slots.extend(children.iter().map(|&e| Slot::Child(e)));
    if inserted {
        slots.push(Slot::Inserted);
    }
    slots
}

fn own_candidate(
    syntax: &Syntax,
    syntax_score: f64,
    weight: f64,
    scored: Scored<String>,
) -> OwnCandidate {
    OwnCandidate {
        syntax: Some(syntax.clone()),
        score: syntax_score + weight * scored.log_prob(),
        text: scored.value,
    }
}

fn top<T>(items: Vec<Scored<T>>) -> Option<Scored<T>> {
    prune(items, TOP_ONE).into_iter().next()
}

fn insertion_options(
    items: Vec<Scored<Option<String>>>,
    width: BeamWidth,
) -> Vec<(Option<String>, f64)> {
    let ranked = prune(items, width);
    if ranked.is_empty() {
        return vec![(None, 0.0)];
    }
    ranked
        .into_iter()
        .map(|s| {
            let lp = s.log_prob();
            (non_empty(s.value), lp)
        })
        .collect()
}

fn non_empty(word: Option<String>) -> Option<String> {
    word.filter(|w| !w.trim().is_empty())
}
