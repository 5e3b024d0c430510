//! Bounded, score-sorted candidate collections.
//!
//! - **CandidateList**: the hypothesis beam of the realization search. Holds
//!   at most `take_best_n` predictions sorted descending by score, merges
//!   duplicates by realized text, and drops entries that fall more than
//!   `max_prob_decrement` below the best.
//! - **NBest**: the same policy for arbitrary scored values (oracle outputs,
//!   permutations), without deduplication.
//!
//! Both are sorted vectors with O(n) insertion; beam widths are small.
//! Ties keep insertion order, which makes the search deterministic.

use serde::{Deserialize, Serialize};

use crate::engine::transition::Prediction;

/// Beam width and pruning threshold for one decision class.
///
/// `max_prob_decrement` is applied in log space: an entry whose log score is
/// more than this below the best entry is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeamWidth {
    pub take_best_n: usize,
    pub max_prob_decrement: f64,
}

impl BeamWidth {
    pub const fn new(take_best_n: usize, max_prob_decrement: f64) -> Self {
        Self {
            take_best_n,
            max_prob_decrement,
        }
    }
}

/// A value with the probability an oracle assigned to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored<T> {
    pub value: T,
    pub prob: f64,
}

impl<T> Scored<T> {
    pub fn new(value: T, prob: f64) -> Self {
        Self { value, prob }
    }

    /// Natural log of the probability; non-positive or NaN probabilities map
    /// to negative infinity.
    pub fn log_prob(&self) -> f64 {
        if self.prob > 0.0 {
            self.prob.ln()
        } else {
            f64::NEG_INFINITY
        }
    }
}

/// Ranks an oracle's output and prunes it to a beam.
///
/// Entries with non-positive or non-finite probability are discarded; the
/// rest are sorted descending (stable), truncated to `take_best_n`, and cut
/// by the log-space decrement rule.
pub fn prune<T>(mut items: Vec<Scored<T>>, width: BeamWidth) -> Vec<Scored<T>> {
    items.retain(|s| s.prob > 0.0 && s.prob.is_finite());
    items.sort_by(|a, b| b.prob.total_cmp(&a.prob));
    items.truncate(width.take_best_n);
    if let Some(best) = items.first().map(|s| s.log_prob()) {
        let floor = best - width.max_prob_decrement;
        items.retain(|s| s.log_prob() >= floor);
    }
    items
}

/// Bounded n-best list over arbitrary values scored in log space.
#[derive(Debug, Clone)]
pub struct NBest<T> {
    width: BeamWidth,
    entries: Vec<(T, f64)>,
}

impl<T> NBest<T> {
    pub fn new(width: BeamWidth) -> Self {
        Self {
            width,
            entries: Vec::with_capacity(width.take_best_n.min(64)),
        }
    }

    /// Inserts a value with its log score. Returns false if the value was
    /// rejected (NaN, below the decrement floor, or beyond capacity).
    pub fn push(&mut self, value: T, log_score: f64) -> bool {
        if log_score.is_nan() || self.width.take_best_n == 0 {
            return false;
        }
        if let Some(&(_, best)) = self.entries.first() {
            if log_score < best - self.width.max_prob_decrement {
                return false;
            }
        }
        let at = self.entries.partition_point(|(_, s)| *s >= log_score);
        if at >= self.width.take_best_n {
            return false;
        }
        self.entries.insert(at, (value, log_score));
        self.entries.truncate(self.width.take_best_n);
        if at == 0 {
            let floor = log_score - self.width.max_prob_decrement;
            self.entries.retain(|(_, s)| *s >= floor);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Log score of the best entry.
    pub fn best_score(&self) -> Option<f64> {
        self.entries.first().map(|(_, s)| *s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&T, f64)> {
        self.entries.iter().map(|(v, s)| (v, *s))
    }

    pub fn into_vec(self) -> Vec<(T, f64)> {
        self.entries
    }
}

/// Bounded, deduplicating beam of predictions.
#[derive(Debug, Clone)]
pub struct CandidateList {
    width: BeamWidth,
    entries: Vec<Prediction>,
}

impl CandidateList {
    pub fn new(width: BeamWidth) -> Self {
        Self {
            width,
            entries: Vec::with_capacity(width.take_best_n.min(64)),
        }
    }

    /// Creates a list holding a single prediction.
    pub fn singleton(width: BeamWidth, prediction: Prediction) -> Self {
        let mut list = Self::new(width);
        list.insert_or_merge(prediction);
        list
    }

    /// Inserts a prediction, or merges it into an existing entry with the
    /// same text.
    ///
    /// A merge keeps the maximum score and the maximum LM-free score; the
    /// partial transition function of the higher-scoring prediction wins.
    /// Returns true if the list changed.
    pub fn insert_or_merge(&mut self, prediction: Prediction) -> bool {
        if prediction.score.is_nan() || self.width.take_best_n == 0 {
            return false;
        }
        if let Some(i) = self.entries.iter().position(|p| p.text == prediction.text) {
            let mut existing = self.entries.remove(i);
            let changed = prediction.score > existing.score
                || prediction.score_without_lm > existing.score_without_lm;
            existing.score_without_lm = existing.score_without_lm.max(prediction.score_without_lm);
            if prediction.score > existing.score {
                existing.score = prediction.score;
                existing.ptf = prediction.ptf;
            }
            self.place(existing);
            return changed;
        }
        if let Some(best) = self.entries.first() {
            if prediction.score < best.score - self.width.max_prob_decrement {
                return false;
            }
        }
        let at = self.entries.partition_point(|p| p.score >= prediction.score);
        if at >= self.width.take_best_n {
            return false;
        }
        self.place(prediction);
        true
    }

    fn place(&mut self, prediction: Prediction) {
        let at = self.entries.partition_point(|p| p.score >= prediction.score);
        self.entries.insert(at, prediction);
        self.entries.truncate(self.width.take_best_n);
        if let Some(best) = self.entries.first().map(|p| p.score) {
            let floor = best - self.width.max_prob_decrement;
            self.entries.retain(|p| p.score >= floor);
        }
    }

    /// Best prediction, if any.
    pub fn best(&self) -> Option<&Prediction> {
        self.entries.first()
    }

    /// The `k` best predictions in descending order.
    pub fn top_k(&self, k: usize) -> &[Prediction] {
        &self.entries[..k.min(self.entries.len())]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.width.take_best_n
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Prediction> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<Prediction> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a CandidateList {
    type Item = &'a Prediction;
    type IntoIter = std::slice::Iter<'a, Prediction>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(text: &str, score: f64) -> Prediction {
        Prediction::leaf(text, score, score)
    }

    fn wide(n: usize) -> BeamWidth {
        BeamWidth::new(n, f64::INFINITY)
    }

    #[test]
    fn candidate_list_sorts_descending() {
        let mut list = CandidateList::new(wide(5));
        list.insert_or_merge(prediction("b", -2.0));
        list.insert_or_merge(prediction("a", -1.0));
        list.insert_or_merge(prediction("c", -3.0));
        let texts: Vec<&str> = list.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn candidate_list_evicts_lowest_beyond_capacity() {
        let mut list = CandidateList::new(wide(2));
        list.insert_or_merge(prediction("a", -1.0));
        list.insert_or_merge(prediction("b", -2.0));
        assert!(!list.insert_or_merge(prediction("c", -3.0)));
        assert!(list.insert_or_merge(prediction("d", -0.5)));
        let texts: Vec<&str> = list.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["d", "a"]);
    }

    #[test]
    fn candidate_list_merges_duplicates_by_max() {
        let mut list = CandidateList::new(wide(3));
        list.insert_or_merge(Prediction::leaf("x", -2.0, -5.0));
        list.insert_or_merge(Prediction::leaf("y", -1.5, -1.5));
        list.insert_or_merge(Prediction::leaf("x", -1.0, -6.0));
        assert_eq!(list.len(), 2);
        let best = list.best().unwrap();
        assert_eq!(best.text, "x");
        assert_eq!(best.score, -1.0);
        assert_eq!(best.score_without_lm, -5.0);
    }

    #[test]
    fn candidate_list_duplicate_with_lower_score_keeps_old() {
        let mut list = CandidateList::new(wide(3));
        list.insert_or_merge(prediction("x", -1.0));
        assert!(!list.insert_or_merge(prediction("x", -3.0)));
        assert_eq!(list.best().unwrap().score, -1.0);
    }

    #[test]
    fn candidate_list_ties_keep_insertion_order() {
        let mut list = CandidateList::new(wide(3));
        list.insert_or_merge(prediction("first", -1.0));
        list.insert_or_merge(prediction("second", -1.0));
        assert_eq!(list.best().unwrap().text, "first");
    }

    #[test]
    fn candidate_list_applies_decrement_rule() {
        let mut list = CandidateList::new(BeamWidth::new(5, 1.0));
        list.insert_or_merge(prediction("a", -3.0));
        list.insert_or_merge(prediction("b", -3.5));
        list.insert_or_merge(prediction("c", -1.0));
        let texts: Vec<&str> = list.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["c"]);
        assert!(!list.insert_or_merge(prediction("d", -2.5)));
    }

    #[test]
    fn candidate_list_rejects_nan() {
        let mut list = CandidateList::new(wide(3));
        assert!(!list.insert_or_merge(prediction("a", f64::NAN)));
        assert!(list.is_empty());
    }

    #[test]
    fn top_k_is_bounded_by_len() {
        let mut list = CandidateList::new(wide(4));
        list.insert_or_merge(prediction("a", -1.0));
        assert_eq!(list.top_k(3).len(), 1);
    }

    #[test]
    fn prune_sorts_truncates_and_cuts() {
        let items = vec![
            Scored::new("low", 0.01),
            Scored::new("high", 0.6),
            Scored::new("zero", 0.0),
            Scored::new("mid", 0.3),
        ];
        let pruned = prune(items, BeamWidth::new(3, 2.0));
        let values: Vec<&str> = pruned.iter().map(|s| s.value).collect();
        // ln(0.6) - ln(0.01) > 2, so "low" is cut
        assert_eq!(values, vec!["high", "mid"]);
    }

    #[test]
    fn nbest_keeps_best_n() {
        let mut nbest = NBest::new(wide(2));
        nbest.push(1, -3.0);
        nbest.push(2, -1.0);
        nbest.push(3, -2.0);
        let values: Vec<i32> = nbest.iter().map(|(v, _)| *v).collect();
        assert_eq!(values, vec![2, 3]);
        assert_eq!(nbest.best_score(), Some(-1.0));
    }

    #[test]
    fn nbest_decrement_drops_far_entries() {
        let mut nbest = NBest::new(BeamWidth::new(4, 0.5));
        nbest.push("a", -2.0);
        nbest.push("b", -1.0);
        assert_eq!(nbest.len(), 1);
        assert!(!nbest.push("c", -1.6));
    }
}
