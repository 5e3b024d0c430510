//! Cached, length-normalized language model scoring.
//!
//! The raw [`LanguageModel`] returns a total log probability. The search
//! compares hypotheses of different lengths, so [`SentenceScorer`] divides by
//! an effective word count in which articles weigh `article_word_weight`:
//! a phrase is not rewarded for dropping its articles.
//!
//! Raw scores are memoized in an [`NgramCache`] shared by every generation
//! run of a [`crate::engine::generate::Generator`]; concurrent runs read it
//! under a `parking_lot` read lock and only take the write lock on a miss.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::engine::oracle::LanguageModel;

const ARTICLES: [&str; 3] = ["the", "a", "an"];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    text: String,
    bounded_left: bool,
    bounded_right: bool,
}

/// Hit/miss counters of an [`NgramCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Thread-safe memo of raw language model scores.
#[derive(Debug, Default)]
pub struct NgramCache {
    entries: RwLock<FxHashMap<CacheKey, f64>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl NgramCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_or_compute(
        &self,
        text: &str,
        bounded_left: bool,
        bounded_right: bool,
        compute: impl FnOnce() -> f64,
    ) -> f64 {
        let key = CacheKey {
            text: text.to_string(),
            bounded_left,
            bounded_right,
        };
        if let Some(&score) = self.entries.read().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return score;
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let score = compute();
        self.entries.write().entry(key).or_insert(score);
        score
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.read().len(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.get_mut().clear();
        *self.hits.get_mut() = 0;
        *self.misses.get_mut() = 0;
    }
}

/// Scores realized text with a language model.
#[derive(Clone, Copy)]
pub struct SentenceScorer<'a> {
    model: &'a dyn LanguageModel,
    cache: &'a NgramCache,
    article_word_weight: f64,
}

impl<'a> SentenceScorer<'a> {
    pub fn new(
        model: &'a dyn LanguageModel,
        cache: &'a NgramCache,
        article_word_weight: f64,
    ) -> Self {
        Self {
            model,
            cache,
            article_word_weight,
        }
    }

    /// Normalized log probability of `text`.
    ///
    /// Empty text scores 0. `bounded_left`/`bounded_right` ask the model to
    /// score sentence start/end context.
    pub fn score(&self, text: &str, bounded_left: bool, bounded_right: bool) -> f64 {
        let text = text.trim();
        if text.is_empty() {
            return 0.0;
        }
        let raw = self
            .cache
            .get_or_compute(text, bounded_left, bounded_right, || {
                let tokens: Vec<&str> = text.split_whitespace().collect();
                self.model.log_prob(&tokens, bounded_left, bounded_right)
            });
        let words = self.effective_word_count(text);
        if words > 0.0 {
            raw / words
        } else {
            raw
        }
    }

    /// Token count with articles weighted by `article_word_weight`.
    pub fn effective_word_count(&self, text: &str) -> f64 {
        text.split_whitespace()
            .map(|token| {
                if ARTICLES.iter().any(|a| a.eq_ignore_ascii_case(token)) {
                    self.article_word_weight
                } else {
                    1.0
                }
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Every token costs -1; sentence bounds cost -0.5 each.
    struct FlatModel {
        calls: AtomicUsize,
    }

    impl LanguageModel for FlatModel {
        fn log_prob(&self, tokens: &[&str], bounded_left: bool, bounded_right: bool) -> f64 {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut score = -(tokens.len() as f64);
            if bounded_left {
                score -= 0.5;
            }
            if bounded_right {
                score -= 0.5;
            }
            score
        }
    }

    fn model() -> FlatModel {
        FlatModel {
            calls: AtomicUsize::new(0),
        }
    }

    #[test]
    fn empty_text_scores_zero() {
        let lm = model();
        let cache = NgramCache::new();
        let scorer = SentenceScorer::new(&lm, &cache, 0.5);
        assert_eq!(scorer.score("   ", true, true), 0.0);
        assert_eq!(lm.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn articles_count_as_partial_words() {
        let lm = model();
        let cache = NgramCache::new();
        let scorer = SentenceScorer::new(&lm, &cache, 0.5);
        assert_eq!(scorer.effective_word_count("the dog barks"), 2.5);
        // raw -3 over 2.5 effective words
        assert!((scorer.score("the dog barks", false, false) + 1.2).abs() < 1e-12);
    }

    #[test]
    fn repeated_queries_hit_the_cache() {
        let lm = model();
        let cache = NgramCache::new();
        let scorer = SentenceScorer::new(&lm, &cache, 1.0);
        let first = scorer.score("dogs bark", true, false);
        let second = scorer.score("dogs bark", true, false);
        assert_eq!(first, second);
        assert_eq!(lm.calls.load(Ordering::SeqCst), 1);

        // different bounds are a different entry
        scorer.score("dogs bark", true, true);
        let stats = cache.stats();
        assert_eq!(stats, CacheStats { hits: 1, misses: 2, entries: 2 });
    }

    #[test]
    fn clear_resets_counters() {
        let lm = model();
        let mut cache = NgramCache::new();
        SentenceScorer::new(&lm, &cache, 1.0).score("x", false, false);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn zero_article_weight_falls_back_to_raw_score() {
        let lm = model();
        let cache = NgramCache::new();
        let scorer = SentenceScorer::new(&lm, &cache, 0.0);
        assert_eq!(scorer.score("the", false, false), -1.0);
    }
}
