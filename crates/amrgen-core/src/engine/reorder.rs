//! # Reordering Scorer
//!
//! Scores permutations of a vertex's slots (own word, child subtrees, the
//! inserted child) with three classifiers:
//!
//! - `precedes_head(i)`: item `i` goes left of the own slot
//! - `precedes_left(a, b)`: among left items, `a` comes before `b`
//! - `precedes_right(a, b)`: among right items, `a` comes before `b`
//!
//! The probability of a permutation is the product of the head decisions of
//! every item and the pairwise decisions within each half. Classifier
//! outputs are queried once per vertex and cached in matrices; permutations
//! are enumerated exhaustively in lexicographic order and collected into an
//! [`NBest`] list, so ties keep enumeration order.
//!
//! ## Hard Constraints
//!
//! Permutations violating these get probability 0 and are never returned:
//!
//! - date components keep `month < day < year` order
//! - `snt1..sntk` keep ascending order
//! - `op1..opk` keep ascending order and form a contiguous block; if the own
//!   slot lies inside the block it is second-from-last (`a, b, and c`)

use crate::engine::beam::{BeamWidth, NBest};
use crate::engine::oracle::{OrderItem, ReorderOracle, VertexContext};
use crate::engine::roles;

/// Scores slot permutations of one vertex.
pub struct ReorderScorer<'a> {
    oracle: &'a dyn ReorderOracle,
    width: BeamWidth,
}

impl<'a> ReorderScorer<'a> {
    pub fn new(oracle: &'a dyn ReorderOracle, width: BeamWidth) -> Self {
        Self { oracle, width }
    }

    /// Returns the best permutations of `items` with their log probability.
    ///
    /// A permutation is a list of indices into `items`. `head` is the index
    /// of the own slot; `None` for a deleted vertex, in which case every item
    /// counts as left of the head.
    pub fn best_orders(
        &self,
        ctx: &VertexContext<'_>,
        items: &[OrderItem<'_>],
        head: Option<usize>,
    ) -> NBest<Vec<usize>> {
        let n = items.len();
        let mut best = NBest::new(self.width);
        if n == 0 {
            best.push(Vec::new(), 0.0);
            return best;
        }

        let mut p_head = vec![1.0; n];
        let mut left = vec![vec![1.0; n]; n];
        let mut right = vec![vec![1.0; n]; n];
        for i in 0..n {
            if Some(i) == head {
                continue;
            }
            p_head[i] = self.oracle.precedes_head(ctx, &items[i]);
            for j in 0..n {
                if i == j || Some(j) == head {
                    continue;
                }
                left[i][j] = self.oracle.precedes_left(ctx, &items[i], &items[j]);
                right[i][j] = self.oracle.precedes_right(ctx, &items[i], &items[j]);
            }
        }

        let mut perm: Vec<usize> = (0..n).collect();
        let mut evaluated = 0usize;
        loop {
            if satisfies_constraints(items, &perm, head) {
                let score = log_probability(&perm, head, &p_head, &left, &right);
                if score.is_finite() {
                    best.push(perm.clone(), score);
                }
            }
            evaluated += 1;
            if !next_permutation(&mut perm) {
                break;
            }
        }
        tracing::trace!(
            items = n,
            evaluated,
            kept = best.len(),
            "scored permutations"
        );
        best
    }
}

fn log_probability(
    perm: &[usize],
    head: Option<usize>,
    p_head: &[f64],
    left: &[Vec<f64>],
    right: &[Vec<f64>],
) -> f64 {
    let split = head
        .and_then(|h| perm.iter().position(|&x| x == h))
        .unwrap_or(perm.len());
    let (before, after) = perm.split_at(split);
    let after = if head.is_some() && !after.is_empty() {
        &after[1..]
    } else {
        after
    };

    let mut score = 0.0;
    for &x in before {
        score += ln(p_head[x]);
    }
    for &x in after {
        score += ln(1.0 - p_head[x]);
    }
    for (half, matrix) in [(before, left), (after, right)] {
        for (i, &a) in half.iter().enumerate() {
            for &b in &half[i + 1..] {
                score += ln(matrix[a][b]);
            }
        }
    }
    score
}

fn ln(p: f64) -> f64 {
    if p > 0.0 {
        p.ln()
    } else {
        f64::NEG_INFINITY
    }
}

/// Checks the date, sentence and operand constraints on a permutation.
pub fn satisfies_constraints(items: &[OrderItem<'_>], perm: &[usize], head: Option<usize>) -> bool {
    let labelled = |rank: fn(&str) -> Option<u32>| -> Vec<(usize, u32)> {
        perm.iter()
            .enumerate()
            .filter(|&(_, &idx)| Some(idx) != head && !items[idx].inserted)
            .filter_map(|(pos, &idx)| rank(items[idx].label).map(|k| (pos, k)))
            .collect()
    };

    // only a complete month/day/year triple is constrained
    let dates = labelled(date_rank);
    let complete = dates.iter().fold(0u32, |seen, &(_, r)| seen | 1 << r) == 0b111;
    if complete && !strictly_ascending(&dates) {
        return false;
    }
    if !strictly_ascending(&labelled(roles::snt_index)) {
        return false;
    }

    let ops = labelled(roles::op_index);
    if !strictly_ascending(&ops) {
        return false;
    }
    if let (Some(&(first, _)), Some(&(last, _))) = (ops.first(), ops.last()) {
        let own = head
            .and_then(|h| perm.iter().position(|&x| x == h))
            .filter(|&p| first < p && p < last);
        let block = ops.len() + usize::from(own.is_some());
        if last - first + 1 != block {
            return false;
        }
        if let Some(p) = own {
            if p != last - 1 {
                return false;
            }
        }
    }
    true
}

fn date_rank(label: &str) -> Option<u32> {
    roles::date_rank(label).map(|r| r as u32)
}

/// `ranks` is in position order; the ranks must increase.
fn strictly_ascending(ranks: &[(usize, u32)]) -> bool {
    ranks.windows(2).all(|w| w[0].1 < w[1].1)
}

/// Rearranges `perm` into the next lexicographic permutation; returns false
/// (leaving the slice sorted descending) after the last one.
fn next_permutation(perm: &mut [usize]) -> bool {
    let n = perm.len();
    if n < 2 {
        return false;
    }
    let mut i = n - 1;
    while i > 0 && perm[i - 1] >= perm[i] {
        i -= 1;
    }
    if i == 0 {
        return false;
    }
    let mut j = n - 1;
    while perm[j] <= perm[i - 1] {
        j -= 1;
    }
    perm.swap(i - 1, j);
    perm[i..].reverse();
    true
}
