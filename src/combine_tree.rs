//! An associative binary-tree combiner over per-batch accumulators.
//!
//! The shape this module implements is the same iterative, level-by-level
//! pairwise merge that `differential-dataflow`'s
//! `trace::implementations::merge_batcher::MergeBatcher::insert_chain`
//! uses to keep its chain of sorted runs geometrically sized: pair up
//! adjacent same-size things, carry forward whatever does not have a
//! partner yet, repeat. The teacher's chains are ordered by arrival and
//! merge two chains whenever the newest one is at least half the size of
//! its neighbour; this tree instead fixes each leaf's position *before*
//! any batch completes (leaf `i` is always batch `i`), so that the
//! resulting association is a pure function of `n`, independent of which
//! batch happens to finish first.
//!
//! Concretely: level 0 has `n` slots, one per batch. Level `L + 1` has
//! `ceil(level_len(L) / 2)` slots, one per pair of level-`L` slots (plus,
//! if `level_len(L)` is odd, one slot that simply promotes the odd node
//! untouched). A value offered at leaf `i` walks up through levels,
//! merging with its sibling the moment the sibling is already present,
//! and otherwise parking in its own slot to wait for it. The single slot
//! remaining once a level's length reaches `1` is the root.

use parking_lot::Mutex;

use crate::logging::{self, ExecutorEvent, Logger};

/// One level of the combine tree: a row of slots, each big enough to hold
/// at most one pending accumulator.
struct Level<A> {
    slots: Vec<Mutex<Option<A>>>,
}

impl<A> Level<A> {
    fn new(len: usize) -> Self {
        Level { slots: (0..len).map(|_| Mutex::new(None)).collect() }
    }
}

/// Computes the length of each level of a combine tree with `n` leaves,
/// from level 0 (`n` leaves) up to and including the root (length 1).
fn level_lengths(n: usize) -> Vec<usize> {
    assert!(n > 0, "a combine tree needs at least one batch");
    let mut lens = vec![n];
    while *lens.last().unwrap() > 1 {
        let prev = *lens.last().unwrap();
        lens.push(prev.div_ceil(2));
    }
    lens
}

/// An associative merge tree over `n` per-batch accumulators.
///
/// `offer` may be called concurrently from distinct batch indices, each
/// exactly once; after all `n` offers have returned, `root` yields the
/// fully combined accumulator.
pub struct CombineTree<A, F> {
    levels: Vec<Level<A>>,
    root: Mutex<Option<A>>,
    combiner: F,
}

impl<A, F> CombineTree<A, F>
where
    F: Fn(A, A) -> A,
{
    /// Builds a tree with `n` leaves (`n >= 1`) using `combiner` to merge
    /// accumulators. `combiner` must be associative; it need not be
    /// commutative, and is always called as `combiner(left, right)` with
    /// `left` drawn from the lower-indexed batch.
    pub fn new(n: usize, combiner: F) -> Self {
        let lens = level_lengths(n);
        let levels = lens.iter().map(|&len| Level::new(len)).collect();
        CombineTree { levels, root: Mutex::new(None), combiner }
    }

    /// Offers the accumulator produced by batch `batch_index`. Must be
    /// called at most once per distinct `batch_index` in `0..n`.
    pub fn offer(&self, batch_index: usize, value: A) {
        self.offer_logged(batch_index, value, None);
    }

    /// As [`CombineTree::offer`], additionally reporting each merge it
    /// performs through `logger`.
    pub fn offer_logged(&self, batch_index: usize, value: A, logger: Option<&dyn Logger>) {
        let mut idx = batch_index;
        let mut value = value;

        for level in 0..self.levels.len() {
            let level_len = self.levels[level].slots.len();
            if level_len == 1 {
                // This is the root level: `idx` must be 0 here.
                *self.root.lock() = Some(value);
                return;
            }

            let sibling_idx = idx ^ 1;
            let has_sibling = sibling_idx < level_len;
            if !has_sibling {
                // Odd one out at this level: promote untouched.
                idx /= 2;
                continue;
            }

            let mut sibling_slot = self.levels[level].slots[sibling_idx].lock();
            if let Some(sibling_value) = sibling_slot.take() {
                drop(sibling_slot);
                value = if idx < sibling_idx {
                    (self.combiner)(value, sibling_value)
                } else {
                    (self.combiner)(sibling_value, value)
                };
                logging::log(logger, ExecutorEvent::CombineTreeMerge { level });
                idx /= 2;
            } else {
                drop(sibling_slot);
                *self.levels[level].slots[idx].lock() = Some(value);
                return;
            }
        }
        unreachable!("level_lengths always terminates at length 1");
    }

    /// Returns the fully combined accumulator. Must only be called after
    /// every leaf in `0..n` has been offered exactly once.
    pub fn root(self) -> A {
        self.root
            .into_inner()
            .expect("CombineTree::root called before every batch was offered")
    }
}

/// The same pairwise, level-by-level association the tree computes,
/// expressed as a straight sequential fold. Used by tests to check that
/// the concurrent tree produces the same association for any permutation
/// of arrival order.
pub fn sequential_combine<A, F>(mut items: Vec<A>, combiner: F) -> A
where
    F: Fn(A, A) -> A,
{
    assert!(!items.is_empty());
    while items.len() > 1 {
        let mut next = Vec::with_capacity(items.len().div_ceil(2));
        let mut it = items.into_iter();
        while let Some(a) = it.next() {
            match it.next() {
                Some(b) => next.push(combiner(a, b)),
                None => next.push(a),
            }
        }
        items = next;
    }
    items.into_iter().next().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_leaf_is_identity() {
        let tree = CombineTree::new(1, |a: i32, b: i32| a + b);
        tree.offer(0, 42);
        assert_eq!(tree.root(), 42);
    }

    #[test]
    fn power_of_two_matches_left_fold() {
        let tree = CombineTree::new(8, |a: i32, b: i32| a * 100 + b);
        for i in (0..8).rev() {
            tree.offer(i, i as i32);
        }
        let expected = sequential_combine((0..8i32).collect(), |a, b| a * 100 + b);
        assert_eq!(tree.root(), expected);
    }

    #[test]
    fn odd_leaf_count_matches_sequential() {
        for n in 1..20usize {
            let tree = CombineTree::new(n, |a: String, b: String| format!("({a}+{b})"));
            let values: Vec<String> = (0..n).map(|i| i.to_string()).collect();
            for (i, v) in values.iter().enumerate() {
                tree.offer(i, v.clone());
            }
            let expected = sequential_combine(values, |a, b| format!("({a}+{b})"));
            assert_eq!(tree.root(), expected, "n={n}");
        }
    }

    #[test]
    fn arrival_order_does_not_change_the_result() {
        use std::sync::Arc;
        for n in [1usize, 2, 3, 5, 7, 16, 17, 31] {
            let tree = Arc::new(CombineTree::new(n, |a: i64, b: i64| a * 1_000_003 + b));
            let mut order: Vec<usize> = (0..n).collect();
            // A fixed but non-trivial permutation: reverse, then swap pairs.
            order.reverse();
            crossbeam::thread::scope(|s| {
                for &i in &order {
                    let tree = Arc::clone(&tree);
                    s.spawn(move |_| tree.offer(i, i as i64));
                }
            })
            .unwrap();
            let tree = Arc::try_unwrap(tree).unwrap_or_else(|_| panic!("dangling reference"));
            let expected = sequential_combine((0..n as i64).collect(), |a, b| a * 1_000_003 + b);
            assert_eq!(tree.root(), expected, "n={n}");
        }
    }
}
