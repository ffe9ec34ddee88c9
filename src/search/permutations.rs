//! Lazy enumeration of batting orders.
//!
//! Orders are produced in lexicographic order of roster indices, one at a
//! time, so a 9-man roster never materializes its 362,880 candidates.

/// Number of orderings of `n` hitters, or `None` on overflow.
#[must_use]
pub fn permutation_count(n: usize) -> Option<u64> {
    (1..=n as u64).try_fold(1u64, u64::checked_mul)
}

/// Iterator over every permutation of `0..n` in lexicographic order.
#[derive(Debug, Clone)]
pub struct Permutations {
    current: Vec<usize>,
    done: bool,
}

impl Permutations {
    /// Enumerate the orderings of `n` roster slots.
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self {
            current: (0..n).collect(),
            done: n == 0,
        }
    }

    /// Step `current` to its lexicographic successor. Returns false after
    /// the last permutation.
    fn advance(&mut self) -> bool {
        let v = &mut self.current;
        let Some(pivot) = (1..v.len()).rev().find(|&i| v[i - 1] < v[i]).map(|i| i - 1) else {
            return false;
        };
        // A larger element exists to the right of the pivot by construction.
        let mut succ = v.len() - 1;
        while v[succ] <= v[pivot] {
            succ -= 1;
        }
        v.swap(pivot, succ);
        v[pivot + 1..].reverse();
        true
    }
}

impl Iterator for Permutations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let out = self.current.clone();
        self.done = !self.advance();
        Some(out)
    }
}
