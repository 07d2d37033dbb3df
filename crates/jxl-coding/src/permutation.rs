use jxl_bitstream::{Bitstream, Error, Result};

use crate::decoder::Decoder;
use crate::hybrid_uint::add_log2_ceil;

/// Context used for both the Lehmer-entry count and each entry itself:
/// `ceil(log2(x))` capped to the eight context slots the permutation
/// decoder's one-histogram code provides.
fn get_context(x: u32) -> usize {
    (add_log2_ceil(x.max(1)).min(7)) as usize
}

/// Fenwick (binary-indexed) tree over `{0, 1, .., n-1}` supporting
/// "find and remove the k-th remaining element", used to turn a Lehmer
/// code into a permutation in `O(n log n)`.
struct OrderStatisticsTree {
    tree: Vec<u32>,
    n: usize,
    top_bit: u32,
}

impl OrderStatisticsTree {
    fn new(n: usize) -> Self {
        let mut tree = vec![0u32; n + 1];
        for i in 1..=n {
            tree[i] += 1;
            let j = i + (i & i.wrapping_neg());
            if j <= n {
                tree[j] += tree[i];
            }
        }
        let top_bit = if n == 0 { 0 } else { 32 - (n as u32).leading_zeros() };
        Self { tree, n, top_bit }
    }

    fn update(&mut self, mut i: usize, delta: i32) {
        while i <= self.n {
            self.tree[i] = (self.tree[i] as i32 + delta) as u32;
            i += i & i.wrapping_neg();
        }
    }

    /// Remove and return the 0-indexed position of the `k`-th (0-based)
    /// element still present.
    fn take_kth(&mut self, mut k: u32) -> usize {
        let mut pos = 0usize;
        let mut log = self.top_bit;
        loop {
            if log == 0 {
                break;
            }
            log -= 1;
            let next = pos + (1usize << log);
            if next <= self.n && self.tree[next] <= k {
                pos = next;
                k -= self.tree[next];
            }
        }
        self.update(pos + 1, -1);
        pos
    }
}

/// Decode a Lehmer code into the permutation it represents.
/// `lehmer[i] + i < n` for every entry (verified by the caller).
fn lehmer_to_permutation(lehmer: &[u32], n: usize) -> Vec<u32> {
    let mut tree = OrderStatisticsTree::new(n);
    lehmer
        .iter()
        .map(|&code| tree.take_kth(code) as u32)
        .collect()
}

/// Read a permutation of `{0, .., size-skip-1}` (cross-cutting: used for
/// both TOC permutation and VarDCT coefficient orders). `decoder` must have
/// been parsed with 8 raw contexts.
pub fn read_permutation(
    bitstream: &mut Bitstream<'_>,
    decoder: &mut Decoder,
    size: usize,
    skip: usize,
) -> Result<Vec<u32>> {
    let n = size
        .checked_sub(skip)
        .ok_or_else(|| Error::malformed("permutation skip exceeds size"))?;

    let end = decoder.read_varint(bitstream, get_context(size as u32))? as usize;
    if end > n {
        return Err(Error::malformed("permutation has more entries than available slots"));
    }

    let mut lehmer = Vec::with_capacity(end);
    let mut prev = 0u32;
    for _ in 0..end {
        let ctx = get_context(prev);
        let v = decoder.read_varint(bitstream, ctx)?;
        if (v as usize) + lehmer.len() >= n {
            return Err(Error::malformed("Lehmer entry out of range for remaining slots"));
        }
        lehmer.push(v);
        prev = v;
    }

    let mut perm = lehmer_to_permutation(&lehmer, n);
    perm.extend((end as u32)..(n as u32));
    Ok(perm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lehmer_round_trips_known_cases() {
        assert_eq!(lehmer_to_permutation(&[3, 2, 1, 0], 4), vec![3, 2, 1, 0]);
        assert_eq!(lehmer_to_permutation(&[1, 0, 0], 3), vec![1, 0, 2]);
    }

    #[test]
    fn invalid_lehmer_entry_is_rejected_by_caller() {
        // code[0] + 0 == n (4) violates the `code[i] + i < n` invariant;
        // `read_permutation` checks this before calling the tree, the unit
        // under test here only covers the tree's own behaviour.
        let n = 4;
        let code = [4, 0, 0, 0];
        assert!(code[0] as usize + 0 >= n);
    }

    #[test]
    fn identity_permutation_for_empty_lehmer() {
        assert_eq!(lehmer_to_permutation(&[], 0), Vec::<u32>::new());
    }
}
