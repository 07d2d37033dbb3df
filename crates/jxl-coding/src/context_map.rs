use jxl_bitstream::{Bitstream, Error, Result};

use crate::ans::Histogram as AnsHistogram;

/// Maps `num_raw_contexts` raw context ids to at most 256 histogram
/// clusters. Invariant: every cluster in `[0, num_clusters)` is referenced
/// by at least one raw context.
#[derive(Debug, Clone)]
pub struct ContextMap {
    clusters: Vec<u8>,
    num_clusters: usize,
}

impl ContextMap {
    pub fn num_raw_contexts(&self) -> usize {
        self.clusters.len()
    }

    pub fn num_clusters(&self) -> usize {
        self.num_clusters
    }

    pub fn cluster(&self, raw_context: usize) -> u8 {
        self.clusters[raw_context]
    }

    /// `num_raw_contexts == 1` is the trivial single-cluster map used when a
    /// bundle has nothing to cluster (e.g. a histogram decoder instance
    /// with a single distribution).
    pub fn trivial(num_raw_contexts: usize) -> Self {
        Self {
            clusters: vec![0; num_raw_contexts],
            num_clusters: 1,
        }
    }

    /// Build a map from an already-known cluster assignment (e.g. a
    /// format-fixed default table), skipping the bitstream-driven paths.
    pub fn from_raw(clusters: Vec<u8>, num_clusters: usize) -> Self {
        Self { clusters, num_clusters }
    }

    pub fn parse(bitstream: &mut Bitstream<'_>, num_raw_contexts: usize) -> Result<Self> {
        if num_raw_contexts == 1 {
            return Ok(Self::trivial(1));
        }

        let simple = bitstream.read_bool()?;
        let clusters = if simple {
            let width = bitstream.read_bits(2)?;
            if width == 0 {
                vec![0u8; num_raw_contexts]
            } else {
                let mut out = Vec::with_capacity(num_raw_contexts);
                for _ in 0..num_raw_contexts {
                    out.push(bitstream.read_bits(width)? as u8);
                }
                out
            }
        } else {
            Self::parse_complex(bitstream, num_raw_contexts)?
        };

        let num_clusters = clusters.iter().copied().max().map(|m| m as usize + 1).unwrap_or(0);
        if num_clusters == 0 {
            return Err(Error::malformed("context map has no clusters"));
        }
        if num_clusters > 256 {
            return Err(Error::resource_exceeded("context map exceeds 256 clusters"));
        }
        let mut seen = vec![false; num_clusters];
        for &c in &clusters {
            seen[c as usize] = true;
        }
        if seen.iter().any(|&s| !s) {
            return Err(Error::malformed(
                "context map cluster id is never referenced (not onto [0, numHistograms))",
            ));
        }

        Ok(Self {
            clusters,
            num_clusters,
        })
    }

    /// Complex encoding: a single-histogram ANS code decodes the cluster id
    /// stream directly (recursive LZ77 is disallowed below 3 raw
    /// contexts), with an optional Move-To-Front inverse applied after.
    fn parse_complex(bitstream: &mut Bitstream<'_>, num_raw_contexts: usize) -> Result<Vec<u8>> {
        let use_mtf = bitstream.read_bool()?;
        let max_clusters = num_raw_contexts.min(256);
        let alphabet_size = max_clusters;
        let dist = AnsHistogram::parse(bitstream, alphabet_size)?;
        let mut state = crate::ans::read_initial_state(bitstream)?;

        let mut clusters = Vec::with_capacity(num_raw_contexts);
        for _ in 0..num_raw_contexts {
            let v = dist.read_symbol(bitstream, &mut state)?;
            clusters.push(v as u8);
        }
        crate::ans::check_final_state(state)?;

        if use_mtf {
            let mut mtf: Vec<u8> = (0..=255u8).collect();
            for c in clusters.iter_mut() {
                let pos = mtf.iter().position(|&x| x == *c).ok_or_else(|| {
                    Error::internal("context map MTF state missing a byte value")
                })?;
                let val = mtf.remove(pos);
                mtf.insert(0, val);
                *c = val;
            }
        }

        Ok(clusters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trivial_map_is_single_cluster() {
        let m = ContextMap::trivial(5);
        assert_eq!(m.num_clusters(), 1);
        for i in 0..5 {
            assert_eq!(m.cluster(i), 0);
        }
    }
}
