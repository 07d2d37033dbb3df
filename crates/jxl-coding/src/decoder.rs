use jxl_bitstream::{Bitstream, Result};

use crate::ans::Histogram as AnsHistogram;
use crate::context_map::ContextMap;
use crate::hybrid_uint::HybridUintConfig;
use crate::lz77::{resolve_distance, Lz77Params, Lz77State};
use crate::prefix::Histogram as PrefixHistogram;

enum Coder {
    Prefix(Vec<PrefixHistogram>),
    Ans { dists: Vec<AnsHistogram>, state: u32 },
}

/// The composite entropy decoder produced by the histogram decoder:
/// per-cluster codes (prefix or rANS), one [`HybridUintConfig`] per
/// cluster, the raw-context-to-cluster [`ContextMap`], and (if enabled)
/// LZ77-over-symbols state.
pub struct Decoder {
    configs: Vec<HybridUintConfig>,
    context_map: ContextMap,
    coder: Coder,
    lz77: Lz77Params,
    lz77_state: Option<Lz77State>,
    lz77_dist_cluster: u8,
    dist_multiplier: u32,
}

impl Decoder {
    /// Read LZ77 params, the context map (with an extra raw context for
    /// the LZ77 distance cluster when enabled), the per-cluster uint
    /// configs, and either prefix tables or rANS histograms.
    pub fn parse(bitstream: &mut Bitstream<'_>, num_raw_contexts: usize) -> Result<Self> {
        let lz77 = Lz77Params::parse(bitstream)?;
        let total_raw_contexts = num_raw_contexts + usize::from(lz77.enabled);
        let context_map = ContextMap::parse(bitstream, total_raw_contexts)?;
        let lz77_dist_cluster = if lz77.enabled {
            context_map.cluster(total_raw_contexts - 1)
        } else {
            0
        };

        let use_prefix_code = bitstream.read_bool()?;
        let log_alphabet_size = if use_prefix_code {
            15
        } else {
            5 + bitstream.read_bits(2)?
        };

        let num_clusters = context_map.num_clusters();
        let mut configs = Vec::with_capacity(num_clusters);
        for _ in 0..num_clusters {
            configs.push(HybridUintConfig::parse(bitstream, log_alphabet_size)?);
        }

        let alphabet_size = 1usize << log_alphabet_size;
        let coder = if use_prefix_code {
            let mut hists = Vec::with_capacity(num_clusters);
            for _ in 0..num_clusters {
                hists.push(PrefixHistogram::parse(bitstream, alphabet_size)?);
            }
            Coder::Prefix(hists)
        } else {
            let mut hists = Vec::with_capacity(num_clusters);
            for _ in 0..num_clusters {
                hists.push(AnsHistogram::parse(bitstream, alphabet_size)?);
            }
            let state = crate::ans::read_initial_state(bitstream)?;
            Coder::Ans { dists: hists, state }
        };

        Ok(Self {
            configs,
            context_map,
            coder,
            lz77_state: if lz77.enabled {
                Some(Lz77State::new())
            } else {
                None
            },
            lz77,
            lz77_dist_cluster,
            dist_multiplier: 0,
        })
    }

    /// Row-width multiplier used to turn a small distance token into a
    /// pixel-space offset via the special-distance table. Modular image
    /// decode sets this per channel before reading samples.
    pub fn set_distance_multiplier(&mut self, multiplier: u32) {
        self.dist_multiplier = multiplier;
    }

    pub fn num_clusters(&self) -> usize {
        self.context_map.num_clusters()
    }

    fn read_token(&mut self, bitstream: &mut Bitstream<'_>, cluster: u8) -> Result<u32> {
        match &mut self.coder {
            Coder::Prefix(hists) => hists[cluster as usize].read_symbol(bitstream),
            Coder::Ans { dists, state } => dists[cluster as usize].read_symbol(bitstream, state),
        }
    }

    /// Read the next value in raw context `context`, transparently
    /// expanding LZ77 back-references when enabled.
    pub fn read_varint(&mut self, bitstream: &mut Bitstream<'_>, context: usize) -> Result<u32> {
        let cluster = self.context_map.cluster(context);

        if !self.lz77.enabled {
            let token = self.read_token(bitstream, cluster)?;
            return self.configs[cluster as usize].read_uint(bitstream, token);
        }

        let mut state = self.lz77_state.take().expect("lz77 state present when enabled");
        let value = if let Some(v) = state.in_progress_copy() {
            v
        } else {
            let token = self.read_token(bitstream, cluster)?;
            if token >= self.lz77.min_symbol {
                let extra = self
                    .lz77
                    .length_config
                    .read_uint(bitstream, token - self.lz77.min_symbol)?;
                let length = extra + self.lz77.min_length;
                let dist_token = self.read_token(bitstream, self.lz77_dist_cluster)?;
                let draw = self.configs[self.lz77_dist_cluster as usize]
                    .read_uint(bitstream, dist_token)?;
                let distance = resolve_distance(draw, self.dist_multiplier);
                state.begin_copy(length, distance as u64)
            } else {
                self.configs[cluster as usize].read_uint(bitstream, token)?
            }
        };
        state.push(value);
        self.lz77_state = Some(state);
        Ok(value)
    }

    /// Verify the rANS state closed on `ANS_SIGNATURE << 16`. A no-op in
    /// prefix-code mode.
    pub fn finalize(&self) -> Result<()> {
        if let Coder::Ans { state, .. } = &self.coder {
            crate::ans::check_final_state(*state)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jxl_bitstream::U32Distribution;

    fn bits_msb(bits: &[(u64, u32)]) -> Vec<u8> {
        let mut acc: u128 = 0;
        let mut n = 0u32;
        let mut out = Vec::new();
        for &(v, w) in bits {
            acc |= (v as u128) << n;
            n += w;
            while n >= 8 {
                out.push((acc & 0xff) as u8);
                acc >>= 8;
                n -= 8;
            }
        }
        if n > 0 {
            out.push((acc & 0xff) as u8);
        }
        out
    }

    #[test]
    fn single_cluster_prefix_mode_round_trips() {
        // lz77 disabled (1 bit: 0), context map trivial for 1 raw context,
        // use_prefix_code=1, hybrid config bits, then a single-symbol
        // prefix table (hskip bits picking complex path with all-zero
        // run collapses to one symbol via the harness below is overkill
        // for this smoke test) -- instead exercise the ANS branch, which
        // has a simpler deterministic encoding: flat histogram with one
        // symbol's distribution.
        let mut bits = vec![(0u64, 1)]; // lz77 disabled
        bits.push((0, 1)); // use_prefix_code = 0 (ANS mode)
        bits.push((0, 2)); // log_alphabet_size selector -> 5 + 0 = 5
                            // HybridUintConfig::parse(log_alphabet_size=5): split_exponent_bits = add_log2_ceil(6) = 3
        bits.push((5, 3)); // split_exponent = 5 == log_alphabet_size -> msb/lsb default to 0
                           // ANS histogram for alphabet_size=32: simple path, single symbol.
        bits.push((1, 1)); // simple=1
        bits.push((0, 1)); // two_symbols=0
                           // symbol index needs ceil_log2(32) = 5 bits
        bits.push((7, 5)); // symbol = 7
        bits.push((0, 32)); // initial rANS state = 0 -> but single_symbol fast path never reads state
        let data = bits_msb(&bits);
        let mut b = Bitstream::new(&data);
        let mut dec = Decoder::parse(&mut b, 1).unwrap();
        let v = dec.read_varint(&mut b, 0).unwrap();
        assert_eq!(v, 7);
        dec.finalize().unwrap();
    }

    #[test]
    fn lz77_params_default_when_disabled() {
        let data = bits_msb(&[(0, 1)]);
        let mut b = Bitstream::new(&data);
        let p = Lz77Params::parse(&mut b).unwrap();
        assert!(!p.enabled);
        assert_eq!(p.min_symbol, 224);
    }

    #[test]
    fn u32_distribution_smoke() {
        let data = bits_msb(&[(0, 2)]);
        let mut b = Bitstream::new(&data);
        let v = b
            .read_u32(
                U32Distribution::Constant(224),
                U32Distribution::Constant(512),
                U32Distribution::Constant(4096),
                U32Distribution::BitsOffset { bits: 15, offset: 8 },
            )
            .unwrap();
        assert_eq!(v, 224);
    }
}
