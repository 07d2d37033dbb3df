use jxl_bitstream::{Bitstream, Error, Result};

use crate::prefix::Histogram as PrefixHistogram;

/// `ANS_SIGNATURE << 16`, the exact 32-bit rANS state every stream must
/// close on after its last symbol.
pub const ANS_FINAL_STATE: u32 = 0x13 << 16;

const LOG_TAB_SIZE: u32 = 12;
const TABLE_SIZE: u32 = 1 << LOG_TAB_SIZE;

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    cutoff: u32,
    self_value: u32,
    self_freq: u32,
    right_value: u32,
    right_freq: u32,
    right_offset: u32,
}

/// A 12-bit-precision rANS distribution plus its alias table.
///
/// Built once per cluster when a histogram block is parsed, then shared
/// read-only by every symbol read that uses this cluster.
#[derive(Debug, Clone)]
pub struct Histogram {
    buckets: Vec<Bucket>,
    bucket_shift: u32,
    entry_size: u32,
    single_symbol: Option<u32>,
}

impl Histogram {
    /// Parse the distribution for one cluster: a flat-histogram shortcut,
    /// a one/two-symbol shortcut, or the general log-count scheme with
    /// RLE and an implicit "omit position" used to force closure at
    /// `2^12`.
    pub fn parse(bitstream: &mut Bitstream<'_>, alphabet_size: usize) -> Result<Self> {
        if alphabet_size == 0 {
            return Err(Error::malformed("ANS histogram alphabet is empty"));
        }
        let counts = if alphabet_size == 1 {
            vec![TABLE_SIZE]
        } else if bitstream.read_bool()? {
            Self::read_simple(bitstream, alphabet_size)?
        } else if bitstream.read_bool()? {
            Self::read_flat(alphabet_size)
        } else {
            Self::read_compressed(bitstream, alphabet_size)?
        };
        Self::build(&counts)
    }

    fn read_simple(bitstream: &mut Bitstream<'_>, alphabet_size: usize) -> Result<Vec<u32>> {
        let two_symbols = bitstream.read_bool()?;
        let mut counts = vec![0u32; alphabet_size];
        let sym0 = read_small_symbol(bitstream, alphabet_size)?;
        if !two_symbols {
            counts[sym0] = TABLE_SIZE;
            return Ok(counts);
        }
        let sym1 = read_small_symbol(bitstream, alphabet_size)?;
        if sym0 == sym1 {
            return Err(Error::malformed("two-symbol ANS shortcut repeats a symbol"));
        }
        let split = bitstream.read_bits(LOG_TAB_SIZE)?;
        if split == 0 || split >= TABLE_SIZE {
            return Err(Error::malformed("two-symbol ANS split out of range"));
        }
        counts[sym0] = split;
        counts[sym1] = TABLE_SIZE - split;
        Ok(counts)
    }

    fn read_flat(alphabet_size: usize) -> Vec<u32> {
        let n = alphabet_size as u32;
        let base = TABLE_SIZE / n;
        let rem = TABLE_SIZE % n;
        (0..alphabet_size)
            .map(|i| base + if (i as u32) < rem { 1 } else { 0 })
            .collect()
    }

    fn read_compressed(bitstream: &mut Bitstream<'_>, alphabet_size: usize) -> Result<Vec<u32>> {
        let log_count_code = log_count_histogram();
        let mut log_counts = vec![0u8; alphabet_size];
        let mut i = 0usize;
        while i < alphabet_size {
            let sym = log_count_code.read_symbol(bitstream)?;
            if sym == 13 {
                let rep = 4 + bitstream.read_bits(2)?;
                let prev = if i > 0 { log_counts[i - 1] } else { 0 };
                for _ in 0..rep {
                    if i >= alphabet_size {
                        break;
                    }
                    log_counts[i] = prev;
                    i += 1;
                }
            } else {
                log_counts[i] = sym as u8;
                i += 1;
            }
        }

        let mut omit_pos = None;
        let mut omit_log = 0u8;
        for (i, &lc) in log_counts.iter().enumerate() {
            if lc > 0 && (omit_pos.is_none() || lc > omit_log) {
                omit_log = lc;
                omit_pos = Some(i);
            }
        }
        let omit_pos = omit_pos.ok_or_else(|| {
            Error::malformed("ANS histogram omit position missing (all log-counts zero)")
        })?;

        let mut counts = vec![0u32; alphabet_size];
        let mut sum = 0u32;
        for (i, &lc) in log_counts.iter().enumerate() {
            if i == omit_pos {
                continue;
            }
            let count = match lc {
                0 => 0,
                1 => 1,
                lc => {
                    let extra_bits = (lc - 1) as u32;
                    let base = 1u32 << (lc - 1);
                    base + bitstream.read_bits(extra_bits)?
                }
            };
            counts[i] = count;
            sum = sum
                .checked_add(count)
                .ok_or_else(|| Error::malformed("ANS histogram counts overflow"))?;
        }
        if sum >= TABLE_SIZE {
            return Err(Error::malformed(
                "ANS histogram counts exceed table size before the omit position",
            ));
        }
        counts[omit_pos] = TABLE_SIZE - sum;
        Ok(counts)
    }

    /// Vose's alias-method construction: redistribute mass from "overfull"
    /// buckets (more than `entrySize` slots' worth) into "underfull" ones so
    /// every slot resolves with a single branch between at most two
    /// symbols.
    fn build(counts: &[u32]) -> Result<Self> {
        let sum: u32 = counts.iter().sum();
        if sum != TABLE_SIZE {
            return Err(Error::malformed(
                "ANS distribution does not sum to 2^12",
            ));
        }

        let nonzero = counts.iter().filter(|&&c| c > 0).count();
        if nonzero == 1 {
            let symbol = counts.iter().position(|&c| c > 0).unwrap() as u32;
            return Ok(Self {
                buckets: Vec::new(),
                bucket_shift: 0,
                entry_size: 0,
                single_symbol: Some(symbol),
            });
        }

        let num_buckets = counts.len().next_power_of_two();
        let log_alphabet_size = num_buckets.trailing_zeros();
        let bucket_shift = LOG_TAB_SIZE - log_alphabet_size;
        let entry_size = 1u32 << bucket_shift;

        let mut freq = vec![0u32; num_buckets];
        freq[..counts.len()].copy_from_slice(counts);

        let mut buckets = vec![Bucket::default(); num_buckets];
        let mut excess: Vec<i64> = vec![0; num_buckets];
        let mut overfull = Vec::new();
        let mut underfull = Vec::new();
        for i in 0..num_buckets {
            let f = freq[i];
            buckets[i].cutoff = f.min(entry_size);
            buckets[i].self_value = i as u32;
            buckets[i].self_freq = f;
            buckets[i].right_value = i as u32;
            if f > entry_size {
                excess[i] = (f - entry_size) as i64;
                overfull.push(i);
            } else if f < entry_size {
                underfull.push(i);
            }
        }

        let mut donated = vec![0u32; num_buckets];
        while let Some(u) = underfull.pop() {
            let need = entry_size - freq[u];
            let &o = overfull
                .last()
                .ok_or_else(|| Error::internal("alias table build ran out of overfull buckets"))?;
            buckets[u].right_value = o as u32;
            buckets[u].right_freq = freq[o];
            buckets[u].right_offset = donated[o];
            donated[o] += need;
            excess[o] -= need as i64;
            if excess[o] <= 0 {
                overfull.pop();
            }
        }

        Ok(Self {
            buckets,
            bucket_shift,
            entry_size,
            single_symbol: None,
        })
    }

    /// Fast path: clusters with only one possible symbol never need to
    /// touch the bitstream or the rANS state.
    pub fn single_symbol(&self) -> Option<u32> {
        self.single_symbol
    }

    /// Decode one symbol, threading the 32-bit rANS state through renormalisation.
    pub fn read_symbol(&self, bitstream: &mut Bitstream<'_>, state: &mut u32) -> Result<u32> {
        if let Some(symbol) = self.single_symbol {
            return Ok(symbol);
        }
        let slot = *state & (TABLE_SIZE - 1);
        let bucket = &self.buckets[(slot >> self.bucket_shift) as usize];
        let intra = slot & (self.entry_size - 1);
        let (symbol, freq, offset) = if intra < bucket.cutoff {
            (bucket.self_value, bucket.self_freq, intra)
        } else {
            (
                bucket.right_value,
                bucket.right_freq,
                bucket.right_offset + (intra - bucket.cutoff),
            )
        };
        *state = freq
            .checked_mul(*state >> LOG_TAB_SIZE)
            .and_then(|v| v.checked_add(offset))
            .ok_or_else(|| Error::malformed("rANS state overflowed"))?;
        if *state < (1 << 16) {
            let bits = bitstream.read_bits(16)?;
            *state = (*state << 16) | bits;
        }
        Ok(symbol)
    }
}

pub fn read_initial_state(bitstream: &mut Bitstream<'_>) -> Result<u32> {
    bitstream.read_bits(32)
}

pub fn check_final_state(state: u32) -> Result<()> {
    if state != ANS_FINAL_STATE {
        return Err(Error::malformed("ANS stream did not close on the final state"));
    }
    Ok(())
}

fn read_small_symbol(bitstream: &mut Bitstream<'_>, alphabet_size: usize) -> Result<usize> {
    let nbits = ceil_log2(alphabet_size as u32);
    let v = bitstream.read_bits(nbits)? as usize;
    if v >= alphabet_size {
        return Err(Error::malformed("ANS shortcut symbol out of range"));
    }
    Ok(v)
}

fn ceil_log2(x: u32) -> u32 {
    if x <= 1 {
        0
    } else {
        32 - (x - 1).leading_zeros()
    }
}

/// Fixed canonical code used to read per-symbol log-counts in the general
/// histogram path: 14 values (log-count 0..=12, plus RLE marker 13), two of
/// them three bits wide and the rest four, chosen so the Kraft sum closes
/// on `2^15` exactly.
fn log_count_histogram() -> PrefixHistogram {
    let lengths = [3u8, 3, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4];
    PrefixHistogram::with_code_lengths(&lengths).expect("fixed log-count table is well-formed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_symbol_fast_path() {
        let h = Histogram::build(&[TABLE_SIZE]).unwrap();
        let data = [0u8; 0];
        let mut b = Bitstream::new(&data);
        let mut state = 0u32;
        assert_eq!(h.read_symbol(&mut b, &mut state).unwrap(), 0);
    }

    #[test]
    fn flat_histogram_sums_to_table_size() {
        let counts = Histogram::read_flat(4);
        assert_eq!(counts.iter().sum::<u32>(), TABLE_SIZE);
    }
}
