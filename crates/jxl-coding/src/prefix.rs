use jxl_bitstream::{Bitstream, Error, Result};

/// Canonical (Brotli-style) prefix-code table.
///
/// `configs[len]` packs `(first_code_of_len << 16) | count_of_len` for
/// every length 1..=15 that actually occurs; `symbols` lists the alphabet
/// sorted by `(length, symbol)`, matching the canonical assignment order.
#[derive(Debug, Clone)]
pub struct Histogram {
    configs: Vec<u32>,
    symbols: Vec<u16>,
}

const CODE_LENGTH_ORDER: [usize; 18] = [
    1, 2, 3, 4, 0, 5, 17, 6, 16, 7, 8, 9, 10, 11, 12, 13, 14, 15,
];

impl Histogram {
    pub fn with_single_symbol(symbol: u16) -> Self {
        Self {
            configs: vec![0, (0 << 16) | 1],
            symbols: vec![symbol],
        }
    }

    /// Build the canonical table from a per-symbol code-length array.
    /// Validates that the Kraft sum equals exactly `2^15` whenever more
    /// than one symbol is present.
    pub fn with_code_lengths(lengths: &[u8]) -> Result<Self> {
        let max_len = lengths.iter().copied().max().unwrap_or(0) as usize;
        if max_len == 0 {
            let nonzero: Vec<u16> = lengths
                .iter()
                .enumerate()
                .filter(|&(_, &l)| l != 0)
                .map(|(i, _)| i as u16)
                .collect();
            return match nonzero.len() {
                0 => Err(Error::malformed("prefix code has no symbols")),
                1 => Ok(Self::with_single_symbol(nonzero[0])),
                _ => Err(Error::malformed("prefix code has all-zero lengths")),
            };
        }

        let mut count_per_len = vec![0u32; max_len + 1];
        for &l in lengths {
            if l > 0 {
                count_per_len[l as usize] += 1;
            }
        }

        let mut kraft: u32 = 0;
        let mut code = 0u32;
        let mut next_code = vec![0u32; max_len + 1];
        for len in 1..=max_len {
            code = (code + count_per_len[len - 1]) << 1;
            next_code[len] = code;
            kraft += count_per_len[len] << (15 - len);
        }
        if kraft != 1 << 15 {
            return Err(Error::malformed("prefix code Kraft sum is not 2^15"));
        }

        let mut symbols_by_len: Vec<Vec<u16>> = vec![Vec::new(); max_len + 1];
        for (sym, &len) in lengths.iter().enumerate() {
            if len == 0 {
                continue;
            }
            symbols_by_len[len as usize].push(sym as u16);
        }

        let mut symbols = Vec::with_capacity(lengths.len());
        let mut configs = vec![0u32; max_len + 1];
        for len in 1..=max_len {
            let start_code = next_code[len];
            let count = symbols_by_len[len].len() as u32;
            configs[len] = (start_code << 16) | count;
            for &sym in &symbols_by_len[len] {
                symbols.push(sym);
            }
        }

        Ok(Self { configs, symbols })
    }

    /// Parse a prefix code: `hskip` selects simple (1..4 symbols) vs
    /// complex (18 code-length codes then the data alphabet) encoding.
    pub fn parse(bitstream: &mut Bitstream<'_>, alphabet_size: usize) -> Result<Self> {
        let hskip = bitstream.read_bits(2)?;
        if hskip == 1 {
            Self::parse_simple(bitstream, alphabet_size)
        } else {
            Self::parse_complex(bitstream, alphabet_size, hskip)
        }
    }

    fn parse_simple(bitstream: &mut Bitstream<'_>, alphabet_size: usize) -> Result<Self> {
        let num_symbols = bitstream.read_bits(2)? + 1;
        let nbits = ceil_log2(alphabet_size.max(1) as u32);
        let mut symbols = Vec::new();
        for _ in 0..num_symbols {
            let s = bitstream.read_bits(nbits)?;
            if s as usize >= alphabet_size {
                return Err(Error::malformed("simple prefix code symbol out of range"));
            }
            symbols.push(s as u16);
        }
        let lengths: Vec<u8> = match num_symbols {
            1 => {
                return Ok(Self::with_single_symbol(symbols[0]));
            }
            2 => vec![1, 1],
            3 => vec![1, 2, 2],
            4 => {
                let tree_select = bitstream.read_bool()?;
                if tree_select {
                    vec![1, 2, 3, 3]
                } else {
                    vec![2, 2, 2, 2]
                }
            }
            _ => unreachable!(),
        };
        let mut full_lengths = vec![0u8; alphabet_size];
        for (sym, len) in symbols.iter().zip(lengths) {
            full_lengths[*sym as usize] = len;
        }
        Self::with_code_lengths(&full_lengths)
    }

    fn parse_complex(
        bitstream: &mut Bitstream<'_>,
        alphabet_size: usize,
        hskip: u32,
    ) -> Result<Self> {
        let mut code_lengths = [0u8; 18];
        let mut num_read = 0u32;
        let mut total = 0u32;
        for &idx in CODE_LENGTH_ORDER.iter().skip(hskip as usize) {
            let len = read_code_length_length(bitstream)?;
            code_lengths[idx] = len;
            if len != 0 {
                num_read += 1;
                total += 32 >> len;
                if total >= 32 {
                    break;
                }
            }
        }
        let _ = num_read;
        let cl_histogram = Self::with_code_lengths(&code_lengths)?;

        let mut lengths = vec![0u8; alphabet_size];
        let mut sym = 0usize;
        let mut prev_len = 8u8;
        let mut kraft_total: u32 = 0;
        while sym < alphabet_size && kraft_total < 1 << 15 {
            let code = cl_histogram.read_symbol(bitstream)?;
            match code {
                0..=15 => {
                    lengths[sym] = code as u8;
                    if code != 0 {
                        prev_len = code as u8;
                        kraft_total += 1 << (15 - code);
                    }
                    sym += 1;
                }
                16 => {
                    let rep = 3 + bitstream.read_bits(2)?;
                    for _ in 0..rep {
                        if sym >= alphabet_size {
                            break;
                        }
                        lengths[sym] = prev_len;
                        kraft_total += 1 << (15 - prev_len);
                        sym += 1;
                    }
                }
                17 => {
                    let rep = 3 + bitstream.read_bits(3)?;
                    sym += rep as usize;
                }
                _ => return Err(Error::malformed("invalid code-length symbol")),
            }
        }
        if sym > alphabet_size {
            return Err(Error::malformed("complex prefix code overflowed alphabet"));
        }
        Self::with_code_lengths(&lengths)
    }

    /// Decode one symbol. Uses the bit-reversal trick: a canonical code of
    /// length `len` sorts against the bit-reversed peek window.
    pub fn read_symbol(&self, bitstream: &mut Bitstream<'_>) -> Result<u32> {
        if self.configs.len() <= 1 {
            return Ok(self.symbols[0] as u32);
        }
        let peeked = bitstream.peek_bits(15) as u32;
        let reversed = reverse_bits_u32(peeked, 15);
        for len in 1..self.configs.len() {
            let packed = self.configs[len];
            let first_code = packed >> 16;
            let count = packed & 0xffff;
            if count == 0 {
                continue;
            }
            let code = reversed >> (15 - len as u32);
            if code >= first_code && code - first_code < count {
                let idx = (code - first_code) as usize;
                let base: u32 = self.configs[..len]
                    .iter()
                    .map(|c| c & 0xffff)
                    .sum();
                bitstream.consume_bits(len as u32);
                return Ok(self.symbols[(base + idx) as usize] as u32);
            }
        }
        Err(Error::malformed("no matching prefix code for bitstream"))
    }
}

fn read_code_length_length(bitstream: &mut Bitstream<'_>) -> Result<u8> {
    // Hard-coded mini-Huffman table for the 18 code-length code lengths,
    // values 0..=5 prefixed by `00`, `01`, `10`, `1100`, `1101`, `111x`.
    if !bitstream.read_bool()? {
        return Ok(if !bitstream.read_bool()? { 0 } else { 4 });
    }
    if !bitstream.read_bool()? {
        return Ok(if !bitstream.read_bool()? { 3 } else { 2 });
    }
    if !bitstream.read_bool()? {
        return Ok(5);
    }
    Ok(if !bitstream.read_bool()? { 1 } else { 6 })
}

fn reverse_bits_u32(v: u32, n: u32) -> u32 {
    let mut v = v;
    let mut r = 0u32;
    for _ in 0..n {
        r = (r << 1) | (v & 1);
        v >>= 1;
    }
    r
}

fn ceil_log2(x: u32) -> u32 {
    if x <= 1 {
        0
    } else {
        32 - (x - 1).leading_zeros()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_symbol_never_consumes_bits() {
        let h = Histogram::with_single_symbol(0);
        let data = [0u8; 4];
        let mut b = Bitstream::new(&data);
        assert_eq!(h.read_symbol(&mut b).unwrap(), 0);
        assert_eq!(b.num_read_bits(), 0);
    }

    #[test]
    fn two_symbol_code_lengths_round_trip() {
        let lengths = [1u8, 1u8];
        let h = Histogram::with_code_lengths(&lengths).unwrap();
        assert_eq!(h.symbols.len(), 2);
    }
}
