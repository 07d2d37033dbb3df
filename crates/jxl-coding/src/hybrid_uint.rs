use jxl_bitstream::{Bitstream, Error, Result};

/// `(splitExponent, msbInToken, lsbInToken)`: the token/extra-bits split
/// contract used to compress non-negative integers. Small values round-trip
/// through the token alone; larger ones shift excess magnitude into raw
/// bits read outside the entropy coder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HybridUintConfig {
    pub split_exponent: u32,
    pub msb_in_token: u32,
    pub lsb_in_token: u32,
}

impl HybridUintConfig {
    pub const DEFAULT: Self = Self {
        split_exponent: 4,
        msb_in_token: 2,
        lsb_in_token: 0,
    };

    /// Parse a config bounded by `log_alphabet_size`, as read once per
    /// histogram cluster in the histogram decoder.
    pub fn parse(bitstream: &mut Bitstream<'_>, log_alphabet_size: u32) -> Result<Self> {
        let split_exponent_bits = add_log2_ceil(log_alphabet_size + 1);
        let split_exponent = bitstream.read_bits(split_exponent_bits)?;
        if split_exponent > log_alphabet_size {
            return Err(Error::malformed("split_exponent exceeds log_alphabet_size"));
        }
        let (msb_in_token, lsb_in_token) = if split_exponent != log_alphabet_size {
            let msb_bits = add_log2_ceil(split_exponent + 1);
            let msb_in_token = bitstream.read_bits(msb_bits)?;
            let lsb_bits = add_log2_ceil(split_exponent - msb_in_token + 1);
            let lsb_in_token = bitstream.read_bits(lsb_bits)?;
            (msb_in_token, lsb_in_token)
        } else {
            (0, 0)
        };
        if lsb_in_token + msb_in_token > split_exponent {
            return Err(Error::malformed(
                "lsb_in_token + msb_in_token exceeds split_exponent",
            ));
        }
        Ok(Self {
            split_exponent,
            msb_in_token,
            lsb_in_token,
        })
    }

    /// Expand a decoded token into its integer value, reading any extra
    /// bits the token's magnitude range requires.
    pub fn read_uint(&self, bitstream: &mut Bitstream<'_>, token: u32) -> Result<u32> {
        let split = 1u32 << self.split_exponent;
        if token < split {
            return Ok(token);
        }
        let msb = self.msb_in_token;
        let lsb = self.lsb_in_token;
        let n = self.split_exponent - msb - lsb + ((token - split) >> (msb + lsb));
        if n >= 32 {
            return Err(Error::resource_exceeded("hybrid-integer shift too large"));
        }
        let low_bits = bitstream.read_bits(n)?;
        let token_msb = (token >> lsb) & mask(msb);
        let value_high = (((1u32 << msb) | token_msb) << n) | low_bits;
        let value = (value_high << lsb) | (token & mask(lsb));
        Ok(value)
    }
}

fn mask(bits: u32) -> u32 {
    if bits >= 32 {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    }
}

pub fn add_log2_ceil(x: u32) -> u32 {
    32 - x.leading_zeros()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits_msb(bits: &[(u32, u32)]) -> Vec<u8> {
        let mut acc: u64 = 0;
        let mut n = 0u32;
        let mut out = Vec::new();
        for &(v, w) in bits {
            acc |= (v as u64) << n;
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
    fn below_split_is_identity() {
        let cfg = HybridUintConfig::DEFAULT;
        let data = [0u8; 0];
        let mut b = Bitstream::new(&data);
        assert_eq!(cfg.read_uint(&mut b, 5).unwrap(), 5);
    }

    #[test]
    fn above_split_reads_extra_bits() {
        // split=16 (2^4), msb=2, lsb=0. token=16 -> shift = 4-2-0+0 = 2.
        let cfg = HybridUintConfig::DEFAULT;
        let data = bits_msb(&[(0b11, 2)]);
        let mut b = Bitstream::new(&data);
        let v = cfg.read_uint(&mut b, 16).unwrap();
        // token_msb = (16>>0)&0b11 = 0, value_high = (1<<2 | 0) << 2 | 0b11 = 4*4+3=19
        assert_eq!(v, 19);
    }
}
