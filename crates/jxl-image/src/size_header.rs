use jxl_bitstream::{Bitstream, Bundle, Result, U32Distribution};

/// Full (non-preview) image dimensions, possibly given as a multiple of 8
/// plus an aspect ratio instead of an explicit width.
#[derive(Debug, Clone, Copy)]
pub struct SizeHeader {
    pub height: u32,
    pub width: u32,
}

const DIM_DIST: (U32Distribution, U32Distribution, U32Distribution, U32Distribution) = (
    U32Distribution::BitsOffset { bits: 9, offset: 1 },
    U32Distribution::BitsOffset { bits: 13, offset: 1 },
    U32Distribution::BitsOffset { bits: 18, offset: 1 },
    U32Distribution::BitsOffset { bits: 30, offset: 1 },
);

pub(crate) fn compute_default_width(ratio: u32, w_div8: u32, height: u32) -> u32 {
    match ratio {
        0 => 8 * w_div8,
        1 => height,
        2 => height * 12 / 10,
        3 => height * 4 / 3,
        4 => height * 3 / 2,
        5 => height * 16 / 9,
        6 => height * 5 / 4,
        7 => height * 2,
        _ => unreachable!("ratio is a 3-bit field"),
    }
}

impl<Ctx> Bundle<Ctx> for SizeHeader {
    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        let div8 = bitstream.read_bool()?;
        let h_div8 = if div8 { 1 + bitstream.read_bits(5)? } else { 0 };
        let height = if div8 {
            8 * h_div8
        } else {
            let (d0, d1, d2, d3) = DIM_DIST;
            bitstream.read_u32(d0, d1, d2, d3)?
        };

        let ratio = bitstream.read_bits(3)?;
        let w_div8 = if div8 && ratio == 0 { 1 + bitstream.read_bits(5)? } else { 0 };
        let width = if !div8 && ratio == 0 {
            let (d0, d1, d2, d3) = DIM_DIST;
            bitstream.read_u32(d0, d1, d2, d3)?
        } else {
            compute_default_width(ratio, w_div8, height)
        };

        Ok(Self { height, width })
    }
}

/// Downscaled preview dimensions; same ratio table as [`SizeHeader`] but a
/// different bit-width schedule.
#[derive(Debug, Clone, Copy)]
pub struct PreviewHeader {
    pub height: u32,
    pub width: u32,
}

impl<Ctx> Bundle<Ctx> for PreviewHeader {
    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        let div8 = bitstream.read_bool()?;
        let h_div8 = if div8 {
            bitstream.read_u32(
                U32Distribution::Constant(16),
                U32Distribution::Constant(32),
                U32Distribution::BitsOffset { bits: 5, offset: 1 },
                U32Distribution::BitsOffset { bits: 9, offset: 33 },
            )?
        } else {
            1
        };
        let dim_dist = (
            U32Distribution::BitsOffset { bits: 6, offset: 1 },
            U32Distribution::BitsOffset { bits: 8, offset: 65 },
            U32Distribution::BitsOffset { bits: 10, offset: 321 },
            U32Distribution::BitsOffset { bits: 12, offset: 1345 },
        );
        let height = if div8 {
            8 * h_div8
        } else {
            let (d0, d1, d2, d3) = dim_dist;
            bitstream.read_u32(d0, d1, d2, d3)?
        };

        let ratio = bitstream.read_bits(3)?;
        let w_div8 = if div8 {
            bitstream.read_u32(
                U32Distribution::Constant(16),
                U32Distribution::Constant(32),
                U32Distribution::BitsOffset { bits: 5, offset: 1 },
                U32Distribution::BitsOffset { bits: 9, offset: 33 },
            )?
        } else {
            1
        };
        let width = if !div8 {
            let (d0, d1, d2, d3) = dim_dist;
            bitstream.read_u32(d0, d1, d2, d3)?
        } else {
            compute_default_width(ratio, w_div8, height)
        };

        Ok(Self { height, width })
    }
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
    fn div8_size_with_aspect_ratio() {
        // div8=1, h_div8(1+u5)=9 -> height=72, ratio=1 (square-ish: width=height)
        let data = bits_msb(&[(1, 1), (8, 5), (1, 3)]);
        let mut b = Bitstream::new(&data);
        let sz = SizeHeader::parse(&mut b, ()).unwrap();
        assert_eq!(sz.height, 72);
        assert_eq!(sz.width, 72);
    }

    #[test]
    fn explicit_dimensions_selector0() {
        // div8=0, height selector0 BitsOffset(9,1) carrying 100 -> raw=99
        // ratio=0, width selector0 BitsOffset(9,1) carrying 200 -> raw=199
        let data = bits_msb(&[(0, 1), (0b00, 2), (99, 9), (0, 3), (0b00, 2), (199, 9)]);
        let mut b = Bitstream::new(&data);
        let sz = SizeHeader::parse(&mut b, ()).unwrap();
        assert_eq!(sz.height, 100);
        assert_eq!(sz.width, 200);
    }
}
