//! Codestream signature, [`SizeHeader`] and [`ImageMetadata`] parsing: the
//! part of the bitstream that precedes the first frame.

pub mod metadata;
pub mod size_header;

pub use metadata::{AnimationHeader, BitDepth, ExtraChannelInfo, ExtraChannelType, ImageMetadata};
pub use size_header::{PreviewHeader, SizeHeader};

use jxl_bitstream::{Bitstream, Bundle, Error, Result};

/// Codestream magic: the first two bytes of any raw `.jxl` bitstream not
/// wrapped in an ISOBMFF container.
pub const CODESTREAM_SIGNATURE: u16 = 0xff0a;

/// The parsed prefix shared by every codestream: signature, [`SizeHeader`]
/// and [`ImageMetadata`]. Frame data follows immediately after.
#[derive(Debug, Clone)]
pub struct Headers {
    pub size: SizeHeader,
    pub metadata: ImageMetadata,
}

impl<Ctx> Bundle<Ctx> for Headers {
    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        let signature = bitstream.read_bits(16)? as u16;
        if signature != CODESTREAM_SIGNATURE {
            return Err(Error::malformed(format!(
                "bad codestream signature {signature:#06x}, expected {CODESTREAM_SIGNATURE:#06x}"
            )));
        }
        let size = SizeHeader::parse(bitstream, ())?;
        let metadata = ImageMetadata::parse(bitstream, ())?;
        Ok(Self { size, metadata })
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
    fn rejects_bad_signature() {
        let data = bits_msb(&[(0x1234, 16)]);
        let mut b = Bitstream::new(&data);
        assert!(Headers::parse(&mut b, ()).is_err());
    }

    #[test]
    fn parses_minimal_all_default_header() {
        // signature, div8 size (72x72), all-default metadata.
        let mut bits = vec![(CODESTREAM_SIGNATURE as u32, 16)];
        bits.push((1, 1)); // div8 = true
        bits.push((8, 5)); // h_div8 = 1 + 8 = 9 -> height 72
        bits.push((1, 3)); // ratio = 1 -> width = height
        bits.push((1, 1)); // metadata all_default = true
        let data = bits_msb(&bits);
        let mut b = Bitstream::new(&data);
        let headers = Headers::parse(&mut b, ()).unwrap();
        assert_eq!(headers.size.height, 72);
        assert_eq!(headers.size.width, 72);
        assert!(headers.metadata.xyb_encoded);
    }
}
