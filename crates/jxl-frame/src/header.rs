//! Frame header: a reduced field set (`spec.md`'s `FrameHeader` entity)
//! covering frame type, encoding mode, colour handling, passes, origin,
//! blending, loop filter and naming — the teacher's header carries many
//! more fields (crop windows per extra channel, per-frame duration/
//! timecodes, reference-frame save flags); this workspace keeps only the
//! set `spec.md`'s Data Model names. See DESIGN.md.

use jxl_bitstream::{Bitstream, Bundle, Error, Result, U32Distribution};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    Regular = 0,
    Lf = 1,
    ReferenceOnly = 2,
    SkipProgressive = 3,
}

impl TryFrom<u32> for FrameType {
    type Error = Error;
    fn try_from(value: u32) -> Result<Self> {
        Ok(match value {
            0 => Self::Regular,
            1 => Self::Lf,
            2 => Self::ReferenceOnly,
            3 => Self::SkipProgressive,
            v => return Err(Error::malformed(format!("invalid frame type {v}"))),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    VarDct,
    Modular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorTransform {
    Xyb,
    YCbCr,
    None,
}

/// The subset of `FrameHeader`'s flag bitmask this workspace acts on;
/// unrecognised bits are preserved in `raw` but otherwise ignored.
#[derive(Debug, Clone, Copy)]
pub struct FrameFlags {
    pub use_lf_frame: bool,
    pub skip_adaptive_dc_smoothing: bool,
    pub use_noise: bool,
    pub raw: u64,
}

impl FrameFlags {
    fn from_raw(raw: u64) -> Self {
        Self {
            use_lf_frame: raw & (1 << 1) != 0,
            skip_adaptive_dc_smoothing: raw & (1 << 2) != 0,
            use_noise: raw & (1 << 3) != 0,
            raw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    Replace,
    Add,
    Blend,
    MulAdd,
    Mul,
}

impl TryFrom<u32> for BlendMode {
    type Error = Error;
    fn try_from(value: u32) -> Result<Self> {
        Ok(match value {
            0 => Self::Replace,
            1 => Self::Add,
            2 => Self::Blend,
            3 => Self::MulAdd,
            4 => Self::Mul,
            v => return Err(Error::malformed(format!("invalid blend mode {v}"))),
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Blending {
    pub mode: BlendMode,
    pub source: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoopFilterParams {
    pub gaborish: bool,
    pub epf_iters: u32,
}

impl<Ctx> Bundle<Ctx> for LoopFilterParams {
    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        let all_default = bitstream.read_bool()?;
        if all_default {
            return Ok(Self { gaborish: true, epf_iters: 2 });
        }
        let gaborish = bitstream.read_bool()?;
        let epf_iters = bitstream.read_bits(2)?;
        let extra = bitstream.read_bool()?;
        if extra {
            // Sharpness/weight overrides are out of this core's scope; the
            // bits are consumed so later fields stay aligned.
            for _ in 0..4 {
                bitstream.read_bits(1)?;
            }
        }
        Ok(Self { gaborish, epf_iters })
    }
}

#[derive(Debug, Clone)]
pub struct FrameHeader {
    pub frame_type: FrameType,
    pub encoding: Encoding,
    pub flags: FrameFlags,
    pub color_transform: ColorTransform,
    pub chroma_subsampling: [u32; 3],
    pub upsampling: u32,
    pub passes: u32,
    pub x0: i32,
    pub y0: i32,
    pub width: u32,
    pub height: u32,
    pub blending: Blending,
    pub loop_filter: LoopFilterParams,
    pub is_last: bool,
    pub name: Vec<u8>,
}

fn dim_dist() -> (U32Distribution, U32Distribution, U32Distribution, U32Distribution) {
    (
        U32Distribution::BitsOffset { bits: 8, offset: 0 },
        U32Distribution::BitsOffset { bits: 11, offset: 256 },
        U32Distribution::BitsOffset { bits: 14, offset: 2304 },
        U32Distribution::BitsOffset { bits: 30, offset: 18688 },
    )
}

/// Context passed in by the frame decoder: whether the image is XYB-
/// encoded (forces `ColorTransform::Xyb` and skips `do_ycbcr`) and the
/// canvas size (crop defaults).
#[derive(Debug, Clone, Copy)]
pub struct FrameHeaderCtx {
    pub xyb_encoded: bool,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl Bundle<FrameHeaderCtx> for FrameHeader {
    fn parse(bitstream: &mut Bitstream<'_>, ctx: FrameHeaderCtx) -> Result<Self> {
        let all_default = bitstream.read_bool()?;

        let frame_type = if all_default {
            FrameType::Regular
        } else {
            FrameType::try_from(bitstream.read_bits(2)?)?
        };
        let encoding = if all_default || !bitstream.read_bool()? {
            Encoding::VarDct
        } else {
            Encoding::Modular
        };
        let flags = if all_default {
            FrameFlags::from_raw(0)
        } else {
            let raw = bitstream.read_u64()?;
            FrameFlags::from_raw(raw)
        };

        let color_transform = if ctx.xyb_encoded {
            ColorTransform::Xyb
        } else if !all_default && bitstream.read_bool()? {
            ColorTransform::YCbCr
        } else {
            ColorTransform::None
        };

        let chroma_subsampling = if matches!(color_transform, ColorTransform::YCbCr) && !flags.use_lf_frame {
            [
                bitstream.read_bits(2)?,
                bitstream.read_bits(2)?,
                bitstream.read_bits(2)?,
            ]
        } else {
            [0, 0, 0]
        };

        let upsampling = if !all_default && !flags.use_lf_frame {
            bitstream.read_u32(
                U32Distribution::Constant(1),
                U32Distribution::Constant(2),
                U32Distribution::Constant(4),
                U32Distribution::Constant(8),
            )?
        } else {
            1
        };

        let passes = if !all_default && frame_type != FrameType::ReferenceOnly {
            1 + bitstream.read_u32(
                U32Distribution::Constant(0),
                U32Distribution::BitsOffset { bits: 3, offset: 1 },
                U32Distribution::BitsOffset { bits: 4, offset: 1 },
                U32Distribution::BitsOffset { bits: 4, offset: 1 },
            )?
        } else {
            1
        };
        if passes > 11 {
            return Err(Error::malformed("frame passes exceeds 11"));
        }

        let have_crop = !all_default && frame_type != FrameType::Lf && bitstream.read_bool()?;
        let (x0, y0) = if have_crop && frame_type != FrameType::ReferenceOnly {
            let (d0, d1, d2, d3) = dim_dist();
            let rx = bitstream.read_u32(d0, d1, d2, d3)?;
            let x0 = jxl_bitstream::unpack_signed(rx);
            let (d0, d1, d2, d3) = dim_dist();
            let ry = bitstream.read_u32(d0, d1, d2, d3)?;
            let y0 = jxl_bitstream::unpack_signed(ry);
            (x0, y0)
        } else {
            (0, 0)
        };
        let (width, height) = if have_crop {
            let (d0, d1, d2, d3) = dim_dist();
            let w = bitstream.read_u32(d0, d1, d2, d3)?;
            let (d0, d1, d2, d3) = dim_dist();
            let h = bitstream.read_u32(d0, d1, d2, d3)?;
            (w, h)
        } else {
            (ctx.canvas_width, ctx.canvas_height)
        };

        let is_normal = !matches!(frame_type, FrameType::Lf | FrameType::ReferenceOnly);
        let blending = if !all_default && is_normal {
            let mode = BlendMode::try_from(bitstream.read_bits(3)?)?;
            let source = if mode != BlendMode::Replace { bitstream.read_bits(2)? } else { 0 };
            Blending { mode, source }
        } else {
            Blending { mode: BlendMode::Replace, source: 0 }
        };

        let is_last = if !all_default && is_normal {
            bitstream.read_bool()?
        } else {
            frame_type == FrameType::Regular
        };

        let loop_filter = if frame_type != FrameType::ReferenceOnly {
            LoopFilterParams::parse(bitstream, ())?
        } else {
            LoopFilterParams::default()
        };

        let name_len = bitstream.read_u32(
            U32Distribution::Constant(0),
            U32Distribution::BitsOffset { bits: 4, offset: 0 },
            U32Distribution::BitsOffset { bits: 5, offset: 16 },
            U32Distribution::BitsOffset { bits: 10, offset: 48 },
        )?;
        let mut name = Vec::with_capacity(name_len as usize);
        for _ in 0..name_len {
            name.push(bitstream.read_bits(8)? as u8);
        }

        // Extensions: a count of `(id, bits)` varint pairs, each consumed in
        // full so later sections stay byte-aligned even when unrecognised.
        let num_extensions = bitstream.read_u64()?;
        for _ in 0..num_extensions {
            let _id = bitstream.read_u64()?;
            let bits = bitstream.read_u64()?;
            for _ in 0..bits {
                bitstream.read_bits(1)?;
            }
        }

        Ok(Self {
            frame_type,
            encoding,
            flags,
            color_transform,
            chroma_subsampling,
            upsampling,
            passes,
            x0,
            y0,
            width,
            height,
            blending,
            loop_filter,
            is_last,
            name,
        })
    }
}
