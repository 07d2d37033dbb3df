#![allow(clippy::excessive_precision)]
//! `ColourEncoding`, `ToneMapping` and `OpsinInverseMatrix`: the colour
//! metadata bundles embedded in the image header.

use jxl_bitstream::{unpack_signed, Bitstream, Bundle, Error, Result, U32Distribution};

use crate::consts::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Customxy {
    pub x: i32,
    pub y: i32,
}

impl Customxy {
    #[inline]
    pub fn as_float(self) -> [f32; 2] {
        [self.x as f32 / 1e6, self.y as f32 / 1e6]
    }
}

impl<Ctx> Bundle<Ctx> for Customxy {
    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        let read_coord = |bitstream: &mut Bitstream<'_>| -> Result<i32> {
            let raw = bitstream.read_u32(
                U32Distribution::BitsOffset { bits: 19, offset: 0 },
                U32Distribution::BitsOffset { bits: 19, offset: 524288 },
                U32Distribution::BitsOffset { bits: 20, offset: 1048576 },
                U32Distribution::BitsOffset { bits: 21, offset: 2097152 },
            )?;
            Ok(unpack_signed(raw))
        };
        Ok(Self {
            x: read_coord(bitstream)?,
            y: read_coord(bitstream)?,
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ColourSpace {
    #[default]
    Rgb = 0,
    Grey = 1,
    Xyb = 2,
    Unknown = 3,
}

impl TryFrom<u32> for ColourSpace {
    type Error = ();
    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Rgb,
            1 => Self::Grey,
            2 => Self::Xyb,
            3 => Self::Unknown,
            _ => return Err(()),
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum WhitePoint {
    #[default]
    D65,
    Custom(Customxy),
    E,
    Dci,
}

impl<Ctx: Copy> Bundle<Ctx> for WhitePoint {
    fn parse(bitstream: &mut Bitstream<'_>, ctx: Ctx) -> Result<Self> {
        let d: u32 = bitstream.read_enum()?;
        Ok(match d {
            1 => Self::D65,
            10 => Self::E,
            11 => Self::Dci,
            2 => Self::Custom(Customxy::parse(bitstream, ctx)?),
            _ => return Err(Error::malformed(format!("invalid white point discriminator {d}"))),
        })
    }
}

impl WhitePoint {
    #[inline]
    pub fn as_chromaticity(self) -> [f32; 2] {
        match self {
            Self::D65 => ILLUMINANT_D65,
            Self::Custom(xy) => xy.as_float(),
            Self::E => ILLUMINANT_E,
            Self::Dci => ILLUMINANT_DCI,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Primaries {
    #[default]
    Srgb,
    Custom {
        red: Customxy,
        green: Customxy,
        blue: Customxy,
    },
    Bt2100,
    P3,
}

impl<Ctx: Copy> Bundle<Ctx> for Primaries {
    fn parse(bitstream: &mut Bitstream<'_>, ctx: Ctx) -> Result<Self> {
        let d: u32 = bitstream.read_enum()?;
        Ok(match d {
            1 => Self::Srgb,
            9 => Self::Bt2100,
            11 => Self::P3,
            2 => Self::Custom {
                red: Customxy::parse(bitstream, ctx)?,
                green: Customxy::parse(bitstream, ctx)?,
                blue: Customxy::parse(bitstream, ctx)?,
            },
            _ => return Err(Error::malformed(format!("invalid primaries discriminator {d}"))),
        })
    }
}

impl Primaries {
    #[inline]
    pub fn as_chromaticity(self) -> [[f32; 2]; 3] {
        match self {
            Self::Srgb => PRIMARIES_SRGB,
            Self::Custom { red, green, blue } => [red.as_float(), green.as_float(), blue.as_float()],
            Self::Bt2100 => PRIMARIES_BT2100,
            Self::P3 => PRIMARIES_P3,
        }
    }

    pub fn cicp(&self) -> Option<u8> {
        match self {
            Self::Srgb => Some(1),
            Self::Custom { .. } => None,
            Self::Bt2100 => Some(9),
            Self::P3 => Some(11),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum RenderingIntent {
    Perceptual = 0,
    #[default]
    Relative = 1,
    Saturation = 2,
    Absolute = 3,
}

impl TryFrom<u32> for RenderingIntent {
    type Error = ();
    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Perceptual,
            1 => Self::Relative,
            2 => Self::Saturation,
            3 => Self::Absolute,
            _ => return Err(()),
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum TransferFunction {
    Gamma(u32),
    Bt709,
    Unknown,
    Linear,
    #[default]
    Srgb,
    Pq,
    Dci,
    Hlg,
}

impl<Ctx> Bundle<Ctx> for TransferFunction {
    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        if bitstream.read_bool()? {
            let gamma = bitstream.read_bits(24)?;
            return Ok(Self::Gamma(gamma));
        }
        let d: u32 = bitstream.read_enum()?;
        Ok(match d {
            1 => Self::Bt709,
            2 => Self::Unknown,
            8 => Self::Linear,
            13 => Self::Srgb,
            16 => Self::Pq,
            17 => Self::Dci,
            18 => Self::Hlg,
            _ => return Err(Error::malformed(format!("invalid transfer function discriminator {d}"))),
        })
    }
}

impl TransferFunction {
    pub fn cicp(&self) -> Option<u8> {
        match self {
            Self::Gamma(_) => None,
            Self::Bt709 => Some(1),
            Self::Unknown => None,
            Self::Linear => Some(8),
            Self::Srgb => Some(13),
            Self::Pq => Some(16),
            Self::Dci => Some(17),
            Self::Hlg => Some(18),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EnumColourEncoding {
    pub colour_space: ColourSpace,
    pub white_point: WhitePoint,
    pub primaries: Primaries,
    pub tf: TransferFunction,
    pub rendering_intent: RenderingIntent,
}

impl EnumColourEncoding {
    pub fn xyb() -> Self {
        Self {
            colour_space: ColourSpace::Xyb,
            white_point: WhitePoint::D65,
            primaries: Primaries::Srgb,
            tf: TransferFunction::Linear,
            rendering_intent: RenderingIntent::Perceptual,
        }
    }

    pub fn srgb(rendering_intent: RenderingIntent) -> Self {
        Self {
            colour_space: ColourSpace::Rgb,
            white_point: WhitePoint::D65,
            primaries: Primaries::Srgb,
            tf: TransferFunction::Srgb,
            rendering_intent,
        }
    }

    pub fn gray_srgb() -> Self {
        Self {
            colour_space: ColourSpace::Grey,
            white_point: WhitePoint::D65,
            primaries: Primaries::Srgb,
            tf: TransferFunction::Srgb,
            rendering_intent: RenderingIntent::Relative,
        }
    }

    #[inline]
    pub fn is_srgb(&self) -> bool {
        matches!(
            self,
            Self {
                colour_space: ColourSpace::Rgb,
                white_point: WhitePoint::D65,
                primaries: Primaries::Srgb,
                tf: TransferFunction::Srgb,
                ..
            }
        )
    }

    #[inline]
    pub fn is_hdr(&self) -> bool {
        matches!(self.tf, TransferFunction::Pq | TransferFunction::Hlg)
    }

    pub fn cicp(&self) -> Option<[u8; 4]> {
        let primaries = self.primaries.cicp()?;
        let tf = self.tf.cicp()?;
        Some([primaries, tf, 0, 1])
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ColourEncoding {
    Enum(EnumColourEncoding),
    IccProfile(ColourSpace),
    /// Not a codestream-level value; used internally to request a PCS-XYZ
    /// framebuffer for downstream processing.
    PcsXyz,
}

impl Default for ColourEncoding {
    fn default() -> Self {
        Self::Enum(EnumColourEncoding::default())
    }
}

impl<Ctx: Copy> Bundle<Ctx> for ColourEncoding {
    fn parse(bitstream: &mut Bitstream<'_>, ctx: Ctx) -> Result<Self> {
        let all_default = bitstream.read_bool()?;
        if all_default {
            return Ok(Self::default());
        }
        let want_icc = bitstream.read_bool()?;
        let colour_space: ColourSpace = bitstream.read_enum()?;
        if want_icc {
            return Ok(Self::IccProfile(colour_space));
        }
        let white_point = if colour_space == ColourSpace::Xyb {
            WhitePoint::D65
        } else {
            WhitePoint::parse(bitstream, ctx)?
        };
        let primaries = if matches!(colour_space, ColourSpace::Xyb | ColourSpace::Grey) {
            Primaries::Srgb
        } else {
            Primaries::parse(bitstream, ctx)?
        };
        let tf = TransferFunction::parse(bitstream, ctx)?;
        let rendering_intent: RenderingIntent = bitstream.read_enum()?;
        Ok(Self::Enum(EnumColourEncoding {
            colour_space,
            white_point,
            primaries,
            tf,
            rendering_intent,
        }))
    }
}

impl ColourEncoding {
    #[inline]
    pub fn colour_space(&self) -> ColourSpace {
        match self {
            Self::Enum(e) => e.colour_space,
            Self::IccProfile(x) => *x,
            Self::PcsXyz => ColourSpace::Unknown,
        }
    }

    #[inline]
    pub fn want_icc(&self) -> bool {
        matches!(self, Self::IccProfile(_))
    }
}

/// HDR tone-mapping hints (`toneMapping` bundle).
#[derive(Debug, Clone, Copy)]
pub struct ToneMapping {
    pub intensity_target: f32,
    pub min_nits: f32,
    pub relative_to_max_display: bool,
    pub linear_below: f32,
}

impl Default for ToneMapping {
    fn default() -> Self {
        Self {
            intensity_target: 255.0,
            min_nits: 0.0,
            relative_to_max_display: false,
            linear_below: 0.0,
        }
    }
}

impl<Ctx> Bundle<Ctx> for ToneMapping {
    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        if bitstream.read_bool()? {
            return Ok(Self::default());
        }
        Ok(Self {
            intensity_target: bitstream.read_f16_as_f32()?,
            min_nits: bitstream.read_f16_as_f32()?,
            relative_to_max_display: bitstream.read_bool()?,
            linear_below: bitstream.read_f16_as_f32()?,
        })
    }
}

/// Inverse opsin absorbance matrix applied when undoing the XYB transform.
#[derive(Debug, Clone, Copy)]
pub struct OpsinInverseMatrix {
    pub inv_mat: [[f32; 3]; 3],
    pub opsin_bias: [f32; 3],
    pub quant_bias: [f32; 3],
    pub quant_bias_numerator: f32,
}

impl Default for OpsinInverseMatrix {
    fn default() -> Self {
        Self {
            inv_mat: DEFAULT_INV_MAT,
            opsin_bias: DEFAULT_OPSIN_BIAS,
            quant_bias: DEFAULT_QUANT_BIAS,
            quant_bias_numerator: DEFAULT_QUANT_BIAS_NUMERATOR,
        }
    }
}

impl<Ctx> Bundle<Ctx> for OpsinInverseMatrix {
    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        if bitstream.read_bool()? {
            return Ok(Self::default());
        }
        let mut inv_mat = [[0.0f32; 3]; 3];
        for row in &mut inv_mat {
            for v in row {
                *v = bitstream.read_f16_as_f32()?;
            }
        }
        let mut opsin_bias = [0.0f32; 3];
        for v in &mut opsin_bias {
            *v = bitstream.read_f16_as_f32()?;
        }
        let mut quant_bias = [0.0f32; 3];
        for v in &mut quant_bias {
            *v = bitstream.read_f16_as_f32()?;
        }
        let quant_bias_numerator = bitstream.read_f16_as_f32()?;
        Ok(Self {
            inv_mat,
            opsin_bias,
            quant_bias,
            quant_bias_numerator,
        })
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
    fn all_default_colour_encoding_is_srgb_like_enum() {
        let data = bits_msb(&[(1, 1)]);
        let mut b = Bitstream::new(&data);
        let ce = ColourEncoding::parse(&mut b, ()).unwrap();
        assert_eq!(ce.colour_space(), ColourSpace::Rgb);
    }

    #[test]
    fn tone_mapping_default_matches_spec_constants() {
        let data = bits_msb(&[(1, 1)]);
        let mut b = Bitstream::new(&data);
        let tm = ToneMapping::parse(&mut b, ()).unwrap();
        assert_eq!(tm.intensity_target, 255.0);
        assert!(!tm.relative_to_max_display);
    }

    #[test]
    fn opsin_inverse_matrix_default_matches_builtin_constants() {
        let data = bits_msb(&[(1, 1)]);
        let mut b = Bitstream::new(&data);
        let m = OpsinInverseMatrix::parse(&mut b, ()).unwrap();
        assert_eq!(m.inv_mat, DEFAULT_INV_MAT);
    }
}
