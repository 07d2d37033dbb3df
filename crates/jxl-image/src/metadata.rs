use jxl_bitstream::{Bitstream, Bundle, Result, U32Distribution};
use jxl_color::header::{ColourEncoding, OpsinInverseMatrix, ToneMapping};

use crate::size_header::{PreviewHeader, SizeHeader};

#[derive(Debug, Clone, Copy)]
pub struct AnimationHeader {
    pub tps_numerator: u32,
    pub tps_denominator: u32,
    pub num_loops: u32,
    pub have_timecodes: bool,
}

impl<Ctx> Bundle<Ctx> for AnimationHeader {
    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        let tps_numerator = bitstream.read_u32(
            U32Distribution::Constant(100),
            U32Distribution::Constant(1000),
            U32Distribution::BitsOffset { bits: 10, offset: 1 },
            U32Distribution::BitsOffset { bits: 30, offset: 1 },
        )?;
        let tps_denominator = bitstream.read_u32(
            U32Distribution::Constant(1),
            U32Distribution::Constant(1001),
            U32Distribution::BitsOffset { bits: 8, offset: 1 },
            U32Distribution::BitsOffset { bits: 10, offset: 1 },
        )?;
        let num_loops = bitstream.read_u32(
            U32Distribution::Constant(0),
            U32Distribution::BitsOffset { bits: 3, offset: 0 },
            U32Distribution::BitsOffset { bits: 16, offset: 0 },
            U32Distribution::BitsOffset { bits: 32, offset: 0 },
        )?;
        let have_timecodes = bitstream.read_bool()?;
        Ok(Self {
            tps_numerator,
            tps_denominator,
            num_loops,
            have_timecodes,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ExtraChannelType {
    #[default]
    Alpha = 0,
    Depth,
    SpotColour,
    SelectionMask,
    Black,
    Cfa,
    Thermal,
    NonOptional = 15,
    Optional,
}

impl TryFrom<u32> for ExtraChannelType {
    type Error = ();
    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Alpha,
            1 => Self::Depth,
            2 => Self::SpotColour,
            3 => Self::SelectionMask,
            4 => Self::Black,
            5 => Self::Cfa,
            6 => Self::Thermal,
            15 => Self::NonOptional,
            16 => Self::Optional,
            _ => return Err(()),
        })
    }
}

/// Per-sample bit depth, shared by the main image and every extra channel.
#[derive(Debug, Clone, Copy)]
pub enum BitDepth {
    IntegerSample { bits_per_sample: u32 },
    FloatSample { bits_per_sample: u32, exp_bits: u32 },
}

impl Default for BitDepth {
    fn default() -> Self {
        Self::IntegerSample { bits_per_sample: 8 }
    }
}

impl BitDepth {
    #[inline]
    pub fn bits_per_sample(self) -> u32 {
        match self {
            Self::IntegerSample { bits_per_sample } => bits_per_sample,
            Self::FloatSample { bits_per_sample, .. } => bits_per_sample,
        }
    }

    /// Undo the codestream's integer sample encoding into `[0, 1]`-ish
    /// floating point, honoring float-sample bit depths.
    pub fn parse_integer_sample(self, sample: i32) -> f32 {
        match self {
            Self::IntegerSample { bits_per_sample } => {
                let div = (1i32 << bits_per_sample) - 1;
                (sample as f64 / div as f64) as f32
            }
            Self::FloatSample { bits_per_sample, exp_bits } => {
                let sample = sample as u32;
                let mantissa_bits = bits_per_sample - exp_bits - 1;
                let mantissa_mask = (1u32 << mantissa_bits) - 1;
                let exp_mask = ((1u32 << (bits_per_sample - 1)) - 1) ^ mantissa_mask;

                let is_signed = (sample & (1u32 << (bits_per_sample - 1))) != 0;
                let mantissa = sample & mantissa_mask;
                let exp = ((sample & exp_mask) >> mantissa_bits) as i32;
                let exp = exp - ((1 << (exp_bits - 1)) - 1);

                let f32_mantissa_bits = f32::MANTISSA_DIGITS - 1;
                let mantissa = match mantissa_bits.cmp(&f32_mantissa_bits) {
                    std::cmp::Ordering::Less => mantissa << (f32_mantissa_bits - mantissa_bits),
                    std::cmp::Ordering::Greater => mantissa >> (mantissa_bits - f32_mantissa_bits),
                    std::cmp::Ordering::Equal => mantissa,
                };
                let exp = (exp + 127) as u32;
                let sign = is_signed as u32;
                f32::from_bits((sign << 31) | (exp << f32_mantissa_bits) | mantissa)
            }
        }
    }
}

impl<Ctx> Bundle<Ctx> for BitDepth {
    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        if bitstream.read_bool()? {
            let bits_per_sample = bitstream.read_u32(
                U32Distribution::Constant(32),
                U32Distribution::Constant(16),
                U32Distribution::Constant(24),
                U32Distribution::BitsOffset { bits: 6, offset: 1 },
            )?;
            let exp_bits = 1 + bitstream.read_bits(4)?;
            Ok(Self::FloatSample { bits_per_sample, exp_bits })
        } else {
            let bits_per_sample = bitstream.read_u32(
                U32Distribution::Constant(8),
                U32Distribution::Constant(10),
                U32Distribution::Constant(12),
                U32Distribution::BitsOffset { bits: 6, offset: 1 },
            )?;
            Ok(Self::IntegerSample { bits_per_sample })
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtraChannelInfo {
    pub d_alpha: bool,
    pub ty: ExtraChannelType,
    pub bit_depth: BitDepth,
    pub dim_shift: u32,
    pub name: Vec<u8>,
    pub alpha_associated: bool,
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub solidity: f32,
    pub cfa_channel: u32,
}

impl<Ctx> Bundle<Ctx> for ExtraChannelInfo {
    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        let d_alpha = bitstream.read_bool()?;
        let ty = if d_alpha {
            ExtraChannelType::Alpha
        } else {
            bitstream.read_enum()?
        };
        let bit_depth = if d_alpha {
            BitDepth::default()
        } else {
            BitDepth::parse(bitstream, ())?
        };
        let dim_shift = if d_alpha {
            0
        } else {
            bitstream.read_u32(
                U32Distribution::Constant(0),
                U32Distribution::Constant(3),
                U32Distribution::Constant(4),
                U32Distribution::BitsOffset { bits: 3, offset: 1 },
            )?
        };
        let name_len = if d_alpha {
            0
        } else {
            bitstream.read_u32(
                U32Distribution::Constant(0),
                U32Distribution::BitsOffset { bits: 4, offset: 0 },
                U32Distribution::BitsOffset { bits: 5, offset: 16 },
                U32Distribution::BitsOffset { bits: 10, offset: 48 },
            )?
        };
        let mut name = Vec::with_capacity(name_len as usize);
        for _ in 0..name_len {
            name.push(bitstream.read_bits(8)? as u8);
        }
        let alpha_associated = if !d_alpha && ty == ExtraChannelType::Alpha {
            bitstream.read_bool()?
        } else {
            false
        };
        let is_spot = !d_alpha && ty == ExtraChannelType::SpotColour;
        let red = if is_spot { bitstream.read_f16_as_f32()? } else { 0.0 };
        let green = if is_spot { bitstream.read_f16_as_f32()? } else { 0.0 };
        let blue = if is_spot { bitstream.read_f16_as_f32()? } else { 0.0 };
        let solidity = if is_spot { bitstream.read_f16_as_f32()? } else { 0.0 };
        let cfa_channel = if !d_alpha && ty == ExtraChannelType::Cfa {
            bitstream.read_u32(
                U32Distribution::Constant(1),
                U32Distribution::BitsOffset { bits: 2, offset: 0 },
                U32Distribution::BitsOffset { bits: 4, offset: 3 },
                U32Distribution::BitsOffset { bits: 8, offset: 19 },
            )?
        } else {
            1
        };
        Ok(Self {
            d_alpha,
            ty,
            bit_depth,
            dim_shift,
            name,
            alpha_associated,
            red,
            green,
            blue,
            solidity,
            cfa_channel,
        })
    }
}

/// Arbitrary-length codestream extension blocks. Every extension's payload
/// bit length is currently unspecified by this decoder and simply skipped.
#[derive(Debug, Clone, Default)]
pub struct Extensions {
    pub extension_bits: Vec<u64>,
}

impl<Ctx> Bundle<Ctx> for Extensions {
    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        let extensions = bitstream.read_u64()?;
        if extensions == 0 {
            return Ok(Self::default());
        }
        let count = ((extensions + 7) / 8) as usize;
        let mut extension_bits = Vec::with_capacity(count);
        for _ in 0..count {
            extension_bits.push(bitstream.read_u64()?);
        }
        Ok(Self { extension_bits })
    }
}

/// Per-channel chroma/detail upsampling weights and the whole-image
/// metadata bundle (`ImageMetadata`, spec section on the codestream header).
#[derive(Debug, Clone)]
pub struct ImageMetadata {
    pub orientation: u32,
    pub intrinsic_size: Option<SizeHeader>,
    pub preview: Option<PreviewHeader>,
    pub animation: Option<AnimationHeader>,
    pub bit_depth: BitDepth,
    pub modular_16bit_buffers: bool,
    pub ec_info: Vec<ExtraChannelInfo>,
    pub xyb_encoded: bool,
    pub colour_encoding: ColourEncoding,
    pub tone_mapping: ToneMapping,
    pub extensions: Extensions,
    pub opsin_inverse_matrix: OpsinInverseMatrix,
    pub up2_weight: [f32; 15],
    pub up4_weight: [f32; 55],
    pub up8_weight: [f32; 210],
}

impl ImageMetadata {
    const D_UP2: [f32; 15] = [
        -0.01716200, -0.03452303, -0.04022174, -0.02921014, -0.00624645,
        0.14111091, 0.28896755, 0.00278718, -0.01610267, 0.56661550,
        0.03777607, -0.01986694, -0.03144731, -0.01185068, -0.00213539,
    ];
    const D_UP4: [f32; 55] = [
        -0.02419067, -0.03491987, -0.03693351, -0.03094285, -0.00529785,
        -0.01663432, -0.03556863, -0.03888905, -0.03516850, -0.00989469,
        0.23651958, 0.33392945, -0.01073543, -0.01313181, -0.03556694,
        0.13048175, 0.40103025, 0.03951150, -0.02077584, 0.46914198,
        -0.00209270, -0.01484589, -0.04064806, 0.18942530, 0.56279892,
        0.06674400, -0.02335494, -0.03551682, -0.00754830, -0.02267919,
        -0.02363578, 0.00315804, -0.03399098, -0.01359519, -0.00091653,
        -0.00335467, -0.01163294, -0.01610294, -0.00974088, -0.00191622,
        -0.01095446, -0.03198464, -0.04455121, -0.02799790, -0.00645912,
        0.06390599, 0.22963888, 0.00630981, -0.01897349, 0.67537268,
        0.08483369, -0.02534994, -0.02205197, -0.01667999, -0.00384443,
    ];
    const D_UP8: [f32; 210] = [
        -0.02928613, -0.03706353, -0.03783812, -0.03324558, -0.00447632,
        -0.02519406, -0.03752601, -0.03901508, -0.03663285, -0.00646649,
        -0.02066407, -0.03838633, -0.04002101, -0.03900035, -0.00901973,
        -0.01626393, -0.03954148, -0.04046620, -0.03979621, -0.01224485,
        0.29895328, 0.35757708, -0.02447552, -0.01081748, -0.04314594,
        0.23903219, 0.41119301, -0.00573046, -0.01450239, -0.04246845,
        0.17567618, 0.45220643, 0.02287757, -0.01936783, -0.03583255,
        0.11572472, 0.47416733, 0.06284440, -0.02685066, 0.42720050,
        -0.02248939, -0.01155273, -0.04562755, 0.28689496, 0.49093869,
        -0.00007891, -0.01545926, -0.04562659, 0.21238920, 0.53980934,
        0.03369474, -0.02070211, -0.03866988, 0.14229550, 0.56593398,
        0.08045181, -0.02888298, -0.03680918, -0.00542229, -0.02920477,
        -0.02788574, -0.02118180, -0.03942402, -0.00775547, -0.02433614,
        -0.03193943, -0.02030828, -0.04044014, -0.01074016, -0.01930822,
        -0.03620399, -0.01974125, -0.03919545, -0.01456093, -0.00045072,
        -0.00360110, -0.01020207, -0.01231907, -0.00638988, -0.00071592,
        -0.00279122, -0.00957115, -0.01288327, -0.00730937, -0.00107783,
        -0.00210156, -0.00890705, -0.01317668, -0.00813895, -0.00153491,
        -0.02128481, -0.04173044, -0.04831487, -0.03293190, -0.00525260,
        -0.01720322, -0.04052736, -0.05045706, -0.03607317, -0.00738030,
        -0.01341764, -0.03965629, -0.05151616, -0.03814886, -0.01005819,
        0.18968273, 0.33063684, -0.01300105, -0.01372950, -0.04017465,
        0.13727832, 0.36402234, 0.01027890, -0.01832107, -0.03365072,
        0.08734506, 0.38194295, 0.04338228, -0.02525993, 0.56408126,
        0.00458352, -0.01648227, -0.04887868, 0.24585519, 0.62026135,
        0.04314807, -0.02213737, -0.04158014, 0.16637289, 0.65027023,
        0.09621636, -0.03101388, -0.04082742, -0.00904519, -0.02790922,
        -0.02117818, 0.00798662, -0.03995711, -0.01243427, -0.02231705,
        -0.02946266, 0.00992055, -0.03600283, -0.01684920, -0.00111684,
        -0.00411204, -0.01297130, -0.01723725, -0.01022545, -0.00165306,
        -0.00313110, -0.01218016, -0.01763266, -0.01125620, -0.00231663,
        -0.01374149, -0.03797620, -0.05142937, -0.03117307, -0.00581914,
        -0.01064003, -0.03608089, -0.05272168, -0.03375670, -0.00795586,
        0.09628104, 0.27129991, -0.00353779, -0.01734151, -0.03153981,
        0.05686230, 0.28500998, 0.02230594, -0.02374955, 0.68214326,
        0.05018048, -0.02320852, -0.04383616, 0.18459474, 0.71517975,
        0.10805613, -0.03263677, -0.03637639, -0.01394373, -0.02511203,
        -0.01728636, 0.05407331, -0.02867568, -0.01893131, -0.00240854,
        -0.00446511, -0.01636187, -0.02377053, -0.01522848, -0.00333334,
        -0.00819975, -0.02964169, -0.04499287, -0.02745350, -0.00612408,
        0.02727416, 0.19446600, 0.00159832, -0.02232473, 0.74982506,
        0.11452620, -0.03348048, -0.01605681, -0.02070339, -0.00458223,
    ];

    pub fn alpha(&self) -> Option<usize> {
        self.ec_info.iter().position(|info| info.d_alpha)
    }

    pub fn grayscale(&self) -> bool {
        self.colour_encoding.colour_space() == jxl_color::header::ColourSpace::Grey
    }

    pub fn encoded_color_channels(&self) -> usize {
        if !self.xyb_encoded && self.grayscale() {
            1
        } else {
            3
        }
    }

    /// Maps a pixel coordinate through the header's `orientation` tag
    /// (values `1..=8`, EXIF-style); `inverse` toggles decode vs encode
    /// direction for orientations 6 and 8, which aren't self-inverse.
    pub fn apply_orientation(
        &self,
        width: u32,
        height: u32,
        left: u32,
        top: u32,
        inverse: bool,
    ) -> (u32, u32, u32, u32) {
        let (left, top) = match self.orientation {
            1 => (left, top),
            2 => (width - left - 1, top),
            3 => (width - left - 1, height - top - 1),
            4 => (left, height - top - 1),
            5 => (top, left),
            6 if inverse => (top, width - left - 1),
            6 => (height - top - 1, left),
            7 => (height - top - 1, width - left - 1),
            8 if inverse => (height - top - 1, left),
            8 => (top, width - left - 1),
            _ => unreachable!("orientation is 1 + u(3)"),
        };
        let (width, height) = match self.orientation {
            1..=4 => (width, height),
            5..=8 => (height, width),
            _ => unreachable!("orientation is 1 + u(3)"),
        };
        (width, height, left, top)
    }
}

impl<Ctx> Bundle<Ctx> for ImageMetadata {
    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        let all_default = bitstream.read_bool()?;
        if all_default {
            return Ok(Self {
                orientation: 1,
                intrinsic_size: None,
                preview: None,
                animation: None,
                bit_depth: BitDepth::default(),
                modular_16bit_buffers: true,
                ec_info: Vec::new(),
                xyb_encoded: true,
                colour_encoding: ColourEncoding::default(),
                tone_mapping: ToneMapping::default(),
                extensions: Extensions::default(),
                opsin_inverse_matrix: OpsinInverseMatrix::default(),
                up2_weight: Self::D_UP2,
                up4_weight: Self::D_UP4,
                up8_weight: Self::D_UP8,
            });
        }

        let extra_fields = bitstream.read_bool()?;
        let orientation = if extra_fields { 1 + bitstream.read_bits(3)? } else { 1 };
        let have_intr_size = extra_fields && bitstream.read_bool()?;
        let intrinsic_size = if have_intr_size {
            Some(SizeHeader::parse(bitstream, ())?)
        } else {
            None
        };
        let have_preview = extra_fields && bitstream.read_bool()?;
        let preview = if have_preview {
            Some(PreviewHeader::parse(bitstream, ())?)
        } else {
            None
        };
        let have_animation = extra_fields && bitstream.read_bool()?;
        let animation = if have_animation {
            Some(AnimationHeader::parse(bitstream, ())?)
        } else {
            None
        };

        let bit_depth = BitDepth::parse(bitstream, ())?;
        let modular_16bit_buffers = bitstream.read_bool()?;
        let num_extra = bitstream.read_u32(
            U32Distribution::Constant(0),
            U32Distribution::Constant(1),
            U32Distribution::BitsOffset { bits: 4, offset: 2 },
            U32Distribution::BitsOffset { bits: 12, offset: 1 },
        )?;
        let mut ec_info = Vec::with_capacity(num_extra as usize);
        for _ in 0..num_extra {
            ec_info.push(ExtraChannelInfo::parse(bitstream, ())?);
        }

        let xyb_encoded = bitstream.read_bool()?;
        let colour_encoding = ColourEncoding::parse(bitstream, ())?;
        let tone_mapping = if extra_fields {
            ToneMapping::parse(bitstream, ())?
        } else {
            ToneMapping::default()
        };
        let extensions = Extensions::parse(bitstream, ())?;

        let default_m = bitstream.read_bool()?;
        let opsin_inverse_matrix = if !default_m && xyb_encoded {
            OpsinInverseMatrix::parse(bitstream, ())?
        } else {
            OpsinInverseMatrix::default()
        };
        let cw_mask = if !default_m { bitstream.read_bits(3)? } else { 0 };

        let up2_weight = if cw_mask & 1 != 0 {
            let mut w = [0.0f32; 15];
            for v in &mut w {
                *v = bitstream.read_f16_as_f32()?;
            }
            w
        } else {
            Self::D_UP2
        };
        let up4_weight = if cw_mask & 2 != 0 {
            let mut w = [0.0f32; 55];
            for v in &mut w {
                *v = bitstream.read_f16_as_f32()?;
            }
            w
        } else {
            Self::D_UP4
        };
        let up8_weight = if cw_mask & 4 != 0 {
            let mut w = [0.0f32; 210];
            for v in &mut w {
                *v = bitstream.read_f16_as_f32()?;
            }
            w
        } else {
            Self::D_UP8
        };

        Ok(Self {
            orientation,
            intrinsic_size,
            preview,
            animation,
            bit_depth,
            modular_16bit_buffers,
            ec_info,
            xyb_encoded,
            colour_encoding,
            tone_mapping,
            extensions,
            opsin_inverse_matrix,
            up2_weight,
            up4_weight,
            up8_weight,
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
    fn all_default_metadata_uses_builtin_upsampling_weights() {
        let data = bits_msb(&[(1, 1)]);
        let mut b = Bitstream::new(&data);
        let m = ImageMetadata::parse(&mut b, ()).unwrap();
        assert_eq!(m.orientation, 1);
        assert!(m.xyb_encoded);
        assert_eq!(m.up2_weight, ImageMetadata::D_UP2);
        assert_eq!(m.ec_info.len(), 0);
    }

    #[test]
    fn extra_channel_alpha_default_skips_fields() {
        let data = bits_msb(&[(1, 1)]);
        let mut b = Bitstream::new(&data);
        let info = ExtraChannelInfo::parse(&mut b, ()).unwrap();
        assert!(info.d_alpha);
        assert_eq!(info.ty, ExtraChannelType::Alpha);
        assert_eq!(info.name.len(), 0);
    }
}
