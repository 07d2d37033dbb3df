//! Global quantizer multipliers and per-channel DC dequantization steps.

use jxl_bitstream::{Bitstream, Bundle, Result, U32Distribution};

/// Default per-channel (X, Y, B) DC quantization weight, used unless
/// [`LfChannelDequantization`] overrides it.
pub const DEFAULT_DC_QUANT: [f32; 3] = [1.0 / 4096.0, 1.0 / 512.0, 1.0 / 256.0];

/// Per-channel DC dequantization weights (`m_x_lf`, `m_y_lf`, `m_b_lf`,
/// already divided by 128 as the bitstream encodes them).
#[derive(Debug, Clone, Copy)]
pub struct LfChannelDequantization {
    pub m_x_lf: f32,
    pub m_y_lf: f32,
    pub m_b_lf: f32,
}

impl<Ctx> Bundle<Ctx> for LfChannelDequantization {
    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        let all_default = bitstream.read_bool()?;
        if all_default {
            return Ok(Self {
                m_x_lf: DEFAULT_DC_QUANT[0],
                m_y_lf: DEFAULT_DC_QUANT[1],
                m_b_lf: DEFAULT_DC_QUANT[2],
            });
        }
        let m_x_lf = bitstream.read_f16_as_f32()? / 128.0;
        let m_y_lf = bitstream.read_f16_as_f32()? / 128.0;
        let m_b_lf = bitstream.read_f16_as_f32()? / 128.0;
        Ok(Self { m_x_lf, m_y_lf, m_b_lf })
    }
}

/// Global quantizer multipliers shared by every block in a frame.
#[derive(Debug, Clone, Copy)]
pub struct Quantizer {
    pub global_scale: u32,
    pub quant_lf: u32,
}

impl<Ctx> Bundle<Ctx> for Quantizer {
    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        let global_scale = bitstream.read_u32(
            U32Distribution::BitsOffset { bits: 11, offset: 1 },
            U32Distribution::BitsOffset { bits: 11, offset: 2049 },
            U32Distribution::BitsOffset { bits: 12, offset: 4097 },
            U32Distribution::BitsOffset { bits: 16, offset: 8193 },
        )?;
        let quant_lf = bitstream.read_u32(
            U32Distribution::Constant(16),
            U32Distribution::BitsOffset { bits: 5, offset: 1 },
            U32Distribution::BitsOffset { bits: 8, offset: 1 },
            U32Distribution::BitsOffset { bits: 16, offset: 1 },
        )?;
        Ok(Self { global_scale, quant_lf })
    }
}

impl Quantizer {
    pub fn inv_global_scale(&self) -> f32 {
        65536.0 / self.global_scale as f32
    }

    /// Inverse AC step for a block whose per-block quant field value is `q`.
    pub fn inv_quant_ac(&self, q: u32) -> f32 {
        self.inv_global_scale() / q as f32
    }

    /// Inverse DC step for `channel` (0=X, 1=Y, 2=B).
    pub fn dc_step(&self, channel: usize, dequant: &LfChannelDequantization) -> f32 {
        let weight = match channel {
            0 => dequant.m_x_lf,
            1 => dequant.m_y_lf,
            _ => dequant.m_b_lf,
        };
        self.inv_global_scale() / self.quant_lf as f32 * weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_dequant_matches_dc_quant_table() {
        let dequant = LfChannelDequantization { m_x_lf: DEFAULT_DC_QUANT[0], m_y_lf: DEFAULT_DC_QUANT[1], m_b_lf: DEFAULT_DC_QUANT[2] };
        let q = Quantizer { global_scale: 65536, quant_lf: 16 };
        assert!((q.inv_global_scale() - 1.0).abs() < 1e-6);
        assert!((q.dc_step(1, &dequant) - (1.0 / 16.0) * (1.0 / 512.0)).abs() < 1e-9);
    }
}
