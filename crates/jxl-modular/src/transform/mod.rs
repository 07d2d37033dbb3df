//! Modular channel transforms: RCT, Squeeze and Palette. Each is declared
//! forward at encode time and undone here in reverse declaration order.

pub mod palette;
pub mod rct;
pub mod squeeze;

use jxl_bitstream::{Bitstream, Bundle, Error, Result, U32Distribution};

use crate::predictor::{Predictor, WpHeader};

fn begin_c_dist() -> (U32Distribution, U32Distribution, U32Distribution, U32Distribution) {
    (
        U32Distribution::BitsOffset { bits: 3, offset: 0 },
        U32Distribution::BitsOffset { bits: 6, offset: 8 },
        U32Distribution::BitsOffset { bits: 10, offset: 72 },
        U32Distribution::BitsOffset { bits: 13, offset: 1096 },
    )
}

#[derive(Debug, Clone, Copy)]
pub struct RctHeader {
    pub begin_c: u32,
    /// `permutation * 7 + colour_formula`, both decoded as one field per the
    /// bitstream's `rctType` (0..41).
    pub rct_type: u32,
}

impl<Ctx> Bundle<Ctx> for RctHeader {
    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        let (d0, d1, d2, d3) = begin_c_dist();
        let begin_c = bitstream.read_u32(d0, d1, d2, d3)?;
        let rct_type = bitstream.read_u32(
            U32Distribution::Constant(6),
            U32Distribution::BitsOffset { bits: 2, offset: 0 },
            U32Distribution::BitsOffset { bits: 4, offset: 2 },
            U32Distribution::BitsOffset { bits: 6, offset: 10 },
        )?;
        Ok(Self { begin_c, rct_type })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SqueezeParams {
    pub horizontal: bool,
    pub in_place: bool,
    pub begin_c: u32,
    pub num_c: u32,
}

impl<Ctx> Bundle<Ctx> for SqueezeParams {
    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        let horizontal = bitstream.read_bool()?;
        let in_place = bitstream.read_bool()?;
        let (d0, d1, d2, d3) = begin_c_dist();
        let begin_c = bitstream.read_u32(d0, d1, d2, d3)?;
        let num_c = bitstream.read_u32(
            U32Distribution::Constant(1),
            U32Distribution::Constant(2),
            U32Distribution::Constant(3),
            U32Distribution::BitsOffset { bits: 4, offset: 4 },
        )?;
        Ok(Self { horizontal, in_place, begin_c, num_c })
    }
}

#[derive(Debug, Clone)]
pub struct SqueezeHeader {
    pub params: Vec<SqueezeParams>,
}

impl<Ctx> Bundle<Ctx> for SqueezeHeader {
    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        let num_sq = bitstream.read_u32(
            U32Distribution::Constant(0),
            U32Distribution::BitsOffset { bits: 4, offset: 1 },
            U32Distribution::BitsOffset { bits: 6, offset: 9 },
            U32Distribution::BitsOffset { bits: 8, offset: 41 },
        )?;
        let mut params = Vec::with_capacity(num_sq as usize);
        for _ in 0..num_sq {
            params.push(SqueezeParams::parse(bitstream, ())?);
        }
        Ok(Self { params })
    }
}

#[derive(Debug, Clone)]
pub struct PaletteHeader {
    pub begin_c: u32,
    pub num_c: u32,
    pub nb_colours: u32,
    pub nb_deltas: u32,
    pub d_pred: Predictor,
}

impl Bundle<&WpHeader> for PaletteHeader {
    fn parse(bitstream: &mut Bitstream<'_>, _wp_header: &WpHeader) -> Result<Self> {
        let (d0, d1, d2, d3) = begin_c_dist();
        let begin_c = bitstream.read_u32(d0, d1, d2, d3)?;
        let num_c = bitstream.read_u32(
            U32Distribution::Constant(1),
            U32Distribution::Constant(3),
            U32Distribution::Constant(4),
            U32Distribution::BitsOffset { bits: 13, offset: 1 },
        )?;
        let nb_colours = bitstream.read_u32(
            U32Distribution::BitsOffset { bits: 8, offset: 0 },
            U32Distribution::BitsOffset { bits: 10, offset: 256 },
            U32Distribution::BitsOffset { bits: 12, offset: 1280 },
            U32Distribution::BitsOffset { bits: 16, offset: 5376 },
        )?;
        let nb_deltas = bitstream.read_u32(
            U32Distribution::Constant(0),
            U32Distribution::BitsOffset { bits: 8, offset: 1 },
            U32Distribution::BitsOffset { bits: 10, offset: 257 },
            U32Distribution::BitsOffset { bits: 16, offset: 1281 },
        )?;
        let d_pred = Predictor::try_from(bitstream.read_bits(4)?)
            .map_err(|_| Error::malformed("invalid palette delta predictor"))?;
        Ok(Self { begin_c, num_c, nb_colours, nb_deltas, d_pred })
    }
}

#[derive(Debug, Clone)]
pub enum TransformHeader {
    Rct(RctHeader),
    Squeeze(SqueezeHeader),
    Palette(PaletteHeader),
}

impl Bundle<&WpHeader> for TransformHeader {
    fn parse(bitstream: &mut Bitstream<'_>, wp_header: &WpHeader) -> Result<Self> {
        match bitstream.read_bits(2)? {
            0 => RctHeader::parse(bitstream, ()).map(Self::Rct),
            1 => PaletteHeader::parse(bitstream, wp_header).map(Self::Palette),
            2 => SqueezeHeader::parse(bitstream, ()).map(Self::Squeeze),
            value => Err(Error::malformed(format!("invalid transform id {value}"))),
        }
    }
}
