//! Colour encoding headers (`ColourEncoding`, `ToneMapping`,
//! `OpsinInverseMatrix`) and the colour-space conversions the render
//! pipeline applies when turning decoded XYB/YCbCr/grey samples into
//! display-ready RGB.

pub mod consts;
pub mod header;
pub mod transform;

pub use header::{
    ColourEncoding, ColourSpace, Customxy, EnumColourEncoding, OpsinInverseMatrix, Primaries,
    RenderingIntent, ToneMapping, TransferFunction, WhitePoint,
};
