//! The VarDCT core: variable-size block transforms, the 17 dequantization
//! tables, the global quantizer, AC coefficient decode and the inverse DCT
//! dispatch, plus adaptive DC smoothing on the reconstructed DC image.
//!
//! Per-block transform-type (`AcStrategy`) assignment is a render-pipeline
//! concern fed in from the frame decoder; this crate treats it as an
//! external input rather than deciding it.

pub mod block_context;
pub mod coeff;
pub mod dequant;
pub mod idct;
pub mod quantizer;
pub mod smoothing;
pub mod transform_type;

pub use block_context::HfBlockContext;
pub use coeff::BlockCoeffs;
pub use dequant::{DequantMatrix, DequantMatrixSet};
pub use quantizer::{LfChannelDequantization, Quantizer};
pub use transform_type::TransformType;
