//! The modular image core: per-sample prediction, the meta-adaptive
//! decision tree, and the RCT/Squeeze/Palette channel transforms.
//!
//! Channels are decoded raw (one MA-tree-driven residual stream per
//! channel) by [`ModularImage::decode`], which then undoes the transform
//! list in reverse to recover the channels the encoder started from.
//! Callers are responsible for building the [`ChannelShape`] list,
//! including any palette meta-channel required by a
//! [`transform::PaletteHeader`] in the transform list (its shape is
//! `width = nb_colours + nb_deltas`, `height = num_c`, inserted at index 0).

pub mod image;
pub mod ma;
pub mod predictor;
pub mod transform;

pub use image::{ChannelShape, ModularHeader, ModularImage};
pub use ma::MaTree;
pub use predictor::{Predictor, WpHeader};
