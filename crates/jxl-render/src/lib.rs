//! The render pipeline (§4.12): a fixed sequence of stages turning
//! decoded VarDCT/Modular planes into display-ready samples — chroma
//! upsampling, Gaborish, the edge-preserving filter, colour transforms,
//! noise injection, spatial upsampling and blending.

pub mod blend;
pub mod color;
pub mod epf;
pub mod gaborish;
pub mod mirror;
pub mod noise;
pub mod pipeline;
pub mod upsampling;

pub use pipeline::{Image, Pipeline, Settings};
