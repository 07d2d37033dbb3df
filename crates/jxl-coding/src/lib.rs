//! Entropy decoding for the JPEG XL codestream: canonical prefix codes,
//! 12-bit-precision rANS with alias tables, the hybrid-integer token
//! codec, LZ77-over-symbols, context-map clustering and Lehmer-code
//! permutations.

pub mod ans;
mod context_map;
mod decoder;
pub mod hybrid_uint;
pub mod lz77;
pub mod permutation;
pub mod prefix;

pub use context_map::ContextMap;
pub use decoder::Decoder;
pub use hybrid_uint::HybridUintConfig;
pub use lz77::Lz77Params;
