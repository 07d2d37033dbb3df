//! MSB-first bit I/O and the variable-length field codec shared by every
//! header and entropy-coded structure in the JPEG XL codestream.

mod bitstream;
mod error;

pub use bitstream::{pack_signed, unpack_signed, unpack_signed_u64, Bitstream, U32Distribution};
pub use error::{Error, Result};

/// A type that can be parsed out of a [`Bitstream`] given some context
/// value (commonly `()`, a size, or a previously-parsed sibling field).
///
/// Mirrors the `allDefault`-gated bundle convention used throughout the
/// codestream: implementors typically read one leading bool and, when set,
/// fall back to [`BundleDefault::default_with_context`] instead of reading
/// the remaining fields.
pub trait Bundle<Ctx>: Sized {
    fn parse(bitstream: &mut Bitstream<'_>, ctx: Ctx) -> Result<Self>;
}

pub trait BundleDefault<Ctx>: Sized {
    fn default_with_context(ctx: Ctx) -> Self;
}
