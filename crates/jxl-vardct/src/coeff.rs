//! AC coefficient decode: per block, a non-zero count followed by that
//! many residuals in scan order, using contexts derived from the block
//! context map and a zero-density bucket.

use jxl_bitstream::{unpack_signed, Bitstream, Result};
use jxl_coding::Decoder;

use crate::block_context::{non_zero_context, HfBlockContext};

/// Coefficients for one block's single channel, in natural (row-major,
/// post-unscan) raster order at the transform's native size.
pub struct BlockCoeffs {
    pub width: u32,
    pub height: u32,
    pub coeffs: Vec<i32>,
}

/// Zero-density context bucket for the `k`-th coefficient in scan order
/// out of `nonzeros` remaining, following the format's observation that
/// later coefficients in a mostly-empty block are overwhelmingly likely
/// to be zero.
fn zero_density_context(block_cluster: u8, num_total: u32, k: u32, nonzeros_left: u32) -> usize {
    let ctx32 = if num_total <= 1 {
        0
    } else {
        (32 * k / num_total).min(31)
    };
    let density = nonzeros_left.min(15);
    block_cluster as usize * 512 + ctx32 as usize * 16 + density as usize
}

/// Decode one block's AC coefficients (DC excluded; index 0 of `scan_order`
/// is assumed to be the first AC position). `dc_bucket`/`qf` select the
/// block context; `order_id`/`channel` select the coefficient scan.
#[allow(clippy::too_many_arguments)]
pub fn read_block(
    bitstream: &mut Bitstream<'_>,
    decoder: &mut Decoder,
    block_ctx: &HfBlockContext,
    scan_order: &[u32],
    width: u32,
    height: u32,
    dc_bucket: u32,
    qf: u32,
    order_id: u32,
    channel: u32,
) -> Result<BlockCoeffs> {
    let num_coeffs = (width * height).saturating_sub(1);
    let block_cluster = block_ctx.context_of(dc_bucket, qf, order_id, channel);
    let nz_ctx = non_zero_context(num_coeffs, block_cluster);
    let nonzeros = decoder.read_varint(bitstream, nz_ctx)?.min(num_coeffs);

    let mut coeffs = vec![0i32; (width * height) as usize];
    let mut remaining = nonzeros;
    let mut k = 0u32;
    while remaining > 0 && k < num_coeffs {
        let ctx = zero_density_context(block_cluster, num_coeffs, k, remaining);
        let token = decoder.read_varint(bitstream, ctx)?;
        let value = unpack_signed(token);
        if value != 0 {
            let pos = scan_order[k as usize + 1] as usize;
            coeffs[pos] = value;
            remaining -= 1;
        }
        k += 1;
    }

    Ok(BlockCoeffs { width, height, coeffs })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_density_context_stays_in_block_cluster_band() {
        let a = zero_density_context(3, 63, 0, 63);
        let b = zero_density_context(3, 63, 62, 1);
        assert!(a / 512 == 3 && b / 512 == 3);
        assert_ne!(a, b);
    }
}
