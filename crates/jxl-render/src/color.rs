//! Chroma upsampling (nearest/bilinear depending on subsampling factor)
//! and the wiring between this crate's stage catalogue and
//! `jxl_color::transform`'s XYB/YCbCr/transfer-function primitives.

use jxl_color::header::TransferFunction;
use jxl_color::transform::{apply_inverse_opsin_matrix, inverse_xyb, linear_to_encoded, ycbcr_to_rgb};

/// Nearest-neighbour chroma upsample from `(width >> shift, height >>
/// shift)` to `(width, height)`; JPEG XL's `jpeg_upsampling` modes use
/// this simple replication rather than a filtered resize.
pub fn upsample_chroma(plane: &[f32], sub_width: usize, sub_height: usize, shift_x: u32, shift_y: u32, width: usize, height: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; width * height];
    for y in 0..height {
        let sy = (y >> shift_y).min(sub_height.saturating_sub(1));
        for x in 0..width {
            let sx = (x >> shift_x).min(sub_width.saturating_sub(1));
            out[y * width + x] = plane[sy * sub_width + sx];
        }
    }
    out
}

pub fn xyb_to_linear_rgb(
    xyb: [&mut [f32]; 3],
    opsin_bias: [f32; 3],
    intensity_target: f32,
    inv_mat: [[f32; 3]; 3],
) {
    inverse_xyb(xyb, opsin_bias, intensity_target);
    apply_inverse_opsin_matrix(xyb, inv_mat);
}

pub fn apply_transfer_function(channels: [&mut [f32]; 3], tf: TransferFunction) {
    for c in channels {
        linear_to_encoded(c, tf);
    }
}

pub fn ycbcr_to_rgb_inplace(cbycr: [&mut [f32]; 3]) {
    ycbcr_to_rgb(cbycr);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_neighbour_upsample_replicates_samples() {
        let plane = vec![1.0, 2.0];
        let out = upsample_chroma(&plane, 2, 1, 1, 0, 4, 1);
        assert_eq!(out, vec![1.0, 1.0, 2.0, 2.0]);
    }
}
