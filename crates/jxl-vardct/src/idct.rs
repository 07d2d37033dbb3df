//! Inverse DCT dispatch: a generic, separable type-III IDCT used for every
//! [`crate::TransformType`]. Exotic small shapes (Hornuss, the AFV
//! variants, the embedded DCT4/DCT4x8-in-8x8 blocks) fall back to the same
//! generic transform at their native size rather than the format's
//! hand-built mixed-radix shortcuts — a deliberate simplification. The
//! per-axis formula (no extra normalisation: `output[k] = X[0] + sqrt(2) *
//! sum_{n>=1} X[n] * cos(pi*n*(2k+1)/(2N))`) is the same one the dequant
//! weight tables are scaled to match, so a DC-only coefficient block still
//! comes out flat at the coefficient's own value.

use std::f32::consts::PI;
use std::f32::consts::SQRT_2;

/// 1D inverse type-III DCT, unnormalised (matches the scaling the dequant
/// tables assume).
fn idct_1d(input: &[f32]) -> Vec<f32> {
    let n = input.len();
    if n <= 1 {
        return input.to_vec();
    }
    let nf = n as f32;
    let mut out = vec![0.0f32; n];
    for (k, out_k) in out.iter_mut().enumerate() {
        let mut sum = input[0];
        for (idx, &coeff) in input.iter().enumerate().skip(1) {
            if coeff == 0.0 {
                continue;
            }
            let angle = PI * idx as f32 * (2 * k + 1) as f32 / (2.0 * nf);
            sum += SQRT_2 * coeff * angle.cos();
        }
        *out_k = sum;
    }
    out
}

/// Run the separable inverse DCT over a `width x height` coefficient block
/// (row-major, DC at `(0, 0)`), producing a pixel-domain block of the same
/// size.
pub fn inverse_dct(coeffs: &[i32], width: u32, height: u32) -> Vec<f32> {
    let (w, h) = (width as usize, height as usize);
    debug_assert_eq!(coeffs.len(), w * h);

    let mut rows_out = vec![0.0f32; w * h];
    for y in 0..h {
        let row: Vec<f32> = coeffs[y * w..(y + 1) * w].iter().map(|&v| v as f32).collect();
        let transformed = idct_1d(&row);
        rows_out[y * w..(y + 1) * w].copy_from_slice(&transformed);
    }

    let mut out = vec![0.0f32; w * h];
    for x in 0..w {
        let col: Vec<f32> = (0..h).map(|y| rows_out[y * w + x]).collect();
        let transformed = idct_1d(&col);
        for (y, v) in transformed.into_iter().enumerate() {
            out[y * w + x] = v;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dc_only_block_is_flat_at_its_own_value() {
        let mut coeffs = vec![0i32; 64];
        coeffs[0] = 8;
        let out = inverse_dct(&coeffs, 8, 8);
        for v in out {
            assert!((v - 8.0).abs() < 1e-3);
        }
    }

    #[test]
    fn rectangular_dc_is_flat_too() {
        let mut coeffs = vec![0i32; 16 * 8];
        coeffs[0] = 5;
        let out = inverse_dct(&coeffs, 16, 8);
        for v in out {
            assert!((v - 5.0).abs() < 1e-3);
        }
    }

    #[test]
    fn single_nonzero_ac_coefficient_is_zero_mean() {
        let mut coeffs = vec![0i32; 64];
        coeffs[1] = 100;
        let out = inverse_dct(&coeffs, 8, 8);
        let sum: f32 = out.iter().sum();
        assert!(sum.abs() < 1e-2);
    }
}
