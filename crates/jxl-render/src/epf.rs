//! Edge-preserving filter: up to three passes, each a plus-shaped
//! stencil of weighted neighbour samples where the weight decays with
//! how different the neighbour is from the centre (summed across
//! channels with a per-channel scale). Grounded on `spec.md` §4.12 and
//! the teacher's `filter/impls/generic` EPF kernels.

use crate::mirror::mirror_index;

const CHANNEL_SCALE: [f32; 3] = [1.0, 0.4, 0.4];
const MIN_SIGMA: f32 = 0.3;

/// Stage 0/1/2 stencils: `(border, offsets)` where `offsets` are the
/// plus-shaped taps (excluding the centre) visited for the SAD sum.
fn stencil(stage: u8) -> &'static [(i32, i32)] {
    const STAGE0: [(i32, i32); 12] = [
        (1, 0), (-1, 0), (0, 1), (0, -1),
        (2, 0), (-2, 0), (0, 2), (0, -2),
        (1, 1), (1, -1), (-1, 1), (-1, -1),
    ];
    const STAGE1: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
    match stage {
        0 => &STAGE0,
        _ => &STAGE1[..4],
    }
}

/// Run one EPF pass over `channels` (X/Y/B or equivalent), `sigma` giving
/// the per-pixel `1/invSigma` field (same dimensions as each channel,
/// already derived from the per-block sharpness/quant step).
pub fn apply_pass(channels: [&mut [f32]; 3], width: usize, height: usize, stage: u8, inv_sigma: &[f32]) {
    if width == 0 || height == 0 {
        return;
    }
    let taps = stencil(stage);
    let originals: [Vec<f32>; 3] = [channels[0].to_vec(), channels[1].to_vec(), channels[2].to_vec()];
    let at = |c: usize, x: i64, y: i64| originals[c][mirror_index(y, height) * width + mirror_index(x, width)];

    for y in 0..height {
        for x in 0..width {
            let pos = y * width + x;
            let inv_s = inv_sigma[pos];
            if inv_s < MIN_SIGMA {
                continue;
            }
            let mut weight_sum = 1.0f32;
            let mut acc = [originals[0][pos], originals[1][pos], originals[2][pos]];
            for &(dx, dy) in taps {
                let (nx, ny) = (x as i64 + dx as i64, y as i64 + dy as i64);
                let mut sad = 0.0f32;
                for c in 0..3 {
                    sad += CHANNEL_SCALE[c] * (at(c, nx, ny) - originals[c][pos]).abs();
                }
                let weight = (1.0 + sad * inv_s).max(0.0);
                weight_sum += weight;
                for c in 0..3 {
                    acc[c] += weight * at(c, nx, ny);
                }
            }
            for c in 0..3 {
                channels[c][pos] = acc[c] / weight_sum;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_planes_are_unaffected() {
        let mut x = vec![1.0f32; 16];
        let mut y = vec![2.0f32; 16];
        let mut b = vec![3.0f32; 16];
        let inv_sigma = vec![1.0f32; 16];
        apply_pass([&mut x, &mut y, &mut b], 4, 4, 1, &inv_sigma);
        assert!(x.iter().all(|&v| (v - 1.0).abs() < 1e-5));
    }

    #[test]
    fn low_sigma_pixels_are_skipped() {
        let mut x = vec![0.0f32; 9];
        x[4] = 100.0;
        let mut y = vec![0.0f32; 9];
        let mut b = vec![0.0f32; 9];
        let inv_sigma = vec![0.0f32; 9];
        apply_pass([&mut x, &mut y, &mut b], 3, 3, 1, &inv_sigma);
        assert_eq!(x[4], 100.0);
    }
}
