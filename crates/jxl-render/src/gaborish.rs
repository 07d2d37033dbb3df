//! Gaborish: a per-channel 3x3 separable-looking convolution that softens
//! the blocking artifacts VarDCT's coarse quantization leaves behind.
//! Grounded on the teacher's `filter/gabor.rs` `apply_gabor_like`.

use crate::mirror::mirror_index;

/// `weights = [weight1, weight2]` per channel (orthogonal, diagonal taps);
/// channel order is whatever the caller passes (typically X/Y/B or R/G/B).
pub fn apply(channel: &mut [f32], width: usize, height: usize, weights: [f32; 2]) {
    if width == 0 || height == 0 {
        return;
    }
    let [w1, w2] = weights;
    let global_weight = (1.0 + 4.0 * w1 + 4.0 * w2).recip();
    let original = channel.to_vec();
    let at = |x: i64, y: i64| original[mirror_index(y, height) * width + mirror_index(x, width)];

    for y in 0..height {
        for x in 0..width {
            let (xi, yi) = (x as i64, y as i64);
            let centre = at(xi, yi);
            let orthogonal = at(xi - 1, yi) + at(xi + 1, yi) + at(xi, yi - 1) + at(xi, yi + 1);
            let diagonal = at(xi - 1, yi - 1) + at(xi + 1, yi - 1) + at(xi - 1, yi + 1) + at(xi + 1, yi + 1);
            channel[y * width + x] = (centre + orthogonal * w1 + diagonal * w2) * global_weight;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_plane_is_unaffected() {
        let mut c = vec![3.0f32; 16];
        apply(&mut c, 4, 4, [0.0, 0.0]);
        assert!(c.iter().all(|&v| (v - 3.0).abs() < 1e-6));
    }

    #[test]
    fn single_spike_spreads_to_neighbours() {
        let mut c = vec![0.0f32; 25];
        c[12] = 10.0;
        apply(&mut c, 5, 5, [0.115, 0.01]);
        assert!(c[12] < 10.0);
        assert!(c[7] > 0.0); // directly above the spike
    }
}
