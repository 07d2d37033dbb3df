//! The 17 dequantization weight tables (one per [`TransformType::dequant_matrix_param_index`]),
//! built from the format's default ("Library") distance-band parameters.
//!
//! Every table stores, per channel, the *dequantization* weight (already
//! reciprocated from the encoder-side quantization weight) for each
//! coefficient position.

use crate::TransformType;

/// Per-(table, channel) dequantization weights, row-major at the
/// transform's native pixel size.
#[derive(Debug, Clone)]
pub struct DequantMatrix {
    width: u32,
    height: u32,
    weights: [Vec<f32>; 3],
}

impl DequantMatrix {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn weight(&self, channel: usize, x: u32, y: u32) -> f32 {
        self.weights[channel][(y * self.width + x) as usize]
    }
}

/// Interpolate a smooth falloff curve through `bands` at `pos` (of `max`),
/// geometrically (log-linear) between the two bracketing control points.
fn interpolate(pos: f32, max: f32, bands: &[f32]) -> f32 {
    if let [val] = bands {
        return *val;
    }
    let len = bands.len();
    let scaled_pos = (pos * (len - 1) as f32 / max).max(0.0);
    let scaled_index = (scaled_pos as usize).min(len - 2);
    let frac_index = scaled_pos - scaled_index as f32;
    let a = bands[scaled_index];
    let b = bands[scaled_index + 1];
    a * (b / a).powf(frac_index)
}

fn mult(x: f32) -> f32 {
    if x > 0.0 {
        1.0 + x
    } else {
        1.0 / (1.0 - x)
    }
}

/// Expand a `[dc, delta0, delta1, ..]` control-point list into a full
/// `width x height` weight grid, radial distance from the origin.
fn dct_quant_weights(params: &[f32], width: u32, height: u32) -> Vec<f32> {
    let mut bands = Vec::with_capacity(params.len());
    let mut last = params[0];
    bands.push(last);
    for &val in &params[1..] {
        last *= mult(val);
        bands.push(last);
    }

    let mut out = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            let dx = x as f32 / (width - 1).max(1) as f32;
            let dy = y as f32 / (height - 1).max(1) as f32;
            let distance = (dx * dx + dy * dy).sqrt();
            out.push(interpolate(distance, std::f32::consts::SQRT_2 + 1e-6, &bands));
        }
    }
    out
}

/// Default per-channel control points for each of the 17 table slots,
/// `Hornuss`/`Dct2` tables use their own literal fixed weight layout below;
/// everything else expands via [`dct_quant_weights`] at the transform's
/// native dequant-matrix size (Dct4/Dct4x8/Afv share the generic radial
/// expansion here rather than the format's hand-tuned per-shape layout —
/// a deliberate simplification of the exact default matrices).
fn default_params(index: u32) -> [Vec<f32>; 3] {
    match index {
        0 => [
            vec![3150.0, 0.0, -0.4, -0.4, -0.4, -2.0],
            vec![560.0, 0.0, -0.3, -0.3, -0.3, -0.3],
            vec![512.0, -2.0, -1.0, 0.0, -1.0, -2.0],
        ],
        4 => [
            vec![8996.873, -1.3000778, -0.4942453, -0.43909377, -0.6350102, -0.9017726, -1.6162099],
            vec![3191.4836, -0.67424583, -0.80745816, -0.4492584, -0.3586544, -0.3132239, -0.37615025],
            vec![1157.504, -2.0531423, -1.4, -0.5068713, -0.4270873, -1.4856834, -4.920914],
        ],
        5 => [
            vec![15718.408, -1.025, -0.98, -0.9012, -0.4, -0.48819396, -0.421064, -0.27],
            vec![7305.7637, -0.8041958, -0.76330364, -0.5566038, -0.49785304, -0.43699592, -0.40180868, -0.27321684],
            vec![3803.5317, -3.0607336, -2.041327, -2.023565, -0.54953897, -0.4, -0.4, -0.3],
        ],
        6 => [
            vec![7240.7734, -0.7, -0.7, -0.2, -0.2, -0.2, -0.5],
            vec![1448.1547, -0.5, -0.5, -0.5, -0.2, -0.2, -0.2],
            vec![506.85413, -1.4, -0.2, -0.5, -0.5, -1.5, -3.6],
        ],
        7 => [
            vec![16283.249, -1.7812846, -1.6309059, -1.0382179, -0.85, -0.7, -0.9, -1.2360638],
            vec![5089.1577, -0.3200494, -0.3536285, -0.3034, -0.61, -0.5, -0.5, -0.6],
            vec![3397.7761, -0.32132736, -0.3450762, -0.7034, -0.9, -1.0, -1.0, -1.1754606],
        ],
        8 => [
            vec![13844.971, -0.971138, -0.658, -0.42026, -0.22712, -0.2206, -0.226, -0.6],
            vec![4798.964, -0.6112531, -0.8377079, -0.7901486, -0.26927274, -0.38272768, -0.22924222, -0.20719099],
            vec![1807.2369, -1.2, -1.2, -0.7, -0.7, -0.7, -0.4, -0.5],
        ],
        9 | 10 => [
            vec![2198.0505, -0.96269625, -0.7619425, -0.65511405],
            vec![764.36554, -0.926302, -0.967523, -0.2784529],
            vec![527.10754, -1.4594386, -1.4500821, -1.5843723],
        ],
        3 => [
            vec![2200.0, 0.0, 0.0, 0.0],
            vec![392.0, 0.0, 0.0, 0.0],
            vec![112.0, -0.25, -0.25, -0.5],
        ],
        11 => seq(23966.166, 8380.191, 4493.024),
        12 => seq(15358.898, 5597.3604, 2919.9617),
        13 => seq(47932.332, 16760.383, 8986.048),
        14 => seq(30717.797, 11194.721, 5839.9233),
        15 => seq(95864.664, 33520.766, 17972.096),
        16 => seq(61435.594, 24209.441, 12979.847),
        _ => unreachable!("param index out of the 0..17 range"),
    }
}

const SEQ_A: [f32; 7] = [-1.025, -0.78, -0.65012, -0.19041574, -0.20819396, -0.421064, -0.32733846];
const SEQ_B: [f32; 7] = [-0.30419582, 0.36330363, -0.3566038, -0.34430745, -0.33699593, -0.30180866, -0.27321684];
const SEQ_C: [f32; 7] = [-1.2, -1.2, -0.8, -0.7, -0.7, -0.4, -0.5];

fn seq(a: f32, b: f32, c: f32) -> [Vec<f32>; 3] {
    let extend = |dc: f32, tail: &[f32; 7]| {
        let mut v = vec![dc];
        v.extend_from_slice(tail);
        v
    };
    [extend(a, &SEQ_A), extend(b, &SEQ_B), extend(c, &SEQ_C)]
}

fn hornuss_weights(params: [f32; 3]) -> Vec<f32> {
    let mut grid = vec![params[0]; 64];
    grid[0] = 1.0;
    grid[1] = params[1];
    grid[8] = params[1];
    grid[9] = params[2];
    grid
}

fn dct2_weights(params: [f32; 6]) -> Vec<f32> {
    let mut grid = vec![0.0f32; 64];
    for (idx, val) in params.into_iter().enumerate() {
        let shift = idx / 2;
        let dim = 1usize << shift;
        if idx % 2 == 0 {
            for y in 0..dim {
                for x in dim..2 * dim {
                    grid[y * 8 + x] = val;
                }
            }
            for y in dim..2 * dim {
                for x in 0..dim {
                    grid[y * 8 + x] = val;
                }
            }
        } else {
            for y in dim..2 * dim {
                for x in dim..2 * dim {
                    grid[y * 8 + x] = val;
                }
            }
        }
    }
    grid
}

/// Build the dequantization table (already reciprocated) for table slot
/// `param_index` (0..17, see [`TransformType::dequant_matrix_param_index`]).
pub fn default_matrix(param_index: u32, width: u32, height: u32) -> DequantMatrix {
    let weights = match param_index {
        1 => {
            let params: [[f32; 3]; 3] = [
                [280.0, 3160.0, 3160.0],
                [60.0, 864.0, 864.0],
                [18.0, 200.0, 200.0],
            ];
            params.map(hornuss_weights)
        }
        2 => {
            let params: [[f32; 6]; 3] = [
                [3840.0, 2560.0, 1280.0, 640.0, 480.0, 300.0],
                [960.0, 640.0, 320.0, 180.0, 140.0, 120.0],
                [640.0, 320.0, 128.0, 64.0, 32.0, 16.0],
            ];
            params.map(dct2_weights)
        }
        idx => {
            let params = default_params(idx);
            params.map(|p| dct_quant_weights(&p, width, height))
        }
    };

    let mut weights = weights;
    for channel in weights.iter_mut() {
        for w in channel.iter_mut() {
            *w = 1.0 / *w;
        }
    }
    DequantMatrix { width, height, weights }
}

/// Lazily-built set of all 17 dequant tables, indexed by
/// [`TransformType::dequant_matrix_param_index`].
#[derive(Debug, Default)]
pub struct DequantMatrixSet {
    tables: Vec<Option<DequantMatrix>>,
}

impl DequantMatrixSet {
    pub fn new() -> Self {
        Self { tables: (0..17).map(|_| None).collect() }
    }

    pub fn get(&mut self, ty: TransformType) -> &DequantMatrix {
        let idx = ty.dequant_matrix_param_index() as usize;
        let (width, height) = ty.dequant_matrix_size();
        self.tables[idx].get_or_insert_with(|| default_matrix(idx as u32, width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dc8_weight_is_reciprocal_of_dc_band() {
        let m = default_matrix(0, 8, 8);
        assert!((m.weight(0, 0, 0) - 1.0 / 3150.0).abs() < 1e-6);
    }

    #[test]
    fn every_band0_weight_is_positive() {
        for idx in 0..17u32 {
            let (w, h) = TransformType::Dct8.dequant_matrix_size();
            let m = if idx == 1 {
                default_matrix(1, 8, 8)
            } else if idx == 2 {
                default_matrix(2, 8, 8)
            } else {
                default_matrix(idx, w.max(8), h.max(8))
            };
            assert!(m.weight(0, 0, 0) > 1e-8, "table {idx} has non-positive DC weight");
        }
    }
}
