//! Palette transform inverse: recover the original per-channel samples from
//! a single palette-index channel plus a shared colour table.

use jxl_grid::Grid;

use crate::predictor::{Predictor, PredictorState};

/// Small table of common small colour deltas, indexed by the negative
/// palette indices reserved for "delta-coded" colours not present in the
/// explicit table.
#[rustfmt::skip]
const DELTA_PALETTE: [[i16; 3]; 72] = [
    [0, 0, 0], [4, 4, 4], [11, 0, 0], [0, 0, -13], [0, -12, 0], [-10, -10, -10],
    [-18, -18, -18], [-27, -27, -27], [-18, -18, 0], [0, 0, -32], [-32, 0, 0], [-37, -37, -37],
    [0, -32, -32], [24, 24, 45], [50, 50, 50], [-45, -24, -24], [-24, -45, -45], [0, -24, -24],
    [-34, -34, 0], [-24, 0, -24], [-45, -45, -24], [64, 64, 64], [-32, 0, -32], [0, -32, 0],
    [-32, 0, 32], [-24, -45, -24], [45, 24, 45], [24, -24, -45], [-45, -24, 24], [80, 80, 80],
    [64, 0, 0], [0, 0, -64], [0, -64, -64], [-24, -24, 45], [96, 96, 96], [64, 64, 0],
    [45, -24, -24], [34, -34, 0], [112, 112, 112], [24, -45, -45], [45, 45, -24], [0, -32, 32],
    [24, -24, 45], [0, 96, 96], [45, -24, 24], [24, -45, -24], [-24, -45, 24], [0, -64, 0],
    [96, 0, 0], [128, 128, 128], [64, 0, 64], [144, 144, 144], [96, 96, 0], [-36, -36, 36],
    [45, -24, -45], [45, -45, -24], [0, 0, -96], [0, 128, 128], [0, 96, 0], [45, 24, -45],
    [-128, 0, 0], [24, -45, 24], [-45, 24, -45], [64, 0, -64], [64, -64, -64], [96, 0, 96],
    [45, -45, 24], [24, 45, -45], [64, 64, -64], [128, 128, 0], [0, 0, -128], [-24, 45, -45],
];

/// Palette table: `colours[c]` holds `nb_colours` entries for channel `c`.
pub struct PaletteTable {
    pub colours: Vec<Vec<i32>>,
    pub nb_deltas: i32,
}

/// Undo a palette transform: `index_channel` holds the per-pixel palette
/// index, `targets` are the (already allocated) output channels to fill.
/// `d_pred` / `bit_depth` govern the delta-coded-colour reconstruction path
/// for negative indices.
pub fn inverse(
    palette: &PaletteTable,
    index_channel: &Grid<i32>,
    targets: &mut [Grid<i32>],
    d_pred: Predictor,
    bit_depth: u32,
) {
    let nb_colours = palette.colours.first().map_or(0, |c| c.len()) as i32;
    let nb_deltas = palette.nb_deltas;
    let width = index_channel.width();
    let height = index_channel.height();

    let is_simple = (0..height).all(|y| {
        index_channel
            .get_row(y)
            .iter()
            .all(|&index| (0..nb_colours).contains(&index))
    });

    if is_simple {
        for (c, grid) in targets.iter_mut().enumerate() {
            let table = &palette.colours[c];
            for y in 0..height {
                let idx_row = index_channel.get_row(y);
                let out_row = grid.get_row_mut(y);
                for (index, sample) in idx_row.iter().zip(out_row) {
                    *sample = table[*index as usize];
                }
            }
        }
        return;
    }

    let mut need_delta = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let index = *index_channel.get(x, y);
            if index < nb_deltas {
                need_delta.push((x, y));
            }

            if (0..nb_colours).contains(&index) {
                for (c, grid) in targets.iter_mut().enumerate() {
                    *grid.get_mut(x, y) = palette.colours[c][index as usize];
                }
            } else if index >= nb_colours {
                let rel = index - nb_colours;
                if rel < 64 {
                    for (c, grid) in targets.iter_mut().enumerate() {
                        *grid.get_mut(x, y) = ((rel >> (2 * c)) % 4) * ((1i32 << bit_depth) - 1) / 4
                            + (1i32 << bit_depth.saturating_sub(3));
                    }
                } else {
                    let mut rel = rel - 64;
                    for grid in targets.iter_mut() {
                        *grid.get_mut(x, y) = (rel % 5) * ((1i32 << bit_depth) - 1) / 4;
                        rel /= 5;
                    }
                }
            } else {
                for (c, grid) in targets.iter_mut().enumerate() {
                    if c >= 3 {
                        *grid.get_mut(x, y) = 0;
                        continue;
                    }
                    let delta_idx = -(index + 1);
                    let delta_idx = (delta_idx % 143) as usize;
                    let mut value = DELTA_PALETTE[(delta_idx + 1) >> 1][c] as i32;
                    if delta_idx & 1 == 0 {
                        value = -value;
                    }
                    if bit_depth > 8 {
                        value <<= bit_depth.min(24) - 8;
                    }
                    *grid.get_mut(x, y) = value;
                }
            }
        }
    }

    if need_delta.is_empty() {
        return;
    }

    for grid in targets.iter_mut() {
        let mut predictor = PredictorState::new(width, None);
        let mut need_delta_iter = need_delta.iter().copied().peekable();
        for y in 0..height {
            for x in 0..width {
                let predicted = predictor.predict(d_pred);
                let mut value = *grid.get(x, y);
                if need_delta_iter.peek() == Some(&(x, y)) {
                    value = value.wrapping_add(predicted as i32);
                    *grid.get_mut(x, y) = value;
                    need_delta_iter.next();
                }
                predictor.push(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_path_looks_up_table_directly() {
        let palette = PaletteTable {
            colours: vec![vec![10, 20, 30]],
            nb_deltas: 0,
        };
        let mut index = Grid::new(3, 1);
        *index.get_mut(0, 0) = 2;
        *index.get_mut(1, 0) = 0;
        *index.get_mut(2, 0) = 1;
        let mut out = vec![Grid::new(3, 1)];
        inverse(&palette, &index, &mut out, Predictor::Zero, 8);
        assert_eq!(*out[0].get(0, 0), 30);
        assert_eq!(*out[0].get(1, 0), 10);
        assert_eq!(*out[0].get(2, 0), 20);
    }

    #[test]
    fn delta_coded_index_uses_palette_entry_zero_table() {
        let palette = PaletteTable {
            colours: vec![vec![0], vec![0], vec![0]],
            nb_deltas: 1,
        };
        let mut index = Grid::new(1, 1);
        *index.get_mut(0, 0) = -1; // delta_idx = 0 -> DELTA_PALETTE[0] negated -> [0,0,0]
        let mut out = vec![Grid::new(1, 1), Grid::new(1, 1), Grid::new(1, 1)];
        inverse(&palette, &index, &mut out, Predictor::Zero, 8);
        assert_eq!(*out[0].get(0, 0), 0);
        assert_eq!(*out[1].get(0, 0), 0);
        assert_eq!(*out[2].get(0, 0), 0);
    }
}
