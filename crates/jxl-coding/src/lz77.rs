use jxl_bitstream::{Bitstream, Result, U32Distribution};

use crate::hybrid_uint::HybridUintConfig;

pub const WINDOW_LEN: usize = 1 << 20;
const WINDOW_MASK: usize = WINDOW_LEN - 1;
pub const NUM_SPECIAL_DISTANCES: usize = 120;

/// Back-reference parameters for LZ77-over-symbols. A token whose value is
/// at least `min_symbol` starts a back-reference instead of naming a
/// literal value.
#[derive(Debug, Clone, Copy)]
pub struct Lz77Params {
    pub enabled: bool,
    pub min_symbol: u32,
    pub min_length: u32,
    pub length_config: HybridUintConfig,
}

impl Lz77Params {
    pub fn parse(bitstream: &mut Bitstream<'_>) -> Result<Self> {
        let enabled = bitstream.read_bool()?;
        if !enabled {
            return Ok(Self {
                enabled: false,
                min_symbol: 224,
                min_length: 3,
                length_config: HybridUintConfig::DEFAULT,
            });
        }
        let min_symbol = bitstream.read_u32(
            U32Distribution::Constant(224),
            U32Distribution::Constant(512),
            U32Distribution::Constant(4096),
            U32Distribution::BitsOffset { bits: 15, offset: 8 },
        )?;
        let min_length = bitstream.read_u32(
            U32Distribution::Constant(3),
            U32Distribution::Constant(4),
            U32Distribution::BitsOffset { bits: 2, offset: 5 },
            U32Distribution::BitsOffset { bits: 8, offset: 9 },
        )?;
        let length_config = HybridUintConfig::parse(bitstream, 8)?;
        Ok(Self {
            enabled: true,
            min_symbol,
            min_length,
            length_config,
        })
    }
}

/// The fixed `(dy, dx)` table used to turn a small decoded distance token
/// into a pixel-space offset, scaled by a caller-supplied row-width
/// multiplier for distances below 120.
pub const SPECIAL_DISTANCES: [[i8; 2]; NUM_SPECIAL_DISTANCES] = [
    [0, 1], [1, 0], [1, 1], [-1, 1], [0, 2], [2, 0], [1, 2], [-1, 2], [2, 1], [-2, 1], [2, 2],
    [-2, 2], [0, 3], [3, 0], [1, 3], [-1, 3], [3, 1], [-3, 1], [2, 3], [-2, 3], [3, 2],
    [-3, 2], [0, 4], [4, 0], [1, 4], [-1, 4], [4, 1], [-4, 1], [3, 3], [-3, 3], [2, 4],
    [-2, 4], [4, 2], [-4, 2], [0, 5], [3, 4], [-3, 4], [4, 3], [-4, 3], [5, 0], [1, 5],
    [-1, 5], [5, 1], [-5, 1], [2, 5], [-2, 5], [5, 2], [-5, 2], [4, 4], [-4, 4], [3, 5],
    [-3, 5], [5, 3], [-5, 3], [0, 6], [6, 0], [1, 6], [-1, 6], [6, 1], [-6, 1], [2, 6],
    [-2, 6], [6, 2], [-6, 2], [4, 5], [-4, 5], [5, 4], [-5, 4], [3, 6], [-3, 6], [6, 3],
    [-6, 3], [0, 7], [7, 0], [1, 7], [-1, 7], [5, 5], [-5, 5], [7, 1], [-7, 1], [4, 6],
    [-4, 6], [6, 4], [-6, 4], [2, 7], [-2, 7], [7, 2], [-7, 2], [3, 7], [-3, 7], [7, 3],
    [-7, 3], [5, 6], [-5, 6], [6, 5], [-6, 5], [8, 0], [4, 7], [-4, 7], [7, 4], [-7, 4],
    [8, 1], [8, 2], [6, 6], [-6, 6], [8, 3], [5, 7], [-5, 7], [7, 5], [-7, 5], [8, 4], [6, 7],
    [-6, 7], [7, 6], [-7, 6], [8, 5], [7, 7], [-7, 7], [8, 6], [8, 7],
];

/// Per-decode-session LZ77 state: the sliding window of recently emitted
/// values and the in-progress copy, if any.
pub struct Lz77State {
    window: Vec<u32>,
    num_decoded: u64,
    num_to_copy: u32,
    copy_pos: u64,
}

impl Lz77State {
    pub fn new() -> Self {
        Self {
            window: vec![0; WINDOW_LEN],
            num_decoded: 0,
            num_to_copy: 0,
            copy_pos: 0,
        }
    }

    pub fn in_progress_copy(&mut self) -> Option<u32> {
        if self.num_to_copy == 0 {
            return None;
        }
        let v = self.window[(self.copy_pos as usize) & WINDOW_MASK];
        self.copy_pos += 1;
        self.num_to_copy -= 1;
        Some(v)
    }

    pub fn begin_copy(&mut self, length: u32, distance: u64) -> u32 {
        let distance = distance.min(WINDOW_LEN as u64).min(self.num_decoded).max(1);
        self.copy_pos = self.num_decoded - distance;
        self.num_to_copy = length;
        self.in_progress_copy().expect("length > 0 implies a copy is available")
    }

    pub fn push(&mut self, value: u32) {
        self.window[(self.num_decoded as usize) & WINDOW_MASK] = value;
        self.num_decoded += 1;
    }
}

impl Default for Lz77State {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a raw decoded distance value to a pixel-space back-reference
/// distance. `dist_multiplier == 0` disables the special-distance table
/// (used outside 2D image contexts); otherwise it is the row stride.
pub fn resolve_distance(draw: u32, dist_multiplier: u32) -> u32 {
    if dist_multiplier == 0 {
        draw + 1
    } else if (draw as usize) < NUM_SPECIAL_DISTANCES {
        let [dy, dx] = SPECIAL_DISTANCES[draw as usize];
        (dy as i32 + dist_multiplier as i32 * dx as i32).max(1) as u32
    } else {
        draw - (NUM_SPECIAL_DISTANCES as u32 - 1)
    }
}
