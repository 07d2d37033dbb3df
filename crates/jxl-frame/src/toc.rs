//! Table of contents: per-section byte lengths in *logical* order, plus
//! the optional permutation that maps logical index to the order the
//! sections actually appear in the bitstream.
//!
//! Logical layout (§4.13): `[0]` DC-global, `[1..=num_dc_groups]` DC
//! groups, `[num_dc_groups+1]` AC-global, and the remaining
//! `passes * num_groups` entries AC groups indexed by `pass * num_groups
//! + group`.

use jxl_bitstream::{Bitstream, Decoder, Error, Result, U32Distribution};

#[derive(Debug, Clone, Copy)]
pub struct FrameDimensions {
    pub width: u32,
    pub height: u32,
    pub group_dim: u32,
    pub num_groups_x: u32,
    pub num_groups_y: u32,
    pub num_dc_groups_x: u32,
    pub num_dc_groups_y: u32,
}

impl FrameDimensions {
    /// `group_dim` is the smallest power of two, at least 128, such that a
    /// group covers at most 2^20 samples once shifted by the frame's group
    /// size shift (teacher's `GroupDim` derivation, `header.rs`).
    pub fn new(width: u32, height: u32, group_size_shift: u32) -> Self {
        let group_dim = 128u32 << group_size_shift;
        let num_groups_x = width.div_ceil(group_dim).max(1);
        let num_groups_y = height.div_ceil(group_dim).max(1);
        let dc_group_dim = group_dim * 8;
        let num_dc_groups_x = width.div_ceil(dc_group_dim).max(1);
        let num_dc_groups_y = height.div_ceil(dc_group_dim).max(1);
        Self {
            width,
            height,
            group_dim,
            num_groups_x,
            num_groups_y,
            num_dc_groups_x,
            num_dc_groups_y,
        }
    }

    pub fn num_groups(&self) -> u32 {
        self.num_groups_x * self.num_groups_y
    }

    pub fn num_dc_groups(&self) -> u32 {
        self.num_dc_groups_x * self.num_dc_groups_y
    }
}

#[derive(Debug, Clone)]
pub struct Toc {
    /// Byte length of each section, indexed by *logical* id.
    pub sizes: Vec<u32>,
    /// `order[physical_index] = logical_index`; identity when the stream
    /// carried no permutation.
    pub order: Vec<u32>,
}

fn toc_u32() -> (U32Distribution, U32Distribution, U32Distribution, U32Distribution) {
    (
        U32Distribution::BitsOffset { bits: 10, offset: 0 },
        U32Distribution::BitsOffset { bits: 14, offset: 1024 },
        U32Distribution::BitsOffset { bits: 22, offset: 17408 },
        U32Distribution::BitsOffset { bits: 30, offset: 4211712 },
    )
}

impl Toc {
    pub fn num_sections(dims: &FrameDimensions, passes: u32) -> usize {
        if dims.num_groups() == 1 && passes == 1 {
            1
        } else {
            (1 + dims.num_dc_groups() + 1 + passes * dims.num_groups()) as usize
        }
    }

    pub fn parse(bitstream: &mut Bitstream<'_>, dims: &FrameDimensions, passes: u32) -> Result<Self> {
        let num_sections = Self::num_sections(dims, passes);

        let permuted = bitstream.read_bool()?;
        let order = if permuted {
            let mut decoder = Decoder::parse(bitstream, 8)?;
            let perm = jxl_coding::permutation::read_permutation(bitstream, &mut decoder, num_sections, 0)?;
            if perm.len() != num_sections {
                // Entries not covered by the Lehmer code keep their
                // identity slot, appended in order.
                let mut seen = vec![false; num_sections];
                let mut full = perm.clone();
                for &v in &perm {
                    if (v as usize) < num_sections {
                        seen[v as usize] = true;
                    }
                }
                for (i, was_seen) in seen.iter().enumerate() {
                    if !was_seen {
                        full.push(i as u32);
                    }
                }
                full
            } else {
                perm
            }
        } else {
            (0..num_sections as u32).collect()
        };

        bitstream.zero_pad_to_byte()?;

        let mut sizes = Vec::with_capacity(num_sections);
        for _ in 0..num_sections {
            let (d0, d1, d2, d3) = toc_u32();
            sizes.push(bitstream.read_u32(d0, d1, d2, d3)?);
        }
        bitstream.zero_pad_to_byte()?;

        if order.len() != num_sections {
            return Err(Error::malformed("TOC permutation length mismatch"));
        }

        Ok(Self { sizes, order })
    }
}
