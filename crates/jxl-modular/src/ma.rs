//! Meta-adaptive (MA) decision tree: per-pixel predictor/context selection
//! driven by a small property vector (channel index, coordinates, and
//! neighbourhood statistics).

use jxl_bitstream::{unpack_signed, Bitstream, Result};
use jxl_coding::Decoder;

use crate::predictor::Predictor;

#[derive(Debug, Clone, Copy)]
pub enum MaNode {
    Split { property: u32, split_val: i32, left: u32, right: u32 },
    Leaf { predictor: Predictor, offset: i64, multiplier: i32, context: u32 },
}

/// BFS-declared decision tree; node 0 is the root.
#[derive(Debug, Clone)]
pub struct MaTree {
    nodes: Vec<MaNode>,
}

const MAX_DEPTH: u32 = 2048;

impl MaTree {
    /// Bound from the "Bounds" clause: `min(2^22, 1024 + pixels*chans/16)`
    /// clamped to at least 128.
    pub fn max_nodes(pixels: u64, channels: u64) -> u64 {
        (1024 + pixels.saturating_mul(channels) / 16).clamp(128, 1 << 22)
    }

    pub fn parse(bitstream: &mut Bitstream<'_>, pixels: u64, channels: u64) -> Result<Self> {
        let max_nodes = Self::max_nodes(pixels, channels);
        // Six context slots: property-is-leaf flag folded into `property`,
        // split_val, predictor, offset, mul_log, mul_bits.
        let mut decoder = Decoder::parse(bitstream, 6)?;

        let mut nodes = Vec::new();
        // (node index, depth) queue for BFS declaration order.
        let mut queue = std::collections::VecDeque::new();
        nodes.push(MaNode::Leaf { predictor: Predictor::Zero, offset: 0, multiplier: 1, context: 0 });
        queue.push_back((0usize, 0u32));

        while let Some((idx, depth)) = queue.pop_front() {
            if depth > MAX_DEPTH {
                return Err(jxl_bitstream::Error::malformed("MA tree exceeds max depth"));
            }
            let property_token = decoder.read_varint(bitstream, 0)?;
            if property_token == 0 {
                let predictor_idx = decoder.read_varint(bitstream, 2)?;
                let predictor = Predictor::try_from(predictor_idx)
                    .map_err(|_| jxl_bitstream::Error::malformed("invalid MA leaf predictor"))?;
                let offset = unpack_signed(decoder.read_varint(bitstream, 3)?) as i64;
                let mul_log = decoder.read_varint(bitstream, 4)?;
                let mul_bits = decoder.read_varint(bitstream, 5)?;
                let multiplier = ((mul_bits + 1) as i32) << mul_log;
                nodes[idx] = MaNode::Leaf {
                    predictor,
                    offset,
                    multiplier,
                    context: idx as u32,
                };
                continue;
            }

            let property = property_token - 1;
            let split_val = unpack_signed(decoder.read_varint(bitstream, 1)?);
            let left = nodes.len() as u32;
            nodes.push(MaNode::Leaf { predictor: Predictor::Zero, offset: 0, multiplier: 1, context: 0 });
            let right = nodes.len() as u32;
            nodes.push(MaNode::Leaf { predictor: Predictor::Zero, offset: 0, multiplier: 1, context: 0 });
            if nodes.len() as u64 > max_nodes {
                return Err(jxl_bitstream::Error::malformed("MA tree exceeds max node count"));
            }
            nodes[idx] = MaNode::Split { property, split_val, left, right };
            queue.push_back((left as usize, depth + 1));
            queue.push_back((right as usize, depth + 1));
        }

        decoder.finalize()?;
        Ok(Self { nodes })
    }

    /// Descend from the root given a property vector, returning the reached
    /// leaf's parameters and the ANS context to use for its residual (the
    /// leaf's own index, i.e. tree depth of declaration).
    pub fn lookup(&self, properties: &[i32]) -> (Predictor, i64, i32, u32) {
        let mut idx = 0usize;
        loop {
            match self.nodes[idx] {
                MaNode::Split { property, split_val, left, right } => {
                    let value = properties.get(property as usize).copied().unwrap_or(0);
                    idx = if value <= split_val { left as usize } else { right as usize };
                }
                MaNode::Leaf { predictor, offset, multiplier, context } => {
                    return (predictor, offset, multiplier, context);
                }
            }
        }
    }

    /// Upper bound on the ANS context ids a lookup can report: leaves are
    /// assigned their declaration-order node index as their context, so this
    /// is simply the number of declared nodes.
    pub fn num_contexts(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_trivial(&self) -> Option<(Predictor, i64, i32)> {
        if let [MaNode::Leaf { predictor, offset, multiplier, .. }] = self.nodes[..] {
            Some((predictor, offset, multiplier))
        } else {
            None
        }
    }
}
