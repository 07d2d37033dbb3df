//! Block context map: buckets each AC block by (DC-quant-field, quant-step,
//! strategy-order, channel) into one of at most 256 entropy clusters, and
//! the monotone non-zero-count bucketing used inside the same cluster.

use jxl_bitstream::{Bitstream, Bundle, Result};
use jxl_coding::permutation::read_permutation;
use jxl_coding::{ContextMap, Decoder};

const NUM_ORDERS: u32 = 13;
const NUM_CHANNELS: u32 = 3;

/// Thresholds and the raw-context-to-cluster map for HF coefficient decode.
#[derive(Debug, Clone)]
pub struct HfBlockContext {
    pub qf_thresholds: Vec<u32>,
    pub lf_thresholds: [Vec<i32>; 3],
    context_map: ContextMap,
}

impl<Ctx> Bundle<Ctx> for HfBlockContext {
    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        let default = bitstream.read_bool()?;
        if default {
            let clusters = [
                0u8, 1, 2, 2, 3, 3, 4, 5, 6, 6, 6, 6, 6, 7, 8, 9, 9, 10, 11, 12, 13, 14, 14, 14,
                14, 14, 7, 8, 9, 9, 10, 11, 12, 13, 14, 14, 14, 14, 14,
            ];
            return Ok(Self {
                qf_thresholds: Vec::new(),
                lf_thresholds: [Vec::new(), Vec::new(), Vec::new()],
                context_map: ContextMap::from_raw(clusters.to_vec(), 15),
            });
        }

        let mut lf_thresholds = [Vec::new(), Vec::new(), Vec::new()];
        let mut bucket_size = 1u32;
        for thr in lf_thresholds.iter_mut() {
            let num = bitstream.read_bits(4)?;
            bucket_size *= num + 1;
            for _ in 0..num {
                let t = bitstream.read_u32(
                    jxl_bitstream::U32Distribution::BitsOffset { bits: 4, offset: 0 },
                    jxl_bitstream::U32Distribution::BitsOffset { bits: 8, offset: 16 },
                    jxl_bitstream::U32Distribution::BitsOffset { bits: 16, offset: 272 },
                    jxl_bitstream::U32Distribution::BitsOffset { bits: 32, offset: 65808 },
                )?;
                thr.push(jxl_bitstream::unpack_signed(t));
            }
        }

        let num_qf = bitstream.read_bits(4)?;
        bucket_size *= num_qf + 1;
        let mut qf_thresholds = Vec::with_capacity(num_qf as usize);
        for _ in 0..num_qf {
            let t = bitstream.read_u32(
                jxl_bitstream::U32Distribution::BitsOffset { bits: 2, offset: 0 },
                jxl_bitstream::U32Distribution::BitsOffset { bits: 3, offset: 4 },
                jxl_bitstream::U32Distribution::BitsOffset { bits: 5, offset: 12 },
                jxl_bitstream::U32Distribution::BitsOffset { bits: 8, offset: 44 },
            )?;
            qf_thresholds.push(1 + t);
        }

        let num_raw_contexts = (bucket_size * NUM_CHANNELS * NUM_ORDERS) as usize;
        let context_map = ContextMap::parse(bitstream, num_raw_contexts)?;

        Ok(Self { qf_thresholds, lf_thresholds, context_map })
    }
}

impl HfBlockContext {
    fn bucket_of(thresholds: &[i32], value: i32) -> u32 {
        thresholds.iter().filter(|&&t| value >= t).count() as u32
    }

    /// Maps `(dc-image bucket, qf bucket, strategy order id, channel)` to a
    /// raw context id, then through the stored [`ContextMap`] to a cluster.
    pub fn context_of(&self, dc_bucket: u32, qf: u32, order_id: u32, channel: u32) -> u8 {
        let qf_bucket = Self::bucket_of(
            &self.qf_thresholds.iter().map(|&t| t as i32).collect::<Vec<_>>(),
            qf as i32,
        );
        let raw = dc_bucket * NUM_CHANNELS * NUM_ORDERS
            + qf_bucket * NUM_CHANNELS * NUM_ORDERS
            + channel * NUM_ORDERS
            + order_id;
        self.context_map.cluster(raw as usize)
    }

    pub fn dc_bucket(&self, channel: usize, value: i32) -> u32 {
        Self::bucket_of(&self.lf_thresholds[channel], value)
    }

    pub fn num_clusters(&self) -> usize {
        self.context_map.num_clusters()
    }
}

/// Maps a non-zero coefficient count to one of a small number of
/// monotonically increasing context buckets, to keep the per-block
/// "how many AC coefficients follow" distribution compact.
pub fn non_zero_context(nonzeros: u32, block_ctx: u8) -> usize {
    let bucket = if nonzeros <= 8 {
        nonzeros
    } else {
        4 + (nonzeros + 3) / 4
    }
    .min(15);
    block_ctx as usize * 16 + bucket as usize
}

/// Default per-order coefficient scan (row-major; zig-zag for the 8x8
/// natural order). `usedOrders` may override individual buckets with a
/// permutation read via [`read_permutation`].
pub fn natural_order(width: u32, height: u32) -> Vec<u32> {
    if width == 8 && height == 8 {
        ZIGZAG_8X8.to_vec()
    } else {
        (0..width * height).collect()
    }
}

#[rustfmt::skip]
const ZIGZAG_8X8: [u32; 64] = [
     0,  1,  8, 16,  9,  2,  3, 10,
    17, 24, 32, 25, 18, 11,  4,  5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13,  6,  7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
];

/// Read the per-(order bucket, channel) coefficient scan order, applying a
/// Lehmer-coded permutation wherever `usedOrders` selects one.
pub fn read_coefficient_orders(
    bitstream: &mut Bitstream<'_>,
    decoder: &mut Decoder,
) -> Result<Vec<[Vec<u32>; 3]>> {
    let used_orders = bitstream.read_bits(NUM_ORDERS)?;
    let mut orders = Vec::with_capacity(NUM_ORDERS as usize);
    for order_id in 0..NUM_ORDERS {
        let (w, h) = order_size(order_id);
        let natural = natural_order(w, h);
        let mut per_channel = [natural.clone(), natural.clone(), natural];
        if used_orders & (1 << order_id) != 0 {
            for channel in per_channel.iter_mut() {
                let perm = read_permutation(bitstream, decoder, (w * h) as usize, 0)?;
                *channel = perm;
            }
        }
        orders.push(per_channel);
    }
    Ok(orders)
}

fn order_size(order_id: u32) -> (u32, u32) {
    match order_id {
        0 => (8, 8),
        1 => (8, 8),
        2 => (16, 16),
        3 => (32, 32),
        4 => (16, 8),
        5 => (32, 8),
        6 => (32, 16),
        7 => (64, 64),
        8 => (64, 32),
        9 => (128, 128),
        10 => (128, 64),
        11 => (256, 256),
        12 => (256, 128),
        _ => unreachable!("13 order buckets, 0..13"),
    }
}
