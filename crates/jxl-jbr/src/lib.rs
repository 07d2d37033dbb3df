//! JPEG-reconstruction serializer (§4.15): turns a fully-populated
//! [`JpegData`] record back into a byte-exact JPEG (ITU-T T.81)
//! bitstream. This crate is a collaborator — it takes coefficients and
//! marker metadata the core has already recovered and never parses a
//! JPEG XL codestream itself. Grounded on the teacher's `jxl-jbr`
//! crate, simplified to a direct record-in/bytes-out serializer rather
//! than a streaming reconstructor driven by frame-decode callbacks.

pub mod bit_writer;
pub mod huffman;

use jxl_bitstream::{Error, Result};

use bit_writer::BitWriter;
use huffman::HuffmanSpec;

pub const MARKER_SOI: u8 = 0xd8;
pub const MARKER_EOI: u8 = 0xd9;
pub const MARKER_SOS: u8 = 0xda;
pub const MARKER_DQT: u8 = 0xdb;
pub const MARKER_DHT: u8 = 0xc4;
pub const MARKER_DRI: u8 = 0xdd;
const MARKER_RST0: u8 = 0xd0;

/// One marker segment in original byte order, `payload` excluding the
/// `FF xx` marker bytes themselves for structured kinds, or including
/// raw bytes verbatim for anything this crate doesn't interpret
/// (APPn/COM/unrecognised).
#[derive(Debug, Clone)]
pub enum Marker {
    Sof { precision: u8, height: u16, width: u16, components: Vec<SofComponent> },
    Dqt(QuantTable),
    Dht(HuffmanSpec),
    Dri(u16),
    /// APPn/COM or any other marker this crate passes through untouched.
    Raw { marker: u8, payload: Vec<u8> },
    Scan(Scan),
}

#[derive(Debug, Clone, Copy)]
pub struct SofComponent {
    pub id: u8,
    pub h_sampling: u8,
    pub v_sampling: u8,
    pub quant_table_id: u8,
}

#[derive(Debug, Clone)]
pub struct QuantTable {
    pub id: u8,
    pub precision: u8,
    pub values: [u16; 64],
}

#[derive(Debug, Clone, Copy)]
pub struct ScanComponent {
    pub id: u8,
    pub dc_table: u8,
    pub ac_table: u8,
}

/// One scan's header plus its already-decoded, natural-order block
/// coefficients (`blocks[component][block_index][0..64]`).
#[derive(Debug, Clone)]
pub struct Scan {
    pub components: Vec<ScanComponent>,
    pub spectral_start: u8,
    pub spectral_end: u8,
    pub approx_high: u8,
    pub approx_low: u8,
    pub blocks: Vec<Vec<[i32; 64]>>,
    pub restart_interval: Option<u32>,
}

/// The full structured record this crate serializes. `markers` carries
/// every segment in original stream order (the "respect `markerOrder`"
/// invariant from spec.md); `padding_bits`, when present, are consumed
/// exactly instead of re-deriving fill bits.
#[derive(Debug, Clone)]
pub struct JpegData {
    pub markers: Vec<Marker>,
    pub padding_bits: Option<(u64, u8)>,
}

/// Huffman tables currently in force, indexed `[class][id]`
/// (`class` 0 = DC, 1 = AC), rebuilt each time a `Dht` marker is seen —
/// matching JPEG's "tables stay in effect until redefined" semantics.
#[derive(Default)]
struct TableState {
    dc: [Option<huffman::BuiltHuffmanTable>; 4],
    ac: [Option<huffman::BuiltHuffmanTable>; 4],
}

pub fn serialize(data: &JpegData) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut tables = TableState::default();
    out.extend_from_slice(&[0xff, MARKER_SOI]);
    for marker in &data.markers {
        serialize_marker(marker, &mut out, &mut tables, data.padding_bits)?;
    }
    out.extend_from_slice(&[0xff, MARKER_EOI]);
    Ok(out)
}

fn serialize_marker(
    marker: &Marker,
    out: &mut Vec<u8>,
    tables: &mut TableState,
    padding_bits: Option<(u64, u8)>,
) -> Result<()> {
    match marker {
        Marker::Sof { precision, height, width, components } => {
            let len = 2 + 1 + 2 + 2 + 1 + components.len() * 3;
            out.extend_from_slice(&[0xff, 0xc0]);
            out.extend_from_slice(&(len as u16).to_be_bytes());
            out.push(*precision);
            out.extend_from_slice(&height.to_be_bytes());
            out.extend_from_slice(&width.to_be_bytes());
            out.push(components.len() as u8);
            for c in components {
                out.push(c.id);
                out.push((c.h_sampling << 4) | c.v_sampling);
                out.push(c.quant_table_id);
            }
        }
        Marker::Dqt(table) => {
            let len = 2 + 1 + if table.precision == 0 { 64 } else { 128 };
            out.extend_from_slice(&[0xff, MARKER_DQT]);
            out.extend_from_slice(&(len as u16).to_be_bytes());
            out.push((table.precision << 4) | table.id);
            for &v in &table.values {
                if table.precision == 0 {
                    out.push(v as u8);
                } else {
                    out.extend_from_slice(&v.to_be_bytes());
                }
            }
        }
        Marker::Dht(spec) => {
            let len = 2 + spec.encoded_len();
            out.extend_from_slice(&[0xff, MARKER_DHT]);
            out.extend_from_slice(&(len as u16).to_be_bytes());
            out.push(((spec.is_ac as u8) << 4) | spec.id);
            out.extend_from_slice(&spec.counts[1..=16]);
            out.extend_from_slice(&spec.values);
            let built = spec.build();
            let slot = if spec.is_ac { &mut tables.ac } else { &mut tables.dc };
            slot[spec.id as usize & 3] = Some(built);
        }
        Marker::Dri(interval) => {
            out.extend_from_slice(&[0xff, MARKER_DRI, 0x00, 0x04]);
            out.extend_from_slice(&interval.to_be_bytes());
        }
        Marker::Raw { marker, payload } => {
            out.push(0xff);
            out.push(*marker);
            if !payload.is_empty() {
                out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
                out.extend_from_slice(payload);
            }
        }
        Marker::Scan(scan) => serialize_scan(scan, out, tables, padding_bits)?,
    }
    Ok(())
}

fn serialize_scan(scan: &Scan, out: &mut Vec<u8>, tables: &TableState, padding_bits: Option<(u64, u8)>) -> Result<()> {
    let len = 2 + 1 + scan.components.len() * 2 + 3;
    out.extend_from_slice(&[0xff, MARKER_SOS]);
    out.extend_from_slice(&(len as u16).to_be_bytes());
    out.push(scan.components.len() as u8);
    for c in &scan.components {
        out.push(c.id);
        out.push((c.dc_table << 4) | c.ac_table);
    }
    out.push(scan.spectral_start);
    out.push(scan.spectral_end);
    out.push((scan.approx_high << 4) | scan.approx_low);

    let restart_interval = scan.restart_interval.unwrap_or(0) as usize;
    let mut writer = BitWriter::new();
    let mut blocks_since_restart = 0usize;
    let mut restart_idx = 0u8;
    let num_blocks = scan.blocks.first().map_or(0, |b| b.len());
    let mut prev_dc = vec![0i32; scan.components.len()];

    for block_idx in 0..num_blocks {
        for (comp_idx, (comp_blocks, comp)) in scan.blocks.iter().zip(&scan.components).enumerate() {
            let coeffs = &comp_blocks[block_idx];
            let dc_table = tables.dc[comp.dc_table as usize & 3]
                .as_ref()
                .ok_or_else(|| Error::malformed("scan references an undefined DC Huffman table"))?;
            let ac_table = tables.ac[comp.ac_table as usize & 3]
                .as_ref()
                .ok_or_else(|| Error::malformed("scan references an undefined AC Huffman table"))?;
            write_sequential_block(&mut writer, coeffs, dc_table, ac_table, &mut prev_dc[comp_idx])?;
        }
        blocks_since_restart += 1;
        if restart_interval > 0 && blocks_since_restart == restart_interval && block_idx + 1 != num_blocks {
            let bytes = std::mem::replace(&mut writer, BitWriter::new()).finalize(true);
            out.extend_from_slice(&bytes);
            out.extend_from_slice(&[0xff, MARKER_RST0 + (restart_idx % 8)]);
            restart_idx = restart_idx.wrapping_add(1);
            blocks_since_restart = 0;
            prev_dc.iter_mut().for_each(|v| *v = 0);
        }
    }

    let fill_with_ones = padding_bits.is_none();
    if let Some((bits, len)) = padding_bits {
        writer.write_raw(bits, len);
    }
    let bytes = writer.finalize(fill_with_ones);
    out.extend_from_slice(&bytes);
    Ok(())
}

/// Sequential-mode single block: a Huffman-coded size category for the
/// DC difference (from the previous block of the same component),
/// followed by its magnitude bits; then run-length/size-coded AC
/// coefficients (symbol byte = `run << 4 | size`), `0x00` ending the
/// block once trailing coefficients are all zero, `0xf0` (ZRL) for a
/// run of 16 zeros that doesn't end the block.
fn write_sequential_block(
    writer: &mut BitWriter,
    coeffs: &[i32; 64],
    dc_table: &huffman::BuiltHuffmanTable,
    ac_table: &huffman::BuiltHuffmanTable,
    prev_dc: &mut i32,
) -> Result<()> {
    let diff = coeffs[0] - *prev_dc;
    *prev_dc = coeffs[0];
    let (size, bits) = magnitude_category(diff);
    let (code_len, code_bits) = dc_table.lookup(size);
    writer.write_bits(code_bits, code_len);
    writer.write_raw(bits as u64, size);

    let mut run = 0u8;
    for &coeff in &coeffs[1..64] {
        if coeff == 0 {
            run += 1;
            if run == 16 {
                let (code_len, code_bits) = ac_table.lookup(0xf0);
                writer.write_bits(code_bits, code_len);
                run = 0;
            }
            continue;
        }
        let (size, bits) = magnitude_category(coeff);
        let symbol = (run << 4) | size;
        let (code_len, code_bits) = ac_table.lookup(symbol);
        writer.write_bits(code_bits, code_len);
        writer.write_raw(bits as u64, size);
        run = 0;
    }
    if run > 0 {
        let (code_len, code_bits) = ac_table.lookup(0x00);
        writer.write_bits(code_bits, code_len);
    }
    Ok(())
}

/// JPEG's signed-magnitude category coding: `size` is the number of bits
/// needed for `|value|`, `bits` is `value` itself when positive or its
/// one's-complement when negative.
fn magnitude_category(value: i32) -> (u8, u32) {
    if value == 0 {
        return (0, 0);
    }
    let abs = value.unsigned_abs();
    let size = 32 - abs.leading_zeros();
    let bits = if value > 0 { abs } else { abs ^ ((1u32 << size) - 1) };
    (size as u8, bits)
}

pub fn validate_quant_table(table: &QuantTable) -> Result<()> {
    if table.values.iter().any(|&v| v == 0) {
        return Err(Error::malformed("JPEG quantization table entry is zero"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnitude_category_of_zero_is_empty() {
        assert_eq!(magnitude_category(0), (0, 0));
    }

    #[test]
    fn magnitude_category_of_negative_is_ones_complement() {
        let (size, bits) = magnitude_category(-3);
        assert_eq!(size, 2);
        assert_eq!(bits, 0b00);
    }

    #[test]
    fn serialize_emits_soi_and_eoi() {
        let data = JpegData { markers: vec![], padding_bits: None };
        let bytes = serialize(&data).unwrap();
        assert_eq!(&bytes[..2], &[0xff, MARKER_SOI]);
        assert_eq!(&bytes[bytes.len() - 2..], &[0xff, MARKER_EOI]);
    }

    #[test]
    fn dri_marker_encodes_length_and_interval() {
        let mut out = Vec::new();
        let mut tables = TableState::default();
        serialize_marker(&Marker::Dri(8), &mut out, &mut tables, None).unwrap();
        assert_eq!(out, vec![0xff, MARKER_DRI, 0x00, 0x04, 0x00, 0x08]);
    }
}
