//! Per-cell encoding and decoding: gene indices through Elias-Fano, values
//! through the reference-delta codec.

use super::container::CompressedRow;
use super::delta::{sorted_union, DeltaCodec};
use super::elias_fano::{EliasFanoDecoder, EliasFanoEncoder};
use super::reference;
use crate::matrix::SparseRow;
use anyhow::{Context, Result};

/// Encode one cell against the rows encoded before it.
///
/// `pool` holds rows `0..cell_idx` in order; the reference selector scans its
/// tail. Without a usable reference the row's own values are stored
/// (quantized first in lossy mode).
pub fn encode_row(
    cell_idx: usize,
    row: &SparseRow,
    pool: &[SparseRow],
    num_genes: u32,
    codec: &DeltaCodec,
) -> Result<CompressedRow> {
    row.validate(cell_idx, num_genes)?;

    let ef_bytes = EliasFanoEncoder::new(num_genes, row.indices.len() as u32)
        .encode(&row.indices)
        .with_context(|| format!("cell {}: gene index encoding failed", cell_idx))?;

    let ref_cell = reference::find_best_reference(row, pool);
    let deltas = if ref_cell >= 0 {
        codec.compute_delta(row, &pool[ref_cell as usize])
    } else {
        row.values
            .iter()
            .map(|&v| codec.quantize_value(v) as i32)
            .collect()
    };

    let delta_bytes = codec
        .compress_deltas(&deltas)
        .with_context(|| format!("cell {}: value compression failed", cell_idx))?;

    Ok(CompressedRow {
        ef_bytes,
        delta_bytes,
        ref_cell,
        num_genes_in_row: row.indices.len() as u32,
        max_gene_index: num_genes,
    })
}

/// Decode one cell. `reference` must be the already-decoded row named by
/// `row.ref_cell`, or `None` for self-coded rows.
///
/// Lossy dequantization is NOT applied here: rows that serve as references
/// must stay in the quantized domain until the whole matrix is decoded.
pub fn decode_row(
    cell_idx: usize,
    row: &CompressedRow,
    reference: Option<&SparseRow>,
    codec: &DeltaCodec,
) -> Result<SparseRow> {
    let indices = if row.ef_bytes.is_empty() {
        Vec::new()
    } else {
        EliasFanoDecoder::from_bytes(&row.ef_bytes)
            .and_then(|decoder| decoder.decode())
            .with_context(|| format!("cell {}: gene index decoding failed", cell_idx))?
    };

    let deltas = codec
        .decompress_deltas(&row.delta_bytes)
        .with_context(|| format!("cell {}: value decompression failed", cell_idx))?;

    if let Some(reference) = reference {
        // The union the encoder differenced over is reproducible from the
        // two index sets; reference-only genes carry cancelling deltas.
        let union = sorted_union(&indices, &reference.indices);
        codec
            .reconstruct(reference, &deltas, &union)
            .with_context(|| format!("cell {}: reconstruction failed", cell_idx))
    } else {
        if deltas.len() != indices.len() {
            anyhow::bail!(
                "cell {}: {} genes but {} values in self-coded row",
                cell_idx,
                indices.len(),
                deltas.len()
            );
        }
        let values = deltas.iter().map(|&d| d.max(0) as u32).collect();
        Ok(SparseRow::new(indices, values))
    }
}
