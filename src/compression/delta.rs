//! Delta coding of expression values against a reference cell.
//!
//! Deltas are taken per gene over the sorted union of the target's and the
//! reference's index sets (absent genes count as zero), serialized as zig-zag
//! varints, and DEFLATE-compressed at best compression. In lossy mode, raw
//! deltas below the configured threshold are zeroed before serialization.

use super::quantize::Quantizer;
use super::varint;
use crate::matrix::SparseRow;
use anyhow::{Context, Result};
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use rustc_hash::FxHashMap;
use std::io::{Read, Write};

/// Value codec for one (de)compression run. Carries the lossy parameters by
/// value; there is no process-wide configuration.
#[derive(Debug, Clone)]
pub struct DeltaCodec {
    lossy: bool,
    threshold: f64,
    quantizer: Quantizer,
}

impl DeltaCodec {
    pub fn new(lossy: bool, threshold: f64, quant_levels: u32) -> Self {
        Self {
            lossy,
            threshold,
            quantizer: Quantizer::new(quant_levels.max(2)),
        }
    }

    pub fn is_lossy(&self) -> bool {
        self.lossy
    }

    /// Quantize a raw value if lossy mode is on; identity otherwise.
    pub fn quantize_value(&self, value: u32) -> u32 {
        if self.lossy {
            self.quantizer.quantize(value)
        } else {
            value
        }
    }

    /// Reconstruction mapping for decoded values in lossy mode; identity
    /// otherwise.
    pub fn dequantize_value(&self, value: u32) -> u32 {
        if self.lossy {
            self.quantizer.dequantize(value)
        } else {
            value
        }
    }

    /// Per-gene differences `target - reference` over the sorted union of
    /// both index sets. In lossy mode, deltas below the threshold collapse to
    /// zero.
    pub fn compute_delta(&self, target: &SparseRow, reference: &SparseRow) -> Vec<i32> {
        let target_map = value_map(target);
        let ref_map = value_map(reference);
        let union = sorted_union(&target.indices, &reference.indices);

        let mut deltas = Vec::with_capacity(union.len());
        for gene in union {
            let target_val = target_map.get(&gene).copied().unwrap_or(0);
            let ref_val = ref_map.get(&gene).copied().unwrap_or(0);
            let mut delta = target_val as i32 - ref_val as i32;
            if self.lossy && (delta.abs() as f64) < self.threshold {
                delta = 0;
            }
            deltas.push(delta);
        }
        deltas
    }

    /// Rebuild a row from its reference and the decoded deltas.
    ///
    /// `union_indices` must be the sorted union the deltas were computed
    /// over; genes whose reconstructed value is not positive are dropped.
    pub fn reconstruct(
        &self,
        reference: &SparseRow,
        deltas: &[i32],
        union_indices: &[u32],
    ) -> Result<SparseRow> {
        if deltas.len() != union_indices.len() {
            anyhow::bail!(
                "delta count {} does not match union size {}",
                deltas.len(),
                union_indices.len()
            );
        }

        let ref_map = value_map(reference);
        let mut indices = Vec::new();
        let mut values = Vec::new();
        for (&gene, &delta) in union_indices.iter().zip(deltas) {
            let ref_val = ref_map.get(&gene).copied().unwrap_or(0);
            let value = ref_val as i32 + delta;
            if value > 0 {
                indices.push(gene);
                values.push(value as u32);
            }
        }
        Ok(SparseRow::new(indices, values))
    }

    /// Serialize deltas as varints and DEFLATE the stream. Empty input maps
    /// to an empty byte vector.
    pub fn compress_deltas(&self, deltas: &[i32]) -> Result<Vec<u8>> {
        if deltas.is_empty() {
            return Ok(Vec::new());
        }

        let mut raw = Vec::with_capacity(deltas.len() * 2);
        for &delta in deltas {
            varint::encode(delta, &mut raw);
        }

        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(&raw)?;
        encoder.finish().context("deflate of delta stream failed")
    }

    /// Inverse of [`DeltaCodec::compress_deltas`].
    pub fn decompress_deltas(&self, compressed: &[u8]) -> Result<Vec<i32>> {
        if compressed.is_empty() {
            return Ok(Vec::new());
        }

        let mut raw = Vec::new();
        DeflateDecoder::new(compressed)
            .read_to_end(&mut raw)
            .context("inflate of delta stream failed")?;

        let mut deltas = Vec::new();
        let mut pos = 0usize;
        while pos < raw.len() {
            let (delta, consumed) = varint::decode(&raw[pos..])?;
            deltas.push(delta);
            pos += consumed;
        }
        Ok(deltas)
    }
}

fn value_map(row: &SparseRow) -> FxHashMap<u32, u32> {
    row.indices
        .iter()
        .copied()
        .zip(row.values.iter().copied())
        .collect()
}

/// Sorted union of two strictly ascending index slices.
pub fn sorted_union(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut union = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0usize, 0usize);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => {
                union.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                union.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                union.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    union.extend_from_slice(&a[i..]);
    union.extend_from_slice(&b[j..]);
    union
}
