//! Parallel, dependency-aware decompression driver.
//!
//! A row that references an earlier cell cannot decode before its reference
//! has. References always point backwards, and each row has at most one, so
//! the dependency graph is a forest: rows group into levels by chain depth
//! (self-coded rows at level 0, their dependents at level 1, and so on).
//! Each level decodes in parallel; results are published into the shared
//! result vector between levels, which hands every dependent a
//! happens-before on its reference. Output order is the input cell order
//! regardless of worker count or interleaving.

use super::container::CompressedData;
use super::delta::DeltaCodec;
use super::row;
use crate::matrix::SparseRow;
use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::debug;

/// Decode every row of `data` back into sparse-matrix form.
pub fn decompress(data: &CompressedData) -> Result<Vec<SparseRow>> {
    let num_cells = data.header.num_cells as usize;
    if data.rows.len() != num_cells {
        anyhow::bail!(
            "corrupt file: {} compressed rows but header declares {} cells",
            data.rows.len(),
            num_cells
        );
    }

    let codec = DeltaCodec::new(
        data.header.is_lossy,
        data.header.threshold,
        data.header.quant_levels,
    );
    let levels = dependency_levels(data)?;
    debug!("decoding {} cells across {} dependency levels", num_cells, levels.len());

    let mut slots: Vec<Option<SparseRow>> = vec![None; num_cells];
    for level in &levels {
        let decoded: Vec<(usize, SparseRow)> = level
            .par_iter()
            .map(|&cell_idx| {
                let compressed = &data.rows[cell_idx];
                let reference = if compressed.ref_cell >= 0 {
                    // Present by construction: the reference's level already
                    // ran and published its slot.
                    slots[compressed.ref_cell as usize].as_ref()
                } else {
                    None
                };
                row::decode_row(cell_idx, compressed, reference, &codec)
                    .map(|decoded| (cell_idx, decoded))
                    .with_context(|| format!("failed to decompress cell {}", cell_idx))
            })
            .collect::<Result<_>>()?;

        for (cell_idx, decoded) in decoded {
            slots[cell_idx] = Some(decoded);
        }
    }

    let mut matrix: Vec<SparseRow> = slots.into_iter().map(|slot| slot.unwrap()).collect();

    // References reconstruct in the quantized domain, so the reconstruction
    // mapping runs once over the finished matrix, never per-row.
    if data.header.is_lossy {
        matrix.par_iter_mut().for_each(|row| {
            for value in &mut row.values {
                *value = codec.dequantize_value(*value);
            }
        });
    }

    Ok(matrix)
}

/// Group cells into decode levels by reference-chain depth, validating that
/// every reference points at an earlier row.
fn dependency_levels(data: &CompressedData) -> Result<Vec<Vec<usize>>> {
    let mut depth = vec![0usize; data.rows.len()];
    let mut levels: Vec<Vec<usize>> = Vec::new();

    for (cell_idx, compressed) in data.rows.iter().enumerate() {
        let ref_cell = compressed.ref_cell;
        let cell_depth = if ref_cell == -1 {
            0
        } else if ref_cell < -1 || ref_cell as usize >= cell_idx {
            anyhow::bail!(
                "corrupt file: cell {} references cell {}",
                cell_idx,
                ref_cell
            );
        } else {
            depth[ref_cell as usize] + 1
        };
        depth[cell_idx] = cell_depth;
        if levels.len() <= cell_depth {
            levels.resize_with(cell_depth + 1, Vec::new);
        }
        levels[cell_depth].push(cell_idx);
    }

    Ok(levels)
}
