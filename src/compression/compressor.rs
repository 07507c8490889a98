//! Whole-matrix compression driver.
//!
//! Rows are encoded strictly in index order: reference selection looks back
//! at rows that were already encoded, so the emitted container is a pure
//! function of the input matrix and the codec parameters.

use super::container::{CompressedData, Header, FORMAT_VERSION};
use super::delta::DeltaCodec;
use super::row;
use crate::matrix::SparseRow;
use anyhow::{Context, Result};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

pub struct Compressor {
    lossy: bool,
    threshold: f64,
    quant_levels: u32,
}

impl Compressor {
    pub fn new(lossy: bool, threshold: f64, quant_levels: u32) -> Self {
        Self {
            lossy,
            threshold,
            quant_levels,
        }
    }

    /// Compress `matrix` with its name tables into a container.
    pub fn compress(
        &self,
        matrix: &[SparseRow],
        gene_names: &[String],
        cell_names: &[String],
    ) -> Result<CompressedData> {
        if cell_names.len() != matrix.len() {
            anyhow::bail!(
                "{} cell names for {} matrix rows",
                cell_names.len(),
                matrix.len()
            );
        }
        let num_genes = gene_names.len() as u32;
        let codec = DeltaCodec::new(self.lossy, self.threshold, self.quant_levels);

        let mut rows = Vec::with_capacity(matrix.len());
        for (cell_idx, cell) in matrix.iter().enumerate() {
            let encoded = row::encode_row(cell_idx, cell, &matrix[..cell_idx], num_genes, &codec)
                .with_context(|| format!("failed to compress cell {}", cell_idx))?;
            rows.push(encoded);
            if (cell_idx + 1) % 1000 == 0 {
                debug!("compressed {} of {} cells", cell_idx + 1, matrix.len());
            }
        }

        Ok(CompressedData {
            header: Header {
                version: FORMAT_VERSION,
                num_cells: matrix.len() as u32,
                num_genes,
                is_lossy: self.lossy,
                threshold: self.threshold,
                quant_levels: self.quant_levels,
                timestamp: unix_timestamp(),
            },
            gene_names: gene_names.to_vec(),
            cell_names: cell_names.to_vec(),
            rows,
        })
    }
}

/// Size of the matrix in its naive dense-free binary form, for ratio
/// reporting: 4 bytes per index and per value, plus the name bytes.
pub fn estimate_original_size(
    matrix: &[SparseRow],
    gene_names: &[String],
    cell_names: &[String],
) -> usize {
    let names: usize = gene_names
        .iter()
        .chain(cell_names.iter())
        .map(|name| name.len())
        .sum();
    let entries: usize = matrix.iter().map(|row| row.indices.len() * 8).sum();
    names + entries
}

fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{}{}", prefix, i)).collect()
    }

    #[test]
    fn test_compress_shapes() {
        let matrix = vec![
            SparseRow::new(vec![1, 4, 7], vec![2, 5, 1]),
            SparseRow::new(vec![1, 4, 9], vec![3, 5, 2]),
        ];
        let data = Compressor::new(false, 0.0, 256)
            .compress(&matrix, &names("G", 16), &names("C", 2))
            .unwrap();

        assert_eq!(data.header.num_cells, 2);
        assert_eq!(data.header.num_genes, 16);
        assert!(!data.header.is_lossy);
        assert_eq!(data.rows.len(), 2);
        assert_eq!(data.rows[0].ref_cell, -1);
        // Jaccard 0.5 against cell 0.
        assert_eq!(data.rows[1].ref_cell, 0);
        assert_eq!(data.rows[1].max_gene_index, 16);
    }

    #[test]
    fn test_compress_rejects_name_mismatch() {
        let matrix = vec![SparseRow::new(vec![0], vec![1])];
        assert!(Compressor::new(false, 0.0, 256)
            .compress(&matrix, &names("G", 4), &names("C", 3))
            .is_err());
    }

    #[test]
    fn test_compress_rejects_invalid_row() {
        let matrix = vec![SparseRow::new(vec![99], vec![1])];
        let err = Compressor::new(false, 0.0, 256)
            .compress(&matrix, &names("G", 4), &names("C", 1))
            .unwrap_err();
        assert!(format!("{:#}", err).contains("cell 0"));
    }

    #[test]
    fn test_deterministic_output_modulo_timestamp() {
        let matrix = vec![
            SparseRow::new(vec![0, 2, 5, 11], vec![4, 4, 1, 2]),
            SparseRow::new(vec![0, 2, 5, 12], vec![4, 3, 1, 2]),
            SparseRow::new(vec![7, 9], vec![1, 1]),
        ];
        let compressor = Compressor::new(false, 0.0, 256);
        let a = compressor
            .compress(&matrix, &names("G", 16), &names("C", 3))
            .unwrap();
        let b = compressor
            .compress(&matrix, &names("G", 16), &names("C", 3))
            .unwrap();
        assert_eq!(a.rows, b.rows);
        assert_eq!(a.gene_names, b.gene_names);
    }
}
