//! Sparse representation of a single-cell expression matrix.
//!
//! Each cell is a [`SparseRow`]: two parallel vectors of gene indices and
//! expression counts, omitting zero entries. The whole matrix is just
//! `Vec<SparseRow>` plus the gene/cell name tables carried alongside it.

use anyhow::Result;

/// One cell's expression profile.
///
/// Invariants: `indices` is strictly ascending with every element below the
/// gene universe, `values` has the same length, and no value is zero (zeros
/// are represented by absence).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseRow {
    /// Gene indices (sorted, strictly ascending).
    pub indices: Vec<u32>,
    /// Expression counts, parallel to `indices`.
    pub values: Vec<u32>,
}

impl SparseRow {
    pub fn new(indices: Vec<u32>, values: Vec<u32>) -> Self {
        Self { indices, values }
    }

    /// Number of expressed genes in this cell.
    pub fn num_genes(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Check the row invariants against the gene universe `num_genes`.
    ///
    /// `cell_idx` is only used to name the offending cell in error messages.
    pub fn validate(&self, cell_idx: usize, num_genes: u32) -> Result<()> {
        if self.indices.len() != self.values.len() {
            anyhow::bail!(
                "cell {}: {} gene indices but {} values",
                cell_idx,
                self.indices.len(),
                self.values.len()
            );
        }
        for (i, &gene) in self.indices.iter().enumerate() {
            if gene >= num_genes {
                anyhow::bail!(
                    "cell {}: gene index {} exceeds universe {}",
                    cell_idx,
                    gene,
                    num_genes
                );
            }
            if i > 0 && gene <= self.indices[i - 1] {
                anyhow::bail!(
                    "cell {}: gene indices not strictly ascending at position {} ({} <= {})",
                    cell_idx,
                    i,
                    gene,
                    self.indices[i - 1]
                );
            }
        }
        if let Some(pos) = self.values.iter().position(|&v| v == 0) {
            anyhow::bail!(
                "cell {}: zero value at position {} (zeros must be omitted)",
                cell_idx,
                pos
            );
        }
        Ok(())
    }
}

/// Total non-zero entries across the matrix.
pub fn count_non_zeros(matrix: &[SparseRow]) -> usize {
    matrix.iter().map(|row| row.values.len()).sum()
}
