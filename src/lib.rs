//! scz: compression for single-cell RNA-seq count matrices.
//!
//! The codec has two layers. Each cell's sorted gene-index sequence goes
//! through an Elias-Fano coder; its expression values are stored as zig-zag
//! varint deltas against the most Jaccard-similar earlier cell (or as
//! absolute values when no cell is similar enough), DEFLATE-compressed.
//! Everything is framed by a little-endian container inside one zlib
//! envelope.

pub mod cli;
pub mod compression;
pub mod io;
pub mod matrix;
