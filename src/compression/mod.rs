mod bitvec;
mod compressor;
mod decompressor;
mod delta;
mod quantize;
mod reference;
mod row;
pub mod container;
pub mod elias_fano;
pub mod varint;

pub use compressor::Compressor;
pub use container::{CompressedData, CompressedRow, Header, FORMAT_VERSION};
pub use delta::DeltaCodec;

use crate::cli::{CompressArgs, DecompressArgs};
use anyhow::{Context, Result};
use std::time::Instant;
use tracing::info;

/// Compress a matrix file into an `.scz` container.
pub fn compress(args: &CompressArgs) -> Result<()> {
    if args.quant_levels < 2 {
        anyhow::bail!("--quant-levels must be at least 2, got {}", args.quant_levels);
    }

    let start = Instant::now();
    let (matrix, gene_names, cell_names) = crate::io::load_sparse_matrix(&args.input)?;
    info!(
        "loaded {} cells x {} genes, {} non-zero entries",
        matrix.len(),
        gene_names.len(),
        crate::matrix::count_non_zeros(&matrix)
    );
    if args.lossy {
        info!(
            "lossy mode: threshold {}, {} quantization levels",
            args.threshold, args.quant_levels
        );
    }

    let compressor = Compressor::new(args.lossy, args.threshold, args.quant_levels);
    let data = thread_pool(args.threads)?
        .install(|| compressor.compress(&matrix, &gene_names, &cell_names))?;
    data.save_to_file(&args.output)
        .with_context(|| format!("failed to save {:?}", args.output))?;

    let original = compressor::estimate_original_size(&matrix, &gene_names, &cell_names);
    let compressed = data.estimated_size();
    info!(
        "compressed {} -> {} bytes ({:.2}x) in {:.2?}",
        original,
        compressed,
        original as f64 / compressed.max(1) as f64,
        start.elapsed()
    );
    Ok(())
}

/// Decompress an `.scz` container back into a matrix file.
pub fn decompress(args: &DecompressArgs) -> Result<()> {
    let start = Instant::now();
    let data = CompressedData::load_from_file(&args.input)?;
    info!(
        "container: {} cells x {} genes, format v{}{}",
        data.header.num_cells,
        data.header.num_genes,
        data.header.version,
        if data.header.is_lossy { ", lossy" } else { "" }
    );

    let matrix = thread_pool(args.threads)?.install(|| decompressor::decompress(&data))?;
    info!(
        "decompressed {} non-zero entries in {:.2?}",
        crate::matrix::count_non_zeros(&matrix),
        start.elapsed()
    );

    crate::io::save_sparse_matrix(&matrix, &data.gene_names, &data.cell_names, &args.output)
}

/// Build the worker pool: `threads == 0` sizes it to the hardware.
fn thread_pool(threads: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("failed to build thread pool")
}
