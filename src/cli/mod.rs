use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scz")]
#[command(version)]
#[command(about = "Compression for single-cell RNA-seq count matrices", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compress an expression matrix (CSV/TSV, optionally gzipped)
    Compress(CompressArgs),
    /// Decompress an .scz archive back to CSV
    Decompress(DecompressArgs),
}

#[derive(Parser)]
pub struct CompressArgs {
    /// Input matrix file (.csv, .tsv, or either gzipped)
    #[arg(short, long, value_name = "FILE", required = true)]
    pub input: PathBuf,

    /// Output .scz archive
    #[arg(short, long, value_name = "FILE", required = true)]
    pub output: PathBuf,

    /// Number of threads (0 = auto-detect)
    #[arg(short = 't', long, default_value = "0")]
    pub threads: usize,

    /// Enable lossy compression (delta thresholding + logarithmic quantization)
    #[arg(long)]
    pub lossy: bool,

    /// Delta threshold for lossy compression; deltas below it are dropped
    #[arg(long, default_value = "0.1")]
    pub threshold: f64,

    /// Quantization levels for lossy compression (>= 2)
    #[arg(long, default_value = "256")]
    pub quant_levels: u32,
}

impl Default for CompressArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: PathBuf::new(),
            threads: 0,
            lossy: false,
            threshold: 0.1,
            quant_levels: 256,
        }
    }
}

#[derive(Parser)]
pub struct DecompressArgs {
    /// Input .scz archive
    #[arg(short, long, value_name = "FILE", required = true)]
    pub input: PathBuf,

    /// Output CSV file
    #[arg(short, long, value_name = "FILE", required = true)]
    pub output: PathBuf,

    /// Number of threads (0 = auto-detect)
    #[arg(short = 't', long, default_value = "0")]
    pub threads: usize,
}
