//! Loading and saving expression matrices as delimited text.
//!
//! The expected shape is the usual dense export: a header row with gene
//! names after a leading cell-name column, then one row per cell. Only
//! positive entries are kept; the matrix is sparse from the moment it is
//! parsed. Gzipped input is detected by content, not extension.

use crate::matrix::SparseRow;
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Either a plain file or a gzip-wrapped one, behind one BufRead.
enum FileReader {
    Plain(BufReader<std::fs::File>),
    Gzipped(BufReader<GzDecoder<BufReader<std::fs::File>>>),
}

impl Read for FileReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            FileReader::Plain(r) => r.read(buf),
            FileReader::Gzipped(r) => r.read(buf),
        }
    }
}

impl BufRead for FileReader {
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        match self {
            FileReader::Plain(r) => r.fill_buf(),
            FileReader::Gzipped(r) => r.fill_buf(),
        }
    }

    fn consume(&mut self, amt: usize) {
        match self {
            FileReader::Plain(r) => r.consume(amt),
            FileReader::Gzipped(r) => r.consume(amt),
        }
    }
}

fn open_reader(path: &Path) -> Result<FileReader> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open file: {:?}", path))?;

    // Sniff the gzip magic instead of trusting the extension.
    let mut buffered = BufReader::new(file);
    let is_gzipped = {
        let peek = buffered.fill_buf()?;
        peek.len() >= 2 && peek[0] == 0x1f && peek[1] == 0x8b
    };

    Ok(if is_gzipped {
        FileReader::Gzipped(BufReader::new(GzDecoder::new(buffered)))
    } else {
        FileReader::Plain(buffered)
    })
}

/// Pick the field delimiter from the file name: `.tsv` (optionally `.gz`)
/// means tabs, everything else commas.
fn delimiter_for(path: &Path) -> u8 {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if name.ends_with(".tsv") || name.ends_with(".tsv.gz") {
        b'\t'
    } else {
        b','
    }
}

/// Load a dense CSV/TSV expression matrix into sparse rows plus the gene and
/// cell name tables.
pub fn load_sparse_matrix(path: impl AsRef<Path>) -> Result<(Vec<SparseRow>, Vec<String>, Vec<String>)> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if name.ends_with(".rds") {
        anyhow::bail!(
            "RDS input is not supported; convert to CSV in R first:\n\
             library(Matrix)\n\
             data <- readRDS('{}')\n\
             write.csv(as.matrix(data), 'output.csv')",
            path.display()
        );
    }

    let delimiter = delimiter_for(path) as char;
    let mut reader = open_reader(path)?;
    let mut line = String::new();

    // Header row: leading cell-name column, then gene names.
    if reader.read_line(&mut line)? == 0 {
        anyhow::bail!("empty matrix file: {:?}", path);
    }
    let gene_names: Vec<String> = line
        .trim_end()
        .split(delimiter)
        .skip(1)
        .map(|name| name.trim_matches('"').to_string())
        .collect();
    if gene_names.is_empty() {
        anyhow::bail!("header row of {:?} names no genes", path);
    }

    let mut matrix = Vec::new();
    let mut cell_names = Vec::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            continue;
        }

        let mut fields = trimmed.split(delimiter);
        let cell_name = fields.next().unwrap_or_default();

        let mut indices = Vec::new();
        let mut values = Vec::new();
        for (gene_idx, field) in fields.enumerate() {
            if gene_idx >= gene_names.len() {
                anyhow::bail!(
                    "cell {} ({}) has more columns than the {} genes in the header",
                    matrix.len(),
                    cell_name,
                    gene_names.len()
                );
            }
            if field.is_empty() || field == "0" {
                continue;
            }
            // Tolerate float exports; only positive counts survive.
            let Ok(value) = field.parse::<f64>() else {
                continue;
            };
            if value > 0.0 {
                indices.push(gene_idx as u32);
                values.push(value as u32);
            }
        }

        cell_names.push(cell_name.trim_matches('"').to_string());
        matrix.push(SparseRow::new(indices, values));
    }

    Ok((matrix, gene_names, cell_names))
}

/// Write the matrix back out as dense CSV, one row per cell.
pub fn save_sparse_matrix(
    matrix: &[SparseRow],
    gene_names: &[String],
    cell_names: &[String],
    path: impl AsRef<Path>,
) -> Result<()> {
    let file = std::fs::File::create(path.as_ref())
        .with_context(|| format!("failed to create {:?}", path.as_ref()))?;
    let mut writer = BufWriter::new(file);

    write!(writer, "Cell")?;
    for name in gene_names {
        write!(writer, ",{}", name)?;
    }
    writeln!(writer)?;

    let mut dense = vec![0u32; gene_names.len()];
    for (cell_idx, row) in matrix.iter().enumerate() {
        dense.fill(0);
        for (&gene, &value) in row.indices.iter().zip(&row.values) {
            if (gene as usize) < dense.len() {
                dense[gene as usize] = value;
            }
        }

        match cell_names.get(cell_idx) {
            Some(name) => write!(writer, "{}", name)?,
            None => write!(writer, "Cell_{}", cell_idx + 1)?,
        }
        for value in &dense {
            write!(writer, ",{}", value)?;
        }
        writeln!(writer)?;
    }

    writer.flush().context("failed to flush output")
}
