//! On-disk container for a compressed matrix.
//!
//! The whole artifact is a single zlib stream. Inside the envelope, all
//! fields are little-endian: a fixed header, the gene and cell name tables,
//! then one length-prefixed record per compressed row. There is no magic
//! number and no checksum; framing relies entirely on the length prefixes,
//! each of which is validated against the remaining envelope on read.

use anyhow::{Context, Result};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Write};
use std::path::Path;

/// Current container format version.
pub const FORMAT_VERSION: u32 = 1;

/// Fixed-size metadata at the front of the envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub version: u32,
    pub num_cells: u32,
    pub num_genes: u32,
    pub is_lossy: bool,
    /// Delta threshold; only meaningful when `is_lossy`.
    pub threshold: f64,
    pub quant_levels: u32,
    /// Unix seconds at encode time.
    pub timestamp: i64,
}

/// One encoded cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompressedRow {
    /// Elias-Fano stream of the cell's gene indices; empty only for rows
    /// that never went through the index coder.
    pub ef_bytes: Vec<u8>,
    /// DEFLATE-wrapped varint stream of value deltas.
    pub delta_bytes: Vec<u8>,
    /// Index of the reference row, or -1 when the deltas are absolute.
    pub ref_cell: i32,
    pub num_genes_in_row: u32,
    /// Universe bound used at encode time; equals the header's `num_genes`.
    pub max_gene_index: u32,
}

/// A complete compressed dataset: header, name tables, and rows in cell
/// order. Produced once by the encoder, consumed once by the decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedData {
    pub header: Header,
    pub gene_names: Vec<String>,
    pub cell_names: Vec<String>,
    pub rows: Vec<CompressedRow>,
}

impl CompressedData {
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())
            .with_context(|| format!("failed to create {:?}", path.as_ref()))?;
        self.write_to(BufWriter::new(file))
    }

    /// Serialize through a zlib envelope.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut buf = Vec::new();

        buf.extend_from_slice(&self.header.version.to_le_bytes());
        buf.extend_from_slice(&self.header.num_cells.to_le_bytes());
        buf.extend_from_slice(&self.header.num_genes.to_le_bytes());
        buf.push(self.header.is_lossy as u8);
        // Padding so the threshold sits 8-aligned at offset 16.
        buf.extend_from_slice(&[0u8; 3]);
        buf.extend_from_slice(&self.header.threshold.to_le_bytes());
        buf.extend_from_slice(&self.header.quant_levels.to_le_bytes());
        buf.extend_from_slice(&self.header.timestamp.to_le_bytes());

        write_string_table(&mut buf, &self.gene_names);
        write_string_table(&mut buf, &self.cell_names);

        buf.extend_from_slice(&(self.rows.len() as u32).to_le_bytes());
        for row in &self.rows {
            buf.extend_from_slice(&row.ref_cell.to_le_bytes());
            buf.extend_from_slice(&row.num_genes_in_row.to_le_bytes());
            buf.extend_from_slice(&row.max_gene_index.to_le_bytes());
            buf.extend_from_slice(&(row.ef_bytes.len() as u32).to_le_bytes());
            buf.extend_from_slice(&row.ef_bytes);
            buf.extend_from_slice(&(row.delta_bytes.len() as u32).to_le_bytes());
            buf.extend_from_slice(&row.delta_bytes);
        }

        let mut encoder = ZlibEncoder::new(writer, Compression::best());
        encoder.write_all(&buf)?;
        encoder.finish().context("failed to finish output envelope")?;
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("failed to open {:?}", path.as_ref()))?;
        Self::read_from(BufReader::new(file))
    }

    /// Deserialize from a zlib envelope.
    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        let mut buf = Vec::new();
        ZlibDecoder::new(reader)
            .read_to_end(&mut buf)
            .context("unrecognized file format: not a zlib stream")?;
        let mut cursor = Cursor::new(buf.as_slice());

        let version = read_u32(&mut cursor)?;
        if version != FORMAT_VERSION {
            anyhow::bail!(
                "unsupported file version {} (expected {})",
                version,
                FORMAT_VERSION
            );
        }
        let num_cells = read_u32(&mut cursor)?;
        let num_genes = read_u32(&mut cursor)?;
        let is_lossy = read_u8(&mut cursor)? != 0;
        let mut padding = [0u8; 3];
        cursor.read_exact(&mut padding).context("truncated header")?;
        let threshold = f64::from_le_bytes(read_array(&mut cursor)?);
        let quant_levels = read_u32(&mut cursor)?;
        let timestamp = i64::from_le_bytes(read_array(&mut cursor)?);

        let gene_names = read_string_table(&mut cursor).context("bad gene name table")?;
        if gene_names.len() != num_genes as usize {
            anyhow::bail!(
                "corrupt file: {} gene names but header declares {}",
                gene_names.len(),
                num_genes
            );
        }
        let cell_names = read_string_table(&mut cursor).context("bad cell name table")?;
        if cell_names.len() != num_cells as usize {
            anyhow::bail!(
                "corrupt file: {} cell names but header declares {}",
                cell_names.len(),
                num_cells
            );
        }

        let num_rows = read_u32(&mut cursor)?;
        if num_rows != num_cells {
            anyhow::bail!(
                "corrupt file: {} compressed rows but header declares {} cells",
                num_rows,
                num_cells
            );
        }

        let mut rows = Vec::with_capacity(num_rows as usize);
        for cell_idx in 0..num_rows {
            let row = read_row(&mut cursor)
                .with_context(|| format!("corrupt row record for cell {}", cell_idx))?;
            rows.push(row);
        }

        Ok(Self {
            header: Header {
                version,
                num_cells,
                num_genes,
                is_lossy,
                threshold,
                quant_levels,
                timestamp,
            },
            gene_names,
            cell_names,
            rows,
        })
    }

    /// Rough serialized size, used for compression-ratio reporting.
    pub fn estimated_size(&self) -> usize {
        let mut size = 36; // header
        for name in self.gene_names.iter().chain(self.cell_names.iter()) {
            size += 4 + name.len();
        }
        for row in &self.rows {
            size += 20 + row.ef_bytes.len() + row.delta_bytes.len();
        }
        size
    }
}

fn write_string_table(buf: &mut Vec<u8>, strings: &[String]) {
    buf.extend_from_slice(&(strings.len() as u32).to_le_bytes());
    for s in strings {
        buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
        buf.extend_from_slice(s.as_bytes());
    }
}

fn read_string_table(cursor: &mut Cursor<&[u8]>) -> Result<Vec<String>> {
    let count = read_u32(cursor)?;
    let mut strings = Vec::with_capacity(count.min(1 << 20) as usize);
    for _ in 0..count {
        let bytes = read_bytes(cursor)?;
        strings.push(String::from_utf8(bytes).context("name is not valid UTF-8")?);
    }
    Ok(strings)
}

fn read_row(cursor: &mut Cursor<&[u8]>) -> Result<CompressedRow> {
    let ref_cell = i32::from_le_bytes(read_array(cursor)?);
    let num_genes_in_row = read_u32(cursor)?;
    let max_gene_index = read_u32(cursor)?;
    let ef_bytes = read_bytes(cursor)?;
    let delta_bytes = read_bytes(cursor)?;
    Ok(CompressedRow {
        ef_bytes,
        delta_bytes,
        ref_cell,
        num_genes_in_row,
        max_gene_index,
    })
}

/// Read a `u32` length prefix and that many bytes, refusing prefixes that
/// overrun the envelope (a corrupted length must fail here, not shift every
/// downstream field).
fn read_bytes(cursor: &mut Cursor<&[u8]>) -> Result<Vec<u8>> {
    let len = read_u32(cursor)? as usize;
    let remaining = cursor.get_ref().len() - cursor.position() as usize;
    if len > remaining {
        anyhow::bail!(
            "corrupt length prefix: {} bytes requested, {} remain",
            len,
            remaining
        );
    }
    let mut bytes = vec![0u8; len];
    cursor.read_exact(&mut bytes)?;
    Ok(bytes)
}

fn read_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8> {
    Ok(u8::from_le_bytes(read_array(cursor)?))
}

fn read_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32> {
    Ok(u32::from_le_bytes(read_array(cursor)?))
}

fn read_array<const N: usize>(cursor: &mut Cursor<&[u8]>) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    cursor
        .read_exact(&mut buf)
        .context("unexpected end of file")?;
    Ok(buf)
}
