use scz::cli::{CompressArgs, DecompressArgs};
use std::fs;
use tempfile::TempDir;

fn decompress_args(input: std::path::PathBuf, output: std::path::PathBuf) -> DecompressArgs {
    DecompressArgs {
        input,
        output,
        threads: 1,
    }
}

const SAMPLE_CSV: &str = "\
Cell,G1,G2,G3,G4,G5
c1,0,2,0,5,1
c2,0,3,0,5,2
c3,1,0,0,0,0
c4,0,0,0,0,0
";

#[test]
fn test_compress_decompress_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path().to_path_buf();

    let input_csv = temp_path.join("matrix.csv");
    fs::write(&input_csv, SAMPLE_CSV).unwrap();

    let archive_path = temp_path.join("matrix.scz");
    let compress_args = CompressArgs {
        input: input_csv.clone(),
        output: archive_path.clone(),
        threads: 1,
        ..CompressArgs::default()
    };
    scz::compression::compress(&compress_args).unwrap();
    assert!(archive_path.exists());

    let output_csv = temp_path.join("decompressed.csv");
    scz::compression::decompress(&decompress_args(archive_path, output_csv.clone())).unwrap();
    assert!(output_csv.exists());

    let original = fs::read_to_string(&input_csv).unwrap();
    let decompressed = fs::read_to_string(&output_csv).unwrap();

    let original_lines: Vec<&str> = original.lines().collect();
    let decompressed_lines: Vec<&str> = decompressed.lines().collect();
    assert_eq!(original_lines.len(), decompressed_lines.len());
    for (orig, decomp) in original_lines.iter().zip(decompressed_lines.iter()) {
        assert_eq!(orig.trim(), decomp.trim());
    }
}

#[test]
fn test_roundtrip_preserves_similar_cells_exactly() {
    // Rows built to exercise the reference-delta path: cells share most of
    // their expressed genes and must decode back bit-for-bit.
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path().to_path_buf();

    let mut csv = String::from("Cell,");
    let genes: Vec<String> = (0..64).map(|g| format!("G{}", g)).collect();
    csv.push_str(&genes.join(","));
    csv.push('\n');
    for cell in 0..32 {
        csv.push_str(&format!("c{}", cell));
        for gene in 0..64 {
            let value = if gene % 4 == 0 { cell % 7 + gene / 8 } else { 0 };
            csv.push_str(&format!(",{}", value));
        }
        csv.push('\n');
    }

    let input_csv = temp_path.join("matrix.csv");
    fs::write(&input_csv, &csv).unwrap();

    let archive_path = temp_path.join("matrix.scz");
    scz::compression::compress(&CompressArgs {
        input: input_csv.clone(),
        output: archive_path.clone(),
        ..CompressArgs::default()
    })
    .unwrap();

    let output_csv = temp_path.join("roundtrip.csv");
    scz::compression::decompress(&decompress_args(archive_path, output_csv.clone())).unwrap();

    let (original, _, _) = load(&input_csv);
    let (roundtripped, _, _) = load(&output_csv);
    assert_eq!(original, roundtripped);
}

#[test]
fn test_decompress_worker_counts_agree() {
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path().to_path_buf();

    let input_csv = temp_path.join("matrix.csv");
    fs::write(&input_csv, SAMPLE_CSV).unwrap();

    let archive_path = temp_path.join("matrix.scz");
    scz::compression::compress(&CompressArgs {
        input: input_csv,
        output: archive_path.clone(),
        ..CompressArgs::default()
    })
    .unwrap();

    let out_single = temp_path.join("single.csv");
    let out_many = temp_path.join("many.csv");
    scz::compression::decompress(&decompress_args(archive_path.clone(), out_single.clone()))
        .unwrap();
    scz::compression::decompress(&DecompressArgs {
        input: archive_path,
        output: out_many.clone(),
        threads: 4,
    })
    .unwrap();

    assert_eq!(
        fs::read_to_string(&out_single).unwrap(),
        fs::read_to_string(&out_many).unwrap()
    );
}

#[test]
fn test_lossy_roundtrip_keeps_shape() {
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path().to_path_buf();

    let input_csv = temp_path.join("matrix.csv");
    fs::write(&input_csv, SAMPLE_CSV).unwrap();

    let archive_path = temp_path.join("matrix.scz");
    scz::compression::compress(&CompressArgs {
        input: input_csv.clone(),
        output: archive_path.clone(),
        lossy: true,
        threshold: 0.5,
        quant_levels: 256,
        ..CompressArgs::default()
    })
    .unwrap();

    let output_csv = temp_path.join("lossy.csv");
    scz::compression::decompress(&decompress_args(archive_path, output_csv.clone())).unwrap();

    let (original, genes, cells) = load(&input_csv);
    let (lossy, lossy_genes, lossy_cells) = load(&output_csv);
    assert_eq!(genes, lossy_genes);
    assert_eq!(cells, lossy_cells);
    assert_eq!(original.len(), lossy.len());
}

#[test]
fn test_rejects_invalid_quant_levels() {
    let temp_dir = TempDir::new().unwrap();
    let input_csv = temp_dir.path().join("matrix.csv");
    fs::write(&input_csv, SAMPLE_CSV).unwrap();

    let err = scz::compression::compress(&CompressArgs {
        input: input_csv,
        output: temp_dir.path().join("out.scz"),
        lossy: true,
        quant_levels: 1,
        ..CompressArgs::default()
    })
    .unwrap_err();
    assert!(err.to_string().contains("quant-levels"));
}

#[test]
fn test_rejects_garbage_archive() {
    let temp_dir = TempDir::new().unwrap();
    let bogus = temp_dir.path().join("bogus.scz");
    fs::write(&bogus, b"definitely not an scz file").unwrap();

    let output = temp_dir.path().join("out.csv");
    assert!(scz::compression::decompress(&decompress_args(bogus, output)).is_err());
}

fn load(path: &std::path::Path) -> (Vec<scz::matrix::SparseRow>, Vec<String>, Vec<String>) {
    scz::io::load_sparse_matrix(path).unwrap()
}
