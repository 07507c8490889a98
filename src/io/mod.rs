mod matrix;

pub use matrix::{load_sparse_matrix, save_sparse_matrix};
