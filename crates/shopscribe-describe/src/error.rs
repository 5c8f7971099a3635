use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DescribeError {
    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
