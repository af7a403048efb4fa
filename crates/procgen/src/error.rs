//! Errors for terrain generation and heightmap loading.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("heightmap size must be between {min} and {max}, got {size}")]
    InvalidSize { size: usize, min: usize, max: usize },

    #[error("invalid generation option `{field}` = {value}: {reason}")]
    InvalidOption {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("generated heights are not finite (range [{min}, {max}])")]
    NonFiniteHeights { min: f32, max: f32 },

    #[error("expected {expected} height samples, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("heightmap source {path:?} is {width}x{depth}, must be square")]
    NotSquare {
        path: PathBuf,
        width: usize,
        depth: usize,
    },

    #[error("failed to load heightmap image {path:?}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to read heightmap {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path:?} line {line}: cannot parse `{token}` as a height")]
    Parse {
        path: PathBuf,
        line: usize,
        token: String,
    },
}

pub type Result<T> = std::result::Result<T, TerrainError>;
