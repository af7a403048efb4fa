//! External heightmap sources. Each loader fills the same row-major sample grid that
//! procedural generation writes.

use std::path::Path;

use crate::error::{Result, TerrainError};
use crate::heightmap::HeightMap;

impl HeightMap {
    /// Load a square image, using the red channel (0..=255) of each pixel as its height.
    pub fn from_image(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let img = image::open(path)
            .map_err(|source| TerrainError::Image {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();

        let (width, depth) = (img.width() as usize, img.height() as usize);
        if width != depth {
            return Err(TerrainError::NotSquare {
                path: path.to_path_buf(),
                width,
                depth,
            });
        }

        // Pixel rows run along z, columns along x, matching the grid's row-major order.
        let heights = img.pixels().map(|p| p.0[0] as f32).collect();
        let map = HeightMap::from_heights(width, heights)?;
        log::info!(
            "Loaded {}x{} heightmap from {}",
            width,
            width,
            path.display()
        );
        Ok(map)
    }

    /// Load whitespace-separated rows of heights. Blank lines are skipped; the number of
    /// rows must equal the number of values in each row.
    pub fn from_ascii(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| TerrainError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut heights = Vec::new();
        let mut rows = 0usize;
        let mut width = None;

        for (line_no, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let before = heights.len();
            for token in line.split_whitespace() {
                let value: f32 = token.parse().map_err(|_| TerrainError::Parse {
                    path: path.to_path_buf(),
                    line: line_no + 1,
                    token: token.to_string(),
                })?;
                heights.push(value);
            }

            let row_len = heights.len() - before;
            match width {
                None => width = Some(row_len),
                Some(w) if w != row_len => {
                    return Err(TerrainError::NotSquare {
                        path: path.to_path_buf(),
                        width: w,
                        depth: rows + 1,
                    })
                }
                Some(_) => {}
            }
            rows += 1;
        }

        let width = width.unwrap_or(0);
        if width != rows {
            return Err(TerrainError::NotSquare {
                path: path.to_path_buf(),
                width,
                depth: rows,
            });
        }

        let map = HeightMap::from_heights(width, heights)?;
        log::info!("Loaded {}x{} ASCII heightmap from {}", width, width, path.display());
        Ok(map)
    }
}
