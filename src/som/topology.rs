//! Grid topologies and their coordinate rules.
//!
//! A topology maps a multi-index (`[row, col]` or `[row, col, layer]`) to a
//! spatial coordinate and fixes the flat, row-major order in which the grid
//! stores its nodes. Grid-space distances, and therefore the neighborhood
//! structure, follow from these coordinates.
//!
//! ```text
//! Square        Hex           HexAlt
//! x x x x       x x x x       x x x x
//! x x x x        x x x x       x x x
//! x x x x       x x x x       x x x x
//! ```

use crate::error::{Result, SomError};
use serde::{Deserialize, Serialize};

/// Vertical spacing of hexagonal rows, `sqrt(3) / 2`.
pub const HEX_SCALE: f64 = 0.866_025_403_784_438_6;

/// Horizontal offset of odd hexagonal rows.
pub const HEX_ADDEND: f64 = 0.5;

/// The layout of nodes on a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Topology {
    /// Rectangular grid, unit spacing, 4 direct neighbors.
    Square {
        /// Number of rows.
        height: usize,
        /// Number of columns.
        width: usize,
    },
    /// Hexagonal grid with every odd row shifted half a unit to the right.
    /// Every interior node has 6 equidistant neighbors.
    Hex {
        /// Number of rows.
        height: usize,
        /// Number of columns in every row.
        width: usize,
    },
    /// Hexagonal grid whose odd rows hold `width - 1` nodes, giving jagged rows.
    HexAlt {
        /// Number of rows.
        height: usize,
        /// Number of columns in even rows.
        width: usize,
    },
    /// Cuboid grid, unit spacing, 6 direct neighbors.
    Cube {
        /// Number of rows.
        height: usize,
        /// Number of columns.
        width: usize,
        /// Number of layers.
        depth: usize,
    },
}

impl Topology {
    /// Checks that the grid has no zero-sized axis.
    pub fn validate(&self) -> Result<()> {
        let dims = self.dims();
        if dims.iter().any(|&d| d == 0) {
            return Err(SomError::Config(format!(
                "Grid dimensions must be non-zero, got {:?}",
                dims
            )));
        }
        if let Topology::HexAlt { height, width } = *self {
            if height > 1 && width < 2 {
                return Err(SomError::Config(format!(
                    "Alternating hex grid with {} rows needs width >= 2, got {}",
                    height, width
                )));
            }
        }
        Ok(())
    }

    /// The grid extents, `[height, width]` or `[height, width, depth]`.
    pub fn dims(&self) -> Vec<usize> {
        match *self {
            Topology::Square { height, width }
            | Topology::Hex { height, width }
            | Topology::HexAlt { height, width } => vec![height, width],
            Topology::Cube {
                height,
                width,
                depth,
            } => vec![height, width, depth],
        }
    }

    /// Span of the grid along each coordinate axis, the period of a wrapped
    /// axis. Hexagonal rows are `HEX_SCALE` apart, so their row axis spans
    /// `height * HEX_SCALE`.
    pub fn extents(&self) -> Vec<f64> {
        match *self {
            Topology::Hex { height, width } | Topology::HexAlt { height, width } => {
                vec![height as f64 * HEX_SCALE, width as f64]
            }
            _ => self.dims().into_iter().map(|d| d as f64).collect(),
        }
    }

    /// Checks per-axis wrap flags against the layout. Hexagonal rows alternate
    /// their offset, so the row axis only closes into a torus for an even
    /// number of rows.
    pub fn check_wrap(&self, wrap: &[bool]) -> Result<()> {
        SomError::check_dim(self.coord_dim(), wrap.len())?;
        match *self {
            Topology::Hex { height, .. } | Topology::HexAlt { height, .. }
                if wrap[0] && height % 2 == 1 =>
            {
                Err(SomError::Config(format!(
                    "Hexagonal rows only wrap for an even height, got {}",
                    height
                )))
            }
            _ => Ok(()),
        }
    }

    /// Length of every node coordinate vector.
    pub fn coord_dim(&self) -> usize {
        match self {
            Topology::Cube { .. } => 3,
            _ => 2,
        }
    }

    /// Number of nodes in row `row` (of each layer, for cubes).
    #[inline]
    pub fn row_len(&self, row: usize) -> usize {
        match *self {
            Topology::HexAlt { width, .. } if row % 2 == 1 => width - 1,
            Topology::Square { width, .. }
            | Topology::Hex { width, .. }
            | Topology::HexAlt { width, .. } => width,
            Topology::Cube { width, depth, .. } => width * depth,
        }
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        match *self {
            Topology::Square { height, width } | Topology::Hex { height, width } => height * width,
            Topology::HexAlt { height, width } => {
                let odd_rows = height / 2;
                height * width - odd_rows
            }
            Topology::Cube {
                height,
                width,
                depth,
            } => height * width * depth,
        }
    }

    /// Flat offset of the first node of `row`.
    fn row_offset(&self, row: usize) -> usize {
        match *self {
            Topology::HexAlt { width, .. } => row * width - row / 2,
            _ => row * self.row_len(0),
        }
    }

    /// The coordinate of the node at `idx`, which must be in range.
    fn coord_unchecked(&self, idx: &[usize]) -> Vec<f64> {
        match self {
            Topology::Square { .. } => vec![idx[0] as f64, idx[1] as f64],
            Topology::Hex { .. } | Topology::HexAlt { .. } => {
                let (i, j) = (idx[0], idx[1]);
                vec![
                    i as f64 * HEX_SCALE,
                    j as f64 + HEX_ADDEND * (i % 2) as f64,
                ]
            }
            Topology::Cube { .. } => vec![idx[0] as f64, idx[1] as f64, idx[2] as f64],
        }
    }

    /// Converts a multi-index into the flat node index.
    pub fn flat_index(&self, idx: &[usize]) -> Result<usize> {
        let dims = self.dims();
        SomError::check_dim(dims.len(), idx.len())?;

        let height = dims[0];
        if idx[0] >= height {
            return Err(SomError::IndexOutOfRange {
                index: idx[0],
                max: height,
            });
        }

        match *self {
            Topology::Cube { width, depth, .. } => {
                if idx[1] >= width {
                    return Err(SomError::IndexOutOfRange {
                        index: idx[1],
                        max: width,
                    });
                }
                if idx[2] >= depth {
                    return Err(SomError::IndexOutOfRange {
                        index: idx[2],
                        max: depth,
                    });
                }
                Ok((idx[0] * width + idx[1]) * depth + idx[2])
            }
            _ => {
                let len = self.row_len(idx[0]);
                if idx[1] >= len {
                    return Err(SomError::IndexOutOfRange {
                        index: idx[1],
                        max: len,
                    });
                }
                Ok(self.row_offset(idx[0]) + idx[1])
            }
        }
    }

    /// Converts a flat node index back into its multi-index.
    pub fn multi_index(&self, flat: usize) -> Result<Vec<usize>> {
        let count = self.node_count();
        if flat >= count {
            return Err(SomError::IndexOutOfRange {
                index: flat,
                max: count,
            });
        }

        Ok(match *self {
            Topology::Cube { width, depth, .. } => {
                let layer = flat % depth;
                let rest = flat / depth;
                vec![rest / width, rest % width, layer]
            }
            Topology::HexAlt { width, .. } => {
                // Each pair of rows holds 2 * width - 1 nodes.
                let pair_len = 2 * width - 1;
                let pair = flat / pair_len;
                let within = flat % pair_len;
                if within < width {
                    vec![2 * pair, within]
                } else {
                    vec![2 * pair + 1, within - width]
                }
            }
            Topology::Square { width, .. } | Topology::Hex { width, .. } => {
                vec![flat / width, flat % width]
            }
        })
    }

    /// All `(multi_index, coordinate)` pairs in flat order.
    pub fn layout(&self) -> Vec<(Vec<usize>, Vec<f64>)> {
        let mut out = Vec::with_capacity(self.node_count());
        let dims = self.dims();

        match *self {
            Topology::Cube {
                height,
                width,
                depth,
            } => {
                for i in 0..height {
                    for j in 0..width {
                        for k in 0..depth {
                            let idx = vec![i, j, k];
                            let coords = self.coord_unchecked(&idx);
                            out.push((idx, coords));
                        }
                    }
                }
            }
            _ => {
                for i in 0..dims[0] {
                    for j in 0..self.row_len(i) {
                        let idx = vec![i, j];
                        let coords = self.coord_unchecked(&idx);
                        out.push((idx, coords));
                    }
                }
            }
        }

        out
    }

    /// Flat index ranges of each 2D row. Cubes have no row view.
    pub fn row_ranges(&self) -> Option<Vec<std::ops::Range<usize>>> {
        match self {
            Topology::Cube { .. } => None,
            _ => {
                let height = self.dims()[0];
                Some(
                    (0..height)
                        .map(|i| {
                            let start = self.row_offset(i);
                            start..start + self.row_len(i)
                        })
                        .collect(),
                )
            }
        }
    }
}
