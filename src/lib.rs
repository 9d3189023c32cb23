//! # somgrid - Self-Organizing Maps
//!
//! somgrid trains Self-Organizing Maps (Kohonen maps): grids of nodes whose
//! weight vectors are pulled toward input samples, producing a
//! topology-preserving low-dimensional projection of high-dimensional data.
//!
//! ## Key Features
//!
//! - **Multiple topologies**: square, hexagonal, alternating hexagonal and cuboid grids
//! - **Pluggable strategies**: distance, neighborhood and time-decay functions as traits
//! - **Reproducible training**: every random draw comes from a seeded ChaCha source
//! - **Fair BMU search**: ties are broken uniformly at random among all tied nodes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use somgrid::{Grid, Som};
//!
//! let grid = Grid::hex(20, 20).feature_depth(3).seed(42).build()?;
//! let mut som = Som::builder(grid).seed(42).build();
//!
//! som.train(&samples, 10, true)?;
//!
//! let best = som.predict(&[0.1, 0.5, 0.9])?;
//! println!("node {} at distance {}", best.node_id, best.distance);
//! ```
//!
//! ## Architecture
//!
//! - [`som`] - Grids, topologies, strategy functions and the training engine
//! - [`config`] - Serializable description of a complete training run
//! - [`normalize`] - Rescaling of feature values before training
//! - [`error`] - Error type shared by every module

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod normalize;
pub mod som;

// Re-export commonly used types
pub use config::SomConfig;
pub use error::{Result, SomError};
pub use normalize::DataNormalizer;
pub use som::{
    DistanceFunction, DistanceKind, Grid, GridBuilder, GridSnapshot, NeighborhoodFunction,
    NeighborhoodKind, Node, Prediction, ScheduleKind, Som, SomBuilder, TimeFunction, Topology,
    TrainingSummary, WeightInit,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
