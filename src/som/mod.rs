//! Self-Organizing Map (SOM) grids, strategies and training.
//!
//! - **Topologies**: square, hexagonal, alternating hexagonal and cuboid layouts (topology.rs)
//! - **Grid**: node storage, best-matching-unit search and grid distances (grid.rs)
//! - **Strategies**: pluggable distance, neighborhood and time-decay functions
//! - **Training**: the online update rule, epochs and prediction (training.rs)

pub mod distance;
pub mod grid;
pub mod neighborhood;
mod node;
pub mod schedule;
pub mod topology;
pub mod training;

pub use distance::{
    DistanceFunction, DistanceKind, EuclideanNorm, MaxNorm, MinNorm, ScalarProduct,
    SquaredDistance, ToroidalEuclidean,
};
pub use grid::{Grid, GridBuilder, GridSnapshot, Prediction};
pub use neighborhood::{Bubble, ExponentialDecreasing, NeighborhoodFunction, NeighborhoodKind};
pub use node::{Node, NodeBuilder, WeightInit};
pub use schedule::{ExponentialDecay, LinearDecreasing, ScheduleKind, TimeFunction};
pub use topology::Topology;
pub use training::{Som, SomBuilder, TrainingSummary};
