//! The grid of nodes a Self-Organizing Map is trained on.

use crate::error::{Result, SomError};
use crate::som::distance::{DistanceFunction, EuclideanNorm, SquaredDistance};
use crate::som::node::{Node, WeightInit};
use crate::som::topology::Topology;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Grids with at least this many nodes compute per-node distances and
/// updates in parallel.
pub const PARALLEL_THRESHOLD: usize = 4096;

/// A best-matching node and its feature-space distance to the sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Flat index of the node.
    pub node_id: usize,
    /// Distance between the node's weights and the sample, as measured by the
    /// grid's BMU distance function.
    pub distance: f64,
}

/// Plain-data view of a grid, handed to code that renders or stores results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    /// The grid layout.
    pub topology: Topology,
    /// Length of every weight vector.
    pub feature_depth: usize,
    /// Node coordinates in flat order.
    pub coords: Vec<Vec<f64>>,
    /// Node weights in flat order.
    pub weights: Vec<Vec<f64>>,
}

/// An ordered, fixed-size collection of nodes laid out by a [`Topology`].
///
/// Nodes are stored flat in row-major order (rows, then columns, then layers);
/// that index is the node id used everywhere else. Two distance functions are
/// held: one in feature space for the best-matching-unit search (squared
/// distance by default), one in grid space between node coordinates (Euclidean
/// by default).
pub struct Grid {
    topology: Topology,
    nodes: Vec<Node>,
    feature_depth: usize,
    bmu_distance: Box<dyn DistanceFunction>,
    neighborhood_distance: Box<dyn DistanceFunction>,
    rng: ChaCha8Rng,
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grid")
            .field("topology", &self.topology)
            .field("nodes", &self.nodes.len())
            .field("feature_depth", &self.feature_depth)
            .finish_non_exhaustive()
    }
}

impl Grid {
    /// Starts building a grid with the given topology.
    pub fn builder(topology: Topology) -> GridBuilder {
        GridBuilder::new(topology)
    }

    /// Rectangular `height x width` grid.
    pub fn square(height: usize, width: usize) -> GridBuilder {
        GridBuilder::new(Topology::Square { height, width })
    }

    /// Regular hexagonal `height x width` grid.
    pub fn hex(height: usize, width: usize) -> GridBuilder {
        GridBuilder::new(Topology::Hex { height, width })
    }

    /// Alternating hexagonal grid with `width - 1` nodes on odd rows.
    pub fn hex_alt(height: usize, width: usize) -> GridBuilder {
        GridBuilder::new(Topology::HexAlt { height, width })
    }

    /// Cuboid `height x width x depth` grid.
    pub fn cube(height: usize, width: usize, depth: usize) -> GridBuilder {
        GridBuilder::new(Topology::Cube {
            height,
            width,
            depth,
        })
    }

    /// The grid layout.
    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// The grid extents.
    pub fn dims(&self) -> Vec<usize> {
        self.topology.dims()
    }

    /// Number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the grid has no nodes. Validated topologies never do.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Length of every node's weight vector.
    #[inline]
    pub fn feature_depth(&self) -> usize {
        self.feature_depth
    }

    /// All nodes in flat order.
    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Gets a node by its flat index.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    /// Gets a mutable node by its flat index.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Node> {
        self.nodes.get_mut(index)
    }

    /// Gets a node by its multi-index, e.g. `&[row, col]`.
    pub fn node(&self, idx: &[usize]) -> Result<&Node> {
        let flat = self.topology.flat_index(idx)?;
        Ok(&self.nodes[flat])
    }

    /// Gets a mutable node by its multi-index.
    pub fn node_mut(&mut self, idx: &[usize]) -> Result<&mut Node> {
        let flat = self.topology.flat_index(idx)?;
        Ok(&mut self.nodes[flat])
    }

    /// Converts a multi-index to a flat node index.
    pub fn flat_index(&self, idx: &[usize]) -> Result<usize> {
        self.topology.flat_index(idx)
    }

    /// Converts a flat node index to its multi-index.
    pub fn multi_index(&self, flat: usize) -> Result<Vec<usize>> {
        self.topology.multi_index(flat)
    }

    /// Nested row view for planar grids; rows of an alternating hex grid have
    /// different lengths. `None` for cuboid grids.
    pub fn rows(&self) -> Option<Vec<&[Node]>> {
        self.topology
            .row_ranges()
            .map(|ranges| ranges.into_iter().map(|r| &self.nodes[r]).collect())
    }

    /// Copies of all node weight vectors in flat order.
    pub fn node_weights(&self) -> Vec<Vec<f64>> {
        self.nodes.iter().map(|n| n.weights().to_vec()).collect()
    }

    /// Copies of all node coordinates in flat order.
    pub fn node_coords(&self) -> Vec<Vec<f64>> {
        self.nodes.iter().map(|n| n.coords().to_vec()).collect()
    }

    /// Plain-data copy of the grid.
    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            topology: self.topology,
            feature_depth: self.feature_depth,
            coords: self.node_coords(),
            weights: self.node_weights(),
        }
    }

    /// Redraws every node's weights from `init` with the grid's own random source.
    pub fn initialize_weights(&mut self, depth: usize, init: &WeightInit) -> Result<&mut Self> {
        reinit_all(&mut self.nodes, depth, init, &mut self.rng)?;
        self.feature_depth = depth;
        Ok(self)
    }

    /// Redraws every node's weights from `init` with an explicit random source.
    pub fn initialize_weights_with<R: Rng + ?Sized>(
        &mut self,
        depth: usize,
        init: &WeightInit,
        rng: &mut R,
    ) -> Result<&mut Self> {
        reinit_all(&mut self.nodes, depth, init, rng)?;
        self.feature_depth = depth;
        Ok(self)
    }

    fn check_sample(&self, sample: &[f64]) -> Result<()> {
        SomError::check_dim(self.feature_depth, sample.len())
    }

    /// Finds the node whose weights are closest to `sample`.
    ///
    /// Every node is scored with the BMU distance function. When several nodes
    /// share the minimum score, one of them is picked uniformly at random with
    /// `rng`.
    pub fn find_best_node_id_and_score<R: Rng + ?Sized>(
        &self,
        sample: &[f64],
        rng: &mut R,
    ) -> Result<Prediction> {
        self.check_sample(sample)?;
        bmu_search(&self.nodes, self.bmu_distance.as_ref(), sample, rng)
    }

    /// [`Grid::find_best_node_id_and_score`] using the grid's own random source.
    pub fn best_match(&mut self, sample: &[f64]) -> Result<Prediction> {
        self.check_sample(sample)?;
        bmu_search(&self.nodes, self.bmu_distance.as_ref(), sample, &mut self.rng)
    }

    /// The best-matching node itself.
    pub fn find_best_node<R: Rng + ?Sized>(&self, sample: &[f64], rng: &mut R) -> Result<&Node> {
        let best = self.find_best_node_id_and_score(sample, rng)?;
        Ok(&self.nodes[best.node_id])
    }

    /// The `k` nodes closest to `sample`, sorted by BMU distance. Equal
    /// distances keep flat-index order.
    pub fn find_k_nearest(&self, sample: &[f64], k: usize) -> Result<Vec<Prediction>> {
        self.check_sample(sample)?;

        let mut scored: Vec<Prediction> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(node_id, n)| Prediction {
                node_id,
                distance: self.bmu_distance.distance(n.weights(), sample),
            })
            .collect();

        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(k);

        Ok(scored)
    }

    /// Grid-space distance from every node's coordinates to `point`, in flat order.
    pub fn calc_node_distances_to_point(&self, point: &[f64]) -> Result<Vec<f64>> {
        SomError::check_dim(self.topology.coord_dim(), point.len())?;

        let nd = &self.neighborhood_distance;
        let distances: Vec<f64> = if self.nodes.len() >= PARALLEL_THRESHOLD {
            self.nodes
                .par_iter()
                .map(|n| nd.distance(n.coords(), point))
                .collect()
        } else {
            self.nodes
                .iter()
                .map(|n| nd.distance(n.coords(), point))
                .collect()
        };

        if distances.iter().any(|d| d.is_nan()) {
            return Err(SomError::Config(
                "Grid distance is undefined for these node coordinates".to_string(),
            ));
        }
        Ok(distances)
    }

    /// Grid-space distance between two nodes.
    pub fn node_distance(&self, a: usize, b: usize) -> Result<f64> {
        let len = self.nodes.len();
        let na = self
            .nodes
            .get(a)
            .ok_or(SomError::IndexOutOfRange { index: a, max: len })?;
        let nb = self
            .nodes
            .get(b)
            .ok_or(SomError::IndexOutOfRange { index: b, max: len })?;
        Ok(self.neighborhood_distance.distance(na.coords(), nb.coords()))
    }

    /// Moves node `i` a fraction `factors[i]` of the way toward `sample`.
    pub fn apply_update(&mut self, sample: &[f64], factors: &[f64]) -> Result<()> {
        self.check_sample(sample)?;
        SomError::check_dim(self.nodes.len(), factors.len())?;

        if self.nodes.len() >= PARALLEL_THRESHOLD {
            self.nodes
                .par_iter_mut()
                .zip(factors.par_iter())
                .for_each(|(node, &f)| node.update_towards(sample, f));
        } else {
            for (node, &f) in self.nodes.iter_mut().zip(factors) {
                node.update_towards(sample, f);
            }
        }

        Ok(())
    }
}

fn reinit_all<R: Rng + ?Sized>(
    nodes: &mut [Node],
    depth: usize,
    init: &WeightInit,
    rng: &mut R,
) -> Result<()> {
    if depth == 0 {
        return Err(SomError::Config("Feature depth must be non-zero".to_string()));
    }
    init.validate(depth)?;

    for node in nodes {
        node.redraw_weights(init, depth, rng)?;
    }
    Ok(())
}

/// Linear scan keeping every index tied at the running minimum.
fn bmu_search<R: Rng + ?Sized>(
    nodes: &[Node],
    distance: &dyn DistanceFunction,
    sample: &[f64],
    rng: &mut R,
) -> Result<Prediction> {
    if nodes.is_empty() {
        return Err(SomError::EmptyGrid);
    }

    let mut best: Vec<usize> = Vec::new();
    let mut best_score = f64::INFINITY;

    for (i, node) in nodes.iter().enumerate() {
        let score = distance.distance(node.weights(), sample);

        if score < best_score {
            best_score = score;
            best.clear();
            best.push(i);
        } else if score == best_score {
            best.push(i);
        }
    }

    let node_id = match best.len() {
        0 => {
            return Err(SomError::Config(
                "BMU distance produced no comparable score".to_string(),
            ))
        }
        1 => best[0],
        n => best[rng.gen_range(0..n)],
    };

    Ok(Prediction {
        node_id,
        distance: best_score,
    })
}

/// Configures and constructs a [`Grid`].
pub struct GridBuilder {
    topology: Topology,
    bmu_distance: Option<Box<dyn DistanceFunction>>,
    neighborhood_distance: Option<Box<dyn DistanceFunction>>,
    seed: Option<u64>,
    feature_depth: Option<usize>,
    weight_init: WeightInit,
    weights: Option<Vec<Vec<f64>>>,
}

impl GridBuilder {
    /// Creates a builder for `topology` with default distance functions and
    /// uniform `[0, 1)` weights.
    pub fn new(topology: Topology) -> Self {
        Self {
            topology,
            bmu_distance: None,
            neighborhood_distance: None,
            seed: None,
            feature_depth: None,
            weight_init: WeightInit::default(),
            weights: None,
        }
    }

    /// Feature-space distance for the BMU search.
    pub fn distance<D: DistanceFunction + 'static>(mut self, distance: D) -> Self {
        self.bmu_distance = Some(Box::new(distance));
        self
    }

    /// Feature-space distance for the BMU search, already boxed.
    pub fn distance_boxed(mut self, distance: Box<dyn DistanceFunction>) -> Self {
        self.bmu_distance = Some(distance);
        self
    }

    /// Grid-space distance between node coordinates.
    pub fn neighborhood_distance<D: DistanceFunction + 'static>(mut self, distance: D) -> Self {
        self.neighborhood_distance = Some(Box::new(distance));
        self
    }

    /// Grid-space distance between node coordinates, already boxed.
    pub fn neighborhood_distance_boxed(mut self, distance: Box<dyn DistanceFunction>) -> Self {
        self.neighborhood_distance = Some(distance);
        self
    }

    /// Seeds the grid's random source.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Seeds the grid's random source if `seed` is set, else seeds from entropy.
    pub fn maybe_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Length of every weight vector.
    pub fn feature_depth(mut self, depth: usize) -> Self {
        self.feature_depth = Some(depth);
        self
    }

    /// Rule for drawing the initial weights.
    pub fn weight_init(mut self, init: WeightInit) -> Self {
        self.weight_init = init;
        self
    }

    /// Explicit initial weights, one vector per node in flat order. The feature
    /// depth is taken from the vectors.
    pub fn weights(mut self, weights: Vec<Vec<f64>>) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Generates the node coordinates, initializes the weights and builds the grid.
    pub fn build(self) -> Result<Grid> {
        self.topology.validate()?;

        let mut rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let count = self.topology.node_count();
        let layout = self.topology.layout();

        let (nodes, feature_depth) = match self.weights {
            Some(weights) => {
                SomError::check_dim(count, weights.len())?;
                let depth = weights.first().map(|w| w.len()).unwrap_or(0);
                if depth == 0 {
                    return Err(SomError::Config("Feature depth must be non-zero".to_string()));
                }
                if let Some(expected) = self.feature_depth {
                    SomError::check_dim(expected, depth)?;
                }

                let nodes = layout
                    .into_iter()
                    .zip(weights)
                    .map(|((_, coords), w)| {
                        SomError::check_dim(depth, w.len())?;
                        Node::builder().coords(coords).weights(w).build()
                    })
                    .collect::<Result<Vec<_>>>()?;
                (nodes, depth)
            }
            None => {
                let depth = self.feature_depth.ok_or_else(|| {
                    SomError::UninitializedState(
                        "grid needs a feature depth or explicit weights".to_string(),
                    )
                })?;
                if depth == 0 {
                    return Err(SomError::Config("Feature depth must be non-zero".to_string()));
                }
                self.weight_init.validate(depth)?;

                let nodes = layout
                    .into_iter()
                    .map(|(_, coords)| {
                        Node::builder()
                            .coords(coords)
                            .init_weights(&self.weight_init, depth, &mut rng)?
                            .build()
                    })
                    .collect::<Result<Vec<_>>>()?;
                (nodes, depth)
            }
        };

        Ok(Grid {
            topology: self.topology,
            nodes,
            feature_depth,
            bmu_distance: self.bmu_distance.unwrap_or_else(|| Box::new(SquaredDistance)),
            neighborhood_distance: self
                .neighborhood_distance
                .unwrap_or_else(|| Box::new(EuclideanNorm)),
            rng,
        })
    }
}
