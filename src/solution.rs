use geoptimize_common::Region;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A single service node placement: an integer position inside the region
/// and a fixed coverage radius.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceNode {
    pub x: i32,
    pub y: i32,
    pub range: f32,
}

impl ServiceNode {
    pub fn new(x: i32, y: i32, range: f32) -> Self {
        ServiceNode { x, y, range }
    }
}

/// An ordered, fixed-length placement of all service nodes plus its cached
/// fitness. Index identifies which node is which across the whole swarm.
///
/// `Clone` is a deep copy: nodes are plain `Copy` values, so cloning a
/// solution duplicates every node. No two solutions ever share a node, so
/// moving one particle can never corrupt another's recorded best.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsoSolution {
    pub nodes: Vec<ServiceNode>,
    pub fitness: f32,
}

impl PsoSolution {
    /// Places every node independently uniform over the region's integer
    /// coordinates. Fitness starts at the minimum representable value so
    /// that any real evaluation supersedes it on first comparison.
    pub fn create_random<R: Rng>(n_nodes: usize, range: f32, region: Region, rng: &mut R) -> Self {
        let nodes = (0..n_nodes)
            .map(|_| {
                ServiceNode::new(
                    rng.random_range(region.min_x()..=region.max_x()),
                    rng.random_range(region.min_y()..=region.max_y()),
                    range,
                )
            })
            .collect();
        PsoSolution {
            nodes,
            fitness: f32::MIN,
        }
    }

    /// Node positions as plain tuples, for snapshot publication.
    pub fn node_positions(&self) -> Vec<(i32, i32)> {
        self.nodes.iter().map(|n| (n.x, n.y)).collect()
    }
}
