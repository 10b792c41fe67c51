use crate::grid::GridData;
use crate::solution::PsoSolution;
use geoptimize_common::{FitnessVariant, Region};
use std::sync::Arc;

/// Scores a placement as the total population weight covered by at least
/// one service node.
///
/// The coverage rule is identical across implementations: a pixel is
/// covered iff it lies strictly within some node's circle
/// (`dist^2 < range^2`; pixels exactly on the boundary are not covered),
/// and a covered pixel contributes `grid.get(x, y)` exactly once no matter
/// how many nodes overlap it. Implementations differ only in how the pixel
/// scan is organised, never in the value produced.
pub trait FitnessFunction: Send + Sync {
    fn calc_fitness(&self, solution: &PsoSolution) -> f32;
}

/// Builds the fitness evaluator selected in the configuration.
pub fn build_fitness(
    variant: FitnessVariant,
    grid: Arc<GridData>,
    region: Region,
) -> Box<dyn FitnessFunction> {
    match variant {
        FitnessVariant::Full => Box::new(FullScanFitness::new(grid, region)),
        FitnessVariant::Fast => Box::new(FastFitness::new(grid, region)),
    }
}

/// Reference evaluator: scans every pixel of the region and checks it
/// against every node. O(region area * nodes).
pub struct FullScanFitness {
    grid: Arc<GridData>,
    region: Region,
}

impl FullScanFitness {
    pub fn new(grid: Arc<GridData>, region: Region) -> Self {
        FullScanFitness { grid, region }
    }
}

impl FitnessFunction for FullScanFitness {
    fn calc_fitness(&self, solution: &PsoSolution) -> f32 {
        let mut fitness = 0.0;
        for y in self.region.min_y()..self.region.max_y() {
            for x in self.region.min_x()..self.region.max_x() {
                let covered = solution.nodes.iter().any(|n| {
                    let dx = (x - n.x) as f32;
                    let dy = (y - n.y) as f32;
                    dx * dx + dy * dy < n.range * n.range
                });
                if covered {
                    fitness += self.grid.get(x, y);
                }
            }
        }
        fitness
    }
}

/// Optimized evaluator: restricts the scan to each node's bounding square
/// (clipped to the region), marking covered pixels in a set before a
/// single accumulation pass. Marking rather than accumulating is what
/// keeps overlapping nodes from double-counting a pixel.
/// O(range^2 * nodes + region area).
pub struct FastFitness {
    grid: Arc<GridData>,
    region: Region,
}

impl FastFitness {
    pub fn new(grid: Arc<GridData>, region: Region) -> Self {
        FastFitness { grid, region }
    }
}

impl FitnessFunction for FastFitness {
    fn calc_fitness(&self, solution: &PsoSolution) -> f32 {
        let width = self.region.width as usize;
        let height = self.region.height as usize;
        let mut covered = vec![false; width * height];

        for n in &solution.nodes {
            if n.range <= 0.0 {
                continue;
            }
            let reach = n.range.ceil() as i32;
            let x_lo = (n.x - reach).max(self.region.min_x());
            let x_hi = (n.x + reach + 1).min(self.region.max_x());
            let y_lo = (n.y - reach).max(self.region.min_y());
            let y_hi = (n.y + reach + 1).min(self.region.max_y());
            let range_sq = n.range * n.range;

            for y in y_lo..y_hi {
                for x in x_lo..x_hi {
                    let dx = (x - n.x) as f32;
                    let dy = (y - n.y) as f32;
                    if dx * dx + dy * dy < range_sq {
                        let rx = (x - self.region.x) as usize;
                        let ry = (y - self.region.y) as usize;
                        covered[ry * width + rx] = true;
                    }
                }
            }
        }

        let mut fitness = 0.0;
        for ry in 0..height {
            for rx in 0..width {
                if covered[ry * width + rx] {
                    fitness += self
                        .grid
                        .get(self.region.x + rx as i32, self.region.y + ry as i32);
                }
            }
        }
        fitness
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solution::ServiceNode;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn uniform_grid(width: u32, height: u32) -> Arc<GridData> {
        let weights = vec![1.0; (width * height) as usize];
        Arc::new(GridData::from_weights(width, height, weights).unwrap())
    }

    fn solution_of(nodes: Vec<ServiceNode>) -> PsoSolution {
        PsoSolution {
            nodes,
            fitness: f32::MIN,
        }
    }

    #[test]
    fn single_node_covers_strict_interior_only() {
        // dist^2 < 4 around (2, 2) is exactly the 3x3 pixel block; the four
        // pixels on the boundary circle itself are excluded.
        let region = Region::new(0, 0, 5, 5);
        let grid = uniform_grid(5, 5);
        let solution = solution_of(vec![ServiceNode::new(2, 2, 2.0)]);

        for fitness in [
            FullScanFitness::new(grid.clone(), region).calc_fitness(&solution),
            FastFitness::new(grid.clone(), region).calc_fitness(&solution),
        ] {
            assert_eq!(fitness, 9.0);
        }
    }

    #[test]
    fn overlapping_nodes_do_not_double_count() {
        let region = Region::new(0, 0, 10, 10);
        let grid = uniform_grid(10, 10);
        let single = solution_of(vec![ServiceNode::new(5, 5, 3.0)]);
        let doubled = solution_of(vec![ServiceNode::new(5, 5, 3.0), ServiceNode::new(5, 5, 3.0)]);

        let full = FullScanFitness::new(grid.clone(), region);
        let fast = FastFitness::new(grid.clone(), region);
        assert_eq!(full.calc_fitness(&single), full.calc_fitness(&doubled));
        assert_eq!(fast.calc_fitness(&single), fast.calc_fitness(&doubled));
    }

    #[test]
    fn zero_range_contributes_nothing() {
        let region = Region::new(0, 0, 8, 8);
        let grid = uniform_grid(8, 8);
        let solution = solution_of(vec![ServiceNode::new(4, 4, 0.0)]);

        assert_eq!(FullScanFitness::new(grid.clone(), region).calc_fitness(&solution), 0.0);
        assert_eq!(FastFitness::new(grid, region).calc_fitness(&solution), 0.0);
    }

    #[test]
    fn empty_solution_scores_zero() {
        let region = Region::new(0, 0, 8, 8);
        let grid = uniform_grid(8, 8);
        let solution = solution_of(Vec::new());

        assert_eq!(FullScanFitness::new(grid.clone(), region).calc_fitness(&solution), 0.0);
        assert_eq!(FastFitness::new(grid, region).calc_fitness(&solution), 0.0);
    }

    #[test]
    fn variants_agree_on_random_solutions() {
        // Non-uniform weights, an offset region, and nodes that spill past
        // the region edge exercise the clipping in the fast variant.
        let width = 24u32;
        let height = 20u32;
        let weights: Vec<f32> = (0..width * height).map(|i| (i % 13) as f32).collect();
        let grid = Arc::new(GridData::from_weights(width, height, weights).unwrap());
        let region = Region::new(3, 2, 18, 15);

        let full = FullScanFitness::new(grid.clone(), region);
        let fast = FastFitness::new(grid.clone(), region);

        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..25 {
            let solution = PsoSolution::create_random(4, 5.5, region, &mut rng);
            assert_eq!(full.calc_fitness(&solution), fast.calc_fitness(&solution));
        }
    }
}
