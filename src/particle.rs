use crate::fitness::FitnessFunction;
use crate::solution::PsoSolution;
use geoptimize_common::vecmath::clamp;
use geoptimize_common::{Region, SwarmConfig, Vec2};
use rand::Rng;

/// Positional differences are clamped to this magnitude before the best
/// weights and random multipliers are applied, so a particle far from a
/// best cannot be launched across the whole region in one step.
const ACCEL_CLAMP: f32 = 150.0;

/// One swarm member: a current solution, the best solution this particle
/// has ever visited, and per-node velocity/inertia state.
///
/// Invariant: `local_best.fitness` is a monotone ratchet over every
/// `current.fitness` this particle has observed.
#[derive(Debug, Clone)]
pub struct PsoParticle {
    current: PsoSolution,
    local_best: PsoSolution,
    velocities: Vec<Vec2>,
    inertias: Vec<f32>,
    local_best_weight: f32,
    global_best_weight: f32,
    range: f32,
    region: Region,
}

impl PsoParticle {
    /// Creates a particle with uniform-random node placement and zero
    /// initial velocity. The local best starts as a deep copy of the
    /// (not yet evaluated) current solution.
    pub fn new<R: Rng>(swarm: &SwarmConfig, region: Region, rng: &mut R) -> Self {
        let n_nodes = swarm.n_nodes as usize;
        let current = PsoSolution::create_random(n_nodes, swarm.range, region, rng);
        let local_best = current.clone();
        PsoParticle {
            current,
            local_best,
            velocities: vec![Vec2::zero(); n_nodes],
            inertias: vec![swarm.inertia; n_nodes],
            local_best_weight: swarm.local_best_weight,
            global_best_weight: swarm.global_best_weight,
            range: swarm.range,
            region,
        }
    }

    pub fn current(&self) -> &PsoSolution {
        &self.current
    }

    pub fn local_best(&self) -> &PsoSolution {
        &self.local_best
    }

    pub fn velocities(&self) -> &[Vec2] {
        &self.velocities
    }

    pub fn range(&self) -> f32 {
        self.range
    }

    /// Steps the current solution towards the particle's own best and the
    /// swarm's best. Algorithm from http://tracer.uc3m.es/tws/pso/basics.html
    /// with a binary stochastic multiplier (0 or 1) drawn independently per
    /// axis per term. Velocities persist across calls.
    pub fn step<R: Rng>(&mut self, global_best: &PsoSolution, rng: &mut R) {
        for i in 0..self.current.nodes.len() {
            let cur = self.current.nodes[i];
            let lbest = self.local_best.nodes[i];
            let gbest = global_best.nodes[i];
            let v = &mut self.velocities[i];

            v.x = self.inertias[i] * v.x
                + self.local_best_weight
                    * rand_bit(rng)
                    * clamp((lbest.x - cur.x) as f32, -ACCEL_CLAMP, ACCEL_CLAMP)
                + self.global_best_weight
                    * rand_bit(rng)
                    * clamp((gbest.x - cur.x) as f32, -ACCEL_CLAMP, ACCEL_CLAMP);

            v.y = self.inertias[i] * v.y
                + self.local_best_weight
                    * rand_bit(rng)
                    * clamp((lbest.y - cur.y) as f32, -ACCEL_CLAMP, ACCEL_CLAMP)
                + self.global_best_weight
                    * rand_bit(rng)
                    * clamp((gbest.y - cur.y) as f32, -ACCEL_CLAMP, ACCEL_CLAMP);

            // A velocity component never exceeds the region extent.
            v.x = clamp(v.x, -(self.region.width as f32), self.region.width as f32);
            v.y = clamp(v.y, -(self.region.height as f32), self.region.height as f32);

            let x = (cur.x as f32 + v.x) as i32;
            let y = (cur.y as f32 + v.y) as i32;

            self.current.nodes[i].x = x.clamp(self.region.min_x(), self.region.max_x());
            self.current.nodes[i].y = y.clamp(self.region.min_y(), self.region.max_y());
        }
    }

    /// Re-evaluates the current solution after a step. This is the sole
    /// mutator of the local best, which is replaced by a deep copy of the
    /// current solution on strict improvement only.
    ///
    /// The slowest part of an iteration; evaluated in parallel across
    /// particles by the simulation.
    pub fn update_fitness(&mut self, function: &dyn FitnessFunction) {
        self.current.fitness = function.calc_fitness(&self.current);

        if self.current.fitness > self.local_best.fitness {
            self.local_best = self.current.clone();
        }
    }
}

#[inline]
fn rand_bit<R: Rng>(rng: &mut R) -> f32 {
    rng.random_range(0..2) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoptimize_common::FitnessVariant;
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};

    /// RNG stub emitting a fixed word, pinning every binary multiplier to
    /// 0 (word 0) or 1 (word u32::MAX).
    struct ConstWords(u32);

    impl RngCore for ConstWords {
        fn next_u32(&mut self) -> u32 {
            self.0
        }

        fn next_u64(&mut self) -> u64 {
            ((self.0 as u64) << 32) | self.0 as u64
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            let bytes = self.0.to_le_bytes();
            for (i, b) in dest.iter_mut().enumerate() {
                *b = bytes[i % 4];
            }
        }
    }

    fn always_zero() -> ConstWords {
        ConstWords(0)
    }

    fn always_one() -> ConstWords {
        ConstWords(u32::MAX)
    }

    struct ConstFitness(f32);

    impl FitnessFunction for ConstFitness {
        fn calc_fitness(&self, _solution: &PsoSolution) -> f32 {
            self.0
        }
    }

    fn swarm_config(local_w: f32, global_w: f32, inertia: f32) -> SwarmConfig {
        SwarmConfig {
            n_nodes: 1,
            range: 10.0,
            n_particles: 1,
            n_iterations: 1,
            local_best_weight: local_w,
            global_best_weight: global_w,
            inertia,
            seed: 1,
            fitness: FitnessVariant::Fast,
        }
    }

    fn particle_at(x: i32, y: i32, region: Region, config: &SwarmConfig) -> PsoParticle {
        let mut rng = StdRng::seed_from_u64(0);
        let mut particle = PsoParticle::new(config, region, &mut rng);
        particle.current.nodes[0].x = x;
        particle.current.nodes[0].y = y;
        particle.local_best = particle.current.clone();
        particle
    }

    #[test]
    fn stationary_particle_stays_put_for_any_draws() {
        let region = Region::new(0, 0, 100, 100);
        let config = swarm_config(0.5, 0.5, 1.0);
        // Identical current, local best, and global best: all positional
        // differences are zero regardless of the random bits.
        let mut particle = particle_at(40, 60, region, &config);
        let global_best = particle.current.clone();

        particle.step(&global_best, &mut always_one());
        particle.step(&global_best, &mut StdRng::seed_from_u64(11));

        assert_eq!(particle.current.nodes[0].x, 40);
        assert_eq!(particle.current.nodes[0].y, 60);
        assert_eq!(particle.velocities[0], Vec2::zero());
    }

    #[test]
    fn velocity_follows_rule_with_pinned_bits() {
        let region = Region::new(0, 0, 1000, 1000);
        let config = swarm_config(0.3, 0.1, 1.0);
        let mut particle = particle_at(0, 0, region, &config);
        particle.local_best.nodes[0].x = 10;
        particle.local_best.nodes[0].y = 0;
        let mut global_best = particle.current.clone();
        global_best.nodes[0].x = 0;
        global_best.nodes[0].y = 20;

        particle.step(&global_best, &mut always_one());
        // vx = 0.3 * 10, vy = 0.1 * 20
        assert_eq!(particle.velocities[0], Vec2::new(3.0, 2.0));
        assert_eq!(particle.current.nodes[0].x, 3);
        assert_eq!(particle.current.nodes[0].y, 2);

        // All-zero bits keep both terms out; with no prior velocity the
        // particle does not move.
        let mut particle = particle_at(0, 0, region, &config);
        particle.local_best.nodes[0].x = 10;
        particle.step(&global_best, &mut always_zero());
        assert_eq!(particle.velocities[0], Vec2::zero());
        assert_eq!(particle.current.nodes[0].x, 0);
    }

    #[test]
    fn positional_difference_is_clamped_before_weighting() {
        let region = Region::new(0, 0, 2000, 2000);
        let config = swarm_config(0.3, 0.0, 1.0);
        let mut particle = particle_at(0, 0, region, &config);
        particle.local_best.nodes[0].x = 1000; // diff 1000, clamped to 150
        let global_best = particle.current.clone();

        particle.step(&global_best, &mut always_one());
        assert_eq!(particle.velocities[0].x, 0.3 * 150.0);
        assert_eq!(particle.current.nodes[0].x, 45);
    }

    #[test]
    fn velocity_and_position_clamp_to_region() {
        let region = Region::new(0, 0, 10, 10);
        let config = swarm_config(30.0, 0.0, 1.0);
        let mut particle = particle_at(0, 0, region, &config);
        particle.local_best.nodes[0].x = 10;
        particle.local_best.nodes[0].y = 10;
        let global_best = particle.current.clone();

        particle.step(&global_best, &mut always_one());
        // 30 * 10 = 300, clamped to the region extent.
        assert_eq!(particle.velocities[0], Vec2::new(10.0, 10.0));
        assert_eq!(particle.current.nodes[0].x, region.max_x());
        assert_eq!(particle.current.nodes[0].y, region.max_y());

        // Momentum persists: another all-zero-bit step still moves by the
        // retained velocity, but the position cannot leave the region.
        particle.step(&global_best, &mut always_zero());
        assert_eq!(particle.velocities[0], Vec2::new(10.0, 10.0));
        assert_eq!(particle.current.nodes[0].x, region.max_x());
    }

    #[test]
    fn local_best_ratchets_on_strict_improvement_only() {
        let region = Region::new(0, 0, 50, 50);
        let config = swarm_config(0.5, 0.5, 1.0);
        let mut particle = particle_at(10, 10, region, &config);

        particle.update_fitness(&ConstFitness(5.0));
        assert_eq!(particle.local_best.fitness, 5.0);
        assert_eq!(particle.local_best.nodes[0].x, 10);

        // A tie must not replace the recorded best.
        particle.current.nodes[0].x = 20;
        particle.update_fitness(&ConstFitness(5.0));
        assert_eq!(particle.local_best.nodes[0].x, 10);

        // A strict improvement does.
        particle.update_fitness(&ConstFitness(6.0));
        assert_eq!(particle.local_best.fitness, 6.0);
        assert_eq!(particle.local_best.nodes[0].x, 20);

        // And a regression never does.
        particle.current.nodes[0].x = 30;
        particle.update_fitness(&ConstFitness(1.0));
        assert_eq!(particle.local_best.fitness, 6.0);
        assert_eq!(particle.local_best.nodes[0].x, 20);
    }

    #[test]
    fn clone_is_fully_isolated() {
        let region = Region::new(0, 0, 50, 50);
        let config = swarm_config(0.5, 0.5, 1.0);
        let original = particle_at(10, 10, region, &config);

        let mut copy = original.clone();
        copy.current.nodes[0].x = 49;
        copy.local_best.nodes[0].y = 49;
        copy.velocities[0] = Vec2::new(7.0, 7.0);

        assert_eq!(original.current.nodes[0].x, 10);
        assert_eq!(original.local_best.nodes[0].y, 10);
        assert_eq!(original.velocities[0], Vec2::zero());
    }
}
