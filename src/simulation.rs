use crate::fitness::{build_fitness, FitnessFunction};
use crate::grid::GridData;
use crate::particle::PsoParticle;
use crate::solution::PsoSolution;
use geoptimize_common::{EngineError, Region, SimulationConfig, Snapshot};
use log::debug;
use rand::prelude::*;
use rayon::prelude::*;
use std::sync::Arc;

/// Owns the swarm, the shared global best, the fitness function, and the
/// iteration counter. One instance lives for exactly one run; the driver
/// replaces it wholesale to start over.
///
/// Invariant: after construction, `global_best.fitness` is at least every
/// particle's `local_best.fitness`.
pub struct PsoSimulation {
    particles: Vec<PsoParticle>,
    global_best: PsoSolution,
    fitness: Box<dyn FitnessFunction>,
    current_iteration: u32,
    /// Engine RNG, seeded from the config for reproducible runs.
    rng: StdRng,
}

impl PsoSimulation {
    /// Validates the configuration, places a random initial swarm, and
    /// evaluates every particle once so that the first `global_best` is
    /// selected by comparing real fitness values, never the uninitialized
    /// `f32::MIN` sentinel.
    pub fn new(config: &SimulationConfig, grid: Arc<GridData>) -> Result<Self, EngineError> {
        let region = config.region;
        validate(config, region)?;

        let mut rng = StdRng::seed_from_u64(config.swarm.seed);
        let mut particles: Vec<PsoParticle> = (0..config.swarm.n_particles)
            .map(|_| PsoParticle::new(&config.swarm, region, &mut rng))
            .collect();

        let fitness = build_fitness(config.swarm.fitness, grid, region);
        particles
            .par_iter_mut()
            .for_each(|p| p.update_fitness(fitness.as_ref()));

        // Deep copy of the best initial local best. Ties keep the earliest
        // particle, consistent with the tie policy during stepping.
        let mut global_best = particles[0].local_best().clone();
        for particle in &particles[1..] {
            if particle.local_best().fitness > global_best.fitness {
                global_best = particle.local_best().clone();
            }
        }
        debug!(
            "Initialized swarm of {} particles, initial best fitness {}",
            particles.len(),
            global_best.fitness
        );

        Ok(PsoSimulation {
            particles,
            global_best,
            fitness,
            current_iteration: 0,
            rng,
        })
    }

    /// Advances the swarm by one iteration:
    /// 1. move every particle against the global best finalized at the end
    ///    of the previous iteration,
    /// 2. re-evaluate every particle (in parallel; evaluation is pure per
    ///    particle),
    /// 3. a single serial reduction over local bests updates the global
    ///    best on strict improvement only.
    ///
    /// Updating the global best only after all particles have moved and
    /// been evaluated avoids order-dependent bias toward early-processed
    /// particles; ties never overwrite the incumbent.
    pub fn step(&mut self) {
        let global_best = self.global_best.clone();

        for particle in &mut self.particles {
            particle.step(&global_best, &mut self.rng);
        }

        let fitness = self.fitness.as_ref();
        self.particles
            .par_iter_mut()
            .for_each(|p| p.update_fitness(fitness));

        for particle in &self.particles {
            if particle.local_best().fitness > self.global_best.fitness {
                self.global_best = particle.local_best().clone();
            }
        }

        self.current_iteration += 1;
    }

    pub fn current_iteration(&self) -> u32 {
        self.current_iteration
    }

    /// The best solution any particle has visited so far.
    pub fn global_best(&self) -> &PsoSolution {
        &self.global_best
    }

    /// Read-only view of the swarm; all particle mutation stays inside
    /// `step()`.
    pub fn particles(&self) -> &[PsoParticle] {
        &self.particles
    }

    /// Copies the observable state into an immutable snapshot for
    /// publication to the display layer.
    pub fn snapshot(&self, include_particles: bool) -> Snapshot {
        let particle_nodes = if include_particles {
            Some(
                self.particles
                    .iter()
                    .map(|p| p.current().node_positions())
                    .collect(),
            )
        } else {
            None
        };

        Snapshot {
            iteration: self.current_iteration,
            best_fitness: self.global_best.fitness,
            best_nodes: self.global_best.node_positions(),
            particle_fitness: self.particles.iter().map(|p| p.current().fitness).collect(),
            particle_nodes,
        }
    }
}

fn validate(config: &SimulationConfig, region: Region) -> Result<(), EngineError> {
    if region.width <= 0 || region.height <= 0 {
        return Err(EngineError::Configuration(format!(
            "region must have positive extent, got {}x{}",
            region.width, region.height
        )));
    }
    if config.swarm.n_nodes == 0 {
        return Err(EngineError::Configuration(
            "node count must be at least 1".to_string(),
        ));
    }
    if config.swarm.n_particles == 0 {
        return Err(EngineError::Configuration(
            "particle count must be at least 1".to_string(),
        ));
    }
    if config.swarm.range < 0.0 {
        return Err(EngineError::Configuration(
            "coverage range must not be negative".to_string(),
        ));
    }
    Ok(())
}
