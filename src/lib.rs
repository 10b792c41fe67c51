//! Particle-swarm placement of service nodes over a population raster.
//!
//! The core is [`simulation::PsoSimulation`]: a fixed-size swarm of
//! candidate placements stepped toward the best coverage found so far.
//! [`runner::SimulationRunner`] wraps one simulation at a time behind a
//! background iteration worker that publishes immutable snapshots for the
//! display layer.

pub mod fitness;
pub mod grid;
pub mod particle;
pub mod runner;
pub mod simulation;
pub mod solution;

pub use fitness::{build_fitness, FastFitness, FitnessFunction, FullScanFitness};
pub use grid::GridData;
pub use particle::PsoParticle;
pub use runner::SimulationRunner;
pub use simulation::PsoSimulation;
pub use solution::{PsoSolution, ServiceNode};
