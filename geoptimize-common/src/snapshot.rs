use serde::{Deserialize, Serialize};

/// An immutable snapshot of the observable simulation state, published
/// after each iteration for display and recording. Readers only ever see
/// these copies; the live swarm is owned by the iteration worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// The number of completed iterations when the snapshot was taken.
    pub iteration: u32,
    /// Fitness of the best solution any particle has visited so far.
    pub best_fitness: f32,
    /// Node positions of the global best solution.
    pub best_nodes: Vec<(i32, i32)>,
    /// Fitness of each particle's current solution, by particle index.
    pub particle_fitness: Vec<f32>,
    /// Optional: current node positions of every particle.
    /// Included only if `output.save_particles_in_snapshot` is true.
    #[serde(skip_serializing_if = "Option::is_none")] // Don't write "particle_nodes": null
    pub particle_nodes: Option<Vec<Vec<(i32, i32)>>>,
}
