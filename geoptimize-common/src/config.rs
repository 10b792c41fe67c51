use crate::region::Region;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

// Swarm and stepping-rule parameters, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SwarmConfig {
    /// Number of service nodes placed by every solution (fixed input).
    pub n_nodes: u32,
    /// Coverage radius shared by all service nodes, in pixels.
    pub range: f32,
    /// Number of particles in the swarm.
    pub n_particles: u32,
    /// Iteration budget for a run.
    pub n_iterations: u32,
    /// Weight of the pull towards a particle's own best solution.
    pub local_best_weight: f32,
    /// Weight of the pull towards the swarm's best solution.
    pub global_best_weight: f32,
    /// Per-node weight applied to the previous velocity.
    pub inertia: f32,
    /// Seed for the engine RNG (initial placement and stepping).
    pub seed: u64,
    #[serde(default = "default_fitness_variant")]
    pub fitness: FitnessVariant,
}

// Which fitness evaluation strategy to use. All variants produce the same
// value for the same input; they differ only in how the pixel scan is done.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FitnessVariant {
    Full,
    Fast,
}

fn default_fitness_variant() -> FitnessVariant {
    FitnessVariant::Fast
}

// Configuration for the population raster input
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RasterConfig {
    /// Path to the population weight raster (decoded to grayscale).
    pub population_path: String,
}

// Configuration for iteration-loop pacing and recording
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TimingConfig {
    /// Delay between iterations in the background worker, giving the
    /// display layer time to refresh. Zero disables pacing.
    #[serde(default)]
    pub step_delay_ms: u64,
    /// Record a snapshot every N iterations.
    #[serde(default = "default_record_interval_steps")]
    pub record_interval_steps: u32,
}

fn default_record_interval_steps() -> u32 {
    1
}

// Configuration for output settings, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub base_filename: String,
    pub save_best_positions: bool,
    pub save_history: bool,
    pub save_particles_in_snapshot: bool,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
}

// Main configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    pub region: Region,
    pub swarm: SwarmConfig,
    pub raster: RasterConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    pub output: OutputConfig,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            step_delay_ms: 0,
            record_interval_steps: 1,
        }
    }
}

impl SimulationConfig {
    /// Loads the configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        let config: SimulationConfig = toml::from_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML from '{}': {}", path_ref.display(), e))?;

        // Structural validation happens again at simulation construction;
        // failing here gives the driver an early, file-located message.
        if config.region.width <= 0 || config.region.height <= 0 {
            anyhow::bail!("region width and height must be positive.");
        }
        if config.swarm.n_nodes == 0 {
            anyhow::bail!("n_nodes must be greater than 0.");
        }
        if config.swarm.n_particles == 0 {
            anyhow::bail!("n_particles must be greater than 0.");
        }
        if config.swarm.range < 0.0 {
            anyhow::bail!("range must not be negative.");
        }

        Ok(config)
    }
}
