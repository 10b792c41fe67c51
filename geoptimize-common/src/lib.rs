pub mod config;
pub mod error;
pub mod region;
pub mod snapshot;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use config::{FitnessVariant, OutputConfig, RasterConfig, SimulationConfig, SwarmConfig, TimingConfig};
pub use error::EngineError;
pub use region::Region;
pub use snapshot::Snapshot;
pub use vecmath::{clamp, Vec2};
