use thiserror::Error;

/// Errors reported synchronously by the engine to the caller of the
/// operation that triggered them. Per-iteration fitness evaluation is a
/// pure numeric computation and has no error path of its own.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The population grid is missing, or a region / swarm parameter is
    /// non-positive. Raised at simulation construction.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// `step()` was invoked before a simulation was constructed.
    #[error("no simulation has been created")]
    UninitializedSimulation,

    /// A new iteration-loop worker was requested while a previous one for
    /// the same simulation is still active.
    #[error("a simulation run is already in progress")]
    AlreadyRunning,

    /// A loaded raster uses a pixel encoding the grid accessor cannot
    /// interpret as a scalar weight.
    #[error("unsupported raster format: {0}")]
    InvalidRasterFormat(String),
}
