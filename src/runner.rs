use crate::grid::GridData;
use crate::simulation::PsoSimulation;
use geoptimize_common::{EngineError, SimulationConfig, Snapshot};
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Driver-level handle around one simulation at a time. A background
/// worker owns the live swarm exclusively during a run and publishes
/// immutable snapshots after every iteration; foreground readers only ever
/// see those copies.
pub struct SimulationRunner {
    config: SimulationConfig,
    population_grid: Option<Arc<GridData>>,
    shared: Arc<Shared>,
}

struct Shared {
    simulation: Mutex<Option<PsoSimulation>>,
    /// At most one iteration-loop worker per runner.
    running: AtomicBool,
    latest: Mutex<Option<Snapshot>>,
}

impl SimulationRunner {
    pub fn new(config: SimulationConfig) -> Self {
        SimulationRunner {
            config,
            population_grid: None,
            shared: Arc::new(Shared {
                simulation: Mutex::new(None),
                running: AtomicBool::new(false),
                latest: Mutex::new(None),
            }),
        }
    }

    /// Supplies the population weight raster used by fitness evaluation.
    pub fn set_population_grid(&mut self, grid: GridData) {
        self.population_grid = Some(Arc::new(grid));
    }

    /// Constructs a fresh simulation from the current configuration,
    /// replacing any previous one wholesale. Fails if the population grid
    /// has not been supplied or a parameter is invalid, and with
    /// `AlreadyRunning` while an iteration worker is active — the worker
    /// keeps exclusive ownership of the live simulation until it finishes.
    pub fn new_simulation(&self) -> Result<(), EngineError> {
        if self.shared.running.load(Ordering::Acquire) {
            return Err(EngineError::AlreadyRunning);
        }
        let grid = self
            .population_grid
            .clone()
            .ok_or_else(|| EngineError::Configuration("population grid not set".to_string()))?;

        let simulation = PsoSimulation::new(&self.config, grid)?;
        debug!("Created simulation: region {:?}", self.config.region);

        *lock(&self.shared.simulation) = Some(simulation);
        *lock(&self.shared.latest) = None;
        Ok(())
    }

    /// Advances the simulation by a single iteration and publishes the
    /// resulting snapshot. Used by drivers that own their own cadence.
    pub fn step(&self) -> Result<Snapshot, EngineError> {
        let include_particles = self.config.output.save_particles_in_snapshot;
        let snapshot = {
            let mut guard = lock(&self.shared.simulation);
            let simulation = guard.as_mut().ok_or(EngineError::UninitializedSimulation)?;
            simulation.step();
            simulation.snapshot(include_particles)
        };
        *lock(&self.shared.latest) = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Spawns the iteration-loop worker, which steps the simulation until
    /// the configured iteration budget is exhausted, invoking `observer`
    /// with each published snapshot and pausing `step_delay_ms` between
    /// iterations so the display layer can refresh.
    ///
    /// Fails with `AlreadyRunning` while a previous worker is active; the
    /// active run is unaffected. The returned handle joins to the worker's
    /// result.
    pub fn run<F>(&self, observer: F) -> Result<JoinHandle<Result<(), EngineError>>, EngineError>
    where
        F: Fn(&Snapshot) + Send + 'static,
    {
        if lock(&self.shared.simulation).is_none() {
            return Err(EngineError::UninitializedSimulation);
        }
        if self
            .shared
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(EngineError::AlreadyRunning);
        }

        let shared = Arc::clone(&self.shared);
        let n_iterations = self.config.swarm.n_iterations;
        let step_delay = Duration::from_millis(self.config.timing.step_delay_ms);
        let include_particles = self.config.output.save_particles_in_snapshot;

        let handle = thread::spawn(move || {
            let result = run_loop(&shared, n_iterations, step_delay, include_particles, observer);
            shared.running.store(false, Ordering::Release);
            result
        });
        Ok(handle)
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// The most recently published snapshot, if any.
    pub fn latest_snapshot(&self) -> Option<Snapshot> {
        lock(&self.shared.latest).clone()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
}

fn run_loop<F>(
    shared: &Shared,
    n_iterations: u32,
    step_delay: Duration,
    include_particles: bool,
    observer: F,
) -> Result<(), EngineError>
where
    F: Fn(&Snapshot),
{
    loop {
        let snapshot = {
            let mut guard = lock(&shared.simulation);
            let simulation = guard.as_mut().ok_or(EngineError::UninitializedSimulation)?;
            if simulation.current_iteration() >= n_iterations {
                info!(
                    "Run complete after {} iterations, best fitness {}",
                    simulation.current_iteration(),
                    simulation.global_best().fitness
                );
                return Ok(());
            }
            simulation.step();
            simulation.snapshot(include_particles)
        };

        *lock(&shared.latest) = Some(snapshot.clone());
        observer(&snapshot);

        if !step_delay.is_zero() {
            thread::sleep(step_delay);
        }
    }
}

// A poisoned lock means a panic inside step(), which the design treats as
// a programmer error rather than a recoverable condition.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
