use anyhow::Result;
use geoptimize_common::{SimulationConfig, Snapshot};
use geoptimize_engine::{GridData, SimulationRunner};
use log::{error, info, trace};
use std::fs::File;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Instant;

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();

    info!("Starting Geoptimize Engine (coverage placement PSO)...");

    // --- Load Configuration ---
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = SimulationConfig::load(&config_path)?;

    info!("Using {} Rayon threads.", rayon::current_num_threads());

    // --- Load Population Raster ---
    info!("Loading population raster '{}'...", config.raster.population_path);
    let raster = image::open(&config.raster.population_path)?;
    let grid = GridData::from_image(&raster)?;
    info!("Population raster loaded ({}x{}).", grid.width(), grid.height());

    // --- Initialize Simulation ---
    let n_iterations = config.swarm.n_iterations;
    let record_interval = config.timing.record_interval_steps.max(1);
    let mut runner = SimulationRunner::new(config.clone());
    runner.set_population_grid(grid);
    runner.new_simulation()?;
    info!(
        "Simulation initialized: {} particles, {} nodes, region {:?}.",
        config.swarm.n_particles, config.swarm.n_nodes, config.region
    );

    // --- Iteration Loop (background worker) ---
    info!("Starting iteration loop for {} iterations...", n_iterations);
    let start_time = Instant::now();

    let history: Arc<Mutex<Vec<Snapshot>>> = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&history);
    let handle = runner.run(move |snapshot| {
        let is_record_step =
            snapshot.iteration % record_interval == 0 || snapshot.iteration == n_iterations;
        if is_record_step {
            info!(
                "Iteration [{}/{}] | Best fitness: {:.1}",
                snapshot.iteration, n_iterations, snapshot.best_fitness
            );
            recorder.lock().unwrap().push(snapshot.clone());
        } else {
            trace!(
                "Iteration [{}/{}] completed",
                snapshot.iteration,
                n_iterations
            );
        }
    })?;

    handle
        .join()
        .map_err(|_| anyhow::anyhow!("iteration worker panicked"))??;

    let total_duration = start_time.elapsed();
    info!(
        "Optimization finished in {:.3} seconds.",
        total_duration.as_secs_f64()
    );

    let final_snapshot = runner
        .latest_snapshot()
        .ok_or_else(|| anyhow::anyhow!("no snapshot was published"))?;
    info!(
        "Best placement covers {:.1} population weight with nodes at {:?}.",
        final_snapshot.best_fitness, final_snapshot.best_nodes
    );

    // --- Save Recorded History ---
    if config.output.save_history {
        let snapshots = history.lock().unwrap();
        save_history(&config, &snapshots);
    } else {
        info!("Skipping saving history as per config (save_history is false).");
    }

    // --- Save Best Node Positions ---
    if config.output.save_best_positions {
        let filename = format!("{}_best_positions.csv", config.output.base_filename);
        match csv::Writer::from_path(&filename) {
            Ok(mut writer) => {
                writer.write_record(["x", "y"])?;
                for (x, y) in &final_snapshot.best_nodes {
                    writer.write_record(&[x.to_string(), y.to_string()])?;
                }
                writer.flush()?;
                info!("Best node positions saved to {}", filename);
            }
            Err(e) => error!("Error saving CSV file '{}': {}", filename, e),
        }
    } else {
        info!("Skipping saving best positions as per config.");
    }

    info!("Done.");
    Ok(())
}

/// Writes the recorded snapshots in the configured output format.
fn save_history(config: &SimulationConfig, snapshots: &[Snapshot]) {
    let output_format = config.output.format.as_deref().unwrap_or("json");

    match output_format {
        "bincode" => {
            // Binary format (compact)
            let filename = format!("{}_history.bin", config.output.base_filename);
            match File::create(&filename) {
                Ok(file) => match bincode::serialize_into(file, snapshots) {
                    Ok(_) => info!("History saved to {} (binary format)", filename),
                    Err(e) => error!("Error serializing history to bincode: {}", e),
                },
                Err(e) => error!("Error creating history file '{}': {}", filename, e),
            }
        }
        "messagepack" => {
            // MessagePack format (compact and cross-platform)
            let filename = format!("{}_history.msgpack", config.output.base_filename);
            match File::create(&filename) {
                Ok(mut file) => match rmp_serde::encode::write(&mut file, snapshots) {
                    Ok(_) => info!("History saved to {} (MessagePack format)", filename),
                    Err(e) => error!("Error serializing history to MessagePack: {}", e),
                },
                Err(e) => error!("Error creating history file '{}': {}", filename, e),
            }
        }
        other => {
            if other != "json" {
                error!("Unknown output format: {}. Using JSON instead.", other);
            }
            let filename = format!("{}_history.json", config.output.base_filename);
            match File::create(&filename) {
                Ok(mut file) => match serde_json::to_string(snapshots) {
                    Ok(json_string) => {
                        if let Err(e) = file.write_all(json_string.as_bytes()) {
                            error!("Error writing history JSON to file '{}': {}", filename, e);
                        } else {
                            info!("History saved to {}", filename);
                        }
                    }
                    Err(e) => error!("Error serializing history to JSON: {}", e),
                },
                Err(e) => error!("Error creating history file '{}': {}", filename, e),
            }
        }
    }
}
