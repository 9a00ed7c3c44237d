//! simulation.rs — end-to-end drivers
//!
//! objects → forward model (quantized) → pooled, shuffled channels →
//! matcher → report.

use tracing::info;

use sonar_types::{ArrayGeometry, Vec3};

use crate::config::{ConfigError, FullConfig};
use crate::forward::{arrival_times, TimeMode};
use crate::matcher::{DetectionMatcher, MatchReport};
use crate::report::TargetTimes;
use crate::scenarios::detections_for;
use crate::solver::Solver;

pub struct SimulationRun {
    pub geometry: ArrayGeometry,
    /// Ground truth, in generation order
    pub objects: Vec<Vec3>,
    pub report: MatchReport,
}

/// Simulate the configured scenario and resolve every object it can.
pub fn run_simulation(cfg: &FullConfig, debug: bool) -> Result<SimulationRun, ConfigError> {
    let geometry = cfg.array.geometry()?;
    let mut rng = cfg.scenario.rng();
    let objects = cfg.scenario.objects(&mut rng)?;

    let detections = detections_for(&objects, &geometry, &mut rng);
    info!(
        objects = objects.len(),
        detections = detections.len(),
        sample_rate_hz = geometry.sample_rate_hz(),
        "simulating detections"
    );

    let report = DetectionMatcher::new(&geometry, cfg.matcher.clone())
        .with_debug(debug)
        .run(&detections);

    Ok(SimulationRun { geometry, objects, report })
}

/// Arrival times for one manually placed target, and whether they resolve.
pub fn query_target(position: Vec3, cfg: &FullConfig, debug: bool) -> Result<TargetTimes, ConfigError> {
    let geometry = cfg.array.geometry()?;
    let exact = arrival_times(&position, &geometry, TimeMode::Exact);
    let quantized = arrival_times(&position, &geometry, TimeMode::Quantized);
    let solver = Solver::new(&geometry, cfg.matcher.distance_tolerance_m).with_debug(debug);

    Ok(TargetTimes {
        position,
        exact,
        quantized,
        resolved_exact: solver.solve(&exact),
        resolved_quantized: solver.solve(&quantized),
    })
}
