//! End-to-end checks: forward model → pooled detections → matcher → report.

use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

use sonar_sim::config::{FullConfig, DEFAULT_CONFIG};
use sonar_sim::report::RunSummary;
use sonar_sim::scenarios::{detections_for, preset_pair, preset_reference, ScenarioConfig};
use sonar_sim::simulation::{query_target, run_simulation};
use sonar_sim::{arrival_times, ce_intersect, match_and_resolve, resolve_position, Detections, TimeMode};
use sonar_types::{ArrayGeometry, Vec3, DEFAULT_DEDUP_TOLERANCE_M, DEFAULT_DISTANCE_TOLERANCE_M};

fn geometry() -> ArrayGeometry {
    ArrayGeometry::new(-0.15, 0.25, 0.2, 200_000).unwrap()
}

#[test]
fn single_object_round_trips_from_exact_times() {
    let g = geometry();
    let object = Vec3::new(-1.0, 10.0, 0.0);
    let t = arrival_times(&object, &g, TimeMode::Exact);

    assert!(t.lateral_a < t.reference);
    assert!(t.lateral_a < t.lateral_b);
    assert!(t.lateral_a < t.vertical);

    let p = resolve_position(&t, &g, DEFAULT_DISTANCE_TOLERANCE_M, false).expect("resolves");
    assert_abs_diff_eq!(p.x, -1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(p.y, 10.0, epsilon = 1e-6);
    assert_abs_diff_eq!(p.z, 0.0, epsilon = 1e-6);
}

#[test]
fn ellipse_intersection_matches_hand_computation() {
    // d0 = 4 * 16 / 10 = 6.4, d = 10 * sqrt(6.4)
    let d = 10.0 * 6.4_f64.sqrt();
    let [lo, hi] = ce_intersect(2.0, 10.0, 16.0).expect("positive discriminant");
    assert_abs_diff_eq!(lo, (8.0 - d - 20.0) / 4.0, epsilon = 1e-12);
    assert_abs_diff_eq!(hi, (8.0 + d - 20.0) / 4.0, epsilon = 1e-12);

    assert!(ce_intersect(2.0, 10.0, -16.0).is_none());
    assert!(ce_intersect(2.0, -10.0, 16.0).is_none());
}

#[test]
fn distant_pair_is_found_without_duplicates() {
    let g = geometry();
    let mut rng = StdRng::seed_from_u64(11);
    let detections = detections_for(&preset_pair(), &g, &mut rng);

    let report = match_and_resolve(&detections, &g, DEFAULT_DISTANCE_TOLERANCE_M, DEFAULT_DEDUP_TOLERANCE_M);
    assert_eq!(report.found_count, 2);
    assert_eq!(report.duplicate_count, 0);
}

#[test]
fn empty_channels_produce_an_empty_report() {
    let report = match_and_resolve(
        &Detections::default(),
        &geometry(),
        DEFAULT_DISTANCE_TOLERANCE_M,
        DEFAULT_DEDUP_TOLERANCE_M,
    );
    assert_eq!(report.found_count, 0);
    assert_eq!(report.run_count, 0);
    assert!(report.positions.is_empty());
}

#[test]
fn default_config_resolves_every_reference_object() {
    let cfg = FullConfig::from_toml(DEFAULT_CONFIG).unwrap();
    let run = run_simulation(&cfg, false).unwrap();

    assert_eq!(run.objects, preset_reference());
    assert_eq!(run.report.found_count, 8);

    let summary = RunSummary::new(&run.geometry, &run.report, &run.objects);
    let accuracy = summary.accuracy.as_ref().unwrap();
    assert_eq!(accuracy.unresolved, 0);
    assert!(accuracy.max_error_m < 2.5, "max error {}", accuracy.max_error_m);
    assert!(summary.to_string().contains("Found     : 8 of 8"));
}

#[test]
fn seeded_random_field_is_reproducible_and_mostly_resolved() {
    let cfg = FullConfig { scenario: ScenarioConfig::random(40, Some(7)), ..FullConfig::default() };
    let first = run_simulation(&cfg, false).unwrap();
    let second = run_simulation(&cfg, false).unwrap();

    assert_eq!(first.objects, second.objects);
    assert_eq!(first.report.points(), second.report.points());

    let close = first
        .report
        .points()
        .iter()
        .filter(|f| first.objects.iter().any(|o| o.dist(f) < 2.5))
        .count();
    assert!(close >= 30, "only {close} of 40 resolved near an actual object");
}

#[test]
fn manual_target_query_reports_both_time_modes() {
    let cfg = FullConfig::default();
    let target = query_target(Vec3::new(3.0, 8.0, 2.0), &cfg, false).unwrap();

    assert!(target.quantized.reference > target.exact.reference);
    let exact = target.resolved_exact.expect("exact times resolve");
    assert_abs_diff_eq!(exact.y, 8.0, epsilon = 1e-6);
    assert!(target.resolved_quantized.is_some());
    assert!(target.to_string().contains("Resolved (quantized)"));
}
