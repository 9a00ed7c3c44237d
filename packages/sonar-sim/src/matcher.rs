//! matcher.rs — assign pooled per-receiver detections to physical objects
//!
//! Input: four unlabeled time lists, one per receiver. Output: positions of
//! the objects those detections came from.
//!
//! Search:
//!   1. Sort every channel ascending.
//!   2. For each reference time t, bound each other channel to
//!      [t − w_i, t + w_i] with w_i = |baseline_i| / c (binary search).
//!   3. Solve every quadruple in the cross-product of those windows.
//!   4. Greedy first-found-wins: an accepted, non-duplicate solution consumes
//!      its four detections so they cannot seed another object.
//!
//! Expected cost is O(N · k³) for window occupancy k instead of O(N⁴).
//! `MatchStrategy::Exhaustive` keeps the full N⁴ walk for benchmarking; both
//! strategies visit in-window quadruples in the same order and agree exactly.

use std::ops::Range;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use sonar_types::{
    ArrayGeometry, ArrivalTimes, ReceiverRole, Vec3, DEFAULT_DEDUP_TOLERANCE_M,
    DEFAULT_DISTANCE_TOLERANCE_M, RECEIVER_COUNT,
};

use crate::solver::Solver;

// ── Configuration ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Sorted channels with per-reference tolerance windows
    #[default]
    SlidingWindow,
    /// Every quadruple, window-checked in the innermost loop
    Exhaustive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Stage agreement tolerance passed to the solver (m)
    pub distance_tolerance_m: f64,
    /// Per-axis distance under which two solutions are one object (m)
    pub dedup_tolerance_m: f64,
    pub strategy: MatchStrategy,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            distance_tolerance_m: DEFAULT_DISTANCE_TOLERANCE_M,
            dedup_tolerance_m: DEFAULT_DEDUP_TOLERANCE_M,
            strategy: MatchStrategy::SlidingWindow,
        }
    }
}

// ── Input / output ────────────────────────────────────────────────────────────

/// Pooled detections, one unordered time list per receiver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Detections {
    channels: [Vec<f64>; RECEIVER_COUNT],
}

impl Detections {
    pub fn new(channels: [Vec<f64>; RECEIVER_COUNT]) -> Self {
        Self { channels }
    }

    /// Pool per-object arrival times into per-receiver lists
    pub fn from_arrivals(arrivals: &[ArrivalTimes]) -> Self {
        let channels = ReceiverRole::ALL.map(|role| arrivals.iter().map(|t| t.get(role)).collect());
        Self { channels }
    }

    pub fn channel(&self, role: ReceiverRole) -> &[f64] {
        &self.channels[role.index()]
    }

    pub fn channel_mut(&mut self, role: ReceiverRole) -> &mut Vec<f64> {
        &mut self.channels[role.index()]
    }

    /// Detections across all four channels
    pub fn len(&self) -> usize {
        self.channels.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A solution accepted as one physical object
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedPosition {
    pub position: Vec3,
    /// The quadruple it was solved from
    pub times: ArrivalTimes,
    /// 1-based solver invocation that produced it
    pub run: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchReport {
    /// In acceptance order
    pub positions: Vec<ResolvedPosition>,
    /// Solver invocations
    pub run_count: u64,
    pub found_count: usize,
    /// Successful solves rejected as near-duplicates
    pub duplicate_count: u64,
    pub elapsed: Duration,
    /// Tolerance windows for LateralA, LateralB, Vertical (s)
    pub windows: [f64; 3],
}

impl MatchReport {
    pub fn points(&self) -> Vec<Vec3> {
        self.positions.iter().map(|p| p.position).collect()
    }
}

// ── Working state ─────────────────────────────────────────────────────────────

/// One sorted receiver channel with its consumed mask
struct Channel {
    times: Vec<f64>,
    consumed: Vec<bool>,
}

impl Channel {
    fn sorted(times: &[f64]) -> Self {
        let mut times = times.to_vec();
        times.sort_by(f64::total_cmp);
        let consumed = vec![false; times.len()];
        Self { times, consumed }
    }

    /// Index range of times within [center − half, center + half]
    fn window(&self, center: f64, half: f64) -> Range<usize> {
        let lo = self.times.partition_point(|&t| t < center - half);
        let hi = self.times.partition_point(|&t| t <= center + half);
        lo..hi.max(lo)
    }
}

#[derive(Default)]
struct Tally {
    positions: Vec<ResolvedPosition>,
    run_count: u64,
    duplicate_count: u64,
}

// ── Matcher ───────────────────────────────────────────────────────────────────

pub struct DetectionMatcher<'g> {
    solver: Solver<'g>,
    config: MatchConfig,
}

impl<'g> DetectionMatcher<'g> {
    pub fn new(geometry: &'g ArrayGeometry, config: MatchConfig) -> Self {
        Self {
            solver: Solver::new(geometry, config.distance_tolerance_m),
            config,
        }
    }

    /// Forward the solver debug table for every attempted quadruple
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.solver = self.solver.with_debug(debug);
        self
    }

    pub fn run(&self, detections: &Detections) -> MatchReport {
        let start = Instant::now();
        let geometry = self.solver.geometry();
        let windows = ReceiverRole::BASELINES.map(|role| geometry.time_window(role));
        if detections.is_empty() {
            debug!("no detections to match");
            return MatchReport {
                positions: Vec::new(),
                run_count: 0,
                found_count: 0,
                duplicate_count: 0,
                elapsed: start.elapsed(),
                windows,
            };
        }
        let mut channels = ReceiverRole::ALL.map(|role| Channel::sorted(detections.channel(role)));
        let mut tally = Tally::default();

        match self.config.strategy {
            MatchStrategy::SlidingWindow => self.sliding_window(&mut channels, windows, &mut tally),
            MatchStrategy::Exhaustive => self.exhaustive(&mut channels, windows, &mut tally),
        }

        let elapsed = start.elapsed();
        info!(
            strategy = ?self.config.strategy,
            runs = tally.run_count,
            found = tally.positions.len(),
            duplicates = tally.duplicate_count,
            elapsed_ms = elapsed.as_secs_f64() * 1e3,
            "match complete"
        );

        MatchReport {
            found_count: tally.positions.len(),
            positions: tally.positions,
            run_count: tally.run_count,
            duplicate_count: tally.duplicate_count,
            elapsed,
            windows,
        }
    }

    fn sliding_window(&self, channels: &mut [Channel; RECEIVER_COUNT], windows: [f64; 3], tally: &mut Tally) {
        for i in 0..channels[0].times.len() {
            let t_ref = channels[0].times[i];
            let [wa, wb, wv] = [1, 2, 3].map(|c| channels[c].window(t_ref, windows[c - 1]));

            'scan: for j in wa {
                for k in wb.clone() {
                    for l in wv.clone() {
                        if channels[0].consumed[i] {
                            break 'scan;
                        }
                        self.attempt(channels, [i, j, k, l], tally);
                    }
                }
            }
        }
    }

    fn exhaustive(&self, channels: &mut [Channel; RECEIVER_COUNT], windows: [f64; 3], tally: &mut Tally) {
        let lens = [0, 1, 2, 3].map(|c| channels[c].times.len());
        for i in 0..lens[0] {
            for j in 0..lens[1] {
                for k in 0..lens[2] {
                    for l in 0..lens[3] {
                        let t_ref = channels[0].times[i];
                        let in_window = [j, k, l].iter().enumerate().all(|(w, &idx)| {
                            let half = windows[w];
                            ((t_ref - half)..=(t_ref + half)).contains(&channels[w + 1].times[idx])
                        });
                        if in_window {
                            self.attempt(channels, [i, j, k, l], tally);
                        }
                    }
                }
            }
        }
    }

    /// Solve one quadruple; accept and consume it unless it duplicates an
    /// earlier object.
    fn attempt(&self, channels: &mut [Channel; RECEIVER_COUNT], idx: [usize; RECEIVER_COUNT], tally: &mut Tally) {
        if channels.iter().zip(idx).any(|(ch, i)| ch.consumed[i]) {
            return;
        }

        let times = ArrivalTimes::from([0, 1, 2, 3].map(|c| channels[c].times[idx[c]]));
        tally.run_count += 1;

        let Some(position) = self.solver.solve(&times) else { return };

        let dedup = self.config.dedup_tolerance_m;
        if let Some(prior) = tally.positions.iter().find(|p| p.position.within_box(&position, dedup)) {
            tally.duplicate_count += 1;
            debug!(run = tally.run_count, ?position, prior = ?prior.position, "duplicate rejected");
            return;
        }

        for (ch, i) in channels.iter_mut().zip(idx) {
            ch.consumed[i] = true;
        }
        debug!(run = tally.run_count, ?position, "object resolved");
        tally.positions.push(ResolvedPosition { position, times, run: tally.run_count });
    }
}

/// Match pooled detections and resolve every object found.
pub fn match_and_resolve(
    detections: &Detections,
    geometry: &ArrayGeometry,
    distance_tolerance_m: f64,
    dedup_tolerance_m: f64,
) -> MatchReport {
    let config = MatchConfig { distance_tolerance_m, dedup_tolerance_m, ..MatchConfig::default() };
    DetectionMatcher::new(geometry, config).run(detections)
}
