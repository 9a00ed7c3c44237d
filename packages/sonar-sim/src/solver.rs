//! solver.rs — closed-form four-receiver position solver
//!
//! Every receiver i defines an ellipse with foci at the emitter and at R_i:
//!   ‖P‖ + ‖P − R_i‖ = t_i · c
//! and the reference round trip fixes a sphere ‖P‖ = r, r = t_ref · c / 2.
//! Intersecting each ellipse with that sphere pins one coordinate along the
//! receiver's axis.
//!
//! Stages (order matters, an early miss skips the rest):
//!   A. LateralA ellipse ∩ sphere → x candidates with in-plane radius
//!   B. LateralB ellipse ∩ sphere → x candidates
//!   ×. A and B must agree on x within `tol`, else no solution
//!   C. Vertical ellipse ∩ sphere → z candidates
//!   ○. Two circle estimates of y must agree within `tol`
//!
//! All scratch state is a plain stack value per call; a `Solver` can be
//! shared freely between threads.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use sonar_types::{ArrayGeometry, ArrivalTimes, ReceiverRole, Vec3, SPEED_OF_SOUND_WATER};

// ── Ellipse–circle primitive ──────────────────────────────────────────────────

/// Intersect an ellipse and a circle centred on one of its foci.
///
/// - `a`: half the focal separation (signed, along the focal axis)
/// - `b`: squared half path length, (t · c / 2)²
/// - `c`: squared circle radius
///
/// Returns `[x₁, x₂]`, the "minus" and "plus" roots, in that order. Callers
/// try both; neither is guaranteed to be the larger. `None` when the
/// discriminant is negative or the foci coincide.
pub fn ce_intersect(a: f64, b: f64, c: f64) -> Option<[f64; 2]> {
    if a == 0.0 {
        return None;
    }
    let d0 = a * a * c / b;
    if d0.is_nan() || d0 < 0.0 {
        return None;
    }
    let d = b * d0.sqrt();
    let a2 = a * a;
    let a3 = a2 * a;
    Some([(a3 - d - a * b) / a2, (a3 + d - a * b) / a2])
}

// ── Stage state ───────────────────────────────────────────────────────────────

/// One intersection root along a receiver axis, with the radius of the
/// circle left for the other two coordinates (when real).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Root {
    pub x: f64,
    pub paired: Option<f64>,
}

/// Ellipse parameters and roots for one receiver
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stage {
    pub role: ReceiverRole,
    pub a: f64,
    pub b: f64,
    /// `None` when the ellipse misses the sphere
    pub roots: Option<[Root; 2]>,
}

impl Stage {
    fn build(geometry: &ArrayGeometry, role: ReceiverRole, t: f64, r2: f64) -> Self {
        let a = geometry.offset(role) / 2.0;
        let b = (t * SPEED_OF_SOUND_WATER / 2.0).powi(2);
        let roots = ce_intersect(a, b, r2).map(|xs| {
            xs.map(|x| {
                let rem = r2 - x * x;
                Root { x, paired: (rem >= 0.0).then(|| rem.sqrt()) }
            })
        });
        Self { role, a, b, roots }
    }

    fn candidates(&self) -> impl Iterator<Item = Root> + '_ {
        self.roots.iter().flatten().copied()
    }
}

/// Circle–circle agreement test for one stage-C root
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CircleCheck {
    pub z: f64,
    /// y from the provisional in-plane circle, √(y_prov² − z²)
    pub p: Option<f64>,
    /// y from the vertical circle, √(paired² − x_prov²)
    pub q: Option<f64>,
    pub agreed: bool,
}

/// Every intermediate quantity of one resolution
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SolveTrace {
    pub times: ArrivalTimes,
    pub tolerance: f64,
    pub r2: f64,
    /// A, B, C in order; `None` for a stage never reached
    pub stages: [Option<Stage>; 3],
    /// Agreed (x, y) from stages A and B
    pub provisional: Option<(f64, f64)>,
    pub circle_checks: [Option<CircleCheck>; 2],
    pub result: Option<Vec3>,
}

// ── Solver ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Solver<'g> {
    geometry: &'g ArrayGeometry,
    tolerance: f64,
    debug: bool,
}

impl<'g> Solver<'g> {
    pub fn new(geometry: &'g ArrayGeometry, tolerance: f64) -> Self {
        Self { geometry, tolerance, debug: false }
    }

    /// Log the full stage table for every call (DEBUG level)
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn geometry(&self) -> &ArrayGeometry { self.geometry }

    pub fn solve(&self, times: &ArrivalTimes) -> Option<Vec3> {
        let trace = self.solve_traced(times);
        if self.debug {
            debug!("\n{trace}");
        }
        trace.result
    }

    pub fn solve_traced(&self, times: &ArrivalTimes) -> SolveTrace {
        let tol = self.tolerance;
        let r2 = (times.reference * SPEED_OF_SOUND_WATER / 2.0).powi(2);
        let mut trace = SolveTrace {
            times: *times,
            tolerance: tol,
            r2,
            stages: [None; 3],
            provisional: None,
            circle_checks: [None; 2],
            result: None,
        };

        let stage_a = Stage::build(self.geometry, ReceiverRole::LateralA, times.lateral_a, r2);
        let stage_b = Stage::build(self.geometry, ReceiverRole::LateralB, times.lateral_b, r2);
        trace.stages[0] = Some(stage_a);
        trace.stages[1] = Some(stage_b);

        trace.provisional = cross_check(&stage_a, &stage_b, tol);
        let Some(provisional) = trace.provisional else {
            return trace;
        };

        let stage_c = Stage::build(self.geometry, ReceiverRole::Vertical, times.vertical, r2);
        trace.stages[2] = Some(stage_c);
        (trace.circle_checks, trace.result) = circle_check(&stage_c, provisional, tol);

        trace
    }
}

/// Pair stage-A and stage-B roots whose x agree within `tol`. A root at
/// x = 0 or with no real in-plane radius is never provisional. The last
/// agreeing pair wins.
fn cross_check(stage_a: &Stage, stage_b: &Stage, tol: f64) -> Option<(f64, f64)> {
    let mut provisional = None;
    for ra in stage_a.candidates() {
        let Some(ya) = ra.paired else { continue };
        if ra.x == 0.0 {
            continue;
        }
        let window = (ra.x - tol)..=(ra.x + tol);
        for rb in stage_b.candidates() {
            if window.contains(&rb.x) {
                provisional = Some((ra.x, ya));
            }
        }
    }
    provisional
}

/// Test each stage-C root against the provisional (x, y). The last
/// agreeing root sets the result.
fn circle_check(
    stage_c: &Stage,
    (px, py): (f64, f64),
    tol: f64,
) -> ([Option<CircleCheck>; 2], Option<Vec3>) {
    let mut checks = [None; 2];
    let mut result = None;
    for (slot, rc) in stage_c.candidates().enumerate() {
        let Some(pc) = rc.paired else { continue };
        let p_sq = py * py - rc.x * rc.x;
        let q_sq = pc * pc - px * px;
        let mut check = CircleCheck {
            z: rc.x,
            p: (p_sq >= 0.0).then(|| p_sq.sqrt()),
            q: (q_sq >= 0.0).then(|| q_sq.sqrt()),
            agreed: false,
        };
        if let (Some(p), Some(q)) = (check.p, check.q) {
            if ((q - tol)..=(q + tol)).contains(&p) {
                check.agreed = true;
                result = Some(Vec3::new(px, (p + q) / 2.0, rc.x));
            }
        }
        checks[slot] = Some(check);
    }
    (checks, result)
}

/// Resolve one quadruple of arrival times into a position.
pub fn resolve_position(
    times: &ArrivalTimes,
    geometry: &ArrayGeometry,
    tolerance: f64,
    debug: bool,
) -> Option<Vec3> {
    Solver::new(geometry, tolerance).with_debug(debug).solve(times)
}

// ── Debug table ───────────────────────────────────────────────────────────────

fn opt(v: Option<f64>) -> String {
    v.map_or_else(|| "undef".to_string(), |v| format!("{v:.4}"))
}

impl fmt::Display for SolveTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "+".to_string() + &"-".repeat(70) + "+";
        writeln!(f, "{rule}")?;
        writeln!(
            f,
            "| resolve  t: {:.7} {:.7} {:.7} {:.7}  tol: {}",
            self.times.reference, self.times.lateral_a, self.times.lateral_b, self.times.vertical,
            self.tolerance
        )?;
        writeln!(f, "|          r²: {:.4}", self.r2)?;
        for stage in &self.stages {
            writeln!(f, "{rule}")?;
            let Some(stage) = stage else {
                writeln!(f, "| (stage not reached)")?;
                continue;
            };
            writeln!(f, "| [{:?}]  a: {:.4}  b: {:.4}", stage.role, stage.a, stage.b)?;
            match stage.roots {
                None => writeln!(f, "| - no intersection")?,
                Some(roots) => {
                    for (i, root) in roots.iter().enumerate() {
                        let mark = if root.paired.is_some() { '+' } else { '-' };
                        writeln!(f, "| {mark} x{}: {:>14.4}  paired: {}", i + 1, root.x, opt(root.paired))?;
                    }
                }
            }
        }
        writeln!(f, "{rule}")?;
        match self.provisional {
            None => writeln!(f, "| - lateral stages disagree")?,
            Some((x, y)) => writeln!(f, "| + provisional  x: {x:.4}  y: {y:.4}")?,
        }
        for check in self.circle_checks.iter().flatten() {
            let mark = if check.agreed { '+' } else { '-' };
            writeln!(f, "| {mark} z: {:.4}  p: {}  q: {}", check.z, opt(check.p), opt(check.q))?;
        }
        match self.result {
            Some(p) => writeln!(f, "| = x: {:.4}  y: {:.4}  z: {:.4}", p.x, p.y, p.z)?,
            None => writeln!(f, "| = unresolved")?,
        }
        write!(f, "{rule}")
    }
}
