//! report.rs — text and JSON renderings of a simulation run
//!
//! The text layout follows the console report operators are used to:
//! tolerance windows, timing, run/found counts, then found positions beside
//! the nearest actual object.

use std::fmt;

use serde::Serialize;

use sonar_types::{ArrayGeometry, ArrivalTimes, ReceiverRole, Vec3};

use crate::matcher::MatchReport;

/// One found position paired with the closest actual object
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TruthMatch {
    pub found: Vec3,
    pub nearest: Vec3,
    pub error_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Accuracy {
    pub matches: Vec<TruthMatch>,
    pub mean_error_m: f64,
    pub max_error_m: f64,
    /// Actual objects that are nobody's nearest match
    pub unresolved: usize,
}

/// Compare found positions against ground truth. `None` without truth.
pub fn accuracy(found: &[Vec3], truth: &[Vec3]) -> Option<Accuracy> {
    if truth.is_empty() {
        return None;
    }
    let mut claimed = vec![false; truth.len()];
    let matches: Vec<TruthMatch> = found
        .iter()
        .map(|f| {
            let (idx, nearest) = truth
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| a.dist(f).total_cmp(&b.dist(f)))
                .map(|(i, p)| (i, *p))
                .unwrap_or((0, truth[0]));
            claimed[idx] = true;
            TruthMatch { found: *f, nearest, error_m: nearest.dist(f) }
        })
        .collect();

    let max_error_m = matches.iter().map(|m| m.error_m).fold(0.0, f64::max);
    let mean_error_m = if matches.is_empty() {
        0.0
    } else {
        matches.iter().map(|m| m.error_m).sum::<f64>() / matches.len() as f64
    };
    let unresolved = claimed.iter().filter(|c| !**c).count();

    Some(Accuracy { matches, mean_error_m, max_error_m, unresolved })
}

/// Everything needed to report one simulation run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary<'a> {
    pub geometry: &'a ArrayGeometry,
    pub report: &'a MatchReport,
    pub truth: &'a [Vec3],
    pub accuracy: Option<Accuracy>,
}

impl<'a> RunSummary<'a> {
    pub fn new(geometry: &'a ArrayGeometry, report: &'a MatchReport, truth: &'a [Vec3]) -> Self {
        let accuracy = accuracy(&report.points(), truth);
        Self { geometry, report, truth, accuracy }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for RunSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.report;
        let rule = "-".repeat(72);

        writeln!(f, "--- Detection Accuracy Simulation Results ---")?;
        write!(f, "Receivers :")?;
        for role in ReceiverRole::ALL {
            let p = self.geometry.receiver(role);
            write!(f, "  ({:.2}, {:.2}, {:.2})", p.x, p.y, p.z)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "Windows   : {:>12.4e} {:>12.4e} {:>12.4e} s",
            r.windows[0], r.windows[1], r.windows[2]
        )?;
        writeln!(f, "Time      : {:.3} ms", r.elapsed.as_secs_f64() * 1e3)?;
        writeln!(f, "Runs      : {}", r.run_count)?;
        writeln!(f, "Found     : {} of {}", r.found_count, self.truth.len())?;
        writeln!(f, "Duplicates: {}", r.duplicate_count)?;
        writeln!(f, "{rule}")?;
        writeln!(
            f,
            " {:>3} | {:>9} {:>9} {:>9} | {:>9} {:>9} {:>9} | {:>7}",
            "#", "X", "Y", "Z", "act X", "act Y", "act Z", "err"
        )?;
        writeln!(f, "{rule}")?;

        for (i, p) in r.positions.iter().enumerate() {
            let found = p.position;
            write!(f, " {:>3} | {:>9.3} {:>9.3} {:>9.3} |", i + 1, found.x, found.y, found.z)?;
            match self.accuracy.as_ref().and_then(|a| a.matches.get(i)) {
                Some(m) => {
                    let n = m.nearest;
                    writeln!(f, " {:>9.3} {:>9.3} {:>9.3} | {:>7.3}", n.x, n.y, n.z, m.error_m)?
                }
                None => writeln!(f)?,
            }
        }
        writeln!(f, "{rule}")?;

        if let Some(a) = &self.accuracy {
            writeln!(
                f,
                "Error     : mean {:.3} m, max {:.3} m, unresolved {}",
                a.mean_error_m, a.max_error_m, a.unresolved
            )?;
        }
        Ok(())
    }
}

/// Manual single-target query result
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TargetTimes {
    pub position: Vec3,
    pub exact: ArrivalTimes,
    pub quantized: ArrivalTimes,
    pub resolved_exact: Option<Vec3>,
    pub resolved_quantized: Option<Vec3>,
}

impl fmt::Display for TargetTimes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.position;
        writeln!(f, "Target    : ({:.3}, {:.3}, {:.3})", p.x, p.y, p.z)?;
        writeln!(f, " {:<10} | {:>14} | {:>14}", "receiver", "exact (s)", "quantized (s)")?;
        for role in ReceiverRole::ALL {
            writeln!(
                f,
                " {:<10} | {:>14.9} | {:>14.9}",
                format!("{role:?}"),
                self.exact.get(role),
                self.quantized.get(role)
            )?;
        }
        for (label, resolved) in [("exact", self.resolved_exact), ("quantized", self.resolved_quantized)] {
            match resolved {
                Some(r) => writeln!(
                    f,
                    "Resolved ({label}): ({:.3}, {:.3}, {:.3}), error {:.4} m",
                    r.x, r.y, r.z, r.dist(&p)
                )?,
                None => writeln!(f, "Resolved ({label}): no solution")?,
            }
        }
        Ok(())
    }
}
