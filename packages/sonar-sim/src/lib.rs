//! # sonar-sim
//!
//! Multilateration engine for a four-receiver sonar array:
//! - `forward`: arrival times for a known object position
//! - `solver`: staged ellipse/circle inverse solver
//! - `matcher`: pairs unlabeled per-receiver detections into objects
//!
//! plus scenario generation, TOML config and report rendering for the
//! `sonar-sim` binary.

pub mod config;
pub mod forward;
pub mod matcher;
pub mod report;
pub mod scenarios;
pub mod simulation;
pub mod solver;

pub use forward::{arrival_times, TimeMode};
pub use matcher::{match_and_resolve, DetectionMatcher, Detections, MatchConfig, MatchReport, MatchStrategy};
pub use solver::{ce_intersect, resolve_position, Solver};
