// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extracting run statistics from a test case's combined log.
//!
//! A run may print several summary lines of the form
//!
//! ```text
//! runtime (minutes), retries, backups, steps        2.51         3         1      1170
//! ```
//!
//! one per internal sub-run. Restarts print their own. A summary line counts towards the run
//! phase if the next phase marker after it in the log is `PASS <name> run` or `FAIL <name> run`.

use regex::Regex;
use std::sync::LazyLock;

static SUMMARY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"runtime \(minutes\), retries, backups, steps\s+([\d.]+)\s+(\d+)\s+(\d+)\s+(\d+)")
        .unwrap()
});

/// The phase of a test case's execution.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// The initial run.
    Run,

    /// The restart from a photo.
    Restart,
}

impl Phase {
    /// Returns the word used in phase markers.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Run => "run",
            Phase::Restart => "restart",
        }
    }
}

/// Formats the marker line written to the combined log once a phase has been verified.
pub fn phase_marker(test_name: &str, phase: Phase, passed: bool) -> String {
    let status = if passed { "PASS" } else { "FAIL" };
    format!("{status} {test_name} {}", phase.as_str())
}

/// Statistics accumulated over the run phase of a test case.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunStatistics {
    /// Total runtime in minutes as reported by the simulation.
    pub runtime_minutes: f64,

    /// Total number of retries.
    pub retries: u64,

    /// Total number of backups.
    pub backups: u64,

    /// Total number of steps.
    pub steps: u64,

    /// The summary lines that contributed, joined with newlines. `None` if there were none.
    pub summary_text: Option<String>,
}

impl RunStatistics {
    /// Extracts run-phase statistics for `test_name` from `log`.
    ///
    /// Summary lines with no phase marker after them are ignored. A log with no summary lines
    /// yields zeroed statistics.
    pub fn extract(log: &str, test_name: &str) -> Self {
        let run_markers = [
            phase_marker(test_name, Phase::Run, true),
            phase_marker(test_name, Phase::Run, false),
        ];
        let restart_markers = [
            phase_marker(test_name, Phase::Restart, true),
            phase_marker(test_name, Phase::Restart, false),
        ];

        // Walk backwards so the next marker after each line is already known.
        let mut next_phase = None;
        let mut attributed = Vec::new();
        for line in log.lines().rev() {
            let trimmed = line.trim();
            if run_markers.iter().any(|m| m == trimmed) {
                next_phase = Some(Phase::Run);
            } else if restart_markers.iter().any(|m| m == trimmed) {
                next_phase = Some(Phase::Restart);
            } else if next_phase == Some(Phase::Run) && SUMMARY_LINE.is_match(line) {
                attributed.push(line);
            }
        }
        attributed.reverse();

        let mut stats = Self::default();
        let mut counted = Vec::new();
        for line in attributed {
            let Some(captures) = SUMMARY_LINE.captures(line) else {
                continue;
            };
            // The regex only admits digits, but values may still overflow or be malformed
            // decimals like `1.2.3`; such lines contribute nothing.
            let (Ok(runtime), Ok(retries), Ok(backups), Ok(steps)) = (
                captures[1].parse::<f64>(),
                captures[2].parse::<u64>(),
                captures[3].parse::<u64>(),
                captures[4].parse::<u64>(),
            ) else {
                continue;
            };
            // A line whose counts would overflow the totals is skipped as a whole.
            let (Some(retries), Some(backups), Some(steps)) = (
                stats.retries.checked_add(retries),
                stats.backups.checked_add(backups),
                stats.steps.checked_add(steps),
            ) else {
                continue;
            };
            stats.runtime_minutes += runtime;
            stats.retries = retries;
            stats.backups = backups;
            stats.steps = steps;
            counted.push(line.trim());
        }

        if !counted.is_empty() {
            stats.summary_text = Some(counted.join("\n"));
        }
        stats
    }
}
