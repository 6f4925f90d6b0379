//! Progress estimation and failure-block capture over editor console output.
//!
//! The editor prints no machine-readable progress. Completion is estimated
//! by counting lines against the line count of a typical successful build,
//! and failures are recognised by the block the editor prints after
//! [`FAILURE_SENTINEL`], which runs until the next blank line.

use serde::Serialize;

/// Line the editor prints right before the failure diagnostics.
pub const FAILURE_SENTINEL: &str = "Aborting batchmode due to failure:";

/// Line count of a typical successful build.
pub const DEFAULT_EXPECTED_LINE_COUNT: u64 = 3108;

/// One line of build output with its progress estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    /// Zero-based position of the line in the output.
    pub index: u64,

    /// Estimated completion in `0.0..=100.0`.
    pub percentage: f64,

    /// Line with surrounding whitespace stripped.
    pub line: String,
}

/// Heuristic completion for the line at `index`. Saturates at 100.
pub fn estimate_percentage(index: u64, expected_line_count: u64) -> f64 {
    if expected_line_count == 0 {
        return 100.0;
    }
    (index as f64 / expected_line_count as f64 * 100.0).min(100.0)
}

/// Line-at-a-time state machine over the editor's stdout.
#[derive(Debug, Clone)]
pub struct OutputParser {
    expected_line_count: u64,
    lines_seen: u64,
    inside_failure_block: bool,
    failure_message: String,
}

impl OutputParser {
    pub fn new(expected_line_count: u64) -> Self {
        Self {
            expected_line_count,
            lines_seen: 0,
            inside_failure_block: false,
            failure_message: String::new(),
        }
    }

    /// Consume one raw line.
    pub fn feed(&mut self, raw: &str) -> ProgressEvent {
        let index = self.lines_seen;
        self.lines_seen += 1;

        let line = raw.trim();

        if self.inside_failure_block {
            if line.is_empty() {
                self.inside_failure_block = false;
            } else {
                self.failure_message.push_str(line);
                self.failure_message.push('\n');
            }
        }

        // Checked after accumulation so the sentinel itself is never captured.
        if line == FAILURE_SENTINEL {
            self.inside_failure_block = true;
        }

        ProgressEvent {
            index,
            percentage: estimate_percentage(index, self.expected_line_count),
            line: line.to_string(),
        }
    }

    /// Every failure block seen so far, each line newline-terminated.
    pub fn failure_message(&self) -> &str {
        &self.failure_message
    }

    pub fn lines_seen(&self) -> u64 {
        self.lines_seen
    }

    pub fn inside_failure_block(&self) -> bool {
        self.inside_failure_block
    }

    pub fn into_failure_message(self) -> String {
        self.failure_message
    }
}

impl Default for OutputParser {
    fn default() -> Self {
        Self::new(DEFAULT_EXPECTED_LINE_COUNT)
    }
}
