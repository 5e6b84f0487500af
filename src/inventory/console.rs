//! Operator-facing console output
//!
//! Progress and per-resource notices are for a human watching the run; they
//! go to stderr so stdout stays clean. Pipelines write through the
//! [`Console`] trait so tests can record what the operator would have seen.

use std::io::Write;

pub trait Console {
    /// A per-resource notice (skipped fields, denied access)
    fn notice(&mut self, message: &str);

    /// Progress counter: `done` of `total` resources processed
    fn progress(&mut self, label: &str, done: usize, total: usize);

    /// A status line, e.g. the region being listed
    fn status(&mut self, message: &str);
}

/// Console writing to stderr with a single-line progress counter
#[derive(Debug, Default)]
pub struct TerminalConsole {
    counter_open: bool,
}

impl TerminalConsole {
    pub fn new() -> Self {
        Self::default()
    }

    fn close_counter(&mut self, stderr: &mut impl Write) {
        if self.counter_open {
            let _ = writeln!(stderr);
            self.counter_open = false;
        }
    }
}

impl Console for TerminalConsole {
    fn notice(&mut self, message: &str) {
        let mut stderr = std::io::stderr().lock();
        self.close_counter(&mut stderr);
        let _ = writeln!(stderr, "{}", message);
    }

    fn progress(&mut self, label: &str, done: usize, total: usize) {
        let mut stderr = std::io::stderr().lock();
        let percent = if total == 0 { 100 } else { done * 100 / total };
        let _ = write!(stderr, "\r{}: {}/{} [{:>3}%]", label, done, total, percent);
        let _ = stderr.flush();
        self.counter_open = done < total;
        if !self.counter_open {
            let _ = writeln!(stderr);
        }
    }

    fn status(&mut self, message: &str) {
        let mut stderr = std::io::stderr().lock();
        self.close_counter(&mut stderr);
        let _ = writeln!(stderr, "{}", message);
    }
}

/// Console that keeps everything in memory
#[derive(Debug, Default, Clone)]
pub struct RecordingConsole {
    pub notices: Vec<String>,
    pub statuses: Vec<String>,
    /// `(done, total)` pairs in call order
    pub progress: Vec<(usize, usize)>,
}

impl RecordingConsole {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Console for RecordingConsole {
    fn notice(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }

    fn progress(&mut self, _label: &str, done: usize, total: usize) {
        self.progress.push((done, total));
    }

    fn status(&mut self, message: &str) {
        self.statuses.push(message.to_string());
    }
}
