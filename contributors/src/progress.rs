//! Progress reporting: an interactive bar on terminals, a plain verbose channel otherwise.

use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use std::io::IsTerminal;
use std::sync::{Mutex, PoisonError};
use strum_macros::Display;

/// States of a paginated collection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RunState {
    Idle,
    Probing,
    Splitting,
    Draining,
    Done,
    Aborted,
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg:<40} [{bar:30}] {pos:>5}/{len:5} {elapsed}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

pub struct Progress {
    bar: ProgressBar,
    verbose: bool,
    state: Mutex<RunState>,
}

impl Progress {
    /// The bar is muted in verbose mode and when stderr is not a terminal.
    pub fn new(verbose: bool) -> Self {
        let bar = if verbose || !std::io::stderr().is_terminal() {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new(0);
            bar.set_style(bar_style());
            bar
        };
        Progress {
            bar,
            verbose,
            state: Mutex::new(RunState::Idle),
        }
    }

    /// No bar and no verbose output.
    pub fn hidden() -> Self {
        Progress {
            bar: ProgressBar::hidden(),
            verbose: false,
            state: Mutex::new(RunState::Idle),
        }
    }

    pub fn state(&self) -> RunState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn enter(&self, next: RunState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != next {
            debug!("Run state: {} -> {}", *state, next);
            *state = next;
        }
    }

    /// Restarts the bar once the authoritative number of items is known.
    pub fn reset_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
    }

    pub fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.bar.set_message(message.into());
    }

    /// Prints a line on stdout in verbose mode.
    pub fn verbose(&self, message: impl AsRef<str>) {
        if self.verbose {
            self.bar.suspend(|| println!("{}", message.as_ref()));
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

#[test]
fn state_test() {
    let progress = Progress::hidden();
    assert_eq!(progress.state(), RunState::Idle);
    progress.enter(RunState::Probing);
    progress.enter(RunState::Splitting);
    progress.enter(RunState::Draining);
    progress.enter(RunState::Draining);
    assert_eq!(progress.state(), RunState::Draining);
    progress.enter(RunState::Done);
    assert_eq!(progress.state(), RunState::Done);
    assert_eq!(RunState::Aborted.to_string(), "Aborted");
}
