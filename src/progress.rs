// ABOUTME: User-facing progress reporting for export runs
// ABOUTME: Console reporter with in-place progress bars and a quiet no-op reporter

use crate::error::Phase;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// Receives progress from the orchestrator and extractors.
///
/// Purely informational: nothing here influences control flow.
pub trait Progress: Send + Sync {
    /// `completed` of `total` tables of `phase` are done, the last one being `label`
    fn report(&self, phase: Phase, completed: usize, total: usize, label: &str);

    /// A standalone message line
    fn line(&self, text: &str);

    /// The run failed; stop drawing progress so the error stands on its own
    fn abandon(&self) {}
}

/// Reporter used for `--quiet`
#[derive(Debug, Default, Clone, Copy)]
pub struct QuietProgress;

impl Progress for QuietProgress {
    fn report(&self, _phase: Phase, _completed: usize, _total: usize, _label: &str) {}

    fn line(&self, _text: &str) {}
}

/// Interactive reporter: one bar per phase, redrawn in place
#[derive(Default)]
pub struct ConsoleProgress {
    bar: Mutex<Option<(Phase, ProgressBar)>>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn new_bar(total: usize) -> ProgressBar {
        let bar = ProgressBar::new(total as u64);
        // The template is a constant, it only fails on malformed placeholders
        if let Ok(style) = ProgressStyle::default_bar().template("[{pos}/{len}] - {msg}") {
            bar.set_style(style);
        }
        bar
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some((_, bar)) = slot.take() {
                bar.finish_and_clear();
            }
        }
    }
}

impl Progress for ConsoleProgress {
    fn report(&self, phase: Phase, completed: usize, total: usize, label: &str) {
        let Ok(mut slot) = self.bar.lock() else {
            return;
        };
        let same_phase = matches!(slot.as_ref(), Some((current, _)) if *current == phase);
        if !same_phase {
            if let Some((_, old)) = slot.take() {
                old.finish_and_clear();
            }
            *slot = Some((phase, Self::new_bar(total)));
        }
        if let Some((_, bar)) = slot.as_ref() {
            bar.set_length(total as u64);
            bar.set_position(completed as u64);
            bar.set_message(crate::utils::sanitize_identifier(label));
        }
    }

    fn line(&self, text: &str) {
        self.clear();
        println!("{}", text);
    }

    fn abandon(&self) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some((_, bar)) = slot.take() {
                bar.abandon();
            }
        }
    }
}
