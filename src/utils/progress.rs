use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while a run works through its stages. Stages that know
/// their item count call `set_length` and `increment`.
pub struct ProgressReporter {
    progress_bar: Option<ProgressBar>,
    owner: bool,
}

impl ProgressReporter {
    pub fn new_spinner(message: &str, silent: bool) -> Self {
        if silent {
            return Self::hidden();
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) =
            ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg} {pos}/{len}")
        {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            progress_bar: Some(pb),
            owner: true,
        }
    }

    /// A reporter that draws nothing; used by library callers and tests.
    pub fn hidden() -> Self {
        Self {
            progress_bar: None,
            owner: true,
        }
    }

    /// A second handle onto the same display, for stages running on another
    /// thread. Dropping it leaves the display alone.
    pub fn share(&self) -> Self {
        Self {
            progress_bar: self.progress_bar.clone(),
            owner: false,
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.progress_bar.is_none()
    }

    pub fn set_length(&self, total: u64) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_length(total);
            pb.set_position(0);
        }
    }

    pub fn increment(&self, delta: u64) {
        if let Some(ref pb) = self.progress_bar {
            pb.inc(delta);
        }
    }

    pub fn set_message(&self, message: &str) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_message(message.to_string());
        }
    }

    pub fn finish_with_message(&self, message: &str) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_with_message(message.to_string());
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if !self.owner {
            return;
        }
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_reporter_is_hidden() {
        let progress = ProgressReporter::new_spinner("Scanning...", true);
        assert!(progress.is_hidden());

        // Calls on a hidden reporter are no-ops
        progress.set_length(3);
        progress.increment(1);
        progress.set_message("Inflating...");
        progress.finish_with_message("Done");
    }

    #[test]
    fn test_shared_handle_leaves_display_running() {
        let progress = ProgressReporter {
            progress_bar: Some(ProgressBar::hidden()),
            owner: true,
        };
        progress.set_length(4);

        let shared = progress.share();
        shared.increment(2);
        drop(shared);

        let pb = progress.progress_bar.as_ref().unwrap();
        assert_eq!(pb.position(), 2);
        assert!(!pb.is_finished());
    }
}
