use std::sync::{Arc, Mutex};

use indicatif::{ProgressBar, ProgressStyle};

fn create_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["-", "\\", "|", "/"])
        .template("{msg} {spinner}")
    {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

/// The spinner currently on screen, if any.
///
/// Clones share the slot, so code that needs the terminal for itself (the
/// Google consent prompt) can clear whatever a command started.
#[derive(Clone, Default)]
pub struct ActiveSpinner(Arc<Mutex<Option<ProgressBar>>>);

impl ActiveSpinner {
    pub fn start(&self, message: String) -> ProgressBar {
        let spinner = create_spinner(message);
        if let Ok(mut active) = self.0.lock() {
            *active = Some(spinner.clone());
        }
        spinner
    }

    /// Finish and erase the active spinner. It does not come back.
    pub fn clear(&self) {
        let spinner = self.0.lock().ok().and_then(|mut active| active.take());
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
    }
}
