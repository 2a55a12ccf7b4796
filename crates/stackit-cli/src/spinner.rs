//! Terminal spinner shown while waiting.

use std::fmt;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use parking_lot::Mutex;

use crate::printer::Printer;
use crate::waiter::WaitHooks;

const TICK: Duration = Duration::from_millis(100);

/// An indicatif spinner on stderr.
///
/// Hidden unless the output format is pretty and stderr is a terminal. The
/// spinner is cleared on drop.
pub struct Spinner {
    bar: ProgressBar,
    message: Mutex<String>,
}

impl fmt::Debug for Spinner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spinner")
            .field("hidden", &self.bar.is_hidden())
            .field("message", &*self.message.lock())
            .finish()
    }
}

impl Spinner {
    /// Creates a spinner suited to the printer's output.
    #[must_use]
    pub fn for_printer(printer: &Printer) -> Self {
        if printer.interactive() {
            Self::visible()
        } else {
            Self::hidden()
        }
    }

    /// A spinner drawn on stderr.
    #[must_use]
    pub fn visible() -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        let style = ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        Self {
            bar,
            message: Mutex::new(String::new()),
        }
    }

    /// A spinner that never draws.
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            message: Mutex::new(String::new()),
        }
    }

    /// True if the spinner draws nothing.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.bar.is_hidden()
    }
}

impl WaitHooks for Spinner {
    fn on_start(&self, message: &str) {
        message.clone_into(&mut self.message.lock());
        self.bar.set_message(message.to_owned());
        self.bar.enable_steady_tick(TICK);
    }

    fn on_tick(&self, state: &str) {
        let base = self.message.lock().clone();
        self.bar.set_message(format!("{base} (state: {state})"));
    }

    fn on_stop(&self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
