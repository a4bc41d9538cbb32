use parking_lot::{Condvar, Mutex};
use std::io::Write;
use std::time::Duration;

/// How often the progress thread reports
pub const PROGRESS_PERIOD: Duration = Duration::from_millis(200);

/// Receives hashing progress from the pipeline.
pub trait ProgressSink: Sync {
    /// Called periodically from the progress thread
    fn report(&self, hashed: usize, total: usize);

    /// Called once after every worker has finished
    fn finish(&self, hashed: usize, total: usize) {
        self.report(hashed, total);
    }
}

/// Discards all progress
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _hashed: usize, _total: usize) {}
}

/// Rewrites a single status line on stdout
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn report(&self, hashed: usize, total: usize) {
        let mut stdout = std::io::stdout().lock();
        let _ = write!(stdout, "\rHashed {} of {} pieces.", hashed, total);
        let _ = stdout.flush();
    }

    fn finish(&self, hashed: usize, total: usize) {
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "\rHashed {} of {} pieces.", hashed, total);
        let _ = stdout.flush();
    }
}

/// Stop signal for the progress thread.
///
/// The thread sleeps on the condition variable between reports, so a stop
/// request wakes it at once instead of waiting out the period.
#[derive(Default)]
pub struct Stopper {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl Stopper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        *self.stopped.lock() = true;
        self.wake.notify_all();
    }

    /// Call `tick` every `period` until [`Stopper::stop`] is called
    pub fn run_every<F: FnMut()>(&self, period: Duration, mut tick: F) {
        let mut stopped = self.stopped.lock();

        while !*stopped {
            tick();
            // a timeout just means another round
            let _ = self.wake.wait_for(&mut stopped, period);
        }
    }
}
