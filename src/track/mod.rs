// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Asynchronous job tracking: progress, delegate jobs, pause and abort.
//!
//! A [`Tracker`] manages one lengthy job. The synchronous worker code sets
//! the job name, zeroes the progress and sets the total duration, then
//! intersperses its work with [`Tracker::is_aborted`] / pause checks (at
//! least every [`RESPONSE_TIME`] milliseconds) and monotonic
//! [`Tracker::set_progress`] calls. A job made of subtasks registers each
//! as a *delegate* tracker with a share of the master's duration; the
//! master folds the delegate's progress into its own and forwards abort and
//! pause to it.
//!
//! Cancellation is cooperative only: [`Tracker::abort`] sets a sticky flag
//! that the worker observes at its next check and unwinds from.
//! [`Tracker::abort_worker`] waits up to a timeout for the acknowledgement
//! and then detaches. Pause parks the worker on a condition variable until
//! resume, staying responsive to abort.
//!
//! Counters are word-sized atomics: asynchronous reads may be momentarily
//! stale but are never torn.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// The task should check abort and pause status more often than this.
pub const RESPONSE_TIME: Duration = Duration::from_millis(300);

const DEFAULT_JOB_NAME: &str = "busy...";

#[derive(Default)]
struct TrackerState {
    job_name: String,
    error: Option<String>,
    delegate: Option<(Arc<Tracker>, u64)>,
    worker: Option<std::thread::JoinHandle<()>>,
}

/// Tracks one job: progress 0..total, sticky abort, pause/resume parking,
/// error capture, delegate jobs and an optional worker thread.
pub struct Tracker {
    total: AtomicU64,
    progress: AtomicU64,
    abort: AtomicBool,
    pause: AtomicBool,
    finished: AtomicBool,
    state: Mutex<TrackerState>,
    cond: Condvar,
}

impl Tracker {
    pub fn new(total: u64) -> Self {
        Self {
            total: AtomicU64::new(total.max(1)),
            progress: AtomicU64::new(0),
            abort: AtomicBool::new(false),
            pause: AtomicBool::new(false),
            finished: AtomicBool::new(true),
            state: Mutex::new(TrackerState {
                job_name: DEFAULT_JOB_NAME.to_owned(),
                ..TrackerState::default()
            }),
            cond: Condvar::new(),
        }
    }

    pub fn named(total: u64, name: &str) -> Self {
        let t = Self::new(total);
        t.set_job_name(name);
        t
    }

    /// The name of the running job; a delegate's name wins while one runs.
    pub fn job_name(&self) -> String {
        let state = self.state.lock();
        if let Some((delegate, _)) = &state.delegate {
            return delegate.job_name();
        }
        state.job_name.clone()
    }

    pub fn set_job_name(&self, name: &str) {
        self.state.lock().job_name = name.to_owned();
    }

    pub fn set_total(&self, total: u64) {
        self.total.store(total.max(1), Ordering::Relaxed);
    }

    /// Progress as a percentage 0..=100, folding in any delegate job.
    pub fn progress(&self) -> f64 {
        let mut p = self.progress.load(Ordering::Relaxed) as f64 * 100.0;
        if let Some((delegate, duration)) = &self.state.lock().delegate {
            p += delegate.progress() * *duration as f64;
        }
        let p = p / self.total.load(Ordering::Relaxed) as f64;
        p.min(100.0)
    }

    /// Progress rendered with a fixed number of decimal places.
    pub fn progress_string(&self, decimals: usize) -> String {
        format!("{:.*}", decimals, self.progress())
    }

    /// Advances progress; terminates any delegate job.
    pub fn set_progress(&self, progress: u64) {
        self.end_delegate_job();
        let total = self.total.load(Ordering::Relaxed);
        self.progress.store(progress.min(total), Ordering::Relaxed);
    }

    /// Registers a delegate job worth `duration` progress points of this
    /// tracker. The delegate starts clean, except that an abort or pause
    /// already standing on this tracker is forwarded so it cannot fall
    /// into the gap between two delegate jobs.
    pub fn start_delegate_job(&self, job: Arc<Tracker>, duration: u64) {
        job.reset();
        if self.is_aborted() {
            job.abort();
        }
        if self.is_paused() {
            job.pause();
        }
        self.state.lock().delegate = Some((job, duration));
    }

    /// Ends the delegate job, banking its duration and propagating any
    /// error it recorded.
    pub fn end_delegate_job(&self) {
        let mut state = self.state.lock();
        if let Some((delegate, duration)) = state.delegate.take() {
            self.progress.fetch_add(duration, Ordering::Relaxed);
            if state.error.is_none() {
                if let Some(msg) = delegate.error_msg() {
                    state.error = Some(msg);
                }
            }
        }
    }

    pub fn is_error(&self) -> bool {
        self.state.lock().error.is_some()
    }

    pub fn error_msg(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn set_error(&self, msg: &str) {
        self.state.lock().error = Some(msg.to_owned());
    }

    /// Sticky abort; treated like an error condition and forwarded to any
    /// delegate job.
    pub fn abort(&self) {
        self.abort.store(true, Ordering::SeqCst);
        if let Some((delegate, _)) = &self.state.lock().delegate {
            delegate.abort();
        }
        self.set_error("Aborted");
        let _guard = self.state.lock();
        self.cond.notify_all();
    }

    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::Relaxed)
    }

    /// Clears abort, pause and error state, recursively through delegates.
    pub fn reset(&self) {
        self.abort.store(false, Ordering::SeqCst);
        self.pause.store(false, Ordering::SeqCst);
        let mut state = self.state.lock();
        state.error = None;
        if let Some((delegate, _)) = &state.delegate {
            delegate.reset();
        }
    }

    pub fn pause(&self) {
        self.pause.store(true, Ordering::SeqCst);
        if let Some((delegate, _)) = &self.state.lock().delegate {
            delegate.pause();
        }
    }

    pub fn resume(&self) {
        self.pause.store(false, Ordering::SeqCst);
        if let Some((delegate, _)) = &self.state.lock().delegate {
            delegate.resume();
        }
        let _guard = self.state.lock();
        self.cond.notify_all();
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.pause.load(Ordering::Relaxed)
    }

    /// Parks the calling worker until resume. Stays responsive to abort;
    /// the caller must check [`Tracker::is_aborted`] after this returns.
    pub fn wait_for_resume(&self) {
        let mut state = self.state.lock();
        while self.is_paused() {
            if self.is_aborted() {
                return;
            }
            self.cond.wait_for(&mut state, RESPONSE_TIME / 2);
        }
    }

    // ----------------------------------------------------------------
    // Worker thread support
    // ----------------------------------------------------------------

    /// True when no worker is running. Only meaningful after
    /// [`Tracker::start_worker`] has been used.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Starts a worker thread running `task`. Any previous worker is
    /// aborted first. A panic in the task is caught and recorded as a
    /// fatal error on the tracker.
    pub fn start_worker(self: &Arc<Self>, task: impl FnOnce() + Send + 'static, name: &str) {
        self.abort_worker(RESPONSE_TIME);
        self.reset();
        self.finished.store(false, Ordering::SeqCst);
        let tracker = Arc::clone(self);
        let handle = std::thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(task));
                if let Err(panic) = result {
                    let msg = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_owned());
                    tracker.set_error(&format!("FATAL: {}", msg));
                }
                tracker.finished.store(true, Ordering::SeqCst);
                let _guard = tracker.state.lock();
                tracker.cond.notify_all();
            })
            .expect("failed to spawn worker thread");
        self.state.lock().worker = Some(handle);
    }

    /// Aborts the worker and waits up to `timeout` for it to acknowledge.
    /// Cooperative only: a worker that never checks its flags is left
    /// running detached.
    pub fn abort_worker(&self, timeout: Duration) {
        let running = { self.state.lock().worker.is_some() };
        if !running {
            return;
        }
        self.abort();
        {
            let mut state = self.state.lock();
            if !self.is_finished() {
                self.cond.wait_for(&mut state, timeout);
            }
        }
        let handle = self.state.lock().worker.take();
        if let Some(handle) = handle {
            if self.is_finished() {
                let _ = handle.join();
            }
        }
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("progress", &self.progress.load(Ordering::Relaxed))
            .field("total", &self.total.load(Ordering::Relaxed))
            .field("aborted", &self.is_aborted())
            .field("paused", &self.is_paused())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_scales_to_total() {
        let t = Tracker::new(200);
        t.set_progress(50);
        assert!((t.progress() - 25.0).abs() < 1e-9);
        t.set_progress(500);
        assert!((t.progress() - 100.0).abs() < 1e-9);
        assert_eq!(t.progress_string(3), "100.000");
    }

    #[test]
    fn delegate_jobs_fold_into_master() {
        let master = Tracker::new(2);
        let job = Arc::new(Tracker::new(100));
        master.start_delegate_job(Arc::clone(&job), 1);
        job.set_progress(50);
        assert!((master.progress() - 25.0).abs() < 1e-9);
        master.end_delegate_job();
        assert!((master.progress() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn abort_is_sticky_and_propagates() {
        let master = Tracker::new(2);
        let job = Arc::new(Tracker::new(100));
        master.start_delegate_job(Arc::clone(&job), 1);
        master.abort();
        assert!(master.is_aborted());
        assert!(job.is_aborted());
        assert!(master.is_error());
        assert_eq!(master.error_msg().as_deref(), Some("Aborted"));
    }

    #[test]
    fn delegate_error_propagates_on_end() {
        let master = Tracker::new(2);
        let job = Arc::new(Tracker::new(100));
        master.start_delegate_job(Arc::clone(&job), 1);
        job.set_error("FATAL ERROR building node table");
        master.end_delegate_job();
        assert!(master.is_error());
    }

    #[test]
    fn worker_runs_and_finishes() {
        let tracker = Arc::new(Tracker::new(100));
        let flag = Arc::new(AtomicBool::new(false));
        let f2 = Arc::clone(&flag);
        tracker.start_worker(move || f2.store(true, Ordering::SeqCst), "test-worker");
        tracker.abort_worker(Duration::from_secs(5));
        assert!(flag.load(Ordering::SeqCst));
        assert!(tracker.is_finished());
    }

    #[test]
    fn worker_panic_is_captured() {
        let tracker = Arc::new(Tracker::new(100));
        tracker.start_worker(|| panic!("table corrupt"), "test-worker");
        tracker.abort_worker(Duration::from_secs(5));
        let msg = tracker.error_msg().unwrap();
        assert!(msg.starts_with("FATAL:"), "{}", msg);
    }

    #[test]
    fn pause_parks_until_resume() {
        let tracker = Arc::new(Tracker::new(100));
        tracker.pause();
        let t2 = Arc::clone(&tracker);
        let start = std::time::Instant::now();
        let h = std::thread::spawn(move || t2.wait_for_resume());
        std::thread::sleep(Duration::from_millis(50));
        tracker.resume();
        h.join().unwrap();
        assert!(start.elapsed() >= Duration::from_millis(40));
    }
}
