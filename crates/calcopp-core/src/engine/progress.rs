/// Events emitted by the workflows for display by a front end.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    /// Starts a counted task, e.g. one derived layer over all grid points.
    TaskStart { total_steps: u64 },
    TaskAdvance { steps: u64 },
    TaskFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Forwards [`Progress`] events to an optional callback; without one, reporting is a no-op.
#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    /// Runs `work` between a `PhaseStart` and a `PhaseFinish` event.
    ///
    /// `PhaseFinish` is only reported when `work` succeeds; a failing phase is left for the
    /// caller's error handling.
    pub fn phase<T, E>(&self, name: &'static str, work: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        self.report(Progress::PhaseStart { name });
        let result = work()?;
        self.report(Progress::PhaseFinish);
        Ok(result)
    }
}

/// Reports task progress in batches so per-point loops stay cheap.
pub(crate) struct TaskTicker<'r, 'a> {
    reporter: &'r ProgressReporter<'a>,
    pending: u64,
    batch: u64,
}

impl<'r, 'a> TaskTicker<'r, 'a> {
    pub(crate) fn start(reporter: &'r ProgressReporter<'a>, total_steps: usize) -> Self {
        reporter.report(Progress::TaskStart {
            total_steps: total_steps as u64,
        });
        Self {
            reporter,
            pending: 0,
            batch: (total_steps as u64 / 100).max(1),
        }
    }

    #[inline]
    pub(crate) fn tick(&mut self) {
        self.pending += 1;
        if self.pending >= self.batch {
            self.flush();
        }
    }

    fn flush(&mut self) {
        if self.pending > 0 {
            self.reporter.report(Progress::TaskAdvance {
                steps: self.pending,
            });
            self.pending = 0;
        }
    }

    pub(crate) fn finish(mut self) {
        self.flush();
        self.reporter.report(Progress::TaskFinish);
    }
}
