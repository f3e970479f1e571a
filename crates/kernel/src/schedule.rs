use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Handle to a deferred one-shot task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

/// Handle to a pending frame request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHandle(u64);

#[derive(Debug)]
struct Deferred<T> {
    due: Instant,
    task: T,
}

/// Callback bookkeeping for one mount.
///
/// Holds the deferred tasks (fire-once timers) and the single outstanding
/// frame request. The host owns the clock and the refresh hook; it asks the
/// scheduler what is due instead of the scheduler calling out.
#[derive(Debug)]
pub struct Scheduler<T> {
    next_id: u64,
    deferred: BTreeMap<u64, Deferred<T>>,
    frame: Option<FrameHandle>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            deferred: BTreeMap::new(),
            frame: None,
        }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Schedule `task` to become due `delay` after `now`.
    pub fn defer(&mut self, now: Instant, delay: Duration, task: T) -> TaskHandle {
        let id = self.allocate();
        self.deferred.insert(
            id,
            Deferred {
                due: now + delay,
                task,
            },
        );
        TaskHandle(id)
    }

    /// Cancel a deferred task. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        self.deferred.remove(&handle.0).is_some()
    }

    /// Request a callback on the next display refresh.
    ///
    /// While a request is outstanding the same handle is returned, so two
    /// frame callbacks can never be queued at once.
    pub fn request_frame(&mut self) -> FrameHandle {
        if let Some(handle) = self.frame {
            return handle;
        }
        let handle = FrameHandle(self.allocate());
        self.frame = Some(handle);
        handle
    }

    pub fn cancel_frame(&mut self, handle: FrameHandle) -> bool {
        if self.frame == Some(handle) {
            self.frame = None;
            true
        } else {
            false
        }
    }

    pub fn frame_pending(&self) -> bool {
        self.frame.is_some()
    }

    /// Consume the outstanding frame request, if any.
    pub fn take_frame(&mut self) -> Option<FrameHandle> {
        self.frame.take()
    }

    /// Remove and return every task due at `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<(TaskHandle, T)> {
        let mut due: Vec<(Instant, u64)> = self
            .deferred
            .iter()
            .filter(|(_, d)| d.due <= now)
            .map(|(id, d)| (d.due, *id))
            .collect();
        due.sort();

        due.into_iter()
            .filter_map(|(_, id)| {
                self.deferred
                    .remove(&id)
                    .map(|d| (TaskHandle(id), d.task))
            })
            .collect()
    }

    /// Earliest deadline among deferred tasks.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deferred.values().map(|d| d.due).min()
    }

    /// Deferred tasks plus the outstanding frame request.
    pub fn pending(&self) -> usize {
        self.deferred.len() + usize::from(self.frame.is_some())
    }
}
