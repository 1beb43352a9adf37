//! Registry of interruption monitors.
//!
//! A monitor pairs a page that may appear at any time (a system alert, a
//! promotional overlay) with a handler that gets it out of the way. The
//! [`TestSession`](crate::session::TestSession) evaluates monitors before
//! every interaction, most recently added first, and runs at most one handler
//! per check.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::page::Page;
use crate::session::{SessionError, TestSession};

/// Future returned by a monitor handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), SessionError>> + Send>>;

pub(crate) type MonitorHandler = Arc<dyn Fn(Arc<TestSession>) -> HandlerFuture + Send + Sync>;

/// Identifies a registered monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonitorId(u64);

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "monitor-{}", self.0)
    }
}

#[derive(Clone)]
pub(crate) struct Monitor {
    pub(crate) id: MonitorId,
    pub(crate) page: Arc<dyn Page>,
    pub(crate) handler: MonitorHandler,
}

/// Registered monitors and the reentrancy flag of the interruption check.
#[derive(Default)]
pub struct MonitorRegistry {
    monitors: Mutex<Vec<Monitor>>,
    next_id: AtomicU64,
    checking: AtomicBool,
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&self, page: Arc<dyn Page>, handler: MonitorHandler) -> MonitorId {
        let id = MonitorId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push(Monitor { id, page, handler });
        id
    }

    /// Removes a monitor. Returns `false` if it was not registered.
    pub fn remove(&self, id: MonitorId) -> bool {
        let mut monitors = self.lock();
        let before = monitors.len();
        monitors.retain(|monitor| monitor.id != id);
        monitors.len() != before
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of the monitored pages in evaluation order.
    pub fn page_names(&self) -> Vec<String> {
        self.evaluation_order().iter().map(|m| m.page.name()).collect()
    }

    /// Monitors in evaluation order: most recently added first.
    pub(crate) fn evaluation_order(&self) -> Vec<Monitor> {
        self.lock().iter().rev().cloned().collect()
    }

    /// Claims the check flag. `None` while another check is running.
    pub(crate) fn begin_check(&self) -> Option<CheckGuard<'_>> {
        self.checking
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CheckGuard { flag: &self.checking })
    }

    pub fn is_checking(&self) -> bool {
        self.checking.load(Ordering::Acquire)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Monitor>> {
        self.monitors.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the check flag when dropped.
pub(crate) struct CheckGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for CheckGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
