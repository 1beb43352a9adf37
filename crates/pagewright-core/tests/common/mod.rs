//! Shared test helpers for pagewright-core integration tests.
//!
//! Tree builders for the live side, a stepping clock that replaces real
//! delays, and session constructors wired to a [`TreeDriver`].

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use pagewright_core::config::PagewrightConfig;
use pagewright_core::element::{ElementFrame, UIElement};
use pagewright_core::kind::ElementKind;
use pagewright_core::session::TestSession;
use pagewright_core::tree_driver::TreeDriver;
use pagewright_core::wait::Clock;

// ---------------------------------------------------------------------------
// Live tree builders
// ---------------------------------------------------------------------------

pub fn app(children: impl IntoIterator<Item = UIElement>) -> UIElement {
    UIElement::new(ElementKind::Application)
        .with_label("Demo")
        .with_children(children)
}

pub fn springboard(children: impl IntoIterator<Item = UIElement>) -> UIElement {
    UIElement::new(ElementKind::Application)
        .with_label("SpringBoard")
        .with_children(children)
}

pub fn text(label: &str) -> UIElement {
    UIElement::new(ElementKind::StaticText).with_label(label)
}

pub fn button(label: &str) -> UIElement {
    UIElement::new(ElementKind::Button).with_label(label)
}

pub fn container(kind: ElementKind, children: impl IntoIterator<Item = UIElement>) -> UIElement {
    UIElement::new(kind).with_children(children)
}

pub fn frame(x: f64, y: f64) -> ElementFrame {
    ElementFrame {
        x,
        y,
        width: 100.0,
        height: 44.0,
    }
}

// ---------------------------------------------------------------------------
// Stepping clock
// ---------------------------------------------------------------------------

type Scheduled = (Duration, Box<dyn FnOnce() + Send>);

/// A clock whose `sleep` advances time instantly.
///
/// Actions registered with [`at`](SteppingClock::at) run as soon as a sleep
/// moves the clock to or past their offset.
pub struct SteppingClock {
    start: Instant,
    elapsed: Mutex<Duration>,
    sleeps: AtomicUsize,
    scheduled: Mutex<Vec<Scheduled>>,
}

impl SteppingClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            start: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
            sleeps: AtomicUsize::new(0),
            scheduled: Mutex::new(Vec::new()),
        })
    }

    /// Schedules `action` to run once the clock reaches `offset`.
    pub fn at(&self, offset: Duration, action: impl FnOnce() + Send + 'static) {
        self.scheduled.lock().unwrap().push((offset, Box::new(action)));
    }

    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap()
    }

    pub fn sleeps(&self) -> usize {
        self.sleeps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Clock for SteppingClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        let now = {
            let mut elapsed = self.elapsed.lock().unwrap();
            *elapsed += duration;
            *elapsed
        };
        let due: Vec<Scheduled> = {
            let mut scheduled = self.scheduled.lock().unwrap();
            let (due, pending) = scheduled.drain(..).partition(|(offset, _)| *offset <= now);
            *scheduled = pending;
            due
        };
        for (_, action) in due {
            action();
        }
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Configuration without the system alert monitors.
pub fn quiet_config() -> PagewrightConfig {
    PagewrightConfig {
        default_monitors: false,
        ..PagewrightConfig::default()
    }
}

/// A session over `tree` with no default monitors and a stepping clock.
pub fn quiet_session(tree: UIElement) -> (Arc<TestSession>, Arc<TreeDriver>, Arc<SteppingClock>) {
    session_with(tree, quiet_config())
}

pub fn session_with(
    tree: UIElement,
    config: PagewrightConfig,
) -> (Arc<TestSession>, Arc<TreeDriver>, Arc<SteppingClock>) {
    let driver = Arc::new(TreeDriver::with_tree(tree));
    let clock = SteppingClock::new();
    let session = TestSession::with_clock(driver.clone(), config, clock.clone());
    (session, driver, clock)
}
