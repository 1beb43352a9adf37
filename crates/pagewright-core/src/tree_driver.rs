//! In-memory [`AutomationDriver`] serving fixed trees.
//!
//! [`TreeDriver`] holds one tree per application and re-locates queries with
//! [`Snapshot::locate`]. Every call is recorded, so tests can assert which
//! gestures reached the backend. An optional tap hook mutates the trees, for
//! example to make an alert disappear once its button is tapped.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use crate::driver::{AutomationDriver, DriverError, ElementQuery};
use crate::element::{ElementFrame, UIElement};
use crate::snapshot::{Snapshot, SnapshotNode};

/// Trees keyed by bundle identifier; `None` is the application under test.
pub type Trees = HashMap<Option<String>, UIElement>;

type TapHook = Arc<dyn Fn(&ElementQuery, &mut Trees) + Send + Sync>;

/// A call received by a [`TreeDriver`].
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    Snapshot { application: Option<String> },
    Tap(ElementQuery),
    TypeText { query: ElementQuery, text: String },
    Scroll { query: ElementQuery, dx: f64, dy: f64 },
    IsHittable(ElementQuery),
    Frame(ElementQuery),
}

/// An automation driver backed by in-memory trees.
#[derive(Default)]
pub struct TreeDriver {
    trees: Mutex<Trees>,
    calls: Mutex<Vec<DriverCall>>,
    tap_hook: Mutex<Option<TapHook>>,
}

impl TreeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A driver serving `tree` as the application under test.
    pub fn with_tree(tree: UIElement) -> Self {
        let driver = Self::new();
        driver.set_tree(None, tree);
        driver
    }

    /// Parses a JSON tree dump.
    pub fn from_json(json: &str) -> Result<Self, DriverError> {
        Ok(Self::with_tree(serde_json::from_str(json)?))
    }

    /// Reads a JSON tree dump from disk.
    pub fn from_file(path: &Path) -> Result<Self, DriverError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn set_tree(&self, application: Option<&str>, tree: UIElement) {
        self.lock_trees().insert(application.map(str::to_string), tree);
    }

    /// Removes an application's tree; its snapshots fail afterwards.
    pub fn clear_tree(&self, application: Option<&str>) {
        self.lock_trees().remove(&application.map(str::to_string));
    }

    /// Installs a hook that runs after every successful tap.
    pub fn on_tap(&self, hook: impl Fn(&ElementQuery, &mut Trees) + Send + Sync + 'static) {
        *self.tap_hook.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(hook));
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Queries of every tap received so far.
    pub fn taps(&self) -> Vec<ElementQuery> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                DriverCall::Tap(query) => Some(query),
                _ => None,
            })
            .collect()
    }

    /// Calls other than snapshots.
    pub fn actions(&self) -> Vec<DriverCall> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, DriverCall::Snapshot { .. }))
            .collect()
    }

    fn lock_trees(&self) -> std::sync::MutexGuard<'_, Trees> {
        self.trees.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: DriverCall) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }

    fn find(&self, query: &ElementQuery) -> Result<SnapshotNode, DriverError> {
        let trees = self.lock_trees();
        let tree = trees
            .get(&query.application)
            .ok_or_else(|| not_running(query.application.as_deref()))?;
        let snapshot = Snapshot::build(tree);
        snapshot
            .locate(&query.path, query.index)
            .map(|pos| snapshot.node(pos).clone())
            .ok_or_else(|| DriverError::ElementNotFound(query.to_string()))
    }
}

fn not_running(application: Option<&str>) -> DriverError {
    DriverError::ApplicationNotRunning(application.unwrap_or("application under test").to_string())
}

#[async_trait]
impl AutomationDriver for TreeDriver {
    async fn snapshot(&self, application: Option<&str>) -> Result<UIElement, DriverError> {
        self.record(DriverCall::Snapshot {
            application: application.map(str::to_string),
        });
        self.lock_trees()
            .get(&application.map(str::to_string))
            .cloned()
            .ok_or_else(|| not_running(application))
    }

    async fn tap(&self, query: &ElementQuery) -> Result<(), DriverError> {
        self.record(DriverCall::Tap(query.clone()));
        let node = self.find(query)?;
        debug!(kind = %node.kind, label = %node.label, index = node.index, "tap");

        let hook = self.tap_hook.lock().unwrap_or_else(PoisonError::into_inner).clone();
        if let Some(hook) = hook {
            hook(query, &mut *self.lock_trees());
        }
        Ok(())
    }

    async fn type_text(&self, query: &ElementQuery, text: &str) -> Result<(), DriverError> {
        self.record(DriverCall::TypeText {
            query: query.clone(),
            text: text.to_string(),
        });
        self.find(query).map(|_| ())
    }

    async fn scroll(&self, query: &ElementQuery, dx: f64, dy: f64) -> Result<(), DriverError> {
        self.record(DriverCall::Scroll {
            query: query.clone(),
            dx,
            dy,
        });
        self.find(query).map(|_| ())
    }

    async fn is_hittable(&self, query: &ElementQuery) -> Result<bool, DriverError> {
        self.record(DriverCall::IsHittable(query.clone()));
        Ok(self.find(query)?.hittable.unwrap_or(true))
    }

    async fn frame(&self, query: &ElementQuery) -> Result<Option<ElementFrame>, DriverError> {
        self.record(DriverCall::Frame(query.clone()));
        Ok(self.find(query)?.frame)
    }
}
