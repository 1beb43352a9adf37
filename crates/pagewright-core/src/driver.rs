//! Automation driver trait for backend-agnostic tree access and input.
//!
//! An [`AutomationDriver`] supplies the live accessibility tree of an
//! application and performs gestures on elements addressed by an
//! [`ElementQuery`]: the path and occurrence index recorded by a resolution
//! pass. Everything above this seam (resolution, caching, waits,
//! interruption handling) is backend independent.
//!
//! [`TreeDriver`](crate::tree_driver::TreeDriver) is the in-memory backend
//! shipped with this crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::element::{ElementFrame, UIElement};
use crate::snapshot::PathStep;

/// Errors that can occur during automation driver operations.
///
/// This enum unifies errors from all backends behind a single type,
/// allowing consumers to handle errors uniformly regardless of the
/// underlying automation backend.
#[derive(Error, Debug)]
pub enum DriverError {
    /// A command or operation failed with the given message.
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// The backend is not available or not connected.
    #[error("Not connected to automation backend")]
    NotConnected,

    /// The target application has no tree to report.
    #[error("Application not running: {0}")]
    ApplicationNotRunning(String),

    /// No live element matches the query.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// An operation timed out.
    #[error("Operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse JSON data.
    #[error("JSON parse error: {0}")]
    JsonParse(String),
}

impl From<serde_json::Error> for DriverError {
    fn from(err: serde_json::Error) -> Self {
        DriverError::JsonParse(err.to_string())
    }
}

/// Addresses one live element for a gesture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementQuery {
    /// Bundle identifier, `None` for the application under test.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    /// Root-to-element path recorded by the resolution pass.
    pub path: Vec<PathStep>,
    /// Occurrence index among nodes sharing `path`.
    pub index: usize,
}

impl std::fmt::Display for ElementQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let steps: Vec<String> = self.path.iter().map(ToString::to_string).collect();
        write!(f, "{} [{}]", steps.join(" > "), self.index)
    }
}

/// Trait for backend-agnostic UI automation.
///
/// Implementors report the accessibility tree and perform gestures. Only
/// [`frame`](AutomationDriver::frame) has a default; a backend that cannot
/// report frames skips stable-position waits.
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    /// Fetches the accessibility tree of an application.
    ///
    /// `None` targets the application under test.
    async fn snapshot(&self, application: Option<&str>) -> Result<UIElement, DriverError>;

    /// Taps the queried element.
    async fn tap(&self, query: &ElementQuery) -> Result<(), DriverError>;

    /// Types text into the queried element.
    async fn type_text(&self, query: &ElementQuery, text: &str) -> Result<(), DriverError>;

    /// Scrolls the queried element by a vector in points.
    async fn scroll(&self, query: &ElementQuery, dx: f64, dy: f64) -> Result<(), DriverError>;

    /// Whether the queried element can currently receive taps.
    async fn is_hittable(&self, query: &ElementQuery) -> Result<bool, DriverError>;

    /// The queried element's frame, if the backend reports frames.
    async fn frame(&self, _query: &ElementQuery) -> Result<Option<ElementFrame>, DriverError> {
        Ok(None)
    }
}
