//! Action types and logging for session operations.
//!
//! Every interaction and wait that a [`TestSession`](crate::session::TestSession)
//! performs is recorded as an [`ActionLog`] entry.
//!
//! # Example
//!
//! ```
//! use pagewright_core::action::{ActionType, ActionResult, ActionLog};
//!
//! let action = ActionType::Tap {
//!     element: "Button(label: \"Log In\")".to_string(),
//! };
//!
//! let log = ActionLog::new(action, ActionResult::Success, Some(12));
//! println!("Action {} at {}", log.id, log.timestamp);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The result of executing an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionResult {
    /// The action completed successfully.
    Success,

    /// The action failed with the given error message.
    Failure(String),
}

impl ActionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionResult::Success)
    }
}

/// Actions a session performs.
///
/// Elements and pages are recorded by their display form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActionType {
    /// Tap a declared element.
    Tap { element: String },

    /// Tap the first live element sharing the declared element's path.
    TapAny { element: String },

    /// Type text into a declared element.
    TypeText { element: String, text: String },

    /// Scroll a declared element by a vector in points.
    Scroll { element: String, dx: f64, dy: f64 },

    /// Wait for a page to exist.
    WaitForExistence { page: String, timeout_ms: u64 },

    /// Wait for a declared element to become hittable.
    WaitUntilHittable { element: String, timeout_ms: u64 },

    /// An interruption monitor's handler ran.
    HandleInterruption { page: String },
}

impl ActionType {
    /// Returns a short, static name for this action type suitable for use in
    /// tracing span metadata.
    pub fn name(&self) -> &'static str {
        match self {
            ActionType::Tap { .. } => "tap",
            ActionType::TapAny { .. } => "tap_any",
            ActionType::TypeText { .. } => "type_text",
            ActionType::Scroll { .. } => "scroll",
            ActionType::WaitForExistence { .. } => "wait_for_existence",
            ActionType::WaitUntilHittable { .. } => "wait_until_hittable",
            ActionType::HandleInterruption { .. } => "handle_interruption",
        }
    }
}

/// A logged action with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    /// Unique identifier for this log entry.
    pub id: Uuid,

    /// When the action finished.
    pub timestamp: DateTime<Utc>,

    pub action: ActionType,

    pub result: ActionResult,

    /// How long the action took in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ActionLog {
    /// Creates a new entry with a fresh id and the current time.
    pub fn new(action: ActionType, result: ActionResult, duration_ms: Option<u64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action,
            result,
            duration_ms,
        }
    }
}
