//! Capture variables for values read off the screen.
//!
//! A [`TestData`] is declared once (typically as a field on a page struct) and
//! interpolated into a label or value pattern. Its `Display` output is a
//! placeholder token, so `format!("Buy now for {price}")` builds a pattern.
//! After a resolution pass matches that pattern, the captured text is read
//! from the session's [`TestDataStore`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use uuid::Uuid;

use crate::pattern::Capture;

/// Returned by [`TestDataStore::read`] for a variable that never matched.
pub const NO_VALUE: &str = "<NO VALUE>";

/// A capture variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TestData {
    id: Uuid,
}

impl TestData {
    /// Creates a fresh variable.
    pub fn new() -> Self {
        Self { id: Uuid::new_v4() }
    }

    /// The variable's identity.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The token this variable contributes to a pattern.
    pub fn placeholder(&self) -> String {
        format!("{{{}}}", self.id.as_hyphenated().to_string().to_uppercase())
    }
}

impl Default for TestData {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TestData {
    fn from(id: Uuid) -> Self {
        Self { id }
    }
}

impl fmt::Display for TestData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.placeholder())
    }
}

/// Captured values keyed by variable identity.
#[derive(Debug, Default)]
pub struct TestDataStore {
    values: Mutex<HashMap<Uuid, String>>,
}

impl TestDataStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The last captured value, if the variable has ever matched.
    pub fn get(&self, variable: &TestData) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&variable.id)
            .cloned()
    }

    /// The last captured value, or [`NO_VALUE`].
    pub fn read(&self, variable: &TestData) -> String {
        self.get(variable).unwrap_or_else(|| NO_VALUE.to_string())
    }

    /// Stores the captures of an accepted match.
    pub(crate) fn record(&self, captures: impl IntoIterator<Item = Capture>) {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        for capture in captures {
            values.insert(capture.variable, capture.value);
        }
    }

    /// Number of variables with a captured value.
    pub fn len(&self) -> usize {
        self.values.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing has been captured yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
