//! Transition log.
//!
//! Records the terminal outcome of every action an engine applies, so tests
//! and diagnostics can ask "did the last action enter, reenter, do nothing
//! or raise?" without installing a custom sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Terminal outcome of one interpreted action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionKind {
    /// Nothing changed and no callback fired.
    Noop,
    /// The entry callback fired with the unchanged state.
    Reenter,
    /// The state was replaced and the entry callback fired.
    Enter,
    /// The action raised an error; the state is unchanged.
    Raise,
    /// The action handed a supplier to the background executor.
    Async,
}

/// Record of a single interpreted action.
///
/// # Example
///
/// ```rust
/// use troupe::core::{TransitionKind, TransitionRecord};
/// use chrono::Utc;
///
/// let record = TransitionRecord {
///     kind: TransitionKind::Enter,
///     timestamp: Utc::now(),
///     steps: 2,
///     error: None,
/// };
/// assert_eq!(record.kind, TransitionKind::Enter);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// What the action ended in
    pub kind: TransitionKind,
    /// When the outcome was committed
    pub timestamp: DateTime<Utc>,
    /// How many steps ran in the synchronous turn
    pub steps: usize,
    /// Rendered error for `Raise` outcomes
    pub error: Option<String>,
}

/// Bounded, ordered log of transition records.
///
/// Once `capacity` records are held, recording another one evicts the
/// oldest. [`total`](Self::total) keeps counting evicted records.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionLog {
    records: VecDeque<TransitionRecord>,
    capacity: usize,
    total: u64,
}

impl Default for TransitionLog {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl TransitionLog {
    pub const DEFAULT_CAPACITY: usize = 64;

    /// Create an empty log holding at most `capacity` records.
    ///
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity.min(Self::DEFAULT_CAPACITY)),
            capacity,
            total: 0,
        }
    }

    /// Append a record, evicting the oldest one when full.
    pub fn record(&mut self, record: TransitionRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
        self.total += 1;
    }

    /// Records in the order they were committed.
    pub fn records(&self) -> impl Iterator<Item = &TransitionRecord> {
        self.records.iter()
    }

    /// Kinds of the held records, oldest first.
    pub fn kinds(&self) -> Vec<TransitionKind> {
        self.records.iter().map(|r| r.kind).collect()
    }

    /// The most recent record.
    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of records ever recorded, including evicted ones.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Time between the oldest and newest held records.
    ///
    /// Returns `None` if the log is empty.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.records.front()?, self.records.back()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
