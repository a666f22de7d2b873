//! Domain identifiers (strongly-typed IDs).
//!
//! Every table hands out `INTEGER PRIMARY KEY` values, so all ids share one
//! representation. The phantom marker keeps a `TaskId` from being passed where
//! a `PartnerId` is expected without costing anything at runtime.
//!
//! Id `0` is the "not yet stored" value: a task built by `receive` carries it
//! until `store` assigns the generated key.

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

/// Marker trait for each id kind.
pub trait IdMarker: Send + Sync + 'static {
    /// Entity name used in log fields (e.g. "task").
    fn kind() -> &'static str;
}

#[repr(transparent)]
pub struct Id<T: IdMarker> {
    value: i64,
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub const UNSAVED: Self = Self::new(0);

    pub const fn new(value: i64) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }

    pub fn get(self) -> i64 {
        self.value
    }

    pub fn is_unsaved(self) -> bool {
        self.value == 0
    }
}

// Manual impls: derives would put bounds on `T`, which is never instantiated.
impl<T: IdMarker> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: IdMarker> Copy for Id<T> {}

impl<T: IdMarker> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: IdMarker> Eq for Id<T> {}

impl<T: IdMarker> std::hash::Hash for Id<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T: IdMarker> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: IdMarker> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}

impl<T: IdMarker> Default for Id<T> {
    fn default() -> Self {
        Self::UNSAVED
    }
}

impl<T: IdMarker> From<i64> for Id<T> {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", T::kind(), self.value)
    }
}

/// Displays the bare number; it is part of the confirmation path.
impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

impl<T: IdMarker> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.value)
    }
}

impl<'de, T: IdMarker> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i64::deserialize(deserializer).map(Self::new)
    }
}

impl<T: IdMarker> ToSql for Id<T> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.value))
    }
}

impl<T: IdMarker> FromSql for Id<T> {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Self::new)
    }
}

// ========================================
// Marker types
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskMarker {}

impl IdMarker for TaskMarker {
    fn kind() -> &'static str {
        "task"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StepMarker {}

impl IdMarker for StepMarker {
    fn kind() -> &'static str {
        "step"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventMarker {}

impl IdMarker for EventMarker {
    fn kind() -> &'static str {
        "event"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PartnerMarker {}

impl IdMarker for PartnerMarker {
    fn kind() -> &'static str {
        "partner"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubscriberMarker {}

impl IdMarker for SubscriberMarker {
    fn kind() -> &'static str {
        "subscriber"
    }
}

/// Identifier of a stored, deduplicated transaction.
pub type TaskId = Id<TaskMarker>;

/// Identifier of one delivery obligation.
pub type StepId = Id<StepMarker>;

pub type EventId = Id<EventMarker>;

pub type PartnerId = Id<PartnerMarker>;

pub type SubscriberId = Id<SubscriberMarker>;
