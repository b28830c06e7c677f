use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Status values
// ---------------------------------------------------------------------------

// The roster's status field is an open set edited by humans; only these two
// values mean anything to the engine. Everything else passes through.
pub const STATUS_DONE: &str = "Done";
pub const STATUS_ONGOING: &str = "Ongoing";

/// Placeholder title for records whose title property is empty.
pub const UNTITLED_DUTY: &str = "Untitled duty";

// ---------------------------------------------------------------------------
// DutyRecord
// ---------------------------------------------------------------------------

/// One row of the duty roster, as read from the record source.
///
/// Records are created and edited by humans outside this system; dutysync
/// only reads them and applies the two guarded transitions (notify, close).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DutyRecord {
    /// Opaque stable id assigned by the store.
    pub id: String,
    pub title: String,
    /// Assignee display names, in roster order. May be empty.
    pub assignees: Vec<String>,
    /// Raw inline recipient-identifier strings from the record itself.
    /// Unvalidated here; the resolver shape-checks them.
    pub recipient_fields: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Open-ended status value; `None` when the property is unset.
    pub status: Option<String>,
    /// True once a start-of-duty notification has been sent. Monotonic:
    /// never reset by this system.
    pub notified: bool,
}

impl DutyRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            assignees: Vec::new(),
            recipient_fields: Vec::new(),
            start_date: None,
            end_date: None,
            status: None,
            notified: false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status.as_deref() == Some(STATUS_DONE)
    }

    /// Derive the record's lifecycle state for `today`. Never stored; the
    /// roster fields are the only source of truth.
    pub fn state(&self, today: NaiveDate) -> RecordState {
        if self.is_done() {
            return RecordState::Closed;
        }
        if self.end_date.is_some_and(|end| today > end) {
            return RecordState::Expired;
        }
        if self.start_date == Some(today) && !self.notified {
            return RecordState::DueToday;
        }
        if self.notified {
            return RecordState::Notified;
        }
        RecordState::Pending
    }
}

// ---------------------------------------------------------------------------
// RecordState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    Pending,
    DueToday,
    Notified,
    Expired,
    Closed,
}

impl RecordState {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordState::Pending => "pending",
            RecordState::DueToday => "due_today",
            RecordState::Notified => "notified",
            RecordState::Expired => "expired",
            RecordState::Closed => "closed",
        }
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// DutyPatch
// ---------------------------------------------------------------------------

/// Partial update written back to the record source. Only the fields that
/// are `Some` are touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutyPatch {
    pub notified: Option<bool>,
    pub status: Option<String>,
}

impl DutyPatch {
    /// Patch for the notify transition: mark notified and move to Ongoing,
    /// in a single update call.
    pub fn begun() -> Self {
        Self {
            notified: Some(true),
            status: Some(STATUS_ONGOING.to_string()),
        }
    }

    /// Patch for the close transition.
    pub fn done() -> Self {
        Self {
            notified: None,
            status: Some(STATUS_DONE.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Date parsing
// ---------------------------------------------------------------------------

/// Parse a roster date value down to a calendar date.
///
/// The store may return a bare date (`2025-07-29`) or a datetime with an
/// offset (`2025-07-29T09:00:00.000+08:00`). Comparisons are date-only, so
/// the calendar-date prefix is kept and any time/offset is discarded.
pub fn parse_date_only(value: &str) -> Option<NaiveDate> {
    let prefix = value.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
