use crate::mapping::{RecipientId, RecipientMapping};
use crate::record::DutyRecord;

/// Mention text used when a record has no assignees and nothing resolved.
pub const GENERIC_FALLBACK: &str = "on-call personnel";

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Outcome of resolving a record's people to message recipients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Deduplicated recipient ids: well-formed inline ids first, then
    /// mapping hits for each assignee name. First occurrence wins.
    pub ids: Vec<RecipientId>,
    /// Human-readable stand-in used when nothing resolved: all assignee
    /// names joined with the configured conjunction, or a generic
    /// placeholder when the record names nobody.
    pub fallback: String,
}

// ---------------------------------------------------------------------------
// resolve
// ---------------------------------------------------------------------------

/// Map a record's assignees and inline id fields to recipient ids.
///
/// Pure function of (record, mapping). A name with neither a mapping entry
/// nor an inline id contributes nothing to `ids` but still appears in
/// `fallback`: the fallback is built from the full name list no matter how
/// resolution went.
pub fn resolve(record: &DutyRecord, mapping: &RecipientMapping, conjunction: &str) -> Resolution {
    let mut ids: Vec<RecipientId> = Vec::new();

    for raw in &record.recipient_fields {
        if let Some(id) = RecipientId::parse(raw) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }

    for name in &record.assignees {
        if let Some(id) = mapping.lookup(name) {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
    }

    let fallback = if record.assignees.is_empty() {
        GENERIC_FALLBACK.to_string()
    } else {
        record.assignees.join(conjunction)
    };

    Resolution { ids, fallback }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
