use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// RecipientId
// ---------------------------------------------------------------------------

static RECIPIENT_ID_RE: OnceLock<Regex> = OnceLock::new();

// Slack member ids: U (user) or W (enterprise) prefix, uppercase alphanumeric.
fn recipient_id_re() -> &'static Regex {
    RECIPIENT_ID_RE.get_or_init(|| Regex::new(r"^[UW][A-Z0-9]{3,}$").unwrap())
}

/// Opaque handle the messaging service uses to address a direct message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientId(String);

impl RecipientId {
    /// Accept a string only if it has the recognized id shape. Surrounding
    /// whitespace is trimmed; anything else (names, emails, empty cells
    /// people leave in the roster) is rejected.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if recipient_id_re().is_match(trimmed) {
            Some(Self(trimmed.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// RecipientMapping
// ---------------------------------------------------------------------------

/// Static assignee-name → recipient-id table, loaded once per run from
/// configuration and read-only thereafter.
#[derive(Debug, Clone, Default)]
pub struct RecipientMapping {
    entries: BTreeMap<String, RecipientId>,
}

impl RecipientMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mapping from raw (name, id) pairs. Entries whose id does not
    /// have the recognized shape are skipped with a warning rather than
    /// failing the run. The affected assignees fall back to name mentions.
    pub fn from_pairs<I, N, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: AsRef<str>,
    {
        let mut entries = BTreeMap::new();
        for (name, value) in pairs {
            let name = name.into();
            match RecipientId::parse(value.as_ref()) {
                Some(id) => {
                    entries.insert(name, id);
                }
                None => {
                    tracing::warn!(
                        name = %name,
                        value = %value.as_ref(),
                        "skipping recipient mapping entry with malformed id"
                    );
                }
            }
        }
        Self { entries }
    }

    pub fn lookup(&self, name: &str) -> Option<&RecipientId> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
