use crate::resolve::Resolution;

pub const DEFAULT_CONJUNCTION: &str = " and ";

// ---------------------------------------------------------------------------
// MessageTemplate
// ---------------------------------------------------------------------------

/// Renders the start-of-duty direct message.
///
/// The template is fixed; records only substitute into it. The runbook line
/// is emitted only when a reference link is configured.
#[derive(Debug, Clone)]
pub struct MessageTemplate {
    pub reference_link: Option<String>,
    /// Joiner for assignee names in fallback mention text, e.g. `" and "`.
    pub conjunction: String,
}

impl Default for MessageTemplate {
    fn default() -> Self {
        Self {
            reference_link: None,
            conjunction: DEFAULT_CONJUNCTION.to_string(),
        }
    }
}

impl MessageTemplate {
    /// The mention line: `<@ID>` tokens when anything resolved, otherwise
    /// the fallback text. Ids take priority as a whole; the two are never
    /// mixed in one message.
    pub fn mention_text(&self, resolution: &Resolution) -> String {
        if resolution.ids.is_empty() {
            resolution.fallback.clone()
        } else {
            resolution
                .ids
                .iter()
                .map(|id| format!("<@{id}>"))
                .collect::<Vec<_>>()
                .join(" ")
        }
    }

    pub fn render(&self, title: &str, resolution: &Resolution) -> String {
        let mention = self.mention_text(resolution);
        let mut message = format!(
            ":sunny: *Good morning!*\n{mention}\n:clipboard: *Today's Duty:* {title}\n"
        );
        if let Some(link) = &self.reference_link {
            message.push_str(&format!(":book: *Runbook:* {link}\n"));
        }
        message.push_str(":sparkles: Thanks for your work!");
        message
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
