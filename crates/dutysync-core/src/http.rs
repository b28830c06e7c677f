//! Shared plumbing for the blocking HTTP adapters.

use crate::error::{DutySyncError, Result};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Per-call timeout. One scheduled run makes a handful of calls; anything
/// slower than this should fail and be retried by the next run.
pub(crate) const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn client() -> Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()?)
}

/// Check the status line, then deserialize the body. A non-2xx status
/// becomes `Api`; a 2xx body that does not parse becomes
/// `MalformedResponse`.
pub(crate) fn read_json<T: DeserializeOwned>(
    endpoint: &str,
    response: reqwest::blocking::Response,
) -> Result<T> {
    let status = response.status();
    let text = response.text()?;
    if !status.is_success() {
        return Err(DutySyncError::Api {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body: body_snippet(&text),
        });
    }
    serde_json::from_str(&text).map_err(|e| DutySyncError::MalformedResponse {
        endpoint: endpoint.to_string(),
        detail: e.to_string(),
    })
}

/// Error bodies go into logs and error chains; keep them to one line and a
/// bounded length.
pub(crate) fn body_snippet(body: &str) -> String {
    const MAX_CHARS: usize = 300;
    let flat = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > MAX_CHARS {
        let mut cut: String = flat.chars().take(MAX_CHARS).collect();
        cut.push('\u{2026}');
        cut
    } else {
        flat
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
