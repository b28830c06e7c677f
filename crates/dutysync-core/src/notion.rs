//! Duty roster adapter for the Notion API.
//!
//! Records live as pages in one database. The adapter reads the whole
//! database (cursor pagination, no filter) and patches individual pages.
//! Property names are fixed by the roster schema:
//!
//!   Duty                  title
//!   Person                people
//!   Slack Username 1/2    rich text, optional inline recipient ids
//!   Notification Status   checkbox
//!   Start Date, End Date  date
//!   Status                status (select tolerated on read; writes require
//!                         the status type)

use serde::Deserialize;
use std::collections::HashMap;

use crate::engine::DutySource;
use crate::error::{DutySyncError, Result};
use crate::http::{body_snippet, client, read_json};
use crate::record::{parse_date_only, DutyPatch, DutyRecord, UNTITLED_DUTY};

const NOTION_VERSION: &str = "2022-06-28";

const PROP_TITLE: &str = "Duty";
const PROP_PERSON: &str = "Person";
const PROP_RECIPIENT_1: &str = "Slack Username 1";
const PROP_RECIPIENT_2: &str = "Slack Username 2";
const PROP_NOTIFIED: &str = "Notification Status";
const PROP_START: &str = "Start Date";
const PROP_END: &str = "End Date";
const PROP_STATUS: &str = "Status";

const QUERY_ENDPOINT: &str = "notion:databases.query";
const UPDATE_ENDPOINT: &str = "notion:pages.update";

// ---------------------------------------------------------------------------
// NotionSource
// ---------------------------------------------------------------------------

pub struct NotionSource {
    client: reqwest::blocking::Client,
    token: String,
    database_id: String,
    api_base: String,
}

impl NotionSource {
    pub fn new(
        token: impl Into<String>,
        database_id: impl Into<String>,
        api_base: &str,
    ) -> Result<Self> {
        Ok(Self {
            client: client()?,
            token: token.into(),
            database_id: database_id.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }
}

impl DutySource for NotionSource {
    fn list_records(&self) -> Result<Vec<DutyRecord>> {
        let url = format!("{}/databases/{}/query", self.api_base, self.database_id);
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = serde_json::Map::new();
            if let Some(c) = &cursor {
                body.insert(
                    "start_cursor".to_string(),
                    serde_json::Value::String(c.clone()),
                );
            }
            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.token)
                .header("Notion-Version", NOTION_VERSION)
                .json(&body)
                .send()?;
            let page: QueryResponse = read_json(QUERY_ENDPOINT, response)?;
            records.extend(page.results.into_iter().map(Page::into_record));
            if !page.has_more {
                break;
            }
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(records)
    }

    fn update_record(&self, id: &str, patch: &DutyPatch) -> Result<()> {
        let url = format!("{}/pages/{}", self.api_base, id);
        let mut properties = serde_json::Map::new();
        if let Some(notified) = patch.notified {
            properties.insert(
                PROP_NOTIFIED.to_string(),
                serde_json::json!({ "checkbox": notified }),
            );
        }
        if let Some(status) = &patch.status {
            properties.insert(
                PROP_STATUS.to_string(),
                serde_json::json!({ "status": { "name": status } }),
            );
        }

        let response = self
            .client
            .patch(&url)
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .json(&serde_json::json!({ "properties": properties }))
            .send()?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text()?;
            return Err(DutySyncError::Api {
                endpoint: UPDATE_ENDPOINT.to_string(),
                status: status.as_u16(),
                body: body_snippet(&text),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct QueryResponse {
    results: Vec<Page>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Page {
    id: String,
    #[serde(default)]
    properties: HashMap<String, Property>,
}

/// One property value. The API tags each with a `type` field, but every
/// variant carries its payload under a distinct key, so a single struct of
/// optional facets covers them all.
#[derive(Debug, Default, Deserialize)]
struct Property {
    #[serde(default)]
    title: Vec<RichText>,
    #[serde(default)]
    rich_text: Vec<RichText>,
    #[serde(default)]
    people: Vec<Person>,
    #[serde(default)]
    checkbox: Option<bool>,
    #[serde(default)]
    date: Option<DateValue>,
    #[serde(default)]
    status: Option<NamedValue>,
    #[serde(default)]
    select: Option<NamedValue>,
}

#[derive(Debug, Deserialize)]
struct RichText {
    #[serde(default)]
    plain_text: String,
}

#[derive(Debug, Deserialize)]
struct Person {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DateValue {
    #[serde(default)]
    start: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedValue {
    name: String,
}

impl Page {
    fn into_record(self) -> DutyRecord {
        let Page { id, properties } = self;
        let mut record = DutyRecord::new(id, UNTITLED_DUTY);

        if let Some(prop) = properties.get(PROP_TITLE) {
            let text = plain_text(&prop.title);
            if !text.trim().is_empty() {
                record.title = text;
            }
        }

        if let Some(prop) = properties.get(PROP_PERSON) {
            record.assignees = prop
                .people
                .iter()
                .filter_map(|p| p.name.clone())
                .collect();
        }

        for field in [PROP_RECIPIENT_1, PROP_RECIPIENT_2] {
            if let Some(prop) = properties.get(field) {
                let text = plain_text(&prop.rich_text);
                if !text.trim().is_empty() {
                    record.recipient_fields.push(text);
                }
            }
        }

        record.notified = properties
            .get(PROP_NOTIFIED)
            .and_then(|p| p.checkbox)
            .unwrap_or(false);
        record.start_date = date_value(&properties, PROP_START);
        record.end_date = date_value(&properties, PROP_END);
        record.status = properties
            .get(PROP_STATUS)
            .and_then(|p| p.status.as_ref().or(p.select.as_ref()))
            .map(|s| s.name.clone());

        record
    }
}

fn plain_text(runs: &[RichText]) -> String {
    runs.iter().map(|r| r.plain_text.as_str()).collect()
}

fn date_value(properties: &HashMap<String, Property>, name: &str) -> Option<chrono::NaiveDate> {
    properties
        .get(name)?
        .date
        .as_ref()?
        .start
        .as_deref()
        .and_then(parse_date_only)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
