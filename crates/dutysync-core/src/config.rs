use crate::error::{DutySyncError, Result};
use crate::mapping::{RecipientId, RecipientMapping};
use crate::message::{MessageTemplate, DEFAULT_CONJUNCTION};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// File the CLI reads when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "dutysync.yaml";

pub const NOTION_TOKEN_VAR: &str = "NOTION_TOKEN";
pub const SLACK_TOKEN_VAR: &str = "SLACK_TOKEN";
pub const DATABASE_ID_VAR: &str = "DATABASE_ID";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// NotionConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotionConfig {
    /// Id of the duty roster database.
    pub database_id: String,
    #[serde(default = "default_notion_api_base")]
    pub api_base: String,
}

fn default_notion_api_base() -> String {
    "https://api.notion.com/v1".to_string()
}

// ---------------------------------------------------------------------------
// SlackConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    #[serde(default = "default_slack_api_base")]
    pub api_base: String,
}

fn default_slack_api_base() -> String {
    "https://slack.com/api".to_string()
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            api_base: default_slack_api_base(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// IANA timezone the run's "today" is computed in. Never the process
    /// timezone: the same roster must reconcile identically no matter where
    /// the job happens to run.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Optional runbook link rendered into every notification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_link: Option<String>,
    /// Joiner for assignee names in fallback mention text.
    #[serde(default = "default_conjunction")]
    pub conjunction: String,
    pub notion: NotionConfig,
    #[serde(default)]
    pub slack: SlackConfig,
    /// Assignee display name → messaging-service member id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub recipients: BTreeMap<String, String>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_conjunction() -> String {
    DEFAULT_CONJUNCTION.to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DutySyncError::ConfigNotFound(path.display().to_string()));
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| DutySyncError::InvalidTimezone(self.timezone.clone()))
    }

    /// The run's reference date: the current calendar date in the configured
    /// timezone.
    pub fn today(&self) -> Result<NaiveDate> {
        let tz = self.timezone()?;
        Ok(chrono::Utc::now().with_timezone(&tz).date_naive())
    }

    pub fn mapping(&self) -> RecipientMapping {
        RecipientMapping::from_pairs(self.recipients.iter().map(|(name, id)| (name.clone(), id)))
    }

    pub fn template(&self) -> MessageTemplate {
        MessageTemplate {
            reference_link: self.reference_link.clone(),
            conjunction: self.conjunction.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        // 1. Timezone must be a known IANA name
        if self.timezone.parse::<Tz>().is_err() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("unknown timezone '{}'", self.timezone),
            });
        }

        // 2. The roster database must be identified
        if self.notion.database_id.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "notion.database_id is empty".to_string(),
            });
        }

        // 3. API bases must be http(s) URLs
        for (key, base) in [
            ("notion.api_base", &self.notion.api_base),
            ("slack.api_base", &self.slack.api_base),
        ] {
            if !base.starts_with("http://") && !base.starts_with("https://") {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("{key} '{base}' is not an http(s) URL"),
                });
            }
        }

        // 4. Recipient ids must have the member-id shape; malformed entries
        //    are skipped at run time and those assignees fall back to names
        for (name, value) in &self.recipients {
            if RecipientId::parse(value).is_none() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("recipient '{name}' has a malformed id '{value}'"),
                });
            }
        }

        // 5. An empty table means every mention falls back to plain names
        if self.recipients.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "recipients table is empty; no assignee can be mentioned directly"
                    .to_string(),
            });
        }

        // 6. The runbook link is pasted into messages as-is
        if let Some(link) = &self.reference_link {
            if !link.starts_with("http://") && !link.starts_with("https://") {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("reference_link '{link}' is not an http(s) URL"),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// API tokens, read from the environment only. They never appear in the
/// config file and are never logged.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub notion_token: String,
    pub slack_token: String,
    /// Optional override of `notion.database_id`.
    pub database_id: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |var: &'static str| -> Result<String> {
            match lookup(var) {
                Some(value) if !value.trim().is_empty() => Ok(value),
                _ => Err(DutySyncError::MissingCredential(var)),
            }
        };
        Ok(Self {
            notion_token: require(NOTION_TOKEN_VAR)?,
            slack_token: require(SLACK_TOKEN_VAR)?,
            database_id: lookup(DATABASE_ID_VAR).filter(|v| !v.trim().is_empty()),
        })
    }

    /// The roster database id for this run, preferring the env override.
    pub fn database_id_or(&self, configured: &str) -> String {
        self.database_id
            .clone()
            .unwrap_or_else(|| configured.to_string())
    }
}

// ---------------------------------------------------------------------------
// Date arguments
// ---------------------------------------------------------------------------

/// Parse a user-supplied reference date (`--date 2025-07-29`).
pub fn parse_date_arg(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| DutySyncError::InvalidDate(value.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
