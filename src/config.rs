//! Instrumentation settings. Loaded from JSON, either as a document or as
//! the already-decoded key/value map a host hands over.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::hook::HookIdentifier;

pub const DEFAULT_HOOK_IDENTIFIER: &str = "peekz";
pub const DEFAULT_REPORT_ENDPOINT: &str = "http://127.0.0.1:8765/report";

/// Selects bodies by content type. `match_substring` is tested with
/// `contains` against the raw header value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentTypeRule {
    #[serde(alias = "includes")]
    pub match_substring: String,
    /// Rewrite inline `<script>` elements instead of the whole body.
    #[serde(alias = "isHTML")]
    pub is_markup: bool,
}

impl ContentTypeRule {
    pub fn script(match_substring: impl Into<String>) -> Self {
        Self { match_substring: match_substring.into(), is_markup: false }
    }

    pub fn markup(match_substring: impl Into<String>) -> Self {
        Self { match_substring: match_substring.into(), is_markup: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstrumentConfig {
    pub hook_identifier: HookIdentifier,
    pub report_endpoint: String,
    /// Checked in order; the first match wins.
    pub content_types: Vec<ContentTypeRule>,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            hook_identifier: HookIdentifier::default(),
            report_endpoint: DEFAULT_REPORT_ENDPOINT.to_string(),
            content_types: vec![
                ContentTypeRule::markup("text/html"),
                ContentTypeRule::script("text/javascript"),
            ],
        }
    }
}

impl InstrumentConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Unknown keys are ignored; missing keys take their defaults.
    pub fn from_map(mut map: HashMap<String, serde_json::Value>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(v) = map.remove("hookIdentifier") {
            config.hook_identifier = serde_json::from_value(v)?;
        }
        if let Some(v) = map.remove("reportEndpoint") {
            config.report_endpoint = serde_json::from_value(v)?;
        }
        if let Some(v) = map.remove("contentTypes") {
            config.content_types = serde_json::from_value(v)?;
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        // an empty needle would match every content type
        if let Some(index) = self.content_types.iter().position(|r| r.match_substring.is_empty()) {
            return Err(ConfigError::EmptyMatch { index });
        }
        Ok(())
    }
}
