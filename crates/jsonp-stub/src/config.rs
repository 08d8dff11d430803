//! Stub configuration and rule files
//!
//! Rule files can be YAML or JSON:
//!
//! ```yaml
//! config:
//!   default_callback_key: cb
//! rules:
//!   - pattern: { type: regex, value: 'adserver\.example/.*' }
//!     payload: { slot: banner }
//!     uses: 2
//!   - pattern: { type: any_of, value: [] }
//! ```

use crate::pattern::UrlPattern;
use crate::registry::{StubRule, DEFAULT_CALLBACK_KEY, DEFAULT_USES};
use crate::result::{StubError, StubResult};
use crate::synth::DEFAULT_CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::rc::Rc;

/// Defaults applied to stub rules and synthesized resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StubConfig {
    /// Uses given to rules that don't specify any
    pub default_uses: u32,
    /// Callback parameter for rules that don't specify one
    pub default_callback_key: String,
    /// MIME type of synthesized scripts
    pub content_type: String,
    /// Origin embedded in in-memory blob handles
    pub blob_origin: String,
    /// Filter used by [`crate::logging::init_logging`] when `RUST_LOG` is unset
    pub log_filter: String,
    /// Emit JSON log lines
    pub log_json: bool,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            default_uses: DEFAULT_USES,
            default_callback_key: DEFAULT_CALLBACK_KEY.to_string(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            blob_origin: "http://localhost".to_string(),
            log_filter: "info".to_string(),
            log_json: false,
        }
    }
}

impl StubConfig {
    /// Create a new config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set default uses
    #[must_use]
    pub const fn with_default_uses(mut self, uses: u32) -> Self {
        self.default_uses = uses;
        self
    }

    /// Set default callback key
    #[must_use]
    pub fn with_callback_key(mut self, key: &str) -> Self {
        self.default_callback_key = key.to_string();
        self
    }

    /// Set blob origin
    #[must_use]
    pub fn with_blob_origin(mut self, origin: &str) -> Self {
        self.blob_origin = origin.to_string();
        self
    }

    /// Check the config is usable
    pub fn validate(&self) -> StubResult<()> {
        if self.default_callback_key.is_empty() {
            return Err(StubError::invalid_config("default_callback_key is empty"));
        }
        if self.content_type.is_empty() {
            return Err(StubError::invalid_config("content_type is empty"));
        }
        Ok(())
    }
}

/// Serializable form of [`UrlPattern`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PatternSpec {
    /// Exact URL match
    Exact(String),
    /// Prefix match
    Prefix(String),
    /// Contains substring
    Contains(String),
    /// Regex match
    Regex(String),
    /// Glob match
    Glob(String),
    /// Match any URL
    Any,
    /// Match if any inner pattern matches
    AnyOf(Vec<PatternSpec>),
}

impl PatternSpec {
    /// Build the runtime pattern
    pub fn build(&self) -> StubResult<UrlPattern> {
        Ok(match self {
            Self::Exact(s) => UrlPattern::exact(s.as_str()),
            Self::Prefix(s) => UrlPattern::prefix(s.as_str()),
            Self::Contains(s) => UrlPattern::contains(s.as_str()),
            Self::Regex(s) => UrlPattern::regex(s).map_err(|e| {
                StubError::invalid_config(format!("pattern /{s}/ does not compile: {e}"))
            })?,
            Self::Glob(s) => UrlPattern::glob(s.as_str()),
            Self::Any => UrlPattern::Any,
            Self::AnyOf(specs) => UrlPattern::AnyOf(
                specs
                    .iter()
                    .map(Self::build)
                    .collect::<StubResult<Vec<_>>>()?,
            ),
        })
    }
}

/// One rule in a rule file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// URL pattern
    pub pattern: PatternSpec,
    /// Payload delivered to the callback
    #[serde(default)]
    pub payload: Value,
    /// Times the rule fires (config default if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses: Option<u32>,
    /// Callback parameter (config default if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_key: Option<String>,
}

impl RuleSpec {
    /// Build a stub rule, filling gaps from `defaults`
    pub fn to_rule(&self, defaults: &StubConfig) -> StubResult<StubRule> {
        let callback_key = self
            .callback_key
            .as_deref()
            .unwrap_or(&defaults.default_callback_key);
        if callback_key.is_empty() {
            return Err(StubError::invalid_config(format!(
                "rule for {:?} has an empty callback_key",
                self.pattern
            )));
        }
        let pattern = Rc::new(self.pattern.build()?);
        Ok(StubRule::new(pattern, self.payload.clone())
            .uses(self.uses.unwrap_or(defaults.default_uses))
            .callback_key(callback_key))
    }
}

/// A rule file: optional config plus ordered rules
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StubFile {
    /// Defaults
    #[serde(default)]
    pub config: StubConfig,
    /// Rules in priority order
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

impl StubFile {
    /// Parse a YAML rule file
    pub fn from_yaml_str(yaml: &str) -> StubResult<Self> {
        let file: Self = serde_yaml_ng::from_str(yaml)?;
        file.config.validate()?;
        Ok(file)
    }

    /// Parse a JSON rule file
    pub fn from_json_str(json: &str) -> StubResult<Self> {
        let file: Self = serde_json::from_str(json)?;
        file.config.validate()?;
        Ok(file)
    }

    /// Load a rule file; `.json` files are JSON, anything else is YAML
    pub fn load(path: &Path) -> StubResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        }
    }

    /// Build every rule with this file's config as defaults
    pub fn to_rules(&self) -> StubResult<Vec<StubRule>> {
        self.rules.iter().map(|r| r.to_rule(&self.config)).collect()
    }

    /// Serialize back to YAML
    pub fn to_yaml(&self) -> StubResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}
