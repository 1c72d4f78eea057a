mod keys;

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::error::{AiError, Result};

pub use keys::ConfigKey;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

const HIDDEN_KEY: &str = "***set but hidden***";
const UNSET_KEY: &str = "not set";

/// Connection settings for the chat-completion endpoint.
///
/// Always holds a complete set of values: anything missing from the persisted
/// record keeps its default.
#[derive(Debug, Clone, PartialEq)]
pub struct AiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub timeout: u64,
    path: PathBuf,
}

/// What happened when the persisted record was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The record was read and merged over the in-memory values.
    Loaded,
    /// No record exists yet; defaults are in effect.
    Defaulted,
    /// The record exists but could not be read or parsed; previous values are kept.
    Failed { reason: String },
}

impl LoadOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, LoadOutcome::Failed { .. })
    }
}

/// The six values handed over by the host in one go. Numeric fields arrive as
/// host strings; an empty string means "use the default".
#[derive(Debug, Clone, Default)]
pub struct ConfigImport {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: String,
    pub temperature: String,
    pub timeout: String,
}

/// Display-safe view of the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSummary {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub timeout: u64,
    pub path: PathBuf,
}

impl ConfigSummary {
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("API key:     {}", self.api_key),
            format!("Base URL:    {}", self.base_url),
            format!("Model:       {}", self.model),
            format!("Max tokens:  {}", self.max_tokens),
            format!("Temperature: {}", self.temperature),
            format!("Timeout:     {}s", self.timeout),
            format!("Config file: {}", self.path.display()),
        ]
    }
}

#[derive(Serialize)]
struct StoredConfigRef<'a> {
    api_key: &'a str,
    base_url: &'a str,
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    timeout: u64,
}

impl AiConfig {
    /// Defaults bound to `path`, without touching the filesystem.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout: DEFAULT_TIMEOUT_SECS,
            path: path.into(),
        }
    }

    /// Defaults bound to `path`, then merged with whatever is persisted there.
    pub fn load_from(path: impl Into<PathBuf>) -> (Self, LoadOutcome) {
        let mut config = Self::at(path);
        let outcome = config.load();
        (config, outcome)
    }

    /// `~/.stata_ai/config.json`
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".stata_ai")
            .join("config.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Merge the persisted record over the current values.
    ///
    /// Never fails: an unreadable file or malformed JSON leaves every field as
    /// it was, and a single bad field only keeps that field's current value.
    pub fn load(&mut self) -> LoadOutcome {
        if !self.path.exists() {
            tracing::debug!("no config at {}, using defaults", self.path.display());
            return LoadOutcome::Defaulted;
        }

        match self.read_stored() {
            Ok(record) => {
                self.merge(&record);
                tracing::debug!("loaded config from {}", self.path.display());
                LoadOutcome::Loaded
            }
            Err(e) => {
                tracing::warn!("ignoring config at {}: {}", self.path.display(), e);
                LoadOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn read_stored(&self) -> Result<Map<String, Value>> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| AiError::ConfigLoad(e.to_string()))?;
        match serde_json::from_str(&content).map_err(|e| AiError::ConfigLoad(e.to_string()))? {
            Value::Object(record) => Ok(record),
            other => Err(AiError::ConfigLoad(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Apply each readable field on its own. A field that is missing or has
    /// the wrong shape keeps its current value.
    fn merge(&mut self, record: &Map<String, Value>) {
        let text = |v: &Value| v.as_str().map(str::to_string);

        if let Some(api_key) = stored_field(record, ConfigKey::ApiKey, text) {
            self.api_key = api_key;
        }
        if let Some(base_url) = stored_field(record, ConfigKey::BaseUrl, text) {
            self.base_url = base_url;
        }
        if let Some(model) = stored_field(record, ConfigKey::Model, text) {
            self.model = model;
        }
        if let Some(max_tokens) = stored_field(record, ConfigKey::MaxTokens, |v| {
            v.as_u64()
                .filter(|n| *n > 0)
                .and_then(|n| u32::try_from(n).ok())
        }) {
            self.max_tokens = max_tokens;
        }
        if let Some(temperature) = stored_field(record, ConfigKey::Temperature, |v| {
            v.as_f64().filter(|t| t.is_finite())
        }) {
            self.temperature = temperature;
        }
        if let Some(timeout) =
            stored_field(record, ConfigKey::Timeout, |v| v.as_u64().filter(|n| *n > 0))
        {
            self.timeout = timeout;
        }
    }

    /// Overwrite the persisted record with all six fields.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| AiError::ConfigSave(format!("{}: {}", parent.display(), e)))?;
            }
        }
        let stored = StoredConfigRef {
            api_key: &self.api_key,
            base_url: &self.base_url,
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.timeout,
        };
        let content = serde_json::to_string_pretty(&stored)
            .map_err(|e| AiError::ConfigSave(e.to_string()))?;
        std::fs::write(&self.path, content)
            .map_err(|e| AiError::ConfigSave(format!("{}: {}", self.path.display(), e)))?;
        Ok(())
    }

    /// Set one field by host name or alias, then persist.
    ///
    /// An unknown key or a value that fails validation changes nothing. A
    /// `ConfigSave` error means the new value is live in memory but not on disk.
    pub fn set(&mut self, key: &str, value: &str) -> Result<ConfigKey> {
        let key = ConfigKey::parse(key)?;
        self.apply(key, value)?;
        if key.is_secret() {
            tracing::info!("updated {}", key);
        } else {
            tracing::info!("updated {} = {}", key, value);
        }
        self.save()?;
        Ok(key)
    }

    fn apply(&mut self, key: ConfigKey, value: &str) -> Result<()> {
        match key {
            ConfigKey::ApiKey => self.api_key = value.to_string(),
            ConfigKey::BaseUrl => self.base_url = value.to_string(),
            ConfigKey::Model => self.model = value.to_string(),
            ConfigKey::MaxTokens => self.max_tokens = keys::parse_max_tokens(value)?,
            ConfigKey::Temperature => self.temperature = keys::parse_temperature(value)?,
            ConfigKey::Timeout => self.timeout = keys::parse_timeout(value)?,
        }
        Ok(())
    }

    /// Replace all six fields from host-supplied values. Validation happens up
    /// front so a bad number leaves the configuration untouched. Not persisted.
    pub fn import(&mut self, values: ConfigImport) -> Result<()> {
        let max_tokens = or_default(&values.max_tokens, DEFAULT_MAX_TOKENS, keys::parse_max_tokens)?;
        let temperature =
            or_default(&values.temperature, DEFAULT_TEMPERATURE, keys::parse_temperature)?;
        let timeout = or_default(&values.timeout, DEFAULT_TIMEOUT_SECS, keys::parse_timeout)?;

        self.api_key = values.api_key;
        self.base_url = values.base_url;
        self.model = values.model;
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self.timeout = timeout;
        tracing::debug!("imported config from host");
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub fn show(&self) -> ConfigSummary {
        ConfigSummary {
            api_key: mask_api_key(&self.api_key),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.timeout,
            path: self.path.clone(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self::at(Self::default_path())
    }
}

fn stored_field<T>(
    record: &Map<String, Value>,
    key: ConfigKey,
    read: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    let value = record.get(key.name())?;
    let parsed = read(value);
    if parsed.is_none() {
        if key.is_secret() {
            tracing::warn!("ignoring unreadable {} in config", key);
        } else {
            tracing::warn!("ignoring unreadable {} in config: {}", key, value);
        }
    }
    parsed
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn or_default<T>(value: &str, default: T, parse: fn(&str) -> Result<T>) -> Result<T> {
    if value.trim().is_empty() {
        Ok(default)
    } else {
        parse(value)
    }
}

/// Render a secret for display: first and last four characters around a run
/// of stars, a fixed placeholder for short keys, "not set" for an empty one.
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    match chars.len() {
        0 => UNSET_KEY.to_string(),
        n if n <= 8 => HIDDEN_KEY.to_string(),
        n => {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[n - 4..].iter().collect();
            format!("{}{}{}", head, "*".repeat(n - 8), tail)
        }
    }
}
