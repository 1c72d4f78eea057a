use std::fmt;
use std::str::FromStr;

use crate::error::{AiError, Result};

/// A configuration field addressable from the host by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    ApiKey,
    BaseUrl,
    Model,
    MaxTokens,
    Temperature,
    Timeout,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 6] = [
        ConfigKey::ApiKey,
        ConfigKey::BaseUrl,
        ConfigKey::Model,
        ConfigKey::MaxTokens,
        ConfigKey::Temperature,
        ConfigKey::Timeout,
    ];

    /// Resolve a host-facing name or alias. Matching ignores case and surrounding whitespace.
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "apikey" | "api_key" => Ok(ConfigKey::ApiKey),
            "baseurl" | "base_url" => Ok(ConfigKey::BaseUrl),
            "model" => Ok(ConfigKey::Model),
            "max_tokens" | "maxtokens" => Ok(ConfigKey::MaxTokens),
            "temperature" => Ok(ConfigKey::Temperature),
            "timeout" => Ok(ConfigKey::Timeout),
            _ => Err(AiError::UnknownConfigKey(name.to_string())),
        }
    }

    /// Field name as written to the persisted record.
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::ApiKey => "api_key",
            ConfigKey::BaseUrl => "base_url",
            ConfigKey::Model => "model",
            ConfigKey::MaxTokens => "max_tokens",
            ConfigKey::Temperature => "temperature",
            ConfigKey::Timeout => "timeout",
        }
    }

    /// Short name the host command layer uses, e.g. `apikey` in `ai, config(apikey "...")`.
    pub fn host_alias(&self) -> &'static str {
        match self {
            ConfigKey::ApiKey => "apikey",
            ConfigKey::BaseUrl => "baseurl",
            other => other.name(),
        }
    }

    pub fn is_secret(&self) -> bool {
        matches!(self, ConfigKey::ApiKey)
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConfigKey {
    type Err = AiError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

pub(crate) fn parse_max_tokens(value: &str) -> Result<u32> {
    let parsed: u32 = value
        .trim()
        .parse()
        .map_err(|e| AiError::coercion(ConfigKey::MaxTokens.name(), value, format!("{e}")))?;
    if parsed == 0 {
        return Err(AiError::coercion(
            ConfigKey::MaxTokens.name(),
            value,
            "must be a positive integer",
        ));
    }
    Ok(parsed)
}

pub(crate) fn parse_timeout(value: &str) -> Result<u64> {
    let parsed: u64 = value
        .trim()
        .parse()
        .map_err(|e| AiError::coercion(ConfigKey::Timeout.name(), value, format!("{e}")))?;
    if parsed == 0 {
        return Err(AiError::coercion(
            ConfigKey::Timeout.name(),
            value,
            "must be a positive number of seconds",
        ));
    }
    Ok(parsed)
}

pub(crate) fn parse_temperature(value: &str) -> Result<f64> {
    let parsed: f64 = value
        .trim()
        .parse()
        .map_err(|e| AiError::coercion(ConfigKey::Temperature.name(), value, format!("{e}")))?;
    if !parsed.is_finite() {
        return Err(AiError::coercion(
            ConfigKey::Temperature.name(),
            value,
            "must be a finite number",
        ));
    }
    if !(0.0..=2.0).contains(&parsed) {
        tracing::warn!("temperature {} is outside the usual 0-2 range", parsed);
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_canonical_keys() {
        assert_eq!(ConfigKey::parse("apikey").unwrap(), ConfigKey::ApiKey);
        assert_eq!(ConfigKey::parse("api_key").unwrap(), ConfigKey::ApiKey);
        assert_eq!(ConfigKey::parse("baseurl").unwrap(), ConfigKey::BaseUrl);
        assert_eq!(ConfigKey::parse(" MaxTokens ").unwrap(), ConfigKey::MaxTokens);
        assert_eq!("timeout".parse::<ConfigKey>().unwrap(), ConfigKey::Timeout);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = ConfigKey::parse("config_file").unwrap_err();
        assert!(matches!(err, AiError::UnknownConfigKey(ref k) if k == "config_file"));
    }

    #[test]
    fn every_key_round_trips_through_its_names() {
        for key in ConfigKey::ALL {
            assert_eq!(ConfigKey::parse(key.name()).unwrap(), key);
            assert_eq!(ConfigKey::parse(key.host_alias()).unwrap(), key);
        }
    }

    #[test]
    fn numeric_validators() {
        assert_eq!(parse_max_tokens(" 2048 ").unwrap(), 2048);
        assert!(parse_max_tokens("0").is_err());
        assert!(parse_max_tokens("lots").is_err());
        assert!(parse_max_tokens("4096.5").is_err());

        assert_eq!(parse_timeout("30").unwrap(), 30);
        assert!(parse_timeout("-1").is_err());

        assert_eq!(parse_temperature("0.2").unwrap(), 0.2);
        assert_eq!(parse_temperature("1").unwrap(), 1.0);
        assert!(parse_temperature("warm").is_err());
        assert!(parse_temperature("NaN").is_err());
    }
}
