//! Built-in defaults (layer 1) and the typed view of the merged config.

use chainwitness_model::HashAlgorithm;
use serde::{Deserialize, Serialize};

use super::effective::ConfigError;
use crate::crypto::DEFAULT_PBKDF2_ITERATIONS;

/// Typed configuration. `Default` is the built-in layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub hashing: HashingSettings,
    pub keys: KeySettings,
    pub logging: LoggingSettings,
    pub verification: VerificationSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HashingSettings {
    /// `sha256`, `sha384` or `sha512`
    pub algorithm: String,

    /// Hash CRLF and CR as LF
    pub normalize_line_endings: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeySettings {
    /// PBKDF2 work factor for newly encrypted private keys
    pub pbkdf2_iterations: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// `EnvFilter` directive, overridden by `RUST_LOG` and `--log-filter`
    pub filter: String,

    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerificationSettings {
    /// Largest layout or link document read from disk
    pub max_document_bytes: u64,
}

impl Default for HashingSettings {
    fn default() -> Self {
        Self {
            algorithm: "sha256".to_string(),
            normalize_line_endings: false,
        }
    }
}

impl Default for KeySettings {
    fn default() -> Self {
        Self {
            pbkdf2_iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            max_document_bytes: 16 * 1024 * 1024,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hashing: HashingSettings::default(),
            keys: KeySettings::default(),
            logging: LoggingSettings::default(),
            verification: VerificationSettings::default(),
        }
    }
}

impl Settings {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> Result<serde_json::Value, ConfigError> {
        serde_json::to_value(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let settings: Self =
            serde_json::from_value(value).map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn hash_algorithm(&self) -> Result<HashAlgorithm, ConfigError> {
        HashAlgorithm::from_id(&self.hashing.algorithm).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "hashing.algorithm must be sha256, sha384 or sha512, got {:?}",
                self.hashing.algorithm
            ))
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.hash_algorithm()?;

        if self.keys.pbkdf2_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "keys.pbkdf2_iterations must be at least 1".to_string(),
            ));
        }

        if self.verification.max_document_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "verification.max_document_bytes must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.hashing.algorithm, "sha256");
        assert!(!settings.hashing.normalize_line_endings);
        assert_eq!(settings.keys.pbkdf2_iterations, 100_000);
        assert_eq!(settings.logging.filter, "info");
        assert_eq!(settings.verification.max_document_bytes, 16_777_216);
    }

    #[test]
    fn test_to_value() {
        let value = Settings::default().to_value().unwrap();
        assert_eq!(value["hashing"]["algorithm"], "sha256");
        assert_eq!(value["logging"]["json"], false);
    }

    #[test]
    fn test_partial_value_fills_defaults() {
        let settings = Settings::from_value(json!({"logging": {"json": true}})).unwrap();
        assert!(settings.logging.json);
        assert_eq!(settings.logging.filter, "info");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Settings::from_value(json!({"hashing": {"algo": "sha1"}})).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_bad_algorithm_rejected() {
        let err = Settings::from_value(json!({"hashing": {"algorithm": "md5"}})).unwrap_err();
        assert!(err.to_string().contains("hashing.algorithm"));
    }

    #[test]
    fn test_zero_iterations_rejected() {
        assert!(Settings::from_value(json!({"keys": {"pbkdf2_iterations": 0}})).is_err());
    }
}
