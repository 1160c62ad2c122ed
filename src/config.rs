use log::debug;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable consulted for the API key.
pub const API_KEY_ENV: &str = "DATA_GOV_SG_API_KEY";

const CONFIG_DIR_NAME: &str = "sgmet";
const KEY_FILE_NAME: &str = "api_key";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No API key found: pass --api-key, set DATA_GOV_SG_API_KEY, or write the key to <config dir>/sgmet/api_key")]
    MissingApiKey,

    #[error("Failed to read API key file '{0}'")]
    KeyFileRead(PathBuf, #[source] io::Error),
}

/// Credential sent in the `api-key` header. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Resolves the key from an explicit value (flag or environment, as
    /// provided by the CLI), falling back to the key file in the user's
    /// config directory.
    pub fn load(explicit: Option<String>) -> Result<Self, ConfigError> {
        if let Some(key) = explicit.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()) {
            return Ok(Self(key));
        }
        match default_key_file() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Err(ConfigError::MissingApiKey),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Reading API key from {}", path.display());
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::KeyFileRead(path.to_path_buf(), e))?;
        let key = contents.trim();
        if key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(Self(key.to_string()))
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

pub fn default_key_file() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(CONFIG_DIR_NAME).join(KEY_FILE_NAME))
}
