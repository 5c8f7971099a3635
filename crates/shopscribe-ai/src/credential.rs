//! API key resolution: process environment first, then a `.env` file.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error(
        "ANTHROPIC_API_KEY not set. Set it in the environment or add a line \
         `ANTHROPIC_API_KEY=sk-ant-...` to {}",
        .env_file.display()
    )]
    Missing { env_file: PathBuf },
    #[error("failed to read {}: {source}", .path.display())]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
}

/// An API secret. `Debug` never prints the value.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Read the key from [`API_KEY_VAR`], falling back to `env_file`.
pub fn load_api_key(env_file: &Path) -> Result<ApiKey, CredentialError> {
    resolve_api_key(std::env::var(API_KEY_VAR).ok(), env_file)
}

/// Resolve the key from an already-read environment value, falling back to
/// `env_file`. Blank values count as missing.
pub fn resolve_api_key(
    from_env: Option<String>,
    env_file: &Path,
) -> Result<ApiKey, CredentialError> {
    if let Some(key) = from_env.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()) {
        return Ok(ApiKey(key));
    }

    let missing = || CredentialError::Missing {
        env_file: env_file.to_path_buf(),
    };
    if !env_file.exists() {
        return Err(missing());
    }

    debug!(path = %env_file.display(), "reading API key from env file");
    let entries = dotenvy::from_path_iter(env_file).map_err(|source| CredentialError::EnvFile {
        path: env_file.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let (name, value) = entry.map_err(|source| CredentialError::EnvFile {
            path: env_file.to_path_buf(),
            source,
        })?;
        if name == API_KEY_VAR && !value.trim().is_empty() {
            return Ok(ApiKey(value.trim().to_string()));
        }
    }
    Err(missing())
}
