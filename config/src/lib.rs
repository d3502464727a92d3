//! Configuration for XML Store clients.
//!
//! Read from `~/.xstore/config.toml`:
//!
//! ```toml
//! [xmlstore]
//! namespace = "http://schemas.cordys.com/1.0/xmlstore"
//! shared_version = "organization"
//! save_version = "${XSTORE_SAVE_VERSION}"
//! ```
//!
//! String values may reference environment variables as `${NAME}`.

use std::path::{Path, PathBuf};
use std::{env, fs, io};

use serde::Deserialize;
use thiserror::Error;
use toml::de::Error as TomlError;

use xstore_types::{ORGANIZATION_LEVEL, XML_STORE_NAMESPACE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: TomlError,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct XmlStoreSection {
    /// Namespace of the XML Store web service methods.
    pub namespace: Option<String>,
    /// Version tag whose documents need confirmation before being overwritten.
    pub shared_version: Option<String>,
    /// Version tag written on saved documents.
    pub save_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct XstoreConfig {
    pub xmlstore: Option<XmlStoreSection>,
}

impl XstoreConfig {
    /// Loads the user config, falling back to defaults when the file is
    /// missing or broken.
    #[must_use]
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            tracing::debug!("No home directory; using default XML Store config");
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(Some(config)) => config,
            Ok(None) => Self::default(),
            Err(err) => {
                tracing::warn!(path = %err.path().display(), %err, "Ignoring XML Store config");
                Self::default()
            }
        }
    }

    /// Reads `path`; a missing file is `Ok(None)`.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Loaded XML Store config");
        Ok(Some(config))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, TomlError> {
        toml::from_str(content)
    }

    #[must_use]
    pub fn namespace(&self) -> String {
        self.setting(|s| s.namespace.as_deref(), XML_STORE_NAMESPACE)
    }

    #[must_use]
    pub fn shared_version(&self) -> String {
        self.setting(|s| s.shared_version.as_deref(), ORGANIZATION_LEVEL)
    }

    #[must_use]
    pub fn save_version(&self) -> String {
        self.setting(|s| s.save_version.as_deref(), ORGANIZATION_LEVEL)
    }

    fn setting(&self, pick: impl Fn(&XmlStoreSection) -> Option<&str>, default: &str) -> String {
        self.xmlstore
            .as_ref()
            .and_then(pick)
            .map(expand_env_vars)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| default.to_string())
    }
}

/// Replaces `${NAME}` with the variable's value; unset variables expand to
/// nothing and an unterminated `${` is kept literally.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                out.push_str(&env::var(&after[..end]).unwrap_or_default());
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".xstore").join("config.toml"))
}
