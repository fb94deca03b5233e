use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::schema::Settings;

const ENV_PREFIX: &str = "ONAIR";
const PATH_VAR: &str = "ONAIR_CONFIG_PATH";

/// A setting the relay cannot run with.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum InvalidSettings {
    #[error("stream.{0} must be >= 1")]
    Zero(&'static str),

    #[error("stream.max_backlog_bytes ({backlog}) must hold at least one chunk ({chunk})")]
    BacklogBelowChunk { backlog: usize, chunk: usize },
}

impl Settings {
    /// Load from the resolved config path (if any) with `ONAIR__` env overrides.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        Self::load_from(resolve_config_path().as_deref())
    }

    /// Layers, lowest first: struct defaults, the TOML file at `path` (may be
    /// absent), then environment variables like `ONAIR__STREAM__CHUNK_SIZE`.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ::config::ConfigError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(false));
        }
        builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn validate(&self) -> Result<(), InvalidSettings> {
        let s = &self.stream;
        for (name, value) in [
            ("chunk_size", s.chunk_size as u64),
            ("subscriber_queue_len", s.subscriber_queue_len as u64),
            ("fallback_bitrate_kbps", u64::from(s.fallback_bitrate_kbps)),
        ] {
            if value == 0 {
                return Err(InvalidSettings::Zero(name));
            }
        }
        if s.max_backlog_bytes < s.chunk_size {
            return Err(InvalidSettings::BacklogBelowChunk {
                backlog: s.max_backlog_bytes,
                chunk: s.chunk_size,
            });
        }
        Ok(())
    }

    /// The effective settings as a TOML document (`--print-config`).
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// `$ONAIR_CONFIG_PATH` if set, otherwise the XDG location.
pub fn resolve_config_path() -> Option<PathBuf> {
    env::var_os(PATH_VAR)
        .map(PathBuf::from)
        .or_else(default_config_path)
}

/// `$XDG_CONFIG_HOME/onair/config.toml`, falling back to
/// `~/.config/onair/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .map(|base| base.join("onair").join("config.toml"))
}
