use serde::{Deserialize, Serialize};

/// Top-level relay settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/onair/config.toml` or `~/.config/onair/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `ONAIR__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub stream: StreamSettings,
    pub playback: PlaybackSettings,
    pub library: LibrarySettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamSettings {
    /// Bytes emitted per pacing tick.
    pub chunk_size: usize,
    /// Bitrate assumed when a source does not report one (kbit/s).
    pub fallback_bitrate_kbps: u32,
    /// Interval between heartbeat frames while paused or stopped (milliseconds).
    pub idle_heartbeat_ms: u64,
    /// Maximum number of queued events per push subscriber.
    pub subscriber_queue_len: usize,
    /// Maximum undelivered chunk bytes per push subscriber before it is dropped.
    pub max_backlog_bytes: usize,
    /// How long a blocking pull waits for new bytes before reporting idle (milliseconds).
    pub pull_wait_ms: u64,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            chunk_size: 4096,
            fallback_bitrate_kbps: 128,
            idle_heartbeat_ms: 1000,
            subscriber_queue_len: 64,
            max_backlog_bytes: 256 * 1024,
            pull_wait_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// What happens when the current track runs out.
    pub loop_mode: LoopModeSetting,
    /// Start playing the first track as soon as the relay is up.
    pub autoplay: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            loop_mode: LoopModeSetting::NoLoop,
            autoplay: false,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoopModeSetting {
    #[serde(alias = "no_loop", alias = "noloop", alias = "stop-at-end")]
    NoLoop,
    #[serde(
        alias = "loopall",
        alias = "loop_all",
        alias = "loop-around",
        alias = "wrap"
    )]
    LoopAll,
    #[serde(
        alias = "loopone",
        alias = "loop_one",
        alias = "repeat-one"
    )]
    LoopOne,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Extensions the startup scan picks up; case and a leading dot are ignored.
    pub extensions: Vec<String>,
    /// Descend through symlinked files and directories.
    pub follow_links: bool,
    /// Also seed dotfiles and files under dot-directories.
    pub include_hidden: bool,
    /// `false` only looks at the top level of the music directory.
    pub recursive: bool,
    /// Deepest directory level scanned when recursing (root is 0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            extensions: vec![
                "mp3".into(),
                "wav".into(),
                "flac".into(),
                "ogg".into(),
                "m4a".into(),
            ],
            follow_links: true,
            include_hidden: false,
            recursive: true,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive. `RUST_LOG` takes precedence.
    pub filter: String,
    /// Emit JSON lines instead of the human-readable format.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "onair=info".to_string(),
            json: false,
        }
    }
}
