//! Seams to the file/codec layer.
//!
//! The relay never decodes audio. A `ByteProvider` hands it the raw bytes of a
//! source plus the figures it needs for pacing, and a `MetadataProvider`
//! supplies optional tags. `FileSource` implements both on top of the local
//! filesystem and `lofty`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use lofty::prelude::{Accessor, AudioFile, TaggedFileExt};
use thiserror::Error;
use tracing::debug;

use super::model::TrackMetadata;

const DEFAULT_SAMPLE_RATE: u32 = 44_100;
const DEFAULT_CHANNELS: u16 = 2;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("source not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unsupported source {}: {reason}", path.display())]
    Unsupported { path: PathBuf, reason: String },
}

/// A fully loaded source, ready to be paced out.
#[derive(Debug, Clone)]
pub struct AudioSource {
    pub bytes: Bytes,
    pub sample_rate: u32,
    pub channels: u16,
    /// Bytes per second of real time; drives the pacing interval.
    pub byte_rate: u32,
}

pub trait ByteProvider: Send + Sync {
    /// Cheap check that `path` currently resolves to readable bytes.
    fn locate(&self, path: &Path) -> Result<(), SourceError>;

    /// Load the whole source into memory.
    fn open(&self, path: &Path) -> Result<AudioSource, SourceError>;
}

pub trait MetadataProvider: Send + Sync {
    /// Never fails: unknown fields are simply left empty.
    fn extract(&self, path: &Path) -> TrackMetadata;
}

/// Filesystem-backed provider.
#[derive(Debug, Clone)]
pub struct FileSource {
    fallback_byte_rate: u32,
}

impl FileSource {
    pub fn new(fallback_bitrate_kbps: u32) -> Self {
        Self {
            fallback_byte_rate: fallback_bitrate_kbps.max(1).saturating_mul(1000) / 8,
        }
    }
}

fn io_error(path: &Path, e: io::Error) -> SourceError {
    if e.kind() == io::ErrorKind::NotFound {
        SourceError::NotFound(path.to_path_buf())
    } else {
        SourceError::Unreadable {
            path: path.to_path_buf(),
            source: e,
        }
    }
}

impl ByteProvider for FileSource {
    fn locate(&self, path: &Path) -> Result<(), SourceError> {
        let meta = fs::metadata(path).map_err(|e| io_error(path, e))?;
        if !meta.is_file() {
            return Err(SourceError::NotFound(path.to_path_buf()));
        }
        // Opening proves readability, not just existence.
        fs::File::open(path).map_err(|e| io_error(path, e))?;
        Ok(())
    }

    fn open(&self, path: &Path) -> Result<AudioSource, SourceError> {
        let data = fs::read(path).map_err(|e| io_error(path, e))?;
        if data.is_empty() {
            return Err(SourceError::Unsupported {
                path: path.to_path_buf(),
                reason: "empty file".to_string(),
            });
        }

        let mut source = AudioSource {
            bytes: Bytes::from(data),
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            byte_rate: self.fallback_byte_rate,
        };

        match lofty::read_from_path(path) {
            Ok(tagged) => {
                let props = tagged.properties();
                if let Some(sr) = props.sample_rate() {
                    source.sample_rate = sr;
                }
                if let Some(ch) = props.channels() {
                    source.channels = u16::from(ch);
                }
                if let Some(kbps) = props.audio_bitrate().or(props.overall_bitrate()) {
                    if kbps > 0 {
                        source.byte_rate = kbps.saturating_mul(1000) / 8;
                    }
                }
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no stream properties, using fallbacks");
            }
        }

        Ok(source)
    }
}

impl MetadataProvider for FileSource {
    fn extract(&self, path: &Path) -> TrackMetadata {
        let Ok(tagged) = lofty::read_from_path(path) else {
            return TrackMetadata::default();
        };

        let mut meta = TrackMetadata {
            duration: Some(tagged.properties().duration()).filter(|d| !d.is_zero()),
            ..TrackMetadata::default()
        };

        if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
            meta.title = tag.title().map(|v| v.to_string());
            meta.artist = tag.artist().map(|v| v.to_string());
            meta.album = tag.album().map(|v| v.to_string());
        }

        meta
    }
}
