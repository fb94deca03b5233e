//! In-memory providers for deterministic tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use bytes::Bytes;

use super::model::TrackMetadata;
use super::provider::{AudioSource, ByteProvider, MetadataProvider, SourceError};

#[derive(Default)]
pub struct MemorySource {
    sources: Mutex<HashMap<PathBuf, AudioSource>>,
    tags: Mutex<HashMap<PathBuf, TrackMetadata>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `len` bytes (filled with `fill`) that play for `len / byte_rate` seconds.
    pub fn insert(&self, path: impl AsRef<Path>, len: usize, byte_rate: u32, fill: u8) {
        let source = AudioSource {
            bytes: Bytes::from(vec![fill; len]),
            sample_rate: 44_100,
            channels: 2,
            byte_rate,
        };
        self.sources
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf(), source);
    }

    pub fn tag(&self, path: impl AsRef<Path>, meta: TrackMetadata) {
        self.tags
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf(), meta);
    }

    /// Make a source vanish, as if the file were deleted after being added.
    pub fn remove(&self, path: impl AsRef<Path>) {
        self.sources.lock().unwrap().remove(path.as_ref());
    }
}

impl ByteProvider for MemorySource {
    fn locate(&self, path: &Path) -> Result<(), SourceError> {
        if self.sources.lock().unwrap().contains_key(path) {
            Ok(())
        } else {
            Err(SourceError::NotFound(path.to_path_buf()))
        }
    }

    fn open(&self, path: &Path) -> Result<AudioSource, SourceError> {
        self.sources
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(path.to_path_buf()))
    }
}

impl MetadataProvider for MemorySource {
    fn extract(&self, path: &Path) -> TrackMetadata {
        self.tags
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_default()
    }
}
