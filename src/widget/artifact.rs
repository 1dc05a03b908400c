//! Artifact assembly and the object URL store.
//!
//! An artifact is the concatenation of one recording session's chunk
//! buffer, tagged with a fixed media type. Object URLs map `blob:`
//! identifiers to artifact bytes; they are scoped resources, revoked
//! before replacement and on widget disposal.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::types::Chunk;

/// Media type every artifact is tagged with, regardless of the actual
/// chunk encoding.
pub const MEDIA_TYPE: &str = "audio/wav";

/// Fixed filename exposed on the download control.
pub const DOWNLOAD_FILENAME: &str = "recorded-audio.wav";

/// The final concatenated recording of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    bytes: Vec<u8>,
    media_type: String,
}

impl Artifact {
    /// Concatenate fragments in arrival order.
    pub fn from_chunks(chunks: &[Chunk], media_type: &str) -> Self {
        let mut bytes = Vec::with_capacity(chunks.iter().map(Chunk::len).sum());
        for chunk in chunks {
            bytes.extend_from_slice(&chunk.data);
        }
        Self {
            bytes,
            media_type: media_type.to_string(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Wrap the artifact bytes into an in-memory RIFF/WAVE container.
    ///
    /// Interprets the bytes as 16-bit little-endian mono PCM at the
    /// given sample rate. Hosts whose capture sessions emit raw PCM use
    /// this to turn the download into a playable file; the artifact
    /// itself stays the raw concatenation.
    pub fn to_wav(&self, sample_rate: u32) -> Result<Vec<u8>> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut buffer = Vec::new();
        {
            let cursor = Cursor::new(&mut buffer);
            let mut writer =
                hound::WavWriter::new(cursor, spec).context("failed to create WAV writer")?;

            for pair in self.bytes.chunks_exact(2) {
                let sample = i16::from_le_bytes([pair[0], pair[1]]);
                writer
                    .write_sample(sample)
                    .context("failed to write sample")?;
            }

            writer.finalize().context("failed to finalize WAV data")?;
        }

        Ok(buffer)
    }
}

/// Registry of revocable `blob:` references to artifact bytes.
#[derive(Default)]
pub struct ObjectUrlStore {
    entries: Mutex<HashMap<String, Arc<Artifact>>>,
}

impl ObjectUrlStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an artifact and return a fresh `blob:` URL for it.
    pub fn create(&self, artifact: Artifact) -> String {
        let url = format!("blob:{}", Uuid::new_v4());
        self.entries
            .lock()
            .insert(url.clone(), Arc::new(artifact));
        url
    }

    /// Resolve a URL to its artifact, if it has not been revoked.
    pub fn resolve(&self, url: &str) -> Option<Arc<Artifact>> {
        self.entries.lock().get(url).cloned()
    }

    /// Release a URL. Returns whether it existed.
    pub fn revoke(&self, url: &str) -> bool {
        self.entries.lock().remove(url).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_chunks_concatenates_in_order() {
        let chunks = vec![
            Chunk::new(vec![1, 2]),
            Chunk::new(vec![3]),
            Chunk::new(vec![4, 5]),
        ];
        let artifact = Artifact::from_chunks(&chunks, MEDIA_TYPE);
        assert_eq!(artifact.bytes(), &[1, 2, 3, 4, 5]);
        assert_eq!(artifact.media_type(), "audio/wav");
    }

    #[test]
    fn test_from_no_chunks_is_empty() {
        let artifact = Artifact::from_chunks(&[], MEDIA_TYPE);
        assert!(artifact.is_empty());
        assert_eq!(artifact.len(), 0);
    }

    #[test]
    fn test_to_wav_roundtrip() {
        let samples: Vec<i16> = vec![0, 1000, -1000, i16::MAX, i16::MIN];
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        let artifact = Artifact::from_chunks(&[Chunk::new(bytes)], MEDIA_TYPE);

        let wav = artifact.to_wav(16000).unwrap();
        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().sample_rate, 16000);

        let decoded: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn test_store_create_resolve_revoke() {
        let store = ObjectUrlStore::new();
        let artifact = Artifact::from_chunks(&[Chunk::new(vec![7, 8])], MEDIA_TYPE);
        let url = store.create(artifact.clone());

        assert!(url.starts_with("blob:"));
        assert_eq!(store.resolve(&url).unwrap().bytes(), artifact.bytes());

        assert!(store.revoke(&url));
        assert!(store.resolve(&url).is_none());
        assert!(!store.revoke(&url));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_urls_are_unique() {
        let store = ObjectUrlStore::new();
        let first = store.create(Artifact::from_chunks(&[], MEDIA_TYPE));
        let second = store.create(Artifact::from_chunks(&[], MEDIA_TYPE));
        assert_ne!(first, second);
        assert_eq!(store.len(), 2);
    }
}
