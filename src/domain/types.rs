//! Shared types used across multiple modules.
//!
//! This module contains the data carried by capture and recognition
//! events, plus the option structs the capability traits accept.

/// A single binary fragment delivered by a capture session.
///
/// Fragments are opaque to the widget; their encoding is whatever the
/// capture implementation produces. Zero-length fragments carry no data
/// and are discarded on arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub data: Vec<u8>,
}

impl Chunk {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

/// Options for opening a capture session.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Request an audio input stream.
    pub audio: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self { audio: true }
    }
}

/// Capture session state, queryable at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Inactive,
    Recording,
}

/// Configuration applied to a recognition session before it starts.
#[derive(Debug, Clone)]
pub struct RecognitionConfig {
    /// Keep listening after the first finalized segment.
    pub continuous: bool,
    /// Deliver in-progress (non-final) segments as they form.
    pub interim_results: bool,
    /// Language code passed to the recognizer (e.g. "en", "uk", "auto").
    pub language: String,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            continuous: false,
            interim_results: false,
            language: "en".to_string(),
        }
    }
}

/// One ranked transcription hypothesis for a segment.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionAlternative {
    pub transcript: String,
    pub confidence: f32,
}

/// One recognized segment: ranked alternatives plus a finality flag.
///
/// A session accumulates segments append-only: finalized segments keep
/// their index forever, and at most the trailing segment is non-final.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionSegment {
    pub alternatives: Vec<RecognitionAlternative>,
    pub is_final: bool,
}

impl RecognitionSegment {
    /// Build a single-alternative segment.
    pub fn new(transcript: impl Into<String>, confidence: f32, is_final: bool) -> Self {
        Self {
            alternatives: vec![RecognitionAlternative {
                transcript: transcript.into(),
                confidence,
            }],
            is_final,
        }
    }

    /// The highest-ranked alternative, if any.
    pub fn top(&self) -> Option<&RecognitionAlternative> {
        self.alternatives.first()
    }
}

/// Error reported by a recognition session.
#[derive(Debug, Clone)]
pub struct RecognitionError {
    /// Short machine-readable error code (e.g. "audio-capture").
    pub kind: String,
    pub message: String,
}

impl RecognitionError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_len_and_is_empty() {
        let chunk = Chunk::new(vec![1, 2, 3]);
        assert_eq!(chunk.len(), 3);
        assert!(!chunk.is_empty());

        let empty = Chunk::new(Vec::new());
        assert_eq!(empty.len(), 0);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_capture_options_default_requests_audio() {
        assert!(CaptureOptions::default().audio);
    }

    #[test]
    fn test_recognition_segment_top_is_first_alternative() {
        let segment = RecognitionSegment {
            alternatives: vec![
                RecognitionAlternative {
                    transcript: "hello".to_string(),
                    confidence: 0.9,
                },
                RecognitionAlternative {
                    transcript: "hallo".to_string(),
                    confidence: 0.4,
                },
            ],
            is_final: true,
        };
        assert_eq!(segment.top().unwrap().transcript, "hello");
    }

    #[test]
    fn test_recognition_segment_new_single_alternative() {
        let segment = RecognitionSegment::new("world", 1.0, false);
        assert_eq!(segment.alternatives.len(), 1);
        assert!(!segment.is_final);
        assert_eq!(segment.top().unwrap().transcript, "world");
    }

    #[test]
    fn test_recognition_config_default() {
        let config = RecognitionConfig::default();
        assert!(!config.continuous);
        assert!(!config.interim_results);
        assert_eq!(config.language, "en");
    }
}
