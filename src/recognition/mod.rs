pub mod whisper;

pub use whisper::WhisperRecognizer;
