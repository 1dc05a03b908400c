//! Core domain traits for dependency inversion.
//!
//! These traits define the contracts between the widget and the two
//! host capabilities it consumes, without depending on concrete
//! implementations. They enable:
//! - Testability via mock implementations
//! - Flexibility to swap implementations
//! - Capability selection as a caller concern

use anyhow::Result;

use super::types::{
    CaptureOptions, CaptureState, Chunk, RecognitionConfig, RecognitionError, RecognitionSegment,
};

/// Handler invoked for every data-available event of a capture session.
pub type DataHandler = Box<dyn FnMut(Chunk) + Send>;

/// Handler invoked once when a capture session has stopped and no
/// further data events will follow.
pub type StopHandler = Box<dyn FnMut() + Send>;

/// Handler invoked with the full accumulated segment list on every
/// incremental recognition update.
pub type ResultHandler = Box<dyn FnMut(&[RecognitionSegment]) + Send>;

/// Handler invoked for recognition session errors.
pub type ErrorHandler = Box<dyn FnMut(RecognitionError) + Send>;

/// Audio capture capability.
///
/// Implementors acquire an input device and open recording sessions
/// over it. `open` is the permission step: it may block until the host
/// grants access, and fails if no device is available.
pub trait AudioCapture: Send + Sync {
    /// Request device access and open a capture session.
    fn open(&self, options: &CaptureOptions) -> Result<Box<dyn CaptureSession>>;
}

/// One recording session over an opened input stream.
///
/// Data events arrive in chronological order while the session is
/// active; the stop event arrives exactly once, after the last data
/// event. Handlers must be registered before `start`.
pub trait CaptureSession: Send {
    /// Register the data-available handler.
    fn on_data(&mut self, handler: DataHandler);

    /// Register the stopped handler.
    fn on_stop(&mut self, handler: StopHandler);

    /// Begin capturing.
    ///
    /// Returns `Err` if the session was already started.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing. Safe to call when already inactive.
    fn stop(&mut self);

    /// Current session state.
    fn state(&self) -> CaptureState;
}

/// Speech recognition capability.
///
/// Implementors convert a live audio stream into an append-only list
/// of recognized segments with ranked text alternatives. Result and
/// error events arrive independently of any capture session.
pub trait SpeechRecognition: Send {
    /// Apply session configuration. Takes effect on the next `start`.
    fn configure(&mut self, config: &RecognitionConfig);

    /// Register the incremental result handler.
    fn on_result(&mut self, handler: ResultHandler);

    /// Register the error handler.
    fn on_error(&mut self, handler: ErrorHandler);

    /// Start listening.
    fn start(&mut self) -> Result<()>;

    /// Stop listening. Safe to call when not started.
    fn stop(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Minimal in-line capture implementation exercising the trait
    /// object surface.
    struct TestCapture;

    struct TestSession {
        recording: AtomicBool,
        data_handler: Mutex<Option<DataHandler>>,
    }

    impl AudioCapture for TestCapture {
        fn open(&self, options: &CaptureOptions) -> Result<Box<dyn CaptureSession>> {
            if !options.audio {
                anyhow::bail!("audio was not requested");
            }
            Ok(Box::new(TestSession {
                recording: AtomicBool::new(false),
                data_handler: Mutex::new(None),
            }))
        }
    }

    impl CaptureSession for TestSession {
        fn on_data(&mut self, handler: DataHandler) {
            *self.data_handler.lock() = Some(handler);
        }

        fn on_stop(&mut self, _handler: StopHandler) {}

        fn start(&mut self) -> Result<()> {
            self.recording.store(true, Ordering::SeqCst);
            if let Some(handler) = self.data_handler.lock().as_mut() {
                handler(Chunk::new(vec![1, 2]));
            }
            Ok(())
        }

        fn stop(&mut self) {
            self.recording.store(false, Ordering::SeqCst);
        }

        fn state(&self) -> CaptureState {
            if self.recording.load(Ordering::SeqCst) {
                CaptureState::Recording
            } else {
                CaptureState::Inactive
            }
        }
    }

    #[test]
    fn test_capture_as_trait_object() {
        let capture: Box<dyn AudioCapture> = Box::new(TestCapture);
        let mut session = capture.open(&CaptureOptions::default()).unwrap();

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        session.on_data(Box::new(move |chunk| sink.lock().push(chunk)));

        assert_eq!(session.state(), CaptureState::Inactive);
        session.start().unwrap();
        assert_eq!(session.state(), CaptureState::Recording);
        session.stop();
        assert_eq!(session.state(), CaptureState::Inactive);

        assert_eq!(received.lock().len(), 1);
    }

    #[test]
    fn test_open_rejects_audio_disabled() {
        let capture = TestCapture;
        let options = CaptureOptions { audio: false };
        assert!(capture.open(&options).is_err());
    }
}
