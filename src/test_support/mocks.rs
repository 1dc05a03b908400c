//! Mock implementations for unit testing.
//!
//! These mocks implement the capability traits from `crate::domain` to
//! enable testing the widget without real audio devices or Whisper
//! models. Each mock hands out a handle that stays usable after the
//! mock itself has been boxed and moved into the widget, so tests can
//! drive events and inspect state from the outside.

use anyhow::{bail, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::domain::traits::{
    AudioCapture, CaptureSession, DataHandler, ErrorHandler, ResultHandler, SpeechRecognition,
    StopHandler,
};
use crate::domain::types::{
    CaptureOptions, CaptureState, Chunk, RecognitionConfig, RecognitionError, RecognitionSegment,
};

#[derive(Default)]
struct MockSessionState {
    started: AtomicBool,
    recording: AtomicBool,
    data_handler: Mutex<Option<DataHandler>>,
    stop_handler: Mutex<Option<StopHandler>>,
}

impl MockSessionState {
    fn fire_stop(&self) {
        if let Some(handler) = self.stop_handler.lock().as_mut() {
            handler();
        }
    }
}

/// Outside handle to a session opened by a [`MockCapture`].
#[derive(Clone)]
pub struct MockSessionHandle {
    state: Arc<MockSessionState>,
}

impl MockSessionHandle {
    /// Deliver one data-available event.
    pub fn emit_data(&self, data: &[u8]) {
        if let Some(handler) = self.state.data_handler.lock().as_mut() {
            handler(Chunk::new(data.to_vec()));
        }
    }

    /// End the session from the capture side, firing the stop event.
    pub fn emit_stop(&self) {
        if self.state.recording.swap(false, Ordering::SeqCst) {
            self.state.fire_stop();
        }
    }

    pub fn is_recording(&self) -> bool {
        self.state.recording.load(Ordering::SeqCst)
    }

    pub fn was_started(&self) -> bool {
        self.state.started.load(Ordering::SeqCst)
    }
}

struct MockCaptureInner {
    fail_open: bool,
    open_count: AtomicUsize,
    last_session: Mutex<Option<Arc<MockSessionState>>>,
}

/// Mock capture capability.
///
/// Opens sessions whose events are driven manually through
/// [`MockSessionHandle`]. Stopping a mock session fires its stop
/// handler synchronously, so artifacts appear immediately in tests.
pub struct MockCapture {
    inner: Arc<MockCaptureInner>,
}

impl MockCapture {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MockCaptureInner {
                fail_open: false,
                open_count: AtomicUsize::new(0),
                last_session: Mutex::new(None),
            }),
        }
    }

    /// A capture capability whose open request always fails, as when
    /// permission is denied or no device exists.
    pub fn failing() -> Self {
        Self {
            inner: Arc::new(MockCaptureInner {
                fail_open: true,
                open_count: AtomicUsize::new(0),
                last_session: Mutex::new(None),
            }),
        }
    }

    pub fn handle(&self) -> MockCaptureHandle {
        MockCaptureHandle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for MockCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioCapture for MockCapture {
    fn open(&self, options: &CaptureOptions) -> Result<Box<dyn CaptureSession>> {
        self.inner.open_count.fetch_add(1, Ordering::SeqCst);

        if self.inner.fail_open {
            bail!("permission denied");
        }
        if !options.audio {
            bail!("audio was not requested");
        }

        let state = Arc::new(MockSessionState::default());
        *self.inner.last_session.lock() = Some(Arc::clone(&state));
        Ok(Box::new(MockCaptureSession { state }))
    }
}

/// Outside handle to a [`MockCapture`], usable after the mock is boxed.
#[derive(Clone)]
pub struct MockCaptureHandle {
    inner: Arc<MockCaptureInner>,
}

impl MockCaptureHandle {
    pub fn open_count(&self) -> usize {
        self.inner.open_count.load(Ordering::SeqCst)
    }

    /// Handle to the most recently opened session.
    pub fn session(&self) -> Option<MockSessionHandle> {
        self.inner
            .last_session
            .lock()
            .as_ref()
            .map(|state| MockSessionHandle {
                state: Arc::clone(state),
            })
    }
}

struct MockCaptureSession {
    state: Arc<MockSessionState>,
}

impl CaptureSession for MockCaptureSession {
    fn on_data(&mut self, handler: DataHandler) {
        *self.state.data_handler.lock() = Some(handler);
    }

    fn on_stop(&mut self, handler: StopHandler) {
        *self.state.stop_handler.lock() = Some(handler);
    }

    fn start(&mut self) -> Result<()> {
        if self.state.started.swap(true, Ordering::SeqCst) {
            bail!("capture session already started");
        }
        self.state.recording.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) {
        if self.state.recording.swap(false, Ordering::SeqCst) {
            self.state.fire_stop();
        }
    }

    fn state(&self) -> CaptureState {
        if self.state.recording.load(Ordering::SeqCst) {
            CaptureState::Recording
        } else {
            CaptureState::Inactive
        }
    }
}

#[derive(Default)]
struct MockRecognitionInner {
    fail_start: bool,
    running: AtomicBool,
    config: Mutex<Option<RecognitionConfig>>,
    result_handler: Mutex<Option<ResultHandler>>,
    error_handler: Mutex<Option<ErrorHandler>>,
}

/// Mock recognition capability driven manually from tests.
pub struct MockRecognition {
    inner: Arc<MockRecognitionInner>,
}

impl MockRecognition {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MockRecognitionInner::default()),
        }
    }

    /// A recognition capability whose start always fails.
    pub fn failing() -> Self {
        Self {
            inner: Arc::new(MockRecognitionInner {
                fail_start: true,
                ..Default::default()
            }),
        }
    }

    pub fn handle(&self) -> MockRecognitionHandle {
        MockRecognitionHandle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for MockRecognition {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechRecognition for MockRecognition {
    fn configure(&mut self, config: &RecognitionConfig) {
        *self.inner.config.lock() = Some(config.clone());
    }

    fn on_result(&mut self, handler: ResultHandler) {
        *self.inner.result_handler.lock() = Some(handler);
    }

    fn on_error(&mut self, handler: ErrorHandler) {
        *self.inner.error_handler.lock() = Some(handler);
    }

    fn start(&mut self) -> Result<()> {
        if self.inner.fail_start {
            bail!("recognition unavailable");
        }
        self.inner.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) {
        self.inner.running.store(false, Ordering::SeqCst);
    }
}

/// Outside handle to a [`MockRecognition`].
#[derive(Clone)]
pub struct MockRecognitionHandle {
    inner: Arc<MockRecognitionInner>,
}

impl MockRecognitionHandle {
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// The configuration the widget applied, if any.
    pub fn configured(&self) -> Option<RecognitionConfig> {
        self.inner.config.lock().clone()
    }

    /// Deliver one incremental result event carrying the full
    /// accumulated segment list.
    pub fn emit_result(&self, segments: &[RecognitionSegment]) {
        if let Some(handler) = self.inner.result_handler.lock().as_mut() {
            handler(segments);
        }
    }

    /// Deliver one error event.
    pub fn emit_error(&self, kind: &str, message: &str) {
        if let Some(handler) = self.inner.error_handler.lock().as_mut() {
            handler(RecognitionError::new(kind, message));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_capture_session_lifecycle() {
        let capture = MockCapture::new();
        let handle = capture.handle();

        let mut session = capture.open(&CaptureOptions::default()).unwrap();
        assert_eq!(handle.open_count(), 1);
        assert_eq!(session.state(), CaptureState::Inactive);

        session.start().unwrap();
        assert_eq!(session.state(), CaptureState::Recording);
        assert!(handle.session().unwrap().is_recording());

        session.stop();
        assert_eq!(session.state(), CaptureState::Inactive);
    }

    #[test]
    fn test_mock_session_rejects_second_start() {
        let capture = MockCapture::new();
        let mut session = capture.open(&CaptureOptions::default()).unwrap();
        session.start().unwrap();
        assert!(session.start().is_err());
    }

    #[test]
    fn test_mock_session_stop_fires_handler_once() {
        let capture = MockCapture::new();
        let mut session = capture.open(&CaptureOptions::default()).unwrap();

        let stops = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&stops);
        session.on_stop(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        session.start().unwrap();
        session.stop();
        session.stop();
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_mock_session_delivers_data_to_handler() {
        let capture = MockCapture::new();
        let handle = capture.handle();
        let mut session = capture.open(&CaptureOptions::default()).unwrap();

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        session.on_data(Box::new(move |chunk| sink.lock().push(chunk)));
        session.start().unwrap();

        handle.session().unwrap().emit_data(&[1, 2, 3]);
        assert_eq!(received.lock().len(), 1);
        assert_eq!(received.lock()[0].data, vec![1, 2, 3]);
    }

    #[test]
    fn test_failing_capture_rejects_open() {
        let capture = MockCapture::failing();
        let handle = capture.handle();
        assert!(capture.open(&CaptureOptions::default()).is_err());
        assert_eq!(handle.open_count(), 1);
        assert!(handle.session().is_none());
    }

    #[test]
    fn test_mock_recognition_lifecycle_and_events() {
        let mut recognition = MockRecognition::new();
        let handle = recognition.handle();

        recognition.configure(&RecognitionConfig {
            continuous: true,
            interim_results: true,
            language: "en".to_string(),
        });
        assert!(handle.configured().unwrap().continuous);

        let results = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&results);
        recognition.on_result(Box::new(move |segments| {
            sink.lock().push(segments.to_vec());
        }));

        recognition.start().unwrap();
        assert!(handle.is_running());

        handle.emit_result(&[RecognitionSegment::new("hello", 1.0, true)]);
        assert_eq!(results.lock().len(), 1);

        recognition.stop();
        assert!(!handle.is_running());
    }

    #[test]
    fn test_failing_recognition_rejects_start() {
        let mut recognition = MockRecognition::failing();
        assert!(recognition.start().is_err());
        assert!(!recognition.handle().is_running());
    }
}
