//! The recorder widget.
//!
//! One component: recording plus download always, live transcription
//! as a configuration sub-feature. The widget consumes its two
//! capabilities through the `domain::traits` abstractions; capability
//! selection is a caller concern, with [`install_recorder`] as the
//! production convenience path.

pub mod artifact;
pub mod controls;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use crate::capture::MicrophoneCapture;
use crate::config::WidgetConfig;
use crate::domain::traits::{AudioCapture, CaptureSession, SpeechRecognition};
use crate::domain::types::{CaptureOptions, CaptureState, Chunk, RecognitionConfig, RecognitionSegment};
use crate::recognition::WhisperRecognizer;

use self::artifact::{Artifact, ObjectUrlStore, DOWNLOAD_FILENAME, MEDIA_TYPE};
use self::controls::{Control, Document, DownloadLink, PushButton, TextNode};

const START_LABEL: &str = "Start Recording";
const STOP_LABEL: &str = "Stop Recording";
const DOWNLOAD_LABEL: &str = "Download Audio";
const TRANSCRIPT_PLACEHOLDER: &str = "Speech will appear here...";

/// An embeddable voice recorder mounted into a host container.
pub struct RecorderWidget {
    start_button: PushButton,
    stop_button: PushButton,
    download_link: DownloadLink,
    transcript: Option<TextNode>,
    capture: Box<dyn AudioCapture>,
    recognition: Option<Box<dyn SpeechRecognition>>,
    session: Option<Box<dyn CaptureSession>>,
    chunks: Arc<Mutex<Vec<Chunk>>>,
    urls: Arc<ObjectUrlStore>,
    current_url: Arc<Mutex<Option<String>>>,
}

impl RecorderWidget {
    /// Mount a widget into the container registered under
    /// `container_id`.
    ///
    /// Fails with a "container not found" error, before any control is
    /// created or mounted, if the container is absent. When a
    /// recognition capability is supplied the widget configures it for
    /// continuous, interim-result listening and wires its result and
    /// error handlers; the transcript node exists only in that case.
    pub fn mount(
        document: &Document,
        container_id: &str,
        capture: Box<dyn AudioCapture>,
        mut recognition: Option<Box<dyn SpeechRecognition>>,
        config: &WidgetConfig,
    ) -> Result<Self> {
        let container = document
            .container(container_id)
            .with_context(|| format!("container not found: {container_id}"))?;

        let start_button = PushButton::new(START_LABEL);
        let stop_button = PushButton::new(STOP_LABEL);
        stop_button.set_enabled(false);
        let download_link = DownloadLink::new(DOWNLOAD_LABEL);

        let transcript = recognition
            .as_ref()
            .map(|_| TextNode::new(TRANSCRIPT_PLACEHOLDER));

        container.append(Control::Button(start_button.clone()));
        container.append(Control::Button(stop_button.clone()));
        container.append(Control::Link(download_link.clone()));
        if let Some(transcript) = &transcript {
            container.append(Control::Text(transcript.clone()));
        }

        if let Some(recognition) = recognition.as_mut() {
            recognition.configure(&RecognitionConfig {
                continuous: true,
                interim_results: true,
                language: config.language.clone(),
            });

            let node = transcript.clone().expect("transcript node exists");
            recognition.on_result(Box::new(move |segments| {
                node.set_text(&rebuild_transcript(segments));
            }));
            recognition.on_error(Box::new(|err| {
                warn!(kind = %err.kind, "speech recognition error: {}", err.message);
            }));
        }

        Ok(Self {
            start_button,
            stop_button,
            download_link,
            transcript,
            capture,
            recognition,
            session: None,
            chunks: Arc::new(Mutex::new(Vec::new())),
            urls: Arc::new(ObjectUrlStore::new()),
            current_url: Arc::new(Mutex::new(None)),
        })
    }

    /// Open a capture session and begin recording.
    ///
    /// The start button is disabled before the open request, so a
    /// second invocation while one is pending or a session is active
    /// is a no-op. On failure the button is restored and the error
    /// returned.
    pub fn start_recording(&mut self) -> Result<()> {
        if !self.start_button.is_enabled() {
            return Ok(());
        }
        self.start_button.set_enabled(false);

        let mut session = match self.capture.open(&CaptureOptions::default()) {
            Ok(session) => session,
            Err(err) => {
                self.start_button.set_enabled(true);
                warn!("failed to open audio capture: {err:#}");
                return Err(err.context("failed to open audio capture"));
            }
        };

        self.chunks.lock().clear();

        let chunks = Arc::clone(&self.chunks);
        session.on_data(Box::new(move |chunk| {
            if !chunk.is_empty() {
                chunks.lock().push(chunk);
            }
        }));

        let chunks = Arc::clone(&self.chunks);
        let link = self.download_link.clone();
        let urls = Arc::clone(&self.urls);
        let current_url = Arc::clone(&self.current_url);
        session.on_stop(Box::new(move || {
            let artifact = Artifact::from_chunks(&chunks.lock(), MEDIA_TYPE);

            let mut current = current_url.lock();
            if let Some(previous) = current.take() {
                urls.revoke(&previous);
            }
            let url = urls.create(artifact);
            link.set_target(&url, DOWNLOAD_FILENAME);
            link.show();
            *current = Some(url);
        }));

        if let Err(err) = session.start() {
            self.start_button.set_enabled(true);
            return Err(err.context("failed to start audio capture"));
        }
        self.session = Some(session);
        self.stop_button.set_enabled(true);

        if let Some(recognition) = self.recognition.as_mut() {
            if let Err(err) = recognition.start() {
                warn!("speech recognition failed to start: {err:#}");
            }
        }

        Ok(())
    }

    /// Stop the active session, if any. Idempotent.
    ///
    /// The artifact is assembled by the session's stop notification;
    /// button states are restored unconditionally.
    pub fn stop_recording(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if session.state() != CaptureState::Inactive {
                session.stop();
            }
        }

        if let Some(recognition) = self.recognition.as_mut() {
            recognition.stop();
        }

        self.start_button.set_enabled(true);
        self.stop_button.set_enabled(false);
    }

    pub fn is_recording(&self) -> bool {
        self.session
            .as_ref()
            .map_or(false, |session| session.state() == CaptureState::Recording)
    }

    pub fn start_button(&self) -> &PushButton {
        &self.start_button
    }

    pub fn stop_button(&self) -> &PushButton {
        &self.stop_button
    }

    pub fn download_link(&self) -> &DownloadLink {
        &self.download_link
    }

    pub fn transcript(&self) -> Option<&TextNode> {
        self.transcript.as_ref()
    }

    /// The store backing this widget's download URLs.
    pub fn object_urls(&self) -> Arc<ObjectUrlStore> {
        Arc::clone(&self.urls)
    }
}

impl Drop for RecorderWidget {
    fn drop(&mut self) {
        // Release the last artifact reference when the widget goes away.
        if let Some(url) = self.current_url.lock().take() {
            self.urls.revoke(&url);
        }
    }
}

/// Rebuild the displayed transcript from the full segment list: top
/// alternative of each segment, space-separated, trimmed.
fn rebuild_transcript(segments: &[RecognitionSegment]) -> String {
    let mut text = String::new();
    for segment in segments {
        if let Some(alternative) = segment.top() {
            text.push_str(&alternative.transcript);
            text.push(' ');
        }
    }
    text.trim().to_string()
}

/// Mount a widget wired to the production capabilities selected from
/// `config`: cpal microphone capture, and Whisper recognition when the
/// transcription flag is on.
pub fn install_recorder(
    document: &Document,
    container_id: &str,
    config: &WidgetConfig,
) -> Result<RecorderWidget> {
    let capture: Box<dyn AudioCapture> =
        Box::new(MicrophoneCapture::with_chunk_interval(config.chunk_interval_ms));

    let recognition: Option<Box<dyn SpeechRecognition>> = if config.transcription {
        let model_path = config
            .model_path
            .as_deref()
            .context("transcription enabled but model_path is not configured")?;
        let source = Box::new(MicrophoneCapture::with_chunk_interval(config.chunk_interval_ms));
        let recognizer =
            WhisperRecognizer::new(Path::new(model_path), source, config.segment_interval_secs)?;
        Some(Box::new(recognizer))
    } else {
        None
    };

    RecorderWidget::mount(document, container_id, capture, recognition, config)
}
