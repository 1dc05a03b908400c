//! Host document model and control handles.
//!
//! A minimal stand-in for the embedding environment: named containers
//! in a document, and the three control kinds the widget mounts. All
//! handles are cheap clones over shared state so capture and
//! recognition callbacks can update them from their own threads.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

struct ButtonState {
    label: String,
    enabled: bool,
}

/// A clickable button with an enabled flag.
#[derive(Clone)]
pub struct PushButton {
    state: Arc<Mutex<ButtonState>>,
}

impl PushButton {
    pub fn new(label: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(ButtonState {
                label: label.to_string(),
                enabled: true,
            })),
        }
    }

    pub fn label(&self) -> String {
        self.state.lock().label.clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.state.lock().enabled = enabled;
    }
}

struct LinkState {
    label: String,
    hidden: bool,
    href: Option<String>,
    download: Option<String>,
}

/// A download anchor: hidden until it points at an artifact.
#[derive(Clone)]
pub struct DownloadLink {
    state: Arc<Mutex<LinkState>>,
}

impl DownloadLink {
    pub fn new(label: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(LinkState {
                label: label.to_string(),
                hidden: true,
                href: None,
                download: None,
            })),
        }
    }

    pub fn label(&self) -> String {
        self.state.lock().label.clone()
    }

    pub fn is_hidden(&self) -> bool {
        self.state.lock().hidden
    }

    pub fn show(&self) {
        self.state.lock().hidden = false;
    }

    /// Point the link at an object URL with a download filename.
    pub fn set_target(&self, href: &str, filename: &str) {
        let mut state = self.state.lock();
        state.href = Some(href.to_string());
        state.download = Some(filename.to_string());
    }

    pub fn href(&self) -> Option<String> {
        self.state.lock().href.clone()
    }

    pub fn download(&self) -> Option<String> {
        self.state.lock().download.clone()
    }
}

/// A mutable text node.
#[derive(Clone)]
pub struct TextNode {
    text: Arc<Mutex<String>>,
}

impl TextNode {
    pub fn new(text: &str) -> Self {
        Self {
            text: Arc::new(Mutex::new(text.to_string())),
        }
    }

    pub fn text(&self) -> String {
        self.text.lock().clone()
    }

    pub fn set_text(&self, text: &str) {
        *self.text.lock() = text.to_string();
    }
}

/// Any control a container can hold.
#[derive(Clone)]
pub enum Control {
    Button(PushButton),
    Link(DownloadLink),
    Text(TextNode),
}

/// An ordered group of mounted controls.
#[derive(Clone, Default)]
pub struct Container {
    children: Arc<Mutex<Vec<Control>>>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, control: Control) {
        self.children.lock().push(control);
    }

    pub fn child_count(&self) -> usize {
        self.children.lock().len()
    }
}

/// The host page: a registry of containers addressable by id.
#[derive(Default)]
pub struct Document {
    containers: Mutex<HashMap<String, Container>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty container under the given id and return a
    /// handle to it.
    pub fn add_container(&self, id: &str) -> Container {
        let container = Container::new();
        self.containers
            .lock()
            .insert(id.to_string(), container.clone());
        container
    }

    /// Look up a container by id.
    pub fn container(&self, id: &str) -> Option<Container> {
        self.containers.lock().get(id).cloned()
    }
}
