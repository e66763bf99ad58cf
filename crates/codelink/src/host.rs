//
// host.rs
//
// Interfaces of the diagram host, editor host, and per-document configuration store
//

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;
use tower_lsp::lsp_types::{Range, SymbolInformation, Url};

/// Diagram documents are addressed by the uri of their file.
pub type DiagramId = Url;

/// Payload of a node-selected event.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramNodeSelection {
    /// Visible label text of the node
    pub label: String,
    /// Opaque linked data attached to the node, if any
    pub linked_data: Option<Value>,
}

impl DiagramNodeSelection {
    pub fn new(label: impl Into<String>, linked_data: Option<Value>) -> Self {
        Self {
            label: label.into(),
            linked_data: linked_data.filter(is_present),
        }
    }
}

/// `null`, `false`, zero and the empty string mean the node carries no link.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Events delivered by a diagram document, in host order.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagramEvent {
    NodeSelected(DiagramNodeSelection),
    /// The diagram finished loading its custom plugin and accepts commands.
    CustomPluginLoaded,
}

/// Commands accepted by one open diagram document.
#[async_trait]
pub trait DiagramHost: Send + Sync {
    /// Switch the diagram's native node-selection capture mode.
    async fn set_node_selection_enabled(&self, enabled: bool) -> anyhow::Result<()>;

    async fn has_selected_node(&self) -> anyhow::Result<bool>;

    /// Attach `data` as the linked data of the currently selected node.
    async fn link_selected_node_with_data(&self, data: Value) -> anyhow::Result<()>;
}

/// Per-document configuration store holding the code-link activation flag.
#[async_trait]
pub trait DocumentConfig: Send + Sync {
    fn code_link_activated(&self) -> bool;

    /// Receiver that observes every change of the activation flag.
    fn watch_code_link_activated(&self) -> watch::Receiver<bool>;

    async fn set_code_link_activated(&self, activated: bool) -> anyhow::Result<()>;
}

/// Configuration store kept in memory for the lifetime of the document.
#[derive(Debug)]
pub struct InMemoryDocumentConfig {
    activated: watch::Sender<bool>,
}

impl InMemoryDocumentConfig {
    pub fn new(activated: bool) -> Self {
        let (activated, _) = watch::channel(activated);
        Self { activated }
    }
}

impl Default for InMemoryDocumentConfig {
    fn default() -> Self {
        Self::new(false)
    }
}

#[async_trait]
impl DocumentConfig for InMemoryDocumentConfig {
    fn code_link_activated(&self) -> bool {
        *self.activated.borrow()
    }

    fn watch_code_link_activated(&self) -> watch::Receiver<bool> {
        self.activated.subscribe()
    }

    async fn set_code_link_activated(&self, activated: bool) -> anyhow::Result<()> {
        // Only notify observers on an actual change
        self.activated.send_if_modified(|current| {
            if *current == activated {
                false
            } else {
                *current = activated;
                true
            }
        });
        Ok(())
    }
}

/// Editor pane handle issued by the editor host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EditorId(pub u64);

/// Decoration type handle issued by the editor host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecorationId(pub u64);

/// Text editor as remembered by focus tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEditorRef {
    pub id: EditorId,
    pub uri: Url,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecorationStyle {
    /// Theme color key used as background
    pub background_theme_color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealType {
    Default,
    InCenter,
    /// Center the range if it is outside the viewport, otherwise scroll minimally
    InCenterIfOutsideViewport,
    AtTop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShowOptions {
    /// One-based view column that receives the document
    pub view_column: u32,
    /// Keep keyboard focus where it is
    pub preserve_focus: bool,
}

/// Operations of the code editor host.
#[async_trait]
pub trait EditorHost: Send + Sync {
    /// Documents shown in the visible panes, in pane order.
    fn visible_editors(&self) -> Vec<Url>;

    async fn open_document(&self, uri: &Url) -> anyhow::Result<()>;

    async fn show_document(&self, uri: &Url, options: ShowOptions) -> anyhow::Result<EditorId>;

    fn reveal_range(&self, editor: EditorId, range: Range, reveal_type: RevealType);

    fn create_decoration(&self, style: &DecorationStyle) -> DecorationId;

    /// Replace the ranges painted with `decoration`; an empty slice clears it.
    fn set_decorations(&self, editor: EditorId, decoration: DecorationId, ranges: &[Range]);

    /// Current selection of a text editor, or `None` if the editor is gone.
    fn selection(&self, editor: EditorId) -> Option<Range>;

    fn show_error_message(&self, message: &str);
}

/// Workspace symbol index of the editor host.
#[async_trait]
pub trait SymbolIndex: Send + Sync {
    /// Symbols matching `query`. Results may be fuzzy.
    async fn workspace_symbols(&self, query: &str) -> anyhow::Result<Vec<SymbolInformation>>;
}
