//! Recording fakes of the editor host, diagram host, symbol index and status display.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::Value;
use tower_lsp::lsp_types::{Location, Position, Range, SymbolInformation, SymbolKind, Url};

use crate::activation::{StatusDisplay, StatusIndicator};
use crate::host::{
    DecorationId, DecorationStyle, DiagramHost, EditorHost, EditorId, RevealType, ShowOptions,
    SymbolIndex, TextEditorRef,
};

/// Build a function symbol spanning one line.
#[allow(deprecated)]
pub fn symbol(name: &str, container: Option<&str>, uri: &Url, line: u32) -> SymbolInformation {
    SymbolInformation {
        name: name.to_string(),
        kind: SymbolKind::FUNCTION,
        tags: None,
        deprecated: None,
        location: Location::new(
            uri.clone(),
            Range::new(Position::new(line, 0), Position::new(line, 10)),
        ),
        container_name: container.map(|c| c.to_string()),
    }
}

// ============================================================================
// Editor host
// ============================================================================

#[derive(Default)]
struct EditorState {
    visible: Vec<Url>,
    opened: Vec<Url>,
    shown: Vec<(Url, ShowOptions, EditorId)>,
    revealed: Vec<(EditorId, Range, RevealType)>,
    styles: HashMap<DecorationId, DecorationStyle>,
    painted: HashMap<DecorationId, (EditorId, Vec<Range>)>,
    selections: HashMap<EditorId, Range>,
    errors: Vec<String>,
    next_id: u64,
    fail_open: bool,
}

/// Editor host that records every call. Each view column maps to one editor.
#[derive(Default)]
pub struct FakeEditorHost {
    state: Mutex<EditorState>,
}

impl FakeEditorHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_visible(self, visible: Vec<Url>) -> Self {
        self.state.lock().unwrap().visible = visible;
        self
    }

    pub fn failing_open(self) -> Self {
        self.state.lock().unwrap().fail_open = true;
        self
    }

    /// Register a text editor showing `uri` with the given selection.
    pub fn add_text_editor(&self, uri: Url, selection: Range) -> TextEditorRef {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = EditorId(1000 + state.next_id);
        state.selections.insert(id, selection);
        TextEditorRef { id, uri }
    }

    pub fn set_selection(&self, editor: EditorId, selection: Range) {
        self.state
            .lock()
            .unwrap()
            .selections
            .insert(editor, selection);
    }

    pub fn opened(&self) -> Vec<Url> {
        self.state.lock().unwrap().opened.clone()
    }

    pub fn shown(&self) -> Vec<(Url, ShowOptions, EditorId)> {
        self.state.lock().unwrap().shown.clone()
    }

    pub fn revealed(&self) -> Vec<(EditorId, Range, RevealType)> {
        self.state.lock().unwrap().revealed.clone()
    }

    /// Ranges currently painted with `decoration`.
    pub fn painted(&self, decoration: DecorationId) -> Vec<Range> {
        self.state
            .lock()
            .unwrap()
            .painted
            .get(&decoration)
            .map(|(_, ranges)| ranges.clone())
            .unwrap_or_default()
    }

    /// Decorations with at least one painted range, ordered by id.
    pub fn painted_decorations(&self) -> Vec<DecorationId> {
        let state = self.state.lock().unwrap();
        let mut ids: Vec<DecorationId> = state
            .painted
            .iter()
            .filter(|(_, (_, ranges))| !ranges.is_empty())
            .map(|(id, _)| *id)
            .collect();
        ids.sort_by_key(|id| id.0);
        ids
    }

    pub fn decoration_style(&self, decoration: DecorationId) -> Option<DecorationStyle> {
        self.state.lock().unwrap().styles.get(&decoration).cloned()
    }

    pub fn errors(&self) -> Vec<String> {
        self.state.lock().unwrap().errors.clone()
    }
}

#[async_trait]
impl EditorHost for FakeEditorHost {
    fn visible_editors(&self) -> Vec<Url> {
        self.state.lock().unwrap().visible.clone()
    }

    async fn open_document(&self, uri: &Url) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_open {
            return Err(anyhow!("cannot open {}", uri));
        }
        state.opened.push(uri.clone());
        Ok(())
    }

    async fn show_document(&self, uri: &Url, options: ShowOptions) -> anyhow::Result<EditorId> {
        let id = EditorId(u64::from(options.view_column));
        self.state
            .lock()
            .unwrap()
            .shown
            .push((uri.clone(), options, id));
        Ok(id)
    }

    fn reveal_range(&self, editor: EditorId, range: Range, reveal_type: RevealType) {
        self.state
            .lock()
            .unwrap()
            .revealed
            .push((editor, range, reveal_type));
    }

    fn create_decoration(&self, style: &DecorationStyle) -> DecorationId {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = DecorationId(state.next_id);
        state.styles.insert(id, style.clone());
        id
    }

    fn set_decorations(&self, editor: EditorId, decoration: DecorationId, ranges: &[Range]) {
        self.state
            .lock()
            .unwrap()
            .painted
            .insert(decoration, (editor, ranges.to_vec()));
    }

    fn selection(&self, editor: EditorId) -> Option<Range> {
        self.state.lock().unwrap().selections.get(&editor).copied()
    }

    fn show_error_message(&self, message: &str) {
        self.state.lock().unwrap().errors.push(message.to_string());
    }
}

// ============================================================================
// Symbol index
// ============================================================================

/// Symbol index answering with every symbol whose name contains the query,
/// like a fuzzy workspace search.
#[derive(Default)]
pub struct FakeSymbolIndex {
    symbols: Vec<SymbolInformation>,
    queries: Mutex<Vec<String>>,
    fail: bool,
}

impl FakeSymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symbol(mut self, symbol: SymbolInformation) -> Self {
        self.symbols.push(symbol);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SymbolIndex for FakeSymbolIndex {
    async fn workspace_symbols(&self, query: &str) -> anyhow::Result<Vec<SymbolInformation>> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            return Err(anyhow!("symbol index unavailable"));
        }
        Ok(self
            .symbols
            .iter()
            .filter(|s| s.name.contains(query))
            .cloned()
            .collect())
    }
}

// ============================================================================
// Diagram host
// ============================================================================

/// Diagram host recording selection-mode switches and attached link data.
#[derive(Default)]
pub struct FakeDiagramHost {
    selection_modes: Mutex<Vec<bool>>,
    linked: Mutex<Vec<Value>>,
    has_selection: AtomicBool,
}

impl FakeDiagramHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_selected_node(&self, selected: bool) {
        self.has_selection.store(selected, Ordering::SeqCst);
    }

    pub fn selection_modes(&self) -> Vec<bool> {
        self.selection_modes.lock().unwrap().clone()
    }

    pub fn linked_data(&self) -> Vec<Value> {
        self.linked.lock().unwrap().clone()
    }
}

#[async_trait]
impl DiagramHost for FakeDiagramHost {
    async fn set_node_selection_enabled(&self, enabled: bool) -> anyhow::Result<()> {
        self.selection_modes.lock().unwrap().push(enabled);
        Ok(())
    }

    async fn has_selected_node(&self) -> anyhow::Result<bool> {
        Ok(self.has_selection.load(Ordering::SeqCst))
    }

    async fn link_selected_node_with_data(&self, data: Value) -> anyhow::Result<()> {
        if !self.has_selection.load(Ordering::SeqCst) {
            return Err(anyhow!("no node selected"));
        }
        self.linked.lock().unwrap().push(data);
        Ok(())
    }
}

// ============================================================================
// Status display
// ============================================================================

#[derive(Default)]
pub struct RecordingStatusDisplay {
    updates: Mutex<Vec<StatusIndicator>>,
}

impl RecordingStatusDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<StatusIndicator> {
        self.updates.lock().unwrap().clone()
    }

    pub fn current(&self) -> Option<StatusIndicator> {
        self.updates.lock().unwrap().last().cloned()
    }
}

impl StatusDisplay for RecordingStatusDisplay {
    fn update(&self, status: &StatusIndicator) {
        self.updates.lock().unwrap().push(status.clone());
    }
}
