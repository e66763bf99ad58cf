//
// service.rs
//
// Process-wide code-link service: open diagrams, focus tracking, and user actions
//

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use indexmap::IndexMap;
use tokio::sync::{mpsc, watch};

use crate::activation::{
    self, spawn_status_binding, StatusDisplay, LINK_SELECTION_COMMAND, TOGGLE_ACTIVATION_COMMAND,
};
use crate::config::{parse_code_link_config, CodeLinkConfig};
use crate::error::{CodeLinkError, Precondition};
use crate::host::{DiagramEvent, DiagramId, EditorHost, SymbolIndex, TextEditorRef};
use crate::position_codec::CodeLocation;
use crate::reveal::RevealController;
use crate::session::{self, DiagramDocument, LinkContext, LinkSession, Subscriptions};

/// Actions exposed to the surrounding extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ToggleActivation,
    LinkCodeWithSelectedNode,
}

impl Action {
    pub fn command_id(self) -> &'static str {
        match self {
            Action::ToggleActivation => TOGGLE_ACTIVATION_COMMAND,
            Action::LinkCodeWithSelectedNode => LINK_SELECTION_COMMAND,
        }
    }

    pub fn from_command_id(id: &str) -> Option<Self> {
        match id {
            TOGGLE_ACTIVATION_COMMAND => Some(Action::ToggleActivation),
            LINK_SELECTION_COMMAND => Some(Action::LinkCodeWithSelectedNode),
            _ => None,
        }
    }
}

/// Focus bookkeeping. Only the most recent reference of each kind is kept.
#[derive(Debug, Clone, Default)]
pub struct FocusState {
    /// Diagram currently focused, if any
    pub active_diagram: Option<DiagramId>,
    /// Most recently focused diagram; survives focus moving to a text editor
    pub last_active_diagram: Option<DiagramId>,
    /// Most recently focused text editor
    pub last_text_editor: Option<TextEditorRef>,
}

/// Owns one [`LinkSession`] per open diagram and the status indicator binding.
///
/// Must be created inside a tokio runtime.
pub struct CodeLinkService {
    editor: Arc<dyn EditorHost>,
    symbols: Arc<dyn SymbolIndex>,
    reveal: Arc<RevealController>,
    config: RwLock<CodeLinkConfig>,
    focus: Mutex<FocusState>,
    sessions: Mutex<IndexMap<DiagramId, LinkSession>>,
    active_diagram: watch::Sender<Option<Arc<DiagramDocument>>>,
    _subscriptions: Subscriptions,
}

impl CodeLinkService {
    pub fn new(
        editor: Arc<dyn EditorHost>,
        symbols: Arc<dyn SymbolIndex>,
        status: Arc<dyn StatusDisplay>,
        config: CodeLinkConfig,
    ) -> Self {
        config.log_summary("defaults");
        let reveal = Arc::new(RevealController::new(Arc::clone(&editor), config.clone()));
        let (active_diagram, active_rx) = watch::channel(None);

        let mut subscriptions = Subscriptions::new();
        subscriptions.track(spawn_status_binding(
            active_rx,
            status,
            subscriptions.token(),
        ));

        Self {
            editor,
            symbols,
            reveal,
            config: RwLock::new(config),
            focus: Mutex::new(FocusState::default()),
            sessions: Mutex::new(IndexMap::new()),
            active_diagram,
            _subscriptions: subscriptions,
        }
    }

    pub fn config(&self) -> CodeLinkConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_config(&self, config: CodeLinkConfig) {
        let mut current = self.config.write().unwrap_or_else(PoisonError::into_inner);
        if current.reveal_settings_changed(&config) {
            log::trace!("Reveal settings changed, updating reveal controller");
            self.reveal.set_config(config.clone());
        }
        *current = config;
    }

    /// Apply host settings. Returns false if they carry no `codeLink` section,
    /// in which case the current configuration is kept.
    pub fn update_config(&self, settings: &serde_json::Value) -> bool {
        match parse_code_link_config(settings) {
            Some(config) => {
                self.set_config(config);
                true
            }
            None => {
                log::warn!("Settings have no codeLink section, keeping current configuration");
                false
            }
        }
    }

    pub fn reveal_controller(&self) -> &Arc<RevealController> {
        &self.reveal
    }

    pub fn focus(&self) -> FocusState {
        self.lock_focus().clone()
    }

    pub fn active_diagram(&self) -> Option<Arc<DiagramDocument>> {
        self.active_diagram.borrow().clone()
    }

    pub fn open_diagrams(&self) -> Vec<DiagramId> {
        self.lock_sessions().keys().cloned().collect()
    }

    /// Start a link session for a newly opened diagram.
    ///
    /// Reopening an id replaces, and closes, its previous session.
    pub fn open_diagram(
        &self,
        document: DiagramDocument,
        events: mpsc::UnboundedReceiver<DiagramEvent>,
    ) -> Arc<DiagramDocument> {
        let document = Arc::new(document);
        let context = LinkContext {
            editor: Arc::clone(&self.editor),
            symbols: Arc::clone(&self.symbols),
            reveal: Arc::clone(&self.reveal),
        };
        let session = LinkSession::open(Arc::clone(&document), events, context);
        let replaced = self.lock_sessions().insert(document.id.clone(), session);
        if let Some(mut replaced) = replaced {
            replaced.close();
            let focused = self.lock_focus().active_diagram.as_ref() == Some(&document.id);
            if focused {
                log::trace!("Reopened active diagram {}", document.id);
                self.active_diagram.send_replace(Some(Arc::clone(&document)));
            }
        }
        document
    }

    /// Close the session of a diagram and forget it in focus tracking.
    pub fn close_diagram(&self, id: &DiagramId) -> bool {
        let Some(mut session) = self.lock_sessions().shift_remove(id) else {
            return false;
        };
        session.close();

        let was_active = {
            let mut focus = self.lock_focus();
            if focus.last_active_diagram.as_ref() == Some(id) {
                focus.last_active_diagram = None;
            }
            if focus.active_diagram.as_ref() == Some(id) {
                focus.active_diagram = None;
                true
            } else {
                false
            }
        };
        if was_active {
            self.active_diagram.send_replace(None);
        }
        true
    }

    /// Record a focus change between diagrams; `None` means no diagram has focus.
    ///
    /// Focus on a diagram without a session counts as no diagram having focus.
    pub fn diagram_focused(&self, id: Option<&DiagramId>) {
        let document = id.and_then(|id| {
            let document = self
                .lock_sessions()
                .get(id)
                .map(|session| Arc::clone(session.document()));
            if document.is_none() {
                log::trace!("Focus moved to unknown diagram {}", id);
            }
            document
        });

        {
            let mut focus = self.lock_focus();
            focus.active_diagram = document.as_ref().map(|d| d.id.clone());
            if let Some(document) = &document {
                focus.last_active_diagram = Some(document.id.clone());
            }
        }
        self.active_diagram.send_replace(document);
    }

    /// Record a focus change between text editors. Losing text focus keeps the
    /// last editor.
    pub fn text_editor_focused(&self, editor: Option<TextEditorRef>) {
        if let Some(editor) = editor {
            log::trace!("Text editor {:?} focused ({})", editor.id, editor.uri);
            self.lock_focus().last_text_editor = Some(editor);
        }
    }

    /// Flip code-link activation of the active diagram; no-op without one.
    pub async fn toggle_code_link_activation(&self) -> Result<(), CodeLinkError> {
        let active = self.active_diagram();
        activation::toggle_activation(active.as_deref()).await?;
        Ok(())
    }

    /// Link the selection of the last focused text editor to the selected node of
    /// the last focused diagram.
    pub async fn link_code_with_selected_node(&self) -> Result<(), CodeLinkError> {
        if !self.config().experimental_features_enabled {
            return Err(Precondition::FeatureNotEnabled.into());
        }

        let document = self
            .last_active_document()
            .ok_or(Precondition::NoActiveDiagram)?;
        if !document.host.has_selected_node().await? {
            return Err(Precondition::NoSelectedNode.into());
        }

        let editor = self
            .focus()
            .last_text_editor
            .ok_or(Precondition::NoTextEditor)?;
        let selection = self
            .editor
            .selection(editor.id)
            .ok_or(Precondition::NoTextEditor)?;
        if selection.start == selection.end {
            return Err(Precondition::NothingSelected.into());
        }

        let location = CodeLocation::new(editor.uri, selection);
        session::link_location(&document, &location, &self.reveal).await
    }

    /// Run an action, showing any failure to the user.
    pub async fn execute(&self, action: Action) -> Result<(), CodeLinkError> {
        let result = match action {
            Action::ToggleActivation => self.toggle_code_link_activation().await,
            Action::LinkCodeWithSelectedNode => self.link_code_with_selected_node().await,
        };
        if let Err(err) = &result {
            log::warn!("{} failed: {}", action.command_id(), err);
            self.editor.show_error_message(&err.to_string());
        }
        result
    }

    /// Run the action registered under `command`. Returns false for unknown commands.
    pub async fn execute_command(&self, command: &str) -> bool {
        match Action::from_command_id(command) {
            Some(action) => {
                let _ = self.execute(action).await;
                true
            }
            None => false,
        }
    }

    fn last_active_document(&self) -> Option<Arc<DiagramDocument>> {
        let id = self.lock_focus().last_active_diagram.clone()?;
        self.lock_sessions()
            .get(&id)
            .map(|session| Arc::clone(session.document()))
    }

    fn lock_focus(&self) -> std::sync::MutexGuard<'_, FocusState> {
        self.focus.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_sessions(&self) -> std::sync::MutexGuard<'_, IndexMap<DiagramId, LinkSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
