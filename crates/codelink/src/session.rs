//
// session.rs
//
// Per-diagram link session: node selection to code, code selection to node
//

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::activation::spawn_selection_mode_binding;
use crate::error::CodeLinkError;
use crate::host::{
    DiagramEvent, DiagramHost, DiagramId, DiagramNodeSelection, DocumentConfig, EditorHost,
    SymbolIndex,
};
use crate::position_codec::{self, CodeLocation};
use crate::reveal::RevealController;
use crate::symbol_resolver::{self, Resolution};

/// An open diagram document with its host commands and activation store.
pub struct DiagramDocument {
    pub id: DiagramId,
    pub host: Arc<dyn DiagramHost>,
    pub config: Arc<dyn DocumentConfig>,
}

impl std::fmt::Debug for DiagramDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagramDocument")
            .field("id", &self.id)
            .field("code_link_activated", &self.config.code_link_activated())
            .finish()
    }
}

/// Shared collaborators a session needs to handle events.
#[derive(Clone)]
pub struct LinkContext {
    pub editor: Arc<dyn EditorHost>,
    pub symbols: Arc<dyn SymbolIndex>,
    pub reveal: Arc<RevealController>,
}

/// All subscriptions acquired for one document.
///
/// Releasing (or dropping) cancels the root token, which stops every task
/// spawned under it, and aborts the tracked tasks that have not finished.
#[derive(Debug)]
pub struct Subscriptions {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    /// Token for a task that must stop when these subscriptions are released.
    pub fn token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn track(&mut self, task: JoinHandle<()>) {
        self.tasks.retain(|t| !t.is_finished());
        self.tasks.push(task);
    }

    pub fn release(&mut self) {
        self.token.cancel();
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    pub fn is_released(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Default for Subscriptions {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        self.release();
    }
}

/// Event loop of one open diagram document.
///
/// Events are handled one at a time in arrival order. The session ends when it is
/// closed or dropped, or when the host drops the event sender.
pub struct LinkSession {
    document: Arc<DiagramDocument>,
    subscriptions: Subscriptions,
}

impl LinkSession {
    pub fn open(
        document: Arc<DiagramDocument>,
        events: mpsc::UnboundedReceiver<DiagramEvent>,
        context: LinkContext,
    ) -> Self {
        let mut subscriptions = Subscriptions::new();
        let task = tokio::spawn(run_session(
            Arc::clone(&document),
            events,
            context,
            subscriptions.token(),
        ));
        subscriptions.track(task);
        Self {
            document,
            subscriptions,
        }
    }

    pub fn document(&self) -> &Arc<DiagramDocument> {
        &self.document
    }

    pub fn close(&mut self) {
        if !self.subscriptions.is_released() {
            log::info!("Closing code-link session for {}", self.document.id);
        }
        self.subscriptions.release();
    }

    pub fn is_closed(&self) -> bool {
        self.subscriptions.is_released()
    }
}

async fn run_session(
    document: Arc<DiagramDocument>,
    mut events: mpsc::UnboundedReceiver<DiagramEvent>,
    context: LinkContext,
    cancel: CancellationToken,
) {
    log::info!("Code-link session opened for {}", document.id);
    let mut plugin_bound = false;

    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = events.recv() => event,
        };
        let Some(event) = event else {
            log::trace!("Event stream of {} ended", document.id);
            break;
        };

        match event {
            DiagramEvent::CustomPluginLoaded => {
                if plugin_bound {
                    continue;
                }
                plugin_bound = true;
                spawn_selection_mode_binding(Arc::clone(&document), cancel.child_token());
            }
            DiagramEvent::NodeSelected(selection) => {
                if let Err(err) = handle_node_selected(&document, selection, &context).await {
                    log::warn!("Code link from {} failed: {}", document.id, err);
                    context.editor.show_error_message(&err.to_string());
                }
            }
        }
    }

    // Covers the host dropping the sender without closing the session
    cancel.cancel();
    log::trace!("Code-link session for {} stopped", document.id);
}

/// Reveal the code behind a selected node.
///
/// Linked data on the node is authoritative: if it does not decode, the error is
/// returned and the label is not consulted.
pub async fn handle_node_selected(
    document: &DiagramDocument,
    selection: DiagramNodeSelection,
    context: &LinkContext,
) -> Result<(), CodeLinkError> {
    if !document.config.code_link_activated() {
        return Ok(());
    }

    let location = match selection.linked_data {
        Some(data) => position_codec::decode(&data)?,
        None => {
            let visible = context.editor.visible_editors();
            match symbol_resolver::resolve(&selection.label, context.symbols.as_ref(), &visible)
                .await?
            {
                Resolution::Found { location, .. } => location,
                Resolution::NoSymbolName => return Ok(()),
                Resolution::NoMatch { name } => return Err(CodeLinkError::ResolutionMiss(name)),
            }
        }
    };

    context.reveal.reveal(&location).await?;
    Ok(())
}

/// Attach `location` to the selected node of `document`, then reveal it as confirmation.
pub async fn link_location(
    document: &DiagramDocument,
    location: &CodeLocation,
    reveal: &RevealController,
) -> Result<(), CodeLinkError> {
    let link = position_codec::encode(location);
    document
        .host
        .link_selected_node_with_data(link.to_value())
        .await?;
    log::info!("Linked {} to selected node of {}", location, document.id);
    reveal.reveal(location).await?;
    Ok(())
}
