//
// activation.rs
//
// Keeps the status indicator and diagram selection mode in step with activation
//

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::session::DiagramDocument;

pub const TOGGLE_ACTIVATION_COMMAND: &str = "codeLink.toggleActivation";
pub const LINK_SELECTION_COMMAND: &str = "codeLink.linkCodeWithSelectedNode";

/// Desired state of the global status indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusIndicator {
    pub text: String,
    pub visible: bool,
    /// Command run when the indicator is clicked
    pub command: &'static str,
}

impl StatusIndicator {
    pub fn hidden() -> Self {
        Self {
            text: String::new(),
            visible: false,
            command: TOGGLE_ACTIVATION_COMMAND,
        }
    }

    pub fn for_activation(activated: bool) -> Self {
        let marker = if activated {
            "$(circle-filled)"
        } else {
            "$(circle-outline)"
        };
        Self {
            text: format!("$(link) {} Code Link", marker),
            visible: true,
            command: TOGGLE_ACTIVATION_COMMAND,
        }
    }

    /// Indicator for the activation of the active diagram, hidden without one.
    pub fn from_state(active_activation: Option<bool>) -> Self {
        match active_activation {
            Some(activated) => Self::for_activation(activated),
            None => Self::hidden(),
        }
    }
}

/// Sink for status indicator updates. Applying the same state twice must not
/// change what the user sees.
pub trait StatusDisplay: Send + Sync {
    fn update(&self, status: &StatusIndicator);
}

/// Re-render the status indicator whenever the active diagram or its activation changes.
pub fn spawn_status_binding(
    mut active: watch::Receiver<Option<Arc<DiagramDocument>>>,
    display: Arc<dyn StatusDisplay>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let document = active.borrow_and_update().clone();

            let Some(document) = document else {
                display.update(&StatusIndicator::hidden());
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return,
                    changed = active.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                }
                continue;
            };

            let mut activated = document.config.watch_code_link_activated();
            let mut activation_live = true;
            loop {
                let value = *activated.borrow_and_update();
                display.update(&StatusIndicator::for_activation(value));
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return,
                    changed = active.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        break;
                    }
                    changed = activated.changed(), if activation_live => {
                        if changed.is_err() {
                            activation_live = false;
                        }
                    }
                }
            }
        }
    })
}

/// Forward a document's activation into the diagram's node-selection capture mode,
/// starting with the current value, until `cancel` fires.
pub fn spawn_selection_mode_binding(
    document: Arc<DiagramDocument>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut activated = document.config.watch_code_link_activated();
        loop {
            let value = *activated.borrow_and_update();
            log::trace!("Setting node selection mode of {} to {}", document.id, value);
            if let Err(e) = document.host.set_node_selection_enabled(value).await {
                log::warn!(
                    "Failed to set node selection mode of {}: {}",
                    document.id,
                    e
                );
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                changed = activated.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
    })
}

/// Flip the activation of `active`. Without an active diagram this does nothing.
pub async fn toggle_activation(active: Option<&DiagramDocument>) -> anyhow::Result<()> {
    let Some(document) = active else {
        log::trace!("Toggle activation ignored, no active diagram");
        return Ok(());
    };
    let activated = !document.config.code_link_activated();
    log::info!("Code link for {} turned {}", document.id, if activated { "on" } else { "off" });
    document.config.set_code_link_activated(activated).await
}
