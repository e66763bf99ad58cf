//
// reveal.rs
//
// Navigate to a code location and paint a transient highlight
//

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::CodeLinkConfig;
use crate::host::{DecorationId, DecorationStyle, EditorHost, EditorId, RevealType, ShowOptions};
use crate::position_codec::CodeLocation;

/// The highlight currently painted, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightHandle {
    pub editor: EditorId,
    pub decoration: DecorationId,
}

/// Reveals code locations in a single reused view column.
///
/// At most one highlight is active: each reveal clears the previous highlight
/// before painting its own, and every highlight clears itself after the
/// configured delay. A late retraction only touches its own decoration, so it
/// never affects a newer highlight.
pub struct RevealController {
    editor: Arc<dyn EditorHost>,
    config: Mutex<CodeLinkConfig>,
    active: Arc<Mutex<Option<HighlightHandle>>>,
}

impl RevealController {
    pub fn new(editor: Arc<dyn EditorHost>, config: CodeLinkConfig) -> Self {
        Self {
            editor,
            config: Mutex::new(config),
            active: Arc::new(Mutex::new(None)),
        }
    }

    pub fn set_config(&self, config: CodeLinkConfig) {
        *self.config.lock().unwrap_or_else(PoisonError::into_inner) = config;
    }

    pub fn active_highlight(&self) -> Option<HighlightHandle> {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open `loc` in the reveal column without taking focus and highlight it.
    ///
    /// Returns once the highlight is painted. The returned handle belongs to the
    /// detached retraction task; callers may drop it.
    pub async fn reveal(&self, loc: &CodeLocation) -> anyhow::Result<JoinHandle<()>> {
        let config = self
            .config
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        self.editor.open_document(&loc.uri).await?;
        let editor_id = self
            .editor
            .show_document(
                &loc.uri,
                ShowOptions {
                    view_column: config.reveal_view_column,
                    preserve_focus: true,
                },
            )
            .await?;

        let range = loc.reveal_range();
        self.editor
            .reveal_range(editor_id, range, RevealType::InCenterIfOutsideViewport);

        let decoration = self.editor.create_decoration(&DecorationStyle {
            background_theme_color: config.highlight_color.clone(),
        });
        let handle = HighlightHandle {
            editor: editor_id,
            decoration,
        };

        let previous = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            self.editor
                .set_decorations(previous.editor, previous.decoration, &[]);
        }
        self.editor.set_decorations(editor_id, decoration, &[range]);
        log::trace!("Revealed {} in editor {:?}", loc, editor_id);

        Ok(self.schedule_retraction(handle, Duration::from_millis(config.highlight_duration_ms)))
    }

    fn schedule_retraction(&self, handle: HighlightHandle, delay: Duration) -> JoinHandle<()> {
        let editor = Arc::clone(&self.editor);
        let active = Arc::clone(&self.active);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut active = active.lock().unwrap_or_else(PoisonError::into_inner);
                if *active == Some(handle) {
                    *active = None;
                }
            }
            editor.set_decorations(handle.editor, handle.decoration, &[]);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fakes::FakeEditorHost;
    use tower_lsp::lsp_types::{Position, Range, Url};

    fn location(name: &str, sl: u32, sc: u32, el: u32, ec: u32) -> CodeLocation {
        CodeLocation::new(
            Url::parse(&format!("file:///{}", name)).unwrap(),
            Range::new(Position::new(sl, sc), Position::new(el, ec)),
        )
    }

    fn controller(editor: &Arc<FakeEditorHost>) -> RevealController {
        RevealController::new(editor.clone(), CodeLinkConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveal_opens_shows_and_highlights() {
        let editor = Arc::new(FakeEditorHost::new());
        let reveal = controller(&editor);
        let loc = location("a.rs", 3, 0, 5, 2);

        reveal.reveal(&loc).await.unwrap();

        assert_eq!(editor.opened(), vec![loc.uri.clone()]);
        let shown = editor.shown();
        assert_eq!(shown.len(), 1);
        assert_eq!(
            shown[0].1,
            ShowOptions {
                view_column: 1,
                preserve_focus: true
            }
        );
        assert_eq!(
            editor.revealed(),
            vec![(shown[0].2, loc.range, RevealType::InCenterIfOutsideViewport)]
        );

        let active = reveal.active_highlight().unwrap();
        assert_eq!(editor.painted(active.decoration), vec![loc.range]);
        assert_eq!(
            editor.decoration_style(active.decoration).unwrap().background_theme_color,
            "editor.stackFrameHighlightBackground"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_highlight_retracts_after_delay() {
        let editor = Arc::new(FakeEditorHost::new());
        let reveal = controller(&editor);

        let retraction = reveal.reveal(&location("a.rs", 1, 0, 1, 4)).await.unwrap();
        let handle = reveal.active_highlight().unwrap();

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(editor.painted(handle.decoration).len(), 1);

        retraction.await.unwrap();
        assert!(editor.painted(handle.decoration).is_empty());
        assert!(reveal.active_highlight().is_none());
        assert!(editor.painted_decorations().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_reveal_supersedes_first() {
        let editor = Arc::new(FakeEditorHost::new());
        let reveal = controller(&editor);

        let first_retraction = reveal.reveal(&location("a.rs", 1, 0, 1, 4)).await.unwrap();
        let first = reveal.active_highlight().unwrap();

        tokio::time::sleep(Duration::from_millis(400)).await;
        let second_retraction = reveal.reveal(&location("b.rs", 7, 0, 9, 0)).await.unwrap();
        let second = reveal.active_highlight().unwrap();

        assert_ne!(first.decoration, second.decoration);
        assert_eq!(editor.painted_decorations(), vec![second.decoration]);

        // First retraction fires at +1000ms and leaves the second highlight alone
        first_retraction.await.unwrap();
        assert_eq!(reveal.active_highlight(), Some(second));
        assert_eq!(editor.painted_decorations(), vec![second.decoration]);

        second_retraction.await.unwrap();
        assert!(reveal.active_highlight().is_none());
        assert!(editor.painted_decorations().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reversed_range_highlights_point() {
        let editor = Arc::new(FakeEditorHost::new());
        let reveal = controller(&editor);

        reveal.reveal(&location("a.rs", 8, 4, 2, 0)).await.unwrap();

        let point = Range::new(Position::new(8, 4), Position::new(8, 4));
        let active = reveal.active_highlight().unwrap();
        assert_eq!(editor.painted(active.decoration), vec![point]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveal_uses_configured_column_and_color() {
        let editor = Arc::new(FakeEditorHost::new());
        let reveal = controller(&editor);
        reveal.set_config(CodeLinkConfig {
            reveal_view_column: 2,
            highlight_color: "custom.color".to_string(),
            highlight_duration_ms: 50,
            ..CodeLinkConfig::default()
        });

        let retraction = reveal.reveal(&location("a.rs", 0, 0, 0, 1)).await.unwrap();
        assert_eq!(editor.shown()[0].1.view_column, 2);
        let active = reveal.active_highlight().unwrap();
        assert_eq!(
            editor.decoration_style(active.decoration).unwrap().background_theme_color,
            "custom.color"
        );

        retraction.await.unwrap();
        assert!(reveal.active_highlight().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_failure_is_surfaced() {
        let editor = Arc::new(FakeEditorHost::new().failing_open());
        let reveal = controller(&editor);

        assert!(reveal.reveal(&location("a.rs", 0, 0, 0, 1)).await.is_err());
        assert!(reveal.active_highlight().is_none());
        assert!(editor.painted_decorations().is_empty());
    }
}
