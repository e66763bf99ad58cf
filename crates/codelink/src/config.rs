//
// config.rs
//
// Configuration for code-link behavior
//

/// Theme color painted behind a revealed range
pub const DEFAULT_HIGHLIGHT_COLOR: &str = "editor.stackFrameHighlightBackground";

/// Code-link configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLinkConfig {
    /// Whether experimental features (linking a selection to a node) are enabled
    pub experimental_features_enabled: bool,
    /// Delay after which a reveal highlight is retracted, in milliseconds
    pub highlight_duration_ms: u64,
    /// View column that every reveal reuses
    pub reveal_view_column: u32,
    /// Theme color key of the reveal highlight background
    pub highlight_color: String,
}

impl Default for CodeLinkConfig {
    /// Experimental features off, 1000 ms highlight in view column 1.
    ///
    /// # Examples
    ///
    /// ```
    /// use codelink::config::CodeLinkConfig;
    ///
    /// let cfg = CodeLinkConfig::default();
    /// assert!(!cfg.experimental_features_enabled);
    /// assert_eq!(cfg.highlight_duration_ms, 1000);
    /// assert_eq!(cfg.reveal_view_column, 1);
    /// ```
    fn default() -> Self {
        Self {
            experimental_features_enabled: false,
            highlight_duration_ms: 1000,
            reveal_view_column: 1,
            highlight_color: DEFAULT_HIGHLIGHT_COLOR.to_string(),
        }
    }
}

impl CodeLinkConfig {
    /// Check if settings that affect how reveals look changed between two configs
    pub fn reveal_settings_changed(&self, other: &Self) -> bool {
        self.highlight_duration_ms != other.highlight_duration_ms
            || self.reveal_view_column != other.reveal_view_column
            || self.highlight_color != other.highlight_color
    }

    pub fn log_summary(&self, source: &str) {
        log::info!("Code-link configuration loaded from {}:", source);
        log::info!(
            "  experimental_features_enabled: {}",
            self.experimental_features_enabled
        );
        log::info!("  highlight_duration_ms: {}", self.highlight_duration_ms);
        log::info!("  reveal_view_column: {}", self.reveal_view_column);
        log::info!("  highlight_color: {}", self.highlight_color);
    }
}

/// Parse code-link configuration from host settings.
///
/// Reads the top-level `codeLink` section of `settings`. Keys that are absent or of
/// the wrong type keep their values from `CodeLinkConfig::default()`. A view column
/// of 0 is rejected since view columns are one-based.
///
/// # Returns
///
/// `Some(CodeLinkConfig)` when the `codeLink` section is present, `None` otherwise.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use codelink::config::parse_code_link_config;
///
/// let settings = json!({
///     "codeLink": { "experimentalFeatures": true, "highlightDurationMs": 250 }
/// });
/// let cfg = parse_code_link_config(&settings).unwrap();
/// assert!(cfg.experimental_features_enabled);
/// assert_eq!(cfg.highlight_duration_ms, 250);
/// ```
pub fn parse_code_link_config(settings: &serde_json::Value) -> Option<CodeLinkConfig> {
    let section = settings.get("codeLink")?;

    let mut config = CodeLinkConfig::default();

    if let Some(v) = section
        .get("experimentalFeatures")
        .and_then(|v| v.as_bool())
    {
        config.experimental_features_enabled = v;
    }
    if let Some(v) = section.get("highlightDurationMs").and_then(|v| v.as_u64()) {
        config.highlight_duration_ms = v;
    }
    if let Some(v) = section
        .get("revealViewColumn")
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
    {
        if v > 0 {
            config.reveal_view_column = v;
        } else {
            log::warn!("Ignoring revealViewColumn 0, view columns start at 1");
        }
    }
    if let Some(v) = section.get("highlightColor").and_then(|v| v.as_str()) {
        if !v.is_empty() {
            config.highlight_color = v.to_string();
        }
    }

    config.log_summary("settings");
    Some(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_values() {
        let config = CodeLinkConfig::default();
        assert!(!config.experimental_features_enabled);
        assert_eq!(config.highlight_duration_ms, 1000);
        assert_eq!(config.reveal_view_column, 1);
        assert_eq!(config.highlight_color, "editor.stackFrameHighlightBackground");
    }

    #[test]
    fn test_parse_missing_section() {
        assert!(parse_code_link_config(&json!({})).is_none());
        assert!(parse_code_link_config(&json!({ "crossFile": {} })).is_none());
    }

    #[test]
    fn test_parse_empty_section_keeps_defaults() {
        let config = parse_code_link_config(&json!({ "codeLink": {} })).unwrap();
        assert_eq!(config, CodeLinkConfig::default());
    }

    #[test]
    fn test_parse_all_keys() {
        let config = parse_code_link_config(&json!({
            "codeLink": {
                "experimentalFeatures": true,
                "highlightDurationMs": 500,
                "revealViewColumn": 2,
                "highlightColor": "editor.findMatchHighlightBackground"
            }
        }))
        .unwrap();
        assert!(config.experimental_features_enabled);
        assert_eq!(config.highlight_duration_ms, 500);
        assert_eq!(config.reveal_view_column, 2);
        assert_eq!(config.highlight_color, "editor.findMatchHighlightBackground");
    }

    #[test]
    fn test_parse_ignores_wrong_types_and_zero_column() {
        let config = parse_code_link_config(&json!({
            "codeLink": {
                "experimentalFeatures": "yes",
                "highlightDurationMs": -3,
                "revealViewColumn": 0,
                "highlightColor": ""
            }
        }))
        .unwrap();
        assert_eq!(config, CodeLinkConfig::default());
    }

    #[test]
    fn test_reveal_settings_changed() {
        let base = CodeLinkConfig::default();
        let mut flag_only = base.clone();
        flag_only.experimental_features_enabled = true;
        assert!(!base.reveal_settings_changed(&flag_only));

        let mut longer = base.clone();
        longer.highlight_duration_ms = 2000;
        assert!(base.reveal_settings_changed(&longer));
    }
}
