//
// position_codec.rs
//
// Conversion between code locations and the link record stored on diagram nodes
//

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_lsp::lsp_types::{Position, Range, Url};

use crate::error::CodeLinkError;

/// A range inside a source document.
///
/// Immutable once built; ranges are carried as given, including reversed ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLocation {
    pub uri: Url,
    pub range: Range,
}

impl CodeLocation {
    pub fn new(uri: Url, range: Range) -> Self {
        Self { uri, range }
    }

    /// Range used for scrolling and highlighting.
    ///
    /// Empty and reversed ranges collapse to a zero-width point at `start`.
    pub fn reveal_range(&self) -> Range {
        let Range { start, end } = self.range;
        if (end.line, end.character) <= (start.line, start.character) {
            Range::new(start, start)
        } else {
            self.range
        }
    }
}

impl std::fmt::Display for CodeLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}-{}:{}",
            self.uri,
            self.range.start.line,
            self.range.start.character,
            self.range.end.line,
            self.range.end.character
        )
    }
}

/// Line/column pair in the stored link format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkPosition {
    pub line: u32,
    pub col: u32,
}

impl From<Position> for LinkPosition {
    fn from(pos: Position) -> Self {
        Self {
            line: pos.line,
            col: pos.character,
        }
    }
}

impl From<LinkPosition> for Position {
    fn from(pos: LinkPosition) -> Self {
        Position::new(pos.line, pos.col)
    }
}

/// Stored form of a [`CodeLocation`], attached to a diagram node as its linked data.
///
/// The shape carries no version field: `{ uri, start: {line, col}, end: {line, col} }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedLink {
    pub uri: String,
    pub start: LinkPosition,
    pub end: LinkPosition,
}

impl SerializedLink {
    /// Rebuild the code location this link points at.
    pub fn decode(&self) -> Result<CodeLocation, CodeLinkError> {
        let uri = Url::parse(&self.uri).map_err(|e| {
            CodeLinkError::MalformedLink(format!("invalid uri {:?}: {}", self.uri, e))
        })?;
        Ok(CodeLocation::new(
            uri,
            Range::new(self.start.into(), self.end.into()),
        ))
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "uri": self.uri,
            "start": { "line": self.start.line, "col": self.start.col },
            "end": { "line": self.end.line, "col": self.end.col },
        })
    }
}

pub fn encode(loc: &CodeLocation) -> SerializedLink {
    SerializedLink {
        uri: loc.uri.to_string(),
        start: loc.range.start.into(),
        end: loc.range.end.into(),
    }
}

/// Decode untyped linked data read from a diagram node.
///
/// Fails with [`CodeLinkError::MalformedLink`] when `uri`, `start` or `end` is missing,
/// when a line/column is not a non-negative integer, or when the uri does not parse.
/// Unknown extra fields are ignored.
pub fn decode(value: &Value) -> Result<CodeLocation, CodeLinkError> {
    let link = SerializedLink::deserialize(value)
        .map_err(|e| CodeLinkError::MalformedLink(e.to_string()))?;
    link.decode()
}
