//
// symbol_resolver.rs
//
// Resolve a diagram node label to a code location through the workspace symbol index
//

use std::sync::OnceLock;

use regex::Regex;
use tower_lsp::lsp_types::{SymbolInformation, Url};

use crate::host::SymbolIndex;
use crate::position_codec::CodeLocation;

/// Bonus for symbols without a container, so top-level definitions beat members.
const TOP_LEVEL_BONUS: f64 = 10.0;

/// Outcome of resolving a node label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The label carries no `#tag`; nothing to look up.
    NoSymbolName,
    /// The tag was searched but no symbol matched.
    NoMatch { name: String },
    Found { name: String, location: CodeLocation },
}

fn symbol_tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"#([a-zA-Z0-9_]+)").unwrap())
}

/// Extract the first `#tag` of a label.
///
/// # Examples
///
/// ```
/// use codelink::symbol_resolver::extract_symbol_name;
///
/// assert_eq!(extract_symbol_name("Process #handleRequest data"), Some("handleRequest"));
/// assert_eq!(extract_symbol_name("Process data"), None);
/// ```
pub fn extract_symbol_name(label: &str) -> Option<&str> {
    symbol_tag_pattern()
        .captures(label)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Score of one candidate; higher ranks first.
///
/// A document shown in pane `i` of `n` visible panes adds `(n - i) / n`, using its
/// first pane. A symbol with an empty or missing container name adds 10.
pub fn candidate_score(symbol: &SymbolInformation, visible_editors: &[Url]) -> f64 {
    let mut score = 0.0;

    if let Some(idx) = visible_editors
        .iter()
        .position(|uri| uri == &symbol.location.uri)
    {
        let n = visible_editors.len() as f64;
        score += (n - idx as f64) / n;
    }

    if symbol
        .container_name
        .as_deref()
        .map_or(true, |c| c.is_empty())
    {
        score += TOP_LEVEL_BONUS;
    }

    score
}

/// Keep exact name matches and order them best first.
///
/// The sort is stable, so equal scores keep the index's order.
pub fn rank_candidates(
    name: &str,
    symbols: Vec<SymbolInformation>,
    visible_editors: &[Url],
) -> Vec<SymbolInformation> {
    let mut scored: Vec<(f64, SymbolInformation)> = symbols
        .into_iter()
        .filter(|s| s.name == name)
        .map(|s| (candidate_score(&s, visible_editors), s))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().map(|(_, s)| s).collect()
}

/// Resolve a node label to the best matching symbol location.
///
/// Index failures are propagated; a missing tag or an empty match set is a
/// regular [`Resolution`] value.
pub async fn resolve(
    label: &str,
    index: &dyn SymbolIndex,
    visible_editors: &[Url],
) -> anyhow::Result<Resolution> {
    let Some(name) = extract_symbol_name(label) else {
        log::trace!("No symbol tag in label {:?}", label);
        return Ok(Resolution::NoSymbolName);
    };

    let symbols = index.workspace_symbols(name).await?;
    log::trace!(
        "Workspace symbol search for {:?} returned {} candidates",
        name,
        symbols.len()
    );

    let best = rank_candidates(name, symbols, visible_editors)
        .into_iter()
        .next();

    Ok(match best {
        Some(symbol) => Resolution::Found {
            name: name.to_string(),
            location: CodeLocation::new(symbol.location.uri, symbol.location.range),
        },
        None => Resolution::NoMatch {
            name: name.to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fakes::{symbol, FakeSymbolIndex};

    fn uri(name: &str) -> Url {
        Url::parse(&format!("file:///{}", name)).unwrap()
    }

    #[test]
    fn test_extract_symbol_name() {
        assert_eq!(
            extract_symbol_name("Process #handleRequest data"),
            Some("handleRequest")
        );
        assert_eq!(extract_symbol_name("#a_1 and #b"), Some("a_1"));
        assert_eq!(extract_symbol_name("no tag here"), None);
        assert_eq!(extract_symbol_name("dangling # sign"), None);
        assert_eq!(extract_symbol_name("dash #-x"), None);
        assert_eq!(extract_symbol_name("#Foo.bar"), Some("Foo"));
    }

    #[test]
    fn test_visible_candidate_ranks_first() {
        let visible = vec![uri("a.rs"), uri("b.rs")];
        let hidden = symbol("run", Some("Server"), &uri("c.rs"), 1);
        let shown = symbol("run", Some("Worker"), &uri("a.rs"), 2);

        assert_eq!(candidate_score(&shown, &visible), 1.0);
        assert_eq!(candidate_score(&hidden, &visible), 0.0);

        let ranked = rank_candidates("run", vec![hidden, shown.clone()], &visible);
        assert_eq!(ranked[0], shown);
    }

    #[test]
    fn test_earlier_pane_scores_higher() {
        let visible = vec![uri("a.rs"), uri("b.rs"), uri("c.rs"), uri("d.rs")];
        let in_third = symbol("run", Some("X"), &uri("c.rs"), 1);
        let in_second = symbol("run", Some("X"), &uri("b.rs"), 1);

        assert_eq!(candidate_score(&in_third, &visible), 0.5);
        assert_eq!(candidate_score(&in_second, &visible), 0.75);

        let ranked = rank_candidates("run", vec![in_third, in_second.clone()], &visible);
        assert_eq!(ranked[0], in_second);
    }

    #[test]
    fn test_top_level_beats_visibility() {
        let visible = vec![uri("a.rs")];
        let member_visible = symbol("run", Some("Server"), &uri("a.rs"), 1);
        let top_level_hidden = symbol("run", Some(""), &uri("z.rs"), 1);
        let top_level_none = symbol("run", None, &uri("y.rs"), 1);

        assert_eq!(candidate_score(&top_level_hidden, &visible), 10.0);
        assert_eq!(candidate_score(&top_level_none, &visible), 10.0);

        let ranked = rank_candidates(
            "run",
            vec![member_visible, top_level_hidden.clone(), top_level_none.clone()],
            &visible,
        );
        // Equal scores keep index order
        assert_eq!(ranked[0], top_level_hidden);
        assert_eq!(ranked[1], top_level_none);
    }

    #[test]
    fn test_rank_filters_inexact_names() {
        let candidates = vec![
            symbol("runner", None, &uri("a.rs"), 1),
            symbol("Run", None, &uri("b.rs"), 1),
            symbol("run", Some("M"), &uri("c.rs"), 1),
        ];
        let ranked = rank_candidates("run", candidates, &[]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].location.uri, uri("c.rs"));
    }

    #[test]
    fn test_ties_keep_index_order() {
        let first = symbol("run", Some("A"), &uri("a.rs"), 1);
        let second = symbol("run", Some("B"), &uri("b.rs"), 2);
        let third = symbol("run", Some("C"), &uri("c.rs"), 3);
        let ranked = rank_candidates(
            "run",
            vec![first.clone(), second.clone(), third.clone()],
            &[],
        );
        assert_eq!(ranked, vec![first, second, third]);
    }

    #[tokio::test]
    async fn test_resolve_found() {
        let index = FakeSymbolIndex::new()
            .with_symbol(symbol("handleRequest", Some("Server"), &uri("server.rs"), 4))
            .with_symbol(symbol("handleRequest", None, &uri("handlers.rs"), 12));

        let resolution = resolve("Process #handleRequest data", &index, &[])
            .await
            .unwrap();

        match resolution {
            Resolution::Found { name, location } => {
                assert_eq!(name, "handleRequest");
                assert_eq!(location.uri, uri("handlers.rs"));
                assert_eq!(location.range.start.line, 12);
            }
            other => panic!("expected a match, got {:?}", other),
        }
        assert_eq!(index.queries(), vec!["handleRequest".to_string()]);
    }

    #[tokio::test]
    async fn test_resolve_without_tag_skips_index() {
        let index = FakeSymbolIndex::new();
        let resolution = resolve("Process data", &index, &[]).await.unwrap();
        assert_eq!(resolution, Resolution::NoSymbolName);
        assert!(index.queries().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_no_match() {
        let index =
            FakeSymbolIndex::new().with_symbol(symbol("handleRequests", None, &uri("a.rs"), 1));
        let resolution = resolve("#handleRequest", &index, &[]).await.unwrap();
        assert_eq!(
            resolution,
            Resolution::NoMatch {
                name: "handleRequest".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_resolve_propagates_index_failure() {
        let index = FakeSymbolIndex::new().failing();
        assert!(resolve("#anything", &index, &[]).await.is_err());
    }
}
