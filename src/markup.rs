//! Inline `<script>` replacement inside an HTML document.

use scraper::{Html, Node, Selector};

use crate::source::ParseError;

pub(crate) struct ScriptRewrite {
    /// `Some` only when at least one script's text changed.
    pub html: Option<String>,
    /// One entry per inline script, in document order.
    pub results: Vec<Result<(), ParseError>>,
}

/// `type` values a browser executes as classic or module script. Anything
/// else (`application/json`, `text/template`, ...) is a data block.
const JAVASCRIPT_TYPES: [&str; 8] = [
    "module",
    "text/javascript",
    "application/javascript",
    "text/ecmascript",
    "application/ecmascript",
    "application/x-javascript",
    "text/x-javascript",
    "text/jscript",
];

/// Missing or blank `type` means classic script. Parameters after `;` are
/// ignored and the comparison is case-insensitive.
fn is_javascript(type_attr: Option<&str>) -> bool {
    let Some(raw) = type_attr else { return true };
    let essence = raw.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    essence.is_empty() || JAVASCRIPT_TYPES.contains(&essence.as_str())
}

/// Runs `instrument` over the text of every JavaScript `<script>` element
/// that has no `src` attribute. A script whose text fails keeps its
/// original content. Data blocks are neither rewritten nor counted.
pub(crate) fn rewrite_inline_scripts<F>(document: &str, mut instrument: F) -> ScriptRewrite
where
    F: FnMut(usize, &str) -> Result<String, ParseError>,
{
    let Ok(selector) = Selector::parse("script") else {
        return ScriptRewrite { html: None, results: vec![] };
    };
    let mut doc = Html::parse_document(document);

    let inline: Vec<_> = doc
        .select(&selector)
        .filter(|el| el.value().attr("src").is_none() && is_javascript(el.value().attr("type")))
        .map(|el| (el.id(), el.text().collect::<String>()))
        .collect();

    let mut results = Vec::with_capacity(inline.len());
    let mut changed = false;
    for (index, (id, text)) in inline.into_iter().enumerate() {
        let rewritten = match instrument(index, &text) {
            Ok(rewritten) => rewritten,
            Err(err) => {
                results.push(Err(err));
                continue;
            }
        };
        results.push(Ok(()));

        let Some(mut script) = doc.tree.get_mut(id) else { continue };
        let Some(mut first) = script.first_child() else { continue };
        // the parser merges script data into one text node; drop any extras
        while let Some(mut extra) = first.next_sibling() {
            extra.detach();
        }
        if let Node::Text(t) = first.value() {
            t.text = rewritten.as_str().into();
            changed = true;
        }
    }

    ScriptRewrite { html: changed.then(|| doc.html()), results }
}
