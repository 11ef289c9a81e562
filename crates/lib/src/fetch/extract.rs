//! Rendered text of a document's `<body>`.

use scraper::{ElementRef, Html, Node, Selector};

/// Elements whose content never renders as text.
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr",
    "li", "main", "nav", "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Text of the body only: whitespace collapsed to single spaces, block boundaries separated by
/// a space, head and script/style content excluded.
pub fn body_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut raw = String::new();
    if let Ok(body) = Selector::parse("body") {
        if let Some(root) = document.select(&body).next() {
            collect_text(&root, &mut raw);
        }
    }
    collapse_whitespace(&raw)
}

fn collect_text(element: &ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let tag = el.name();
                if SKIPPED_TAGS.contains(&tag) {
                    continue;
                }
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                let is_block = BLOCK_TAGS.contains(&tag);
                if is_block {
                    out.push(' ');
                }
                collect_text(&child_ref, out);
                if is_block {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
