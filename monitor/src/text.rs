use scraper::{Html, Node};

/// Elements whose text never shows up on the rendered page.
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Elements that render as their own block. Text under different blocks is
/// never merged into one sentence.
const BLOCK_ELEMENTS: [&str; 31] = [
    "address", "article", "aside", "blockquote", "body", "caption", "dd", "details", "div", "dl",
    "dt", "figcaption", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "li",
    "main", "nav", "ol", "p", "section", "summary", "td", "th", "ul",
];

/// Reduces an HTML document to the visible text of each block, in document
/// order, whitespace collapsed. Inline markup stays inside its block.
///
/// Plain text (no markup) comes back as a single block.
pub fn visible_blocks(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut blocks: Vec<String> = Vec::new();
    let mut current = None;

    for node in document.tree.root().descendants() {
        let text: &str = match node.value() {
            Node::Text(text) => &text.text,
            Node::Element(el) if el.name() == "br" => {
                if let Some(last) = blocks.last_mut() {
                    last.push(' ');
                }
                continue;
            }
            _ => continue,
        };

        let mut block = None;
        let mut hidden = false;
        for ancestor in node.ancestors() {
            let Node::Element(el) = ancestor.value() else {
                continue;
            };
            if HIDDEN_ELEMENTS.contains(&el.name()) {
                hidden = true;
                break;
            }
            if block.is_none() && BLOCK_ELEMENTS.contains(&el.name()) {
                block = Some(ancestor.id());
            }
        }
        if hidden {
            continue;
        }

        if block == current && !blocks.is_empty() {
            if let Some(last) = blocks.last_mut() {
                last.push_str(text);
            }
        } else if !text.trim().is_empty() {
            blocks.push(text.to_string());
            current = block;
        }
    }

    blocks
        .iter()
        .map(|block| block.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|block| !block.is_empty())
        .collect()
}
