//! Small helpers over the parsed tree shared by identification and conversion.

use scraper::node::Node;
use scraper::{ElementRef, Html};

/// Elements whose text never renders.
const HIDDEN_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Elements that have no closing tag.
pub(crate) const VOID_TAGS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Position of an element below a component root: child indices from the root.
pub(crate) type NodePath = Vec<usize>;

/// The root and every element below it in document order, with their paths.
pub(crate) fn elements_with_paths(root: ElementRef<'_>) -> Vec<(NodePath, ElementRef<'_>)> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    walk(root, &mut path, &mut out);
    out
}

fn walk<'a>(el: ElementRef<'a>, path: &mut NodePath, out: &mut Vec<(NodePath, ElementRef<'a>)>) {
    out.push((path.clone(), el));
    for (index, child) in el.children().enumerate() {
        if let Some(child) = ElementRef::wrap(child) {
            path.push(index);
            walk(child, path, out);
            path.pop();
        }
    }
}

/// Concatenated text that would render, skipping script/style content.
pub(crate) fn visible_text(root: ElementRef<'_>) -> String {
    let mut out = String::new();
    push_visible_text(root, &mut out);
    out
}

fn push_visible_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) if !HIDDEN_TAGS.contains(&element.name()) => {
                if let Some(child) = ElementRef::wrap(child) {
                    push_visible_text(child, out);
                }
            }
            _ => {}
        }
    }
}

/// Whether the root or any element below it has the given tag name.
pub(crate) fn contains_tag(root: ElementRef<'_>, tag: &str) -> bool {
    elements_with_paths(root)
        .iter()
        .any(|(_, el)| el.value().name() == tag)
}

/// First element of a parsed fragment.
pub(crate) fn fragment_root(fragment: &Html) -> Option<ElementRef<'_>> {
    fragment
        .root_element()
        .children()
        .find_map(ElementRef::wrap)
}

pub(crate) fn is_hidden_tag(name: &str) -> bool {
    HIDDEN_TAGS.contains(&name)
}
