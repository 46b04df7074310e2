//! Parameter extraction and placeholder rendering.
//!
//! Every extracted value is bound to the position of the element it came
//! from, so rendering replaces exactly that element's content or attribute.
//! A value that happens to repeat elsewhere in the component is left alone.
//! Text is only bound on elements whose children are all text, so nested
//! markup inside a heading, paragraph or link always survives rendering.

use indexmap::IndexMap;
use scraper::node::Node;
use scraper::ElementRef;
use std::collections::HashMap;

use crate::pipeline::dom::{elements_with_paths, is_hidden_tag, visible_text, NodePath, VOID_TAGS};
use crate::types::component::ComponentParameters;

const TEXT_TAGS: [&str; 9] = ["h1", "h2", "h3", "h4", "h5", "h6", "p", "span", "a"];

/// Parameters of one component together with their bindings to tree positions.
#[derive(Debug, Clone, Default)]
pub struct ParameterPlan {
    pub parameters: ComponentParameters,
    text_bindings: HashMap<NodePath, String>,
    attr_bindings: HashMap<NodePath, Vec<(String, String)>>,
}

impl ParameterPlan {
    /// Extract parameters below `root` (the root itself included).
    ///
    /// Order is fixed: text elements, then images, then links, each in
    /// document order.
    pub fn extract(root: ElementRef<'_>) -> Self {
        let elements = elements_with_paths(root);
        let mut plan = Self::default();

        let mut tag_counts: HashMap<&str, usize> = HashMap::new();
        for (path, el) in &elements {
            let tag = el.value().name();
            if !TEXT_TAGS.contains(&tag) {
                continue;
            }
            let text = visible_text(*el);
            let text = text.trim();
            if text.is_empty() {
                continue;
            }

            let count = tag_counts.entry(tag).or_insert(0);
            let key = to_camel_case(&indexed_key(tag, *count));
            *count += 1;

            plan.parameters.text.insert(key.clone(), text.to_string());

            // Mixed content keeps its children; only text-only elements collapse
            if el.children().all(|child| child.value().is_text()) {
                plan.text_bindings.insert(path.clone(), key);
            }
        }

        let mut image_count = 0;
        for (path, el) in &elements {
            if el.value().name() != "img" {
                continue;
            }
            let Some(src) = el.value().attr("src").filter(|s| !s.is_empty()) else {
                continue;
            };

            let key = indexed_key("image", image_count);
            image_count += 1;
            plan.parameters.images.insert(key.clone(), src.to_string());
            plan.bind_attr(path, "src", &key);

            if let Some(alt) = el.value().attr("alt").filter(|a| !a.trim().is_empty()) {
                let alt_key = format!("{}Alt", key);
                plan.parameters.images.insert(alt_key.clone(), alt.to_string());
                plan.bind_attr(path, "alt", &alt_key);
            }
        }

        let mut link_count = 0;
        for (path, el) in &elements {
            if el.value().name() != "a" {
                continue;
            }
            let Some(href) = el.value().attr("href") else {
                continue;
            };

            let key = indexed_key("link", link_count);
            link_count += 1;
            plan.parameters.links.insert(key.clone(), href.to_string());
            plan.bind_attr(path, "href", &key);

            let text = visible_text(*el);
            if !text.trim().is_empty() {
                plan.parameters
                    .links
                    .insert(format!("{}Text", key), text.trim().to_string());
            }
        }

        plan
    }

    /// Append caller-supplied parameters. Keys are camel-cased.
    pub fn with_custom(mut self, custom: &IndexMap<String, serde_json::Value>) -> Self {
        for (key, value) in custom {
            self.parameters
                .custom
                .insert(to_camel_case(key), value.clone());
        }
        self
    }

    fn bind_attr(&mut self, path: &NodePath, attr: &str, key: &str) {
        self.attr_bindings
            .entry(path.clone())
            .or_default()
            .push((attr.to_string(), key.to_string()));
    }

    /// Serialize `root` with bound content replaced by `{key}` expressions.
    ///
    /// `root` must be the same tree the plan was extracted from.
    pub fn render(&self, root: ElementRef<'_>) -> String {
        let mut out = String::new();
        let mut path = Vec::new();
        self.render_element(root, &mut path, &mut out);
        out
    }

    fn render_element(&self, el: ElementRef<'_>, path: &mut NodePath, out: &mut String) {
        let element = el.value();
        let name = element.name();
        let bound_attrs = self.attr_bindings.get(path.as_slice());

        out.push('<');
        out.push_str(name);
        for (attr, value) in element.attrs() {
            let placeholder = bound_attrs
                .and_then(|bound| bound.iter().find(|(a, _)| a == attr))
                .map(|(_, key)| key);
            match placeholder {
                Some(key) => out.push_str(&format!(" {}={{{}}}", attr, key)),
                None => out.push_str(&format!(" {}=\"{}\"", attr, escape_attr(value))),
            }
        }
        out.push('>');

        if VOID_TAGS.contains(&name) {
            return;
        }

        match self.text_bindings.get(path.as_slice()) {
            Some(key) => out.push_str(&format!("{{{}}}", key)),
            None => {
                for (index, child) in el.children().enumerate() {
                    match child.value() {
                        Node::Text(text) if is_hidden_tag(name) => out.push_str(text),
                        Node::Text(text) => out.push_str(&escape_text(text)),
                        Node::Comment(comment) => {
                            out.push_str("<!--");
                            out.push_str(comment);
                            out.push_str("-->");
                        }
                        Node::Element(_) => {
                            if let Some(child) = ElementRef::wrap(child) {
                                path.push(index);
                                self.render_element(child, path, out);
                                path.pop();
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        out.push_str("</");
        out.push_str(name);
        out.push('>');
    }
}

/// `tag`, `tag1`, `tag2`, ...
fn indexed_key(base: &str, index: usize) -> String {
    if index == 0 {
        base.to_string()
    } else {
        format!("{}{}", base, index)
    }
}

/// Convert kebab-case or snake_case to camelCase.
pub fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '-' || c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

/// Escape text, including braces, which the template syntax treats as expressions.
fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('{', "&#123;")
        .replace('}', "&#125;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::dom::fragment_root;
    use scraper::Html;

    fn plan_for(markup: &str) -> (ParameterPlan, String) {
        let fragment = Html::parse_fragment(markup);
        let root = fragment_root(&fragment).unwrap();
        let plan = ParameterPlan::extract(root);
        let rendered = plan.render(root);
        (plan, rendered)
    }

    #[test]
    fn test_hero_parameters() {
        let (plan, rendered) = plan_for(
            r#"<section class="hero"><h1>Welcome</h1><img src="/a.png" alt="Logo"></section>"#,
        );

        let params = &plan.parameters;
        assert_eq!(params.text.get("h1").map(String::as_str), Some("Welcome"));
        assert_eq!(params.images.get("image").map(String::as_str), Some("/a.png"));
        assert_eq!(params.images.get("imageAlt").map(String::as_str), Some("Logo"));
        assert_eq!(params.keys(), vec!["h1", "image", "imageAlt"]);

        assert!(rendered.starts_with(r#"<section class="hero"><h1>{h1}</h1><img "#));
        assert!(rendered.contains("src={image}"));
        assert!(rendered.contains("alt={imageAlt}"));
        assert!(!rendered.contains("/a.png"));
        assert!(!rendered.contains("Logo"));
    }

    #[test]
    fn test_repeated_tags_get_index_suffix() {
        let (plan, _) = plan_for("<div><p>One</p><p>Two</p><h2>Head</h2><p>Three</p></div>");
        assert_eq!(plan.parameters.keys(), vec!["p", "p1", "h2", "p2"]);
    }

    #[test]
    fn test_empty_text_is_skipped() {
        let (plan, rendered) = plan_for("<div><p>  </p><p>Real</p></div>");
        assert_eq!(plan.parameters.keys(), vec!["p"]);
        assert_eq!(rendered, "<div><p>  </p><p>{p}</p></div>");
    }

    #[test]
    fn test_repeated_value_replaced_only_where_extracted() {
        // "Learn more" appears as a link label and inside unbound text
        let (plan, rendered) = plan_for(
            r#"<div><a href="/docs">Learn more</a><div>Learn more</div></div>"#,
        );

        assert_eq!(plan.parameters.text.get("a").map(String::as_str), Some("Learn more"));
        assert_eq!(
            plan.parameters.links.get("linkText").map(String::as_str),
            Some("Learn more")
        );
        assert_eq!(
            rendered,
            r#"<div><a href={link}>{a}</a><div>Learn more</div></div>"#
        );
    }

    #[test]
    fn test_nested_binding_keeps_parent_children() {
        let (plan, rendered) = plan_for(r#"<p>Read <a href="/x">more</a></p>"#);

        assert_eq!(plan.parameters.keys(), vec!["p", "a", "link", "linkText"]);
        assert_eq!(rendered, r#"<p>Read <a href={link}>{a}</a></p>"#);
    }

    #[test]
    fn test_link_wrapping_image_keeps_image() {
        let (plan, rendered) = plan_for(
            r#"<header><a href="/"><img src="/logo.png" alt="Logo">Home</a></header>"#,
        );

        assert_eq!(
            plan.parameters.keys(),
            vec!["a", "image", "imageAlt", "link", "linkText"]
        );
        assert!(rendered.starts_with("<header><a href={link}><img "));
        assert!(rendered.contains("src={image}"));
        assert!(rendered.contains("alt={imageAlt}"));
        assert!(rendered.ends_with(">Home</a></header>"));
    }

    #[test]
    fn test_inline_formatting_survives() {
        let (plan, rendered) = plan_for("<p>Save <strong>50%</strong> today</p>");

        assert_eq!(
            plan.parameters.text.get("p").map(String::as_str),
            Some("Save 50% today")
        );
        assert_eq!(rendered, "<p>Save <strong>50%</strong> today</p>");
    }

    #[test]
    fn test_text_escaping_in_unbound_content() {
        let (_, rendered) = plan_for("<div>Price {from} &amp; more</div>");
        assert_eq!(rendered, "<div>Price &#123;from&#125; &amp; more</div>");
    }

    #[test]
    fn test_custom_keys_are_camel_cased() {
        let mut custom = IndexMap::new();
        custom.insert("show-banner".to_string(), serde_json::json!(true));
        let plan = ParameterPlan::default().with_custom(&custom);
        assert_eq!(plan.parameters.keys(), vec!["showBanner"]);
    }

    #[test]
    fn test_extraction_is_stable() {
        let markup = r#"<section><h1>A</h1><p>B</p><img src="/x.png"><a href="/y">C</a></section>"#;
        let (first, _) = plan_for(markup);
        let (second, _) = plan_for(markup);
        assert_eq!(first.parameters.keys(), second.parameters.keys());
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(to_camel_case("hero-title"), "heroTitle");
        assert_eq!(to_camel_case("cta_button_text"), "ctaButtonText");
        assert_eq!(to_camel_case("h1"), "h1");
    }
}
