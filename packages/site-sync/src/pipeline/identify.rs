//! Component identification.
//!
//! Segments a page into typed candidate components:
//!
//! 1. Vendor scaffolding (elements and attributes) is stripped.
//! 2. Each claimable type tries its selector patterns in order; the first
//!    pattern with at least one match claims the type and every match
//!    becomes a component.
//! 3. Remaining section-like elements with enough visible text become
//!    `section` components. Already-claimed elements are recognized by their
//!    serialized markup.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::pipeline::dom::{contains_tag, visible_text};
use crate::pipeline::params::ParameterPlan;
use crate::telemetry::Telemetry;
use crate::types::component::{CandidateComponent, ComponentType};
use crate::types::config::SyncConfig;

lazy_static! {
    static ref SECTION_LIKE: Selector =
        Selector::parse(r#"section, div[class*="section"], .container > div"#).unwrap();
}

/// Visible text a component needs before the text bonus applies.
const TEXT_BONUS_MIN_LEN: usize = 10;

/// Splits page markup into candidate components.
pub struct ComponentIdentifier {
    remove_selectors: Vec<Selector>,
    strip_attributes: Option<Regex>,
    min_section_text_len: usize,
    telemetry: Arc<dyn Telemetry>,
}

impl ComponentIdentifier {
    pub fn new(config: &SyncConfig, telemetry: Arc<dyn Telemetry>) -> Result<Self> {
        let remove_selectors = config
            .vendor
            .remove_selectors
            .iter()
            .map(|s| {
                Selector::parse(s).map_err(|e| {
                    SyncError::Configuration(format!("invalid vendor selector {:?}: {:?}", s, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let strip_attributes = if config.vendor.strip_attribute_prefixes.is_empty() {
            None
        } else {
            let prefixes = config
                .vendor
                .strip_attribute_prefixes
                .iter()
                .map(|p| regex::escape(p))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = format!(
                r#"\s+(?:{})[^\s=>/]*(?:="[^"]*")?"#,
                prefixes
            );
            Some(Regex::new(&pattern).map_err(|e| {
                SyncError::Configuration(format!("invalid vendor attribute prefix: {}", e))
            })?)
        };

        Ok(Self {
            remove_selectors,
            strip_attributes,
            min_section_text_len: config.min_section_text_len,
            telemetry,
        })
    }

    /// Identify components in `markup`, attaching rules from `styles`.
    ///
    /// Fails only when the markup is blank; individual elements that cannot
    /// become components are skipped.
    pub fn identify(&self, markup: &str, styles: &str) -> Result<Vec<CandidateComponent>> {
        if markup.trim().is_empty() {
            return Err(SyncError::parse("page markup is empty"));
        }

        let cleaned = self.strip_vendor(markup);
        let document = Html::parse_document(&cleaned);

        let mut components = Vec::new();
        let mut names = HashSet::new();
        let mut claimed = HashSet::new();

        for component_type in ComponentType::PATTERN_ORDER {
            for pattern in component_type.selector_patterns() {
                let selector = match Selector::parse(pattern) {
                    Ok(selector) => selector,
                    Err(e) => {
                        self.telemetry.warn(
                            "identify",
                            &format!("skipping selector {:?}: {:?}", pattern, e),
                        );
                        continue;
                    }
                };

                let matches: Vec<ElementRef<'_>> = document.select(&selector).collect();
                if matches.is_empty() {
                    continue;
                }

                debug!(
                    component_type = %component_type,
                    pattern,
                    matches = matches.len(),
                    "Pattern claimed type"
                );

                for element in matches {
                    if let Some(component) =
                        self.materialize(element, component_type, styles, &mut names)
                    {
                        claimed.insert(component.markup.clone());
                        components.push(component);
                    }
                }
                break;
            }
        }

        for element in document.select(&SECTION_LIKE) {
            let html = element.html();
            if claimed.contains(&html) {
                continue;
            }

            let text_len = visible_text(element).trim().chars().count();
            if text_len <= self.min_section_text_len {
                continue;
            }

            if let Some(component) =
                self.materialize(element, ComponentType::Section, styles, &mut names)
            {
                claimed.insert(html);
                components.push(component);
            }
        }

        let types: Vec<&str> = components.iter().map(|c| c.component_type.as_str()).collect();
        self.telemetry.info(
            "identify",
            &format!("identified {} components: {}", components.len(), types.join(", ")),
        );

        Ok(components)
    }

    /// Remove vendor elements and attributes from the serialized document.
    pub fn strip_vendor(&self, markup: &str) -> String {
        let document = Html::parse_document(markup);

        let mut doomed = Vec::new();
        let mut doomed_ids = HashSet::new();
        for selector in &self.remove_selectors {
            for element in document.select(selector) {
                if doomed_ids.insert(element.id()) {
                    doomed.push(element);
                }
            }
        }

        let mut html = document.html();
        for element in &doomed {
            // Removing an ancestor already removed this one
            let nested = element.ancestors().any(|a| doomed_ids.contains(&a.id()));
            if !nested {
                html = html.replacen(&element.html(), "", 1);
            }
        }

        match &self.strip_attributes {
            Some(pattern) => pattern.replace_all(&html, "").into_owned(),
            None => html,
        }
    }

    fn materialize(
        &self,
        element: ElementRef<'_>,
        component_type: ComponentType,
        styles: &str,
        names: &mut HashSet<String>,
    ) -> Option<CandidateComponent> {
        let markup = element.html();
        if markup.trim().is_empty() {
            self.telemetry.warn(
                "identify",
                &format!("skipping empty {} element", component_type),
            );
            return None;
        }

        let name = unique_name(component_name(component_type, element), names);
        let parameters = ParameterPlan::extract(element).parameters;
        let confidence = confidence(element, component_type);

        Some(
            CandidateComponent::new(name, component_type, markup)
                .with_style_rules(related_style_rules(element, styles))
                .with_parameters(parameters)
                .with_confidence(confidence),
        )
    }
}

/// `<TypeBaseName><Disambiguator>` from the element's id, else its first class.
pub fn component_name(component_type: ComponentType, element: ElementRef<'_>) -> String {
    let base = component_type.base_name();

    let id = element.value().attr("id").map(clean_identifier);
    let class = element
        .value()
        .attr("class")
        .and_then(|c| c.split_whitespace().next())
        .map(clean_identifier);

    match id.filter(|s| !s.is_empty()).or(class.filter(|s| !s.is_empty())) {
        Some(disambiguator) => format!("{}{}", base, capitalize(&disambiguator)),
        None => base.to_string(),
    }
}

fn unique_name(candidate: String, names: &mut HashSet<String>) -> String {
    if names.insert(candidate.clone()) {
        return candidate;
    }
    let mut n = 2;
    loop {
        let name = format!("{}{}", candidate, n);
        if names.insert(name.clone()) {
            return name;
        }
        n += 1;
    }
}

fn clean_identifier(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Heuristic score in [0, 1]. Keyword bonuses stack before the clamp.
pub fn confidence(element: ElementRef<'_>, component_type: ComponentType) -> f64 {
    let mut score = 0.5;
    let tag = element.value().name();

    if component_type.semantic_tags().contains(&tag) {
        score += 0.3;
    }

    let class_text = format!(
        "{} {}",
        element.value().attr("class").unwrap_or(""),
        element.value().attr("id").unwrap_or("")
    )
    .to_lowercase();
    for keyword in component_type.keywords() {
        if class_text.contains(keyword) {
            score += 0.1;
        }
    }

    if visible_text(element).trim().chars().count() > TEXT_BONUS_MIN_LEN {
        score += 0.1;
    }
    if component_type == ComponentType::Hero && contains_tag(element, "img") {
        score += 0.1;
    }
    if matches!(component_type, ComponentType::Header | ComponentType::Footer)
        && contains_tag(element, "a")
    {
        score += 0.1;
    }

    f64::min(score, 1.0)
}

/// Rules whose text mentions one of the element's classes (`.class`) or its id (`#id`).
///
/// Line-oriented: a rule runs from the line with `{` to the line with `}`.
pub fn related_style_rules(element: ElementRef<'_>, styles: &str) -> Vec<String> {
    let classes: Vec<String> = element
        .value()
        .attr("class")
        .unwrap_or("")
        .split_whitespace()
        .map(|c| format!(".{}", c))
        .collect();
    let id = element
        .value()
        .attr("id")
        .filter(|id| !id.is_empty())
        .map(|id| format!("#{}", id));

    let is_related = |rule: &str| {
        classes.iter().any(|c| rule.contains(c.as_str()))
            || id.as_deref().map_or(false, |id| rule.contains(id))
    };

    let mut rules = Vec::new();
    let mut current = String::new();
    let mut in_rule = false;

    for line in styles.lines() {
        let line = line.trim();
        if line.contains('{') {
            current = line.to_string();
            in_rule = true;
        } else if in_rule {
            current.push(' ');
            current.push_str(line);
        }

        if in_rule && line.contains('}') {
            if is_related(&current) {
                rules.push(current.trim().to_string());
            }
            current.clear();
            in_rule = false;
        }
    }

    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::NoopTelemetry;
    use crate::testing::sample_page;

    fn identifier() -> ComponentIdentifier {
        ComponentIdentifier::new(&SyncConfig::new("https://example.com"), Arc::new(NoopTelemetry))
            .unwrap()
    }

    #[test]
    fn test_hero_scenario() {
        let markup = r#"<section class="hero"><h1>Welcome</h1><img src="/a.png" alt="Logo"></section>"#;

        let components = identifier().identify(markup, "").unwrap();

        assert_eq!(components.len(), 1);
        let hero = &components[0];
        assert_eq!(hero.component_type, ComponentType::Hero);
        assert_eq!(hero.name, "HeroHero");
        assert!((hero.confidence - 1.0).abs() < 1e-9);

        let params = &hero.extracted_parameters;
        assert_eq!(params.text.get("h1").map(String::as_str), Some("Welcome"));
        assert_eq!(params.images.get("image").map(String::as_str), Some("/a.png"));
        assert_eq!(params.images.get("imageAlt").map(String::as_str), Some("Logo"));
        assert!(params.links.is_empty());
    }

    #[test]
    fn test_first_matching_pattern_claims_type() {
        let markup = r#"<header><a href="/">Home</a></header>
            <div class="navbar"><a href="/x">X</a></div>"#;

        let components = identifier().identify(markup, "").unwrap();
        let headers: Vec<_> = components
            .iter()
            .filter(|c| c.component_type == ComponentType::Header)
            .collect();

        assert_eq!(headers.len(), 1);
        assert!(headers[0].markup.starts_with("<header>"));
        assert_eq!(headers[0].name, "Header");
    }

    #[test]
    fn test_all_matches_of_claiming_pattern_materialize() {
        let markup = r#"<div class="features" id="top-features"><p>A</p></div>
            <div class="features"><p>B</p></div>
            <div class="features"><p>C</p></div>"#;

        let components = identifier().identify(markup, "").unwrap();
        let names: Vec<_> = components.iter().map(|c| c.name.as_str()).collect();

        assert_eq!(
            names,
            vec!["FeaturesTopfeatures", "FeaturesFeatures", "FeaturesFeatures2"]
        );
    }

    #[test]
    fn test_vendor_scaffolding_removed() {
        let markup = r#"<section class="hero" data-ready-block="b1" data-component-id="c9">
            <h1>Hello</h1><div class="ready-watermark">Made with Ready</div>
            <div data-ready-ai="x"><span class="ready-branding">Ready</span></div>
            </section>"#;

        let components = identifier().identify(markup, "").unwrap();
        let hero = &components[0];

        assert!(!hero.markup.contains("data-ready"));
        assert!(!hero.markup.contains("data-component-id"));
        assert!(!hero.markup.contains("Made with Ready"));
        assert!(!hero.markup.contains("ready-branding"));
        assert!(hero.markup.contains("<h1>Hello</h1>"));
    }

    #[test]
    fn test_sections_need_enough_text() {
        let long = "This section talks about pricing in enough detail to count as content.";
        let markup = format!(
            r#"<div class="intro">Hi</div><section class="pricing"><p>{}</p></section><section class="tiny"><p>Short</p></section>"#,
            long
        );

        let components = identifier().identify(&markup, "").unwrap();
        let names: Vec<_> = components.iter().map(|c| c.name.as_str()).collect();

        assert_eq!(names, vec!["SectionPricing"]);
        assert_eq!(components[0].component_type, ComponentType::Section);
    }

    #[test]
    fn test_identical_sections_kept_once() {
        let body = "Repeated marketing copy that is long enough to become its own section block.";
        let markup = format!(
            r#"<div class="container"><div class="hero"><p>Intro</p></div><div class="copy"><p>{0}</p></div><div class="copy"><p>{0}</p></div></div>"#,
            body
        );

        let components = identifier().identify(&markup, "").unwrap();
        let sections: Vec<_> = components
            .iter()
            .filter(|c| c.component_type == ComponentType::Section)
            .collect();

        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, "SectionCopy");
        assert!((sections[0].confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_blank_markup_is_parse_error() {
        let err = identifier().identify("   \n", "").unwrap_err();
        assert!(matches!(err, SyncError::Parse { .. }));
    }

    #[test]
    fn test_related_styles_by_class_and_id() {
        let styles = ".hero {\n  color: red;\n}\n#intro h1 { font-size: 48px; }\n.footer {\n  margin: 0;\n}";
        let fragment = Html::parse_fragment(r#"<section class="hero" id="intro"></section>"#);
        let element = crate::pipeline::dom::fragment_root(&fragment).unwrap();

        let rules = related_style_rules(element, styles);

        assert_eq!(
            rules,
            vec![".hero { color: red; }", "#intro h1 { font-size: 48px; }"]
        );
    }

    #[test]
    fn test_keyword_bonuses_stack_then_clamp() {
        let fragment = Html::parse_fragment(
            r#"<nav class="top navigation header"><a href="/">Home page link</a></nav>"#,
        );
        let element = crate::pipeline::dom::fragment_root(&fragment).unwrap();

        // 0.5 + 0.3 + 4 * 0.1 + 0.1 + 0.1 exceeds 1.0
        assert_eq!(confidence(element, ComponentType::Header), 1.0);
    }

    #[test]
    fn test_sample_page_types() {
        let page = sample_page();
        let components = identifier().identify(&page.markup, &page.styles).unwrap();
        let types: Vec<_> = components.iter().map(|c| c.component_type).collect();

        assert_eq!(
            types,
            vec![
                ComponentType::Header,
                ComponentType::Hero,
                ComponentType::Features,
                ComponentType::Footer,
            ]
        );
        let names: Vec<&str> = components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["HeaderSiteheader", "HeroIntro", "FeaturesFeatures", "FooterFooter"]
        );
        assert!(!components
            .iter()
            .any(|c| c.markup.contains("Made with Ready")));
        assert!(components[2]
            .related_style_rules
            .iter()
            .any(|r| r.starts_with(".features")));
    }
}
