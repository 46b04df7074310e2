//! Component types - identified segments of the page and their parameters.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Semantic role of an identified component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Header,
    Hero,
    Features,
    Testimonials,
    Cta,
    Footer,
    Section,
    Unknown,
}

impl ComponentType {
    /// Types tried by selector pattern, in claim order.
    pub const PATTERN_ORDER: [ComponentType; 6] = [
        Self::Header,
        Self::Hero,
        Self::Features,
        Self::Testimonials,
        Self::Cta,
        Self::Footer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Hero => "hero",
            Self::Features => "features",
            Self::Testimonials => "testimonials",
            Self::Cta => "cta",
            Self::Footer => "footer",
            Self::Section => "section",
            Self::Unknown => "unknown",
        }
    }

    /// Prefix used when naming components of this type.
    pub fn base_name(&self) -> &'static str {
        match self {
            Self::Header => "Header",
            Self::Hero => "Hero",
            Self::Features => "Features",
            Self::Testimonials => "Testimonials",
            Self::Cta => "CallToAction",
            Self::Footer => "Footer",
            Self::Section | Self::Unknown => "Section",
        }
    }

    /// Selector patterns tried in order; the first one that matches claims the type.
    pub fn selector_patterns(&self) -> &'static [&'static str] {
        match self {
            Self::Header => &["header", "nav", ".navbar", ".header"],
            Self::Hero => &[".hero", ".landing", ".banner", "section:first-child"],
            Self::Features => &[".features", ".services", ".benefits", ".advantages"],
            Self::Testimonials => &[".testimonials", ".reviews", ".feedback"],
            Self::Cta => &[".cta", ".call-to-action", ".action"],
            Self::Footer => &["footer", ".footer"],
            Self::Section | Self::Unknown => &[],
        }
    }

    /// Tag names that earn the semantic-tag confidence bonus.
    pub fn semantic_tags(&self) -> &'static [&'static str] {
        match self {
            Self::Header => &["header", "nav"],
            Self::Hero => &["section", "main"],
            Self::Features | Self::Testimonials | Self::Cta => &["section", "div"],
            Self::Footer => &["footer"],
            Self::Section | Self::Unknown => &[],
        }
    }

    /// Keywords looked up in the combined class and id text.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Header => &["header", "nav", "navigation", "top"],
            Self::Hero => &["hero", "banner", "landing", "main"],
            Self::Features => &["features", "services", "benefits"],
            Self::Testimonials => &["testimonials", "reviews", "feedback"],
            Self::Cta => &["cta", "call-to-action", "action", "button"],
            Self::Footer => &["footer", "bottom"],
            Self::Section | Self::Unknown => &[],
        }
    }
}

impl std::fmt::Display for ComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Variable content pulled out of a component, split into disjoint namespaces.
///
/// Keys keep insertion order so that re-running extraction on unchanged
/// markup yields the same names in the same order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentParameters {
    /// Trimmed inner text of heading/paragraph/link/span elements
    pub text: IndexMap<String, String>,

    /// Image sources plus `<key>Alt` companions
    pub images: IndexMap<String, String>,

    /// Anchor hrefs plus `<key>Text` companions
    pub links: IndexMap<String, String>,

    /// Caller-supplied values not tied to a DOM feature
    pub custom: IndexMap<String, serde_json::Value>,
}

impl ComponentParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a caller-supplied parameter.
    pub fn with_custom(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.custom.insert(key.into(), value.into());
        self
    }

    /// Total number of parameters across all namespaces.
    pub fn len(&self) -> usize {
        self.text.len() + self.images.len() + self.links.len() + self.custom.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All parameter names in declaration order: text, images, links, custom.
    pub fn keys(&self) -> Vec<&str> {
        self.text
            .keys()
            .chain(self.images.keys())
            .chain(self.links.keys())
            .chain(self.custom.keys())
            .map(String::as_str)
            .collect()
    }
}

/// A segment of markup classified as a semantic unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateComponent {
    /// Unique within one identification pass
    pub name: String,

    #[serde(rename = "type")]
    pub component_type: ComponentType,

    /// Serialized markup of the element
    pub markup: String,

    /// Style rules whose selector mentions the element's classes or id
    pub related_style_rules: Vec<String>,

    pub extracted_parameters: ComponentParameters,

    /// Heuristic score in [0, 1]
    pub confidence: f64,
}

impl CandidateComponent {
    pub fn new(
        name: impl Into<String>,
        component_type: ComponentType,
        markup: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            component_type,
            markup: markup.into(),
            related_style_rules: Vec::new(),
            extracted_parameters: ComponentParameters::new(),
            confidence: 0.5,
        }
    }

    pub fn with_style_rules(mut self, rules: Vec<String>) -> Self {
        self.related_style_rules = rules;
        self
    }

    pub fn with_parameters(mut self, parameters: ComponentParameters) -> Self {
        self.extracted_parameters = parameters;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }
}
