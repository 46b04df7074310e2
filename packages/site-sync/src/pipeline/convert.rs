//! Component conversion into template source.
//!
//! Each candidate becomes a component with a typed `Props` interface, a
//! destructuring statement with defaults, the parameterized markup and a
//! `<style>` block of translated rules. Conversion of one component never
//! affects its siblings: any failure is captured in that artifact.

use futures::future::join_all;
use regex::Regex;
use scraper::Html;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::pipeline::dom::fragment_root;
use crate::pipeline::params::ParameterPlan;
use crate::pipeline::styles::translate_rules;
use crate::telemetry::Telemetry;
use crate::types::artifact::ConversionArtifact;
use crate::types::component::{CandidateComponent, ComponentParameters};
use crate::types::config::SyncConfig;

/// Converts candidate components into artifacts.
#[derive(Clone)]
pub struct Transformer {
    template_extension: String,
    telemetry: Arc<dyn Telemetry>,
}

impl Transformer {
    pub fn new(config: &SyncConfig, telemetry: Arc<dyn Telemetry>) -> Self {
        Self {
            template_extension: config.template_extension.clone(),
            telemetry,
        }
    }

    /// Convert one component. Failures are reported in the artifact.
    pub fn convert(&self, component: &CandidateComponent) -> ConversionArtifact {
        match self.try_convert(component) {
            Ok(artifact) => {
                debug!(component = %component.name, "Converted component");
                artifact
            }
            Err(e) => {
                self.telemetry.warn("convert", &e.to_string());
                let reason = match e {
                    SyncError::Conversion { reason, .. } => reason,
                    other => other.to_string(),
                };
                ConversionArtifact::failure(component.name.clone(), reason)
            }
        }
    }

    fn try_convert(&self, component: &CandidateComponent) -> Result<ConversionArtifact> {
        let fail = |reason: String| SyncError::Conversion {
            component: component.name.clone(),
            reason,
        };

        if component.markup.trim().is_empty() {
            return Err(fail("component markup is empty".to_string()));
        }

        let fragment = Html::parse_fragment(&component.markup);
        if let Some(first) = fragment.errors.first() {
            return Err(fail(format!(
                "malformed markup ({} parse errors, first: {})",
                fragment.errors.len(),
                first
            )));
        }
        let root = fragment_root(&fragment)
            .ok_or_else(|| fail("markup contains no element".to_string()))?;

        let plan = ParameterPlan::extract(root)
            .with_custom(&component.extracted_parameters.custom);
        let markup = plan.render(root);
        let style_text = translate_rules(&component.related_style_rules).join("\n\n");
        let template = render_template(&plan.parameters, &markup, &style_text);

        self.telemetry.info(
            "convert",
            &format!(
                "{}: {} parameters, {} style rules",
                component.name,
                plan.parameters.len(),
                component.related_style_rules.len()
            ),
        );

        Ok(ConversionArtifact::success(
            component.name.clone(),
            template,
            style_text,
        ))
    }

    /// Convert every component on blocking workers, then resolve references.
    ///
    /// Output order matches input order. A worker that panics yields a
    /// failure artifact for its component.
    pub async fn convert_all(&self, components: &[CandidateComponent]) -> Vec<ConversionArtifact> {
        let tasks = components.iter().cloned().map(|component| {
            let transformer = self.clone();
            let name = component.name.clone();
            let handle = tokio::task::spawn_blocking(move || transformer.convert(&component));
            async move {
                handle.await.unwrap_or_else(|e| {
                    ConversionArtifact::failure(name, format!("conversion worker failed: {}", e))
                })
            }
        });

        let artifacts = join_all(tasks).await;
        let artifacts = resolve_references(artifacts, &self.template_extension);

        let succeeded = artifacts.iter().filter(|a| a.succeeded).count();
        self.telemetry.info(
            "convert_all",
            &format!(
                "converted {} components: {} succeeded, {} failed",
                artifacts.len(),
                succeeded,
                artifacts.len() - succeeded
            ),
        );

        artifacts
    }
}

/// Prepend an import for every other successful component whose name
/// appears as a tag in the template.
///
/// Textual and advisory: a coincidental tag-like match produces an import.
pub fn resolve_references(
    mut artifacts: Vec<ConversionArtifact>,
    extension: &str,
) -> Vec<ConversionArtifact> {
    let names: Vec<String> = artifacts
        .iter()
        .filter(|a| a.succeeded)
        .map(|a| a.target_file_stem.clone())
        .collect();

    let patterns: Vec<(String, Regex)> = names
        .iter()
        .filter_map(|name| {
            Regex::new(&format!(r"<{}[\s/>]", regex::escape(name)))
                .ok()
                .map(|re| (name.clone(), re))
        })
        .collect();

    for artifact in artifacts.iter_mut().filter(|a| a.succeeded) {
        for (name, pattern) in &patterns {
            if *name == artifact.target_file_stem || !pattern.is_match(&artifact.template_text) {
                continue;
            }
            let import = format!("import {} from './{}.{}';\n", name, name, extension);
            artifact.template_text = artifact.template_text.replacen("---\n", &format!("---\n{}", import), 1);
            artifact.references.push(name.clone());
        }
    }

    artifacts
}

/// Assemble the component source.
pub fn render_template(parameters: &ComponentParameters, markup: &str, style_text: &str) -> String {
    let declared: Vec<(&str, Value)> = parameters
        .text
        .iter()
        .chain(&parameters.images)
        .chain(&parameters.links)
        .map(|(k, v)| (k.as_str(), Value::String(v.clone())))
        .chain(parameters.custom.iter().map(|(k, v)| (k.as_str(), v.clone())))
        .collect();

    let mut out = String::from("---\n");

    if declared.is_empty() {
        out.push_str("export interface Props {}\n");
    } else {
        out.push_str("export interface Props {\n");
        for (key, value) in &declared {
            let optional = if is_optional(key, value) { "?" } else { "" };
            out.push_str(&format!("  {}{}: {};\n", key, optional, type_of(value)));
        }
        out.push_str("}\n\n");

        let bindings: Vec<String> = declared
            .iter()
            .map(|(key, value)| match default_literal(value) {
                Some(literal) => format!("{} = {}", key, literal),
                None => key.to_string(),
            })
            .collect();
        out.push_str(&format!("const {{ {} }} = Astro.props;\n", bindings.join(", ")));
    }

    out.push_str("---\n\n");
    out.push_str(markup);
    out.push_str("\n\n<style>\n");
    out.push_str(style_text);
    if !style_text.is_empty() {
        out.push('\n');
    }
    out.push_str("</style>\n");
    out
}

/// Declared type for a parameter value.
pub fn type_of(value: &Value) -> &'static str {
    match value {
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Array(_) => "string[]",
        Value::Object(_) => "Record<string, unknown>",
        Value::String(_) | Value::Null => "string",
    }
}

/// Alt companions and empty values are optional.
pub fn is_optional(key: &str, value: &Value) -> bool {
    if key.ends_with("Alt") {
        return true;
    }
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn default_literal(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        // JSON literals are valid script syntax, escaping included
        other => serde_json::to_string(other).ok(),
    }
}
