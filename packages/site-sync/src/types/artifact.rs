//! Conversion artifacts - templated output for one component.

use serde::{Deserialize, Serialize};

/// Output of the transformer for one candidate component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionArtifact {
    /// Component source in the target convention
    pub template_text: String,

    /// Translated style rules
    pub style_text: String,

    /// File stem for the live output; equals the component name
    pub target_file_stem: String,

    pub succeeded: bool,
    pub failure_reason: Option<String>,

    /// Other components this template mentions as tags. Advisory only.
    #[serde(default)]
    pub references: Vec<String>,
}

impl ConversionArtifact {
    pub fn success(
        target_file_stem: impl Into<String>,
        template_text: impl Into<String>,
        style_text: impl Into<String>,
    ) -> Self {
        Self {
            template_text: template_text.into(),
            style_text: style_text.into(),
            target_file_stem: target_file_stem.into(),
            succeeded: true,
            failure_reason: None,
            references: Vec::new(),
        }
    }

    pub fn failure(target_file_stem: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            template_text: String::new(),
            style_text: String::new(),
            target_file_stem: target_file_stem.into(),
            succeeded: false,
            failure_reason: Some(reason.into()),
            references: Vec::new(),
        }
    }

    /// Text persisted to the `processed` record for this attempt.
    pub fn processed_record(&self) -> String {
        match &self.failure_reason {
            Some(reason) if !self.succeeded => {
                format!("<!-- conversion failed: {} -->\n", reason.replace("--", "- -"))
            }
            _ => self.template_text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_record_keeps_reason() {
        let artifact = ConversionArtifact::failure("HeroBroken", "malformed markup -- stray tag");

        assert!(!artifact.succeeded);
        assert!(artifact.template_text.is_empty());
        let record = artifact.processed_record();
        assert!(record.starts_with("<!-- conversion failed:"));
        assert!(record.contains("stray tag"));
        assert!(!record.contains("markup -- stray"));
    }

    #[test]
    fn test_success_record_is_template() {
        let artifact = ConversionArtifact::success("Hero", "---\n---\n<section></section>", "");
        assert_eq!(artifact.processed_record(), artifact.template_text);
        assert_eq!(artifact.failure_reason, None);
    }
}
