//! Prompt template parsing and rendering
//!
//! Supports variable syntax: `${var:variable-name:default-value}`
//! - `${var:name}` - Required variable, error if not provided
//! - `${var:name:default}` - Optional variable with default value
//!
//! Rendering is a single pass, so substituted values are never re-scanned for
//! placeholders. Retrieved passages can contain arbitrary text.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Regex to match variable patterns: ${var:name} or ${var:name:default}
static VARIABLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{var:([a-zA-Z0-9][-_a-zA-Z0-9]*)(?::([^}]*))?\}")
        .expect("variable pattern is a valid regex")
});

/// Template processing errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TemplateError {
    #[error("Missing required variable '{name}' in template '{template}'")]
    MissingVariable { template: String, name: String },

    #[error("Invalid template '{template}': {message}")]
    Invalid { template: String, message: String },
}

/// A parsed variable from a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptVariable {
    pub name: String,
    pub default: Option<String>,
}

impl PromptVariable {
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// A named, versioned instruction template.
///
/// Templates are plain data so instruction wording can be swapped from
/// configuration and tested without running a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawTemplate", into = "RawTemplate")]
pub struct PromptTemplate {
    id: String,
    version: u32,
    content: String,
    variables: Vec<PromptVariable>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawTemplate {
    id: String,
    #[serde(default = "default_version")]
    version: u32,
    content: String,
}

fn default_version() -> u32 {
    1
}

impl TryFrom<RawTemplate> for PromptTemplate {
    type Error = TemplateError;

    fn try_from(raw: RawTemplate) -> Result<Self, Self::Error> {
        PromptTemplate::new(raw.id, raw.version, raw.content)
    }
}

impl From<PromptTemplate> for RawTemplate {
    fn from(template: PromptTemplate) -> Self {
        Self {
            id: template.id,
            version: template.version,
            content: template.content,
        }
    }
}

impl PromptTemplate {
    /// Parse a template and extract its variables
    pub fn new(
        id: impl Into<String>,
        version: u32,
        content: impl Into<String>,
    ) -> Result<Self, TemplateError> {
        let id = id.into();
        let content = content.into();

        if content.trim().is_empty() {
            return Err(TemplateError::Invalid {
                template: id,
                message: "content is empty".to_string(),
            });
        }

        Ok(Self::parse(id, version, content))
    }

    /// Build a template from built-in text known to be non-empty
    pub fn builtin(id: &str, version: u32, content: &str) -> Self {
        Self::parse(id.to_string(), version, content.to_string())
    }

    fn parse(id: String, version: u32, content: String) -> Self {
        let mut variables = Vec::new();
        let mut seen = HashSet::new();

        for cap in VARIABLE_PATTERN.captures_iter(&content) {
            let name = cap[1].to_string();
            if seen.insert(name.clone()) {
                variables.push(PromptVariable {
                    name,
                    default: cap.get(2).map(|m| m.as_str().to_string()),
                });
            }
        }

        Self {
            id,
            version,
            content,
            variables,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn variables(&self) -> &[PromptVariable] {
        &self.variables
    }

    /// Whether the template references `name`
    pub fn uses(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v.name == name)
    }

    /// Check that every required variable is among `names`
    pub fn validate_variables(&self, names: &[&str]) -> Result<(), TemplateError> {
        match self
            .variables
            .iter()
            .find(|v| v.is_required() && !names.contains(&v.name.as_str()))
        {
            Some(var) => Err(TemplateError::MissingVariable {
                template: self.id.clone(),
                name: var.name.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Render the template with provided values, falling back to defaults
    pub fn render(&self, values: &HashMap<&str, &str>) -> Result<String, TemplateError> {
        let mut missing = None;

        let rendered = VARIABLE_PATTERN.replace_all(&self.content, |cap: &Captures| {
            let name = &cap[1];
            match values.get(name).copied().or_else(|| cap.get(2).map(|m| m.as_str())) {
                Some(value) => value.to_string(),
                None => {
                    missing.get_or_insert_with(|| name.to_string());
                    String::new()
                }
            }
        });

        match missing {
            Some(name) => Err(TemplateError::MissingVariable {
                template: self.id.clone(),
                name,
            }),
            None => Ok(rendered.into_owned()),
        }
    }
}
