//! Versioned prompt templates with variable support

mod template;

pub use template::{PromptTemplate, PromptVariable, TemplateError};
