//! Corrective RAG domain
//!
//! Types and traits for the self-correction decision engine: passages are graded
//! for relevance, a threshold policy decides whether local evidence is sufficient,
//! and a web fallback supplements the context when it is not.

mod config;
mod context;
mod grader;
mod prompts;
mod result;
mod synthesizer;
mod threshold;

pub use config::CragConfig;
pub use context::{assemble_context, INSUFFICIENT_INFORMATION_ANSWER, WEB_SECTION_HEADER};
pub use grader::{GradeResult, Relevance, RelevanceGrader};
pub use prompts::{default_answer_template, default_grader_template, ANSWER_TEMPLATE_ID, GRADER_TEMPLATE_ID};
pub use result::{Diagnostics, GradeSummary, QueryResult, GRADE_PREVIEW_CHARS};
pub use synthesizer::AnswerSynthesizer;
pub use threshold::{ThresholdMode, ThresholdSpec};

#[cfg(test)]
pub use grader::mock::MockRelevanceGrader;
#[cfg(test)]
pub use synthesizer::mock::MockAnswerSynthesizer;
