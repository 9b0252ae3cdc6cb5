//! Corrective RAG infrastructure
//!
//! LLM-backed grading and synthesis, and the pipeline that wires them to the
//! passage store and web search.

mod llm_grader;
mod llm_synthesizer;
mod pipeline;

pub use llm_grader::LlmRelevanceGrader;
pub use llm_synthesizer::LlmAnswerSynthesizer;
pub use pipeline::CorrectiveRagPipeline;
