//! Built-in instruction templates for grading and answer synthesis

use crate::domain::prompt::PromptTemplate;

pub const GRADER_TEMPLATE_ID: &str = "relevance-grader";
pub const ANSWER_TEMPLATE_ID: &str = "answer-synthesizer";

const GRADER_TEMPLATE: &str = r#"You are a grader assessing relevance of a retrieved document to a user question.

Here is the retrieved document:
${var:document}

Here is the user question:
${var:question}

IMPORTANT: Be precise about what the question is asking for:
- Distinguish between a feature the subject HAS (built-in) and a capability the subject can only achieve through an external mechanism (another device, an accessory, third-party software or a service).
- If the question asks about a built-in feature, a document describing how to achieve a similar result through an external mechanism is NOT relevant.
- Example: question "How do I use the built-in projector?" and document "How to mirror the screen to an external projector" are about different things, so the document is NOT relevant.

If the document directly addresses what the question is asking for, grade it as relevant.
Give a binary score 'yes' or 'no' to indicate whether the document is relevant to the question.

Provide the score as a JSON object with a single key 'score' and no other text or explanation.

Example response:
{"score": "yes"}

Your response:"#;

const ANSWER_TEMPLATE: &str = r#"You are an assistant for question-answering tasks.
Use only the following pieces of retrieved context to answer the question comprehensively and clearly.
If the context does not contain the answer, say that you don't know.

INSTRUCTIONS:
- Provide a detailed and informative answer (4-6 sentences)
- Include specific details from the context: what the feature is, how it works, where it is found and which products have it
- Be clear and precise in your explanation
- Answer in ${var:language:English}

CRITICAL RULES:
1. When answering about hardware features (buttons, ports, switches), be precise about whether they are physical components or software interface elements.
2. If the question presumes a feature that does not exist, you MUST state clearly that the feature does not exist. Do not answer as if the false premise were true.
3. Do not confuse a capability achieved through an external mechanism (mirroring to another device, an accessory, a third-party app) with a built-in feature. You may mention the external alternative after stating that the built-in feature does not exist.

Question: ${var:question}

Context: ${var:context}

Answer:"#;

/// Relevance grader instruction, version 1
pub fn default_grader_template() -> PromptTemplate {
    PromptTemplate::builtin(GRADER_TEMPLATE_ID, 1, GRADER_TEMPLATE)
}

/// Answer synthesis instruction, version 1
pub fn default_answer_template() -> PromptTemplate {
    PromptTemplate::builtin(ANSWER_TEMPLATE_ID, 1, ANSWER_TEMPLATE)
}
