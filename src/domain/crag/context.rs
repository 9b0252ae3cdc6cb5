//! Context assembly

use crate::domain::passage::Passage;

/// Answer returned when neither local passages nor the web produced any evidence
pub const INSUFFICIENT_INFORMATION_ANSWER: &str =
    "I don't have enough relevant information to answer this question.";

/// Delimiter that opens the supplementary web block
pub const WEB_SECTION_HEADER: &str = "--- Supplementary web information ---";

/// Join relevant passage texts in retrieval order, followed by the web block if any.
///
/// Returns an empty string when there is nothing to ground an answer on.
pub fn assemble_context(relevant: &[Passage], web_text: Option<&str>) -> String {
    let mut parts: Vec<String> = relevant
        .iter()
        .map(|p| p.text().trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    if let Some(web) = web_text.map(str::trim).filter(|w| !w.is_empty()) {
        parts.push(format!("{}\n{}", WEB_SECTION_HEADER, web));
    }

    parts.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passages_in_order() {
        let passages = vec![Passage::new("first"), Passage::new("second")];
        assert_eq!(assemble_context(&passages, None), "first\n\nsecond");
    }

    #[test]
    fn test_web_block_is_last_and_delimited() {
        let passages = vec![Passage::new("local fact")];
        let context = assemble_context(&passages, Some("web fact"));

        assert_eq!(
            context,
            format!("local fact\n\n{}\nweb fact", WEB_SECTION_HEADER)
        );
    }

    #[test]
    fn test_web_only() {
        let context = assemble_context(&[], Some("web fact"));
        assert!(context.starts_with(WEB_SECTION_HEADER));
    }

    #[test]
    fn test_empty_context() {
        assert_eq!(assemble_context(&[], None), "");
        assert_eq!(assemble_context(&[], Some("   ")), "");
        assert_eq!(assemble_context(&[Passage::new("  ")], None), "");
    }
}
