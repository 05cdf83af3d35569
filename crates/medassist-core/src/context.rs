//! Attributed context assembly and prompt templates.
//!
//! [`build_context`] renders retrieved chunks into the single evidence block
//! the generator sees. Each block is labelled `[Source N: …]` with a 1-based
//! position so the model's citations map back to the result list.

use crate::models::RetrievedResult;

/// Returned by [`build_context`] when nothing was retrieved.
pub const NO_EVIDENCE: &str = "No relevant documents found in the knowledge base.";

/// Separator between evidence blocks.
pub const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

/// System prompt for grounded medical answers.
pub const SYSTEM_PROMPT: &str = "You are MedAssist, a medical knowledge assistant specializing in hematology and anemia-related topics.

RULES:
1. For medical queries, answer ONLY based on the provided context from medical documents.
2. If the context doesn't contain enough information for a medical query, clearly state: \"I don't have enough information in my knowledge base to answer this accurately.\"
3. Always cite which source document and page the information comes from using [Source X] notation.
4. Include a brief medical disclaimer at the end of each response.
5. Never provide direct medical diagnoses; always recommend consulting a healthcare professional.
6. Be precise and clear, using medical terminology appropriately while keeping explanations accessible.
7. Format responses with clear headings, bullet points, and structured information when appropriate.

DISCLAIMER TO INCLUDE:
*This information is for educational purposes only and should not be used as a substitute for professional medical advice, diagnosis, or treatment. Always consult a qualified healthcare provider.*
";

/// Render results as `[Source i: source, Page p] (Confidence: x%)` blocks.
///
/// # Example
///
/// ```rust
/// use medassist_core::context::{build_context, NO_EVIDENCE};
/// use medassist_core::models::RetrievedResult;
///
/// assert_eq!(build_context(&[]), NO_EVIDENCE);
///
/// let r = RetrievedResult {
///     id: "guide.pdf_p4_c0".into(),
///     text: "Fatigue is a symptom of anemia".into(),
///     source: "guide.pdf".into(),
///     page: 4,
///     similarity: 0.8123,
/// };
/// assert_eq!(
///     build_context(&[r]),
///     "[Source 1: guide.pdf, Page 4] (Confidence: 81.23%)\nFatigue is a symptom of anemia"
/// );
/// ```
pub fn build_context(results: &[RetrievedResult]) -> String {
    if results.is_empty() {
        return NO_EVIDENCE.to_string();
    }

    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "[Source {}: {}, Page {}] (Confidence: {:.2}%)\n{}",
                i + 1,
                r.source,
                r.page,
                r.similarity * 100.0,
                r.text
            )
        })
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

/// Fill the user-prompt template with the evidence block and the question.
pub fn build_user_prompt(context: &str, question: &str) -> String {
    format!(
        "Based on the following medical knowledge context, answer the user's question.\n\n\
         CONTEXT FROM MEDICAL DOCUMENTS:\n{}\n\n\
         USER QUESTION: {}\n\n\
         Provide a comprehensive, well-structured answer with citations to the source documents \
         [Source 1], [Source 2], etc. Remember to include the medical disclaimer.\n",
        context, question
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(i: usize, similarity: f64) -> RetrievedResult {
        RetrievedResult {
            id: format!("doc{}.pdf_p{}_c0", i, i),
            text: format!("Evidence text {}", i),
            source: format!("doc{}.pdf", i),
            page: i as u32,
            similarity,
        }
    }

    #[test]
    fn test_empty_is_sentinel() {
        assert_eq!(build_context(&[]), NO_EVIDENCE);
    }

    #[test]
    fn test_labels_numbered_in_order() {
        let results: Vec<_> = (1..=4).map(|i| result(i, 0.5)).collect();
        let ctx = build_context(&results);

        assert_eq!(ctx.matches("[Source ").count(), 4);
        let mut last = 0;
        for i in 1..=4 {
            let label = format!("[Source {}: doc{}.pdf, Page {}]", i, i, i);
            let pos = ctx.find(&label).expect("label present");
            assert!(pos >= last);
            last = pos;
        }
        assert_eq!(ctx.matches(BLOCK_SEPARATOR).count(), 3);
    }

    #[test]
    fn test_label_uses_position_not_chunk_index() {
        let results = vec![result(7, 0.9), result(2, 0.4)];
        let ctx = build_context(&results);
        assert!(ctx.starts_with("[Source 1: doc7.pdf, Page 7]"));
        assert!(ctx.contains("[Source 2: doc2.pdf, Page 2]"));
    }

    #[test]
    fn test_confidence_percentage() {
        let ctx = build_context(&[result(1, 0.5)]);
        assert!(ctx.contains("(Confidence: 50.00%)"));
        let ctx = build_context(&[result(1, 1.0)]);
        assert!(ctx.contains("(Confidence: 100.00%)"));
        let ctx = build_context(&[result(1, 0.0)]);
        assert!(ctx.contains("(Confidence: 0.00%)"));
    }

    #[test]
    fn test_user_prompt_contains_parts() {
        let prompt = build_user_prompt("CTX", "what is ferritin?");
        assert!(prompt.contains("CONTEXT FROM MEDICAL DOCUMENTS:\nCTX"));
        assert!(prompt.contains("USER QUESTION: what is ferritin?"));
    }
}
