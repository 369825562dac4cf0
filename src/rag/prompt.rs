use itertools::Itertools;

/// Build the grounded answer prompt: numbered context passages, then the question
#[inline]
pub fn build_prompt<'a>(question: &str, context: impl IntoIterator<Item = &'a str>) -> String {
    let context = context
        .into_iter()
        .enumerate()
        .map(|(i, passage)| format!("[{}] {}", i + 1, passage))
        .join("\n\n");

    format!(
        "You are a helpful assistant. Answer the question using ONLY the context below.\n\
         If the context does not contain the answer, say that you don't know.\n\n\
         Context:\n{context}\n\n\
         Question: {question}\n\n\
         Answer:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_context_verbatim() {
        let prompt = build_prompt(
            "What does the service store?",
            ["Vectors live in SQLite.", "Chunks keep their source name."],
        );

        assert!(prompt.contains("using ONLY the context"));
        assert!(prompt.contains("[1] Vectors live in SQLite."));
        assert!(prompt.contains("[2] Chunks keep their source name."));
        assert!(prompt.ends_with("Question: What does the service store?\n\nAnswer:"));
    }

    #[test]
    fn empty_context_still_asks_the_question() {
        let prompt = build_prompt("Anything?", std::iter::empty());
        assert!(prompt.contains("Context:\n\n\nQuestion: Anything?"));
    }
}
