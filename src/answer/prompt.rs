//! Prompt assembly for the support agent.

/// The sentence the model must answer with when the retrieved context
/// cannot answer the question. Fixed wording; the prompt makes it a hard
/// instruction rather than a suggestion.
pub const FALLBACK_SENTENCE: &str =
    "I'm sorry, I don't have enough information to answer that.";

/// Build the context-grounded support prompt around the user's question.
pub fn support_prompt(context: &str, query: &str) -> String {
    format!(
        "You are a helpful customer support agent for Aven.\n\
         Use the following context to answer the user's question.\n\
         If the context doesn't contain the answer, say \"{FALLBACK_SENTENCE}\"\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         User's Question:\n\
         {query}"
    )
}
