//! Prompt templates

use crate::models::{ChatTurn, Document};

/// Serialize history as `User: ...` / `AI: ...` lines
pub fn format_history(history: &[ChatTurn]) -> String {
    history
        .iter()
        .map(|turn| format!("{}: {}", turn.role.prompt_label(), turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render retrieved chunks as numbered, source-labelled context blocks
pub fn format_context(documents: &[Document]) -> String {
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| format!("[Source {}: {}]: {}", i + 1, doc.source_label(), doc.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Ask the model to turn a follow-up question into a standalone search query
pub fn rephrase_prompt(history: &str, question: &str) -> String {
    format!(
        "As an AI search optimizer, rewrite the user's question into a standalone search query.\n\
         Use context from the history ONLY if the question contains pronouns or relative references; \
         replace them with the names they refer to.\n\
         Return ONLY the optimized query text.\n\
         \n\
         History:\n\
         {history}\n\
         \n\
         Question:\n\
         {question}"
    )
}

/// Answer strictly from the supplied context
pub fn grounded_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a professional assistant specialized in analyzing provided documentation.\n\
         \n\
         STRICT RULES:\n\
         1. Use ONLY the provided CONTEXT to answer.\n\
         2. If the answer is not in the context, say: \"I don't have enough information in my database to answer this.\"\n\
         3. Maintain a professional and objective tone.\n\
         \n\
         CONTEXT:\n\
         {context}\n\
         \n\
         USER QUESTION:\n\
         {question}\n\
         \n\
         FINAL ANSWER:"
    )
}

/// Clean a model-produced query: trim and drop quotation characters
pub fn clean_query(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !matches!(c, '"' | '\u{201C}' | '\u{201D}'))
        .collect::<String>()
        .trim()
        .to_string()
}
