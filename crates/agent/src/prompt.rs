//! Default system prompt and context assembly.

use ragtune_core::PromptVariant;
use ragtune_index::SearchHit;

pub const DEFAULT_PROMPT_ID: &str = "default";

const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a customer service assistant that drafts replies to customer emails.

Each request comes with the top {top_k} most relevant excerpts from the company's \
documents (excerpts of up to {chunk_size} characters, overlapping by {overlap}). \
Read all of them before answering.

Guidelines:
- Answer only from the excerpts; if they do not contain the answer, say so and offer to follow up.
- Keep specific figures, dates and terms exactly as written.
- Combine related excerpts into one coherent answer.
- Write a complete, polite email: greeting, answer, closing.
- Do not mention the excerpts or the search process.";

/// The built-in prompt variant, always available to a sweep.
pub fn default_prompt() -> PromptVariant {
    PromptVariant::new(DEFAULT_PROMPT_ID, DEFAULT_SYSTEM_PROMPT)
}

/// User turn: numbered context excerpts followed by the question.
pub fn build_user_message(question: &str, hits: &[SearchHit]) -> String {
    let mut out = String::from("## Context\n");
    for (i, hit) in hits.iter().enumerate() {
        out.push_str(&format!("\n[{}] ({})\n{}\n", i + 1, hit.source, hit.content.trim()));
    }
    out.push_str("\n## Customer email\n");
    out.push_str(question.trim());
    out
}
