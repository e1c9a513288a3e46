//! Prompts for LLM-backed summarisation.
//!
//! Callers can override the system prompt via
//! [`crate::config::SummaryConfig::system_prompt`]; the constant here is used
//! only when no override is provided. The length window is always appended
//! to the user message, so an override does not need to mention it.

/// Default system prompt for condensing one chunk of prose.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an expert technical summariser. Your task is to condense a passage taken from a longer document.

Follow these rules precisely:

1. CONTENT
   - Keep the main claims, definitions, results and conclusions
   - Keep names, numbers and units exactly as written
   - Drop examples, asides and repetition first

2. STYLE
   - Write plain prose in the same language as the passage
   - Use complete sentences; no bullet points or headings
   - Do not refer to "the passage" or "the text"

3. OUTPUT FORMAT
   - Output ONLY the summary
   - Do NOT add commentary, preambles or explanations
   - Respect the requested length window"#;

/// Build the user message for one summarisation call.
///
/// `min_tokens`/`max_tokens` are the window computed from the input's token
/// count; the completion's `max_tokens` option is set to the same ceiling.
pub fn summarize_request(text: &str, min_tokens: usize, max_tokens: usize) -> String {
    format!(
        "Summarise the following passage in between {min_tokens} and {max_tokens} tokens.\n\n\"\"\"{text}\"\"\""
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_window_and_text() {
        let msg = summarize_request("Rust is fast.", 4, 9);
        assert!(msg.contains("between 4 and 9 tokens"));
        assert!(msg.contains("Rust is fast."));
    }
}
