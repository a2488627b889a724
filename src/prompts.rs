//! Prompts for page transcription, keyword extraction, and answer generation.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — tweaking how keywords are requested or how
//!    retrieved excerpts are presented requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the built prompts directly
//!    without spinning up a real LLM, making prompt regressions easy to catch.
//!
//! The transcription prompt can be overridden via
//! [`crate::config::ServiceConfig::system_prompt`]; the constant here is used
//! only when no override is provided.

/// Default system prompt for transcribing a PDF page image to Markdown.
///
/// The output of this prompt is what gets embedded and searched, so the rules
/// favour complete, plainly-structured text over layout fidelity.
pub const DEFAULT_EXTRACTION_PROMPT: &str = r#"You are an expert document transcriber. Convert the given PDF page image to clean Markdown.

Follow these rules precisely:

1. TEXT PRESERVATION
   - Preserve ALL text content completely and accurately
   - Maintain the reading order as a human would read the page

2. STRUCTURE
   - Use #, ##, ### headings to match the visual hierarchy
   - Use - for unordered lists and 1. 2. 3. for ordered lists
   - Convert tables to GFM pipe format

3. WHAT TO IGNORE
   - Page numbers and repeated headers/footers
   - Decorative borders and lines that carry no content meaning

4. OUTPUT FORMAT
   - Output ONLY the Markdown content
   - Do NOT wrap in ```markdown fences
   - Do NOT add commentary or explanations
   - Start directly with the page content"#;

/// Build the keyword-extraction prompt for a user query.
///
/// The model must reply with a bare comma-separated list (no brackets, no
/// preamble) and an empty string for pure greetings; the caller counts the
/// parsed keywords to decide whether a vector search is worth running.
pub fn keyword_prompt(query: &str) -> String {
    format!(
        r#"You are a helpful assistant that extracts keywords from a query so they can be passed to a vector database.
Correct english spellings.
Extract keywords from the query.
The query is: {query}

RETURN THE KEYWORDS AS A COMMA-SEPARATED LIST.
Example:
keyword1, keyword2, keyword3
Give minimum 3 keywords.

If the user just says Hello, Hi, etc. then return nothing.
NO PREAMBLE. ONLY THE KEYWORDS.
Don't add []"#
    )
}

/// Build the answer prompt from the user query and retrieved page excerpts.
pub fn answer_prompt(query: &str, excerpts: &[String]) -> String {
    let mut context = String::new();
    for (i, text) in excerpts.iter().enumerate() {
        context.push_str(&format!("--- Excerpt {} ---\n{}\n\n", i + 1, text));
    }
    format!(
        r#"You are a helpful assistant that answers a query using excerpts retrieved from the user's document.
The query is: {query}
The retrieved excerpts are:

{context}Answer the query using only the excerpts above. If they do not contain the answer, say so.
The answer is:"#
    )
}

/// Build the no-context fallback prompt, used when keyword extraction yields
/// too few terms to justify a vector search.
pub fn fallback_prompt(query: &str) -> String {
    format!(
        r#"We have no results from the vector database for this query.
Tell the user that nothing relevant was found in their document, then answer the query as best you can from general knowledge.
If the user said Hello or another greeting, reply with a greeting.
The query is: {query}"#
    )
}
