//! Answer composition and message chunking.

use perplexo_backend::{SearchResponse, UserPrefs};

/// WhatsApp rejects payloads past ~4096 characters; stay under that.
pub const MAX_CHUNK_CHARS: usize = 4000;

/// Citations appended to an answer, at most.
const MAX_CITATIONS: usize = 5;

/// Image attachments sent per answer, at most.
pub const MAX_IMAGES: usize = 3;

/// Shown when a response carries no answer text at all.
const EMPTY_ANSWER: &str = "Desculpe, não consegui gerar uma resposta.";

/// Compose the outbound answer: answer text, optional source block, and the
/// trailing model/focus metadata line.
#[must_use]
pub fn compose_answer(response: &SearchResponse, prefs: &UserPrefs) -> String {
    let mut answer = response.answer_text().unwrap_or(EMPTY_ANSWER).to_string();

    if prefs.return_citations && !response.citations.is_empty() {
        answer.push_str("\n\n📚 *Fontes:*\n");
        for (i, citation) in response.citations.iter().take(MAX_CITATIONS).enumerate() {
            let title = citation.title.as_deref().unwrap_or("Link");
            answer.push_str(&format!("{}. {title}\n", i + 1));
            if let Some(url) = citation.url.as_deref().filter(|u| !u.is_empty()) {
                answer.push_str(&format!("   {url}\n"));
            }
        }
    }

    let model = response.model_used.as_deref().unwrap_or(&prefs.model);
    let focus = response.focus_mode.as_deref().unwrap_or(&prefs.focus);
    answer.push_str(&format!("\n_🤖 {model} | 🔍 {focus}_"));
    answer
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Plain slicing: boundaries never split a code point, and concatenating
/// the chunks reproduces the input exactly. Empty input yields no chunks.
#[must_use]
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let split = rest
            .char_indices()
            .nth(max_chars)
            .map_or(rest.len(), |(at, _)| at);
        let (chunk, tail) = rest.split_at(split);
        chunks.push(chunk.to_string());
        rest = tail;
    }
    chunks
}
