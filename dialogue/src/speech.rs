//! Text shaping between the raw model reply and the synthesizer. Markdown
//! and other visual artifacts read fine on screen but sound wrong when
//! spoken aloud, and long replies drown the participant, so replies are
//! cleaned and capped before dispatch.

use once_cell::sync::Lazy;
use regex::Regex;

static EMPHASIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*|\*(.+?)\*|__(.+?)__|_(.+?)_").unwrap());
static HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#+\s*").unwrap());
static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap());
static CODE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[^`]*```").unwrap());
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]*)`").unwrap());
static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*[-*+]\s+").unwrap());
static REPEAT_BANG: Lazy<Regex> = Lazy::new(|| Regex::new(r"!{2,}").unwrap());
static REPEAT_QUESTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\?{2,}").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Strip markdown and typographic noise so the synthesizer reads only
/// speakable words.
pub fn clean_for_speech(text: &str) -> String {
    let t = CODE_FENCE.replace_all(text, " ");
    let t = INLINE_CODE.replace_all(&t, "$1");
    let t = EMPHASIS.replace_all(&t, "$1$2$3$4");
    let t = HEADER.replace_all(&t, "");
    let t = LINK.replace_all(&t, "$1");
    let t = BULLET.replace_all(&t, "");
    let t = t.replace(['\u{2013}', '\u{2014}'], " ");
    let t = REPEAT_BANG.replace_all(&t, "!");
    let t = REPEAT_QUESTION.replace_all(&t, "?");
    WHITESPACE.replace_all(&t, " ").trim().to_string()
}

const MAX_SENTENCES: usize = 2;
const MAX_WORDS: usize = 30;

/// Cap a reply at two sentences and roughly thirty words. Conversational
/// turns should stay short enough that the participant keeps the floor.
pub fn enforce_brevity(text: &str) -> String {
    let cleaned = EMPHASIS.replace_all(text, "$1$2$3$4");
    let cleaned = WHITESPACE.replace_all(&cleaned, " ");
    let cleaned = cleaned.trim();

    let sentences = split_sentences(cleaned);
    let kept: String = sentences
        .iter()
        .take(MAX_SENTENCES)
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let words: Vec<&str> = kept.split_whitespace().collect();
    if words.len() > MAX_WORDS {
        let mut out = words[..MAX_WORDS].join(" ");
        out.push_str("...");
        out
    } else {
        kept
    }
}

// regex lacks lookbehind, so sentence boundaries are found by hand.
fn split_sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = chars.peek().map_or(true, |n| n.is_whitespace());
            if at_boundary {
                let s = current.trim().to_string();
                if !s.is_empty() {
                    out.push(s);
                }
                current.clear();
            }
        }
    }
    let rest = current.trim();
    if !rest.is_empty() {
        out.push(rest.to_string());
    }
    out
}
