//! Reading time estimate for a post body

use lazy_static::lazy_static;
use regex::Regex;

use super::rich_text::as_text;
use super::ContentBlock;

lazy_static! {
    /// Anything that is neither a word character nor whitespace
    static ref NON_WORD: Regex = Regex::new(r"[^\w\s]").unwrap();
}

/// Words in headings plus words in body text (punctuation stripped from bodies)
pub fn count_words(content: &[ContentBlock]) -> usize {
    content
        .iter()
        .map(|block| {
            let heading = block.heading.split_whitespace().count();
            let body_text = as_text(&block.body);
            let body = NON_WORD
                .replace_all(&body_text, "")
                .split_whitespace()
                .count();
            heading + body
        })
        .sum()
}

/// Minutes needed to read `content`, rounded up; empty content reads in 0
pub fn estimate_minutes(content: &[ContentBlock], words_per_minute: u32) -> usize {
    let words = count_words(content);
    let wpm = words_per_minute.max(1) as usize;
    words.div_ceil(wpm)
}
