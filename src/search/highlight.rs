//! Match highlighting - structured spans over the original text / 高亮
//!
//! Returns byte-offset spans instead of pre-built markup, so the
//! presentation layer decides how matches are rendered and filenames
//! containing markup or pattern metacharacters cannot inject anything.
//! Terms are always matched as literal substrings, case-insensitively.

use serde::{Deserialize, Serialize};

/// One highlighted region, byte offsets into the original text / 高亮区间
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightSpan {
    /// Byte offset of the match start / 起始字节偏移
    pub start: usize,
    /// Byte offset one past the match end / 结束字节偏移
    pub end: usize,
    /// The term that matched here / 命中的词
    pub term: String,
}

/// Find every case-insensitive, non-overlapping occurrence of any term.
///
/// An empty term list yields no spans - the text is rendered unchanged.
/// When candidates overlap, the earlier occurrence wins; at equal starts
/// the longer term wins.
pub fn highlight(text: &str, terms: &[String]) -> Vec<HighlightSpan> {
    if terms.is_empty() || text.is_empty() {
        return Vec::new();
    }

    // Per-char lowercase fold with a map back to original byte offsets.
    // Lowercasing can change byte lengths, so offsets are tracked per char.
    let mut folded = String::with_capacity(text.len());
    // original byte offset for each byte of `folded`
    let mut origin: Vec<usize> = Vec::with_capacity(text.len() + 1);

    for (byte_idx, ch) in text.char_indices() {
        for low in ch.to_lowercase() {
            let start = folded.len();
            folded.push(low);
            for _ in start..folded.len() {
                origin.push(byte_idx);
            }
        }
    }
    origin.push(text.len());

    // original byte offset just past the char that produced folded byte i
    let origin_end = |folded_end: usize| -> usize {
        if folded_end >= folded.len() {
            text.len()
        } else {
            origin[folded_end]
        }
    };

    let mut candidates: Vec<HighlightSpan> = Vec::new();
    for term in terms {
        let needle = term.to_lowercase();
        if needle.is_empty() {
            continue;
        }
        for (pos, _) in folded.match_indices(&needle) {
            candidates.push(HighlightSpan {
                start: origin[pos],
                end: origin_end(pos + needle.len()),
                term: term.clone(),
            });
        }
    }

    // Earliest first, longest at ties; then drop overlaps / 去除重叠
    candidates.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut spans: Vec<HighlightSpan> = Vec::new();
    for candidate in candidates {
        match spans.last() {
            Some(last) if candidate.start < last.end => {}
            _ => spans.push(candidate),
        }
    }

    spans
}

/// Cut a short excerpt around the first matched span / 截取命中片段
///
/// Returns the excerpt and its spans, re-based to excerpt offsets. Falls
/// back to the head of the text when nothing matched.
pub fn excerpt(text: &str, terms: &[String], max_len: usize) -> (String, Vec<HighlightSpan>) {
    let spans = highlight(text, terms);

    let window_start = spans
        .first()
        .map(|s| s.start.saturating_sub(max_len / 3))
        .unwrap_or(0);

    // snap to char boundaries
    let mut start = window_start.min(text.len());
    while start > 0 && !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (start + max_len).min(text.len());
    while end < text.len() && !text.is_char_boundary(end) {
        end += 1;
    }

    let excerpt_text = text[start..end].to_string();
    let rebased = spans
        .into_iter()
        .filter(|s| s.start >= start && s.end <= end)
        .map(|s| HighlightSpan {
            start: s.start - start,
            end: s.end - start,
            term: s.term,
        })
        .collect();

    (excerpt_text, rebased)
}
