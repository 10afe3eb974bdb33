//! Markup cleaning and narration-sized chunking.

use crate::types::{AggregatorError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Share of `max_len` a sentence boundary must reach before it is used as a
/// cut point. Shorter boundaries fall back to a hard cut.
pub const DEFAULT_BOUNDARY_RATIO: f64 = 0.4;

static RE_HIDDEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)<!--.*?-->|<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<noscript\b[^>]*>.*?</noscript\s*>",
    )
    .expect("hidden block regex")
});

// A `<` only opens a tag when a name, `/`, `!` or `?` follows it, so decoded
// comparisons such as `1 < 2` survive the next pass.
static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?[A-Za-z!?][^>]*>").expect("tag regex"));

static RE_PARAGRAPHS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<p\b[^>]*>(.*?)</p\s*>").expect("paragraph regex"));

static RE_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").expect("title regex"));

/// Turn feed or page markup into plain prose.
///
/// Drops comments and script/style/noscript blocks, replaces every other tag
/// with a space, decodes entities and collapses whitespace. Decoding can
/// expose markup that was escaped once more (common in RSS descriptions), so
/// the strip/decode pass repeats until nothing changes. Every changing pass
/// shortens the text, which bounds the loop. Running to a fixpoint also means
/// multiply-escaped entities decode fully: `&amp;amp;` becomes `&`.
pub fn clean(markup: &str) -> String {
    let mut text = markup.to_string();
    loop {
        let next = {
            let stripped = RE_HIDDEN.replace_all(&text, " ");
            let stripped = RE_TAGS.replace_all(&stripped, " ");
            html_escape::decode_html_entities(&stripped).into_owned()
        };
        if next == text {
            break;
        }
        text = next;
    }
    collapse_whitespace(&text)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split `text` into parts of at most `max_len` characters using the default
/// boundary ratio.
pub fn chunk(text: &str, max_len: usize) -> Result<Vec<String>> {
    chunk_with_ratio(text, max_len, DEFAULT_BOUNDARY_RATIO)
}

/// Split `text` into ordered parts of at most `max_len` characters.
///
/// A part ends at the latest `". "`, `"! "`, `"? "` or newline inside the
/// window when that boundary lies at least `ratio * max_len` characters in;
/// otherwise the window is cut hard at `max_len`. Parts are trimmed and never
/// empty.
pub fn chunk_with_ratio(text: &str, max_len: usize, ratio: f64) -> Result<Vec<String>> {
    if max_len == 0 {
        return Err(AggregatorError::InvalidChunkSize);
    }

    let min_boundary = max_len as f64 * ratio;
    let mut parts = Vec::new();
    let mut remaining = text.trim();

    while let Some(window_end) = byte_offset_of_char(remaining, max_len) {
        let window = &remaining[..window_end];
        let cut = match last_boundary(window) {
            Some((byte_cut, char_len)) if char_len > 0 && char_len as f64 >= min_boundary => byte_cut,
            _ => window_end,
        };

        let part = remaining[..cut].trim();
        if !part.is_empty() {
            parts.push(part.to_string());
        }
        remaining = remaining[cut..].trim_start();
    }

    if !remaining.is_empty() {
        parts.push(remaining.to_string());
    }

    Ok(parts)
}

/// Byte offset of the `n`th character, or `None` when `text` has at most `n`
/// characters.
fn byte_offset_of_char(text: &str, n: usize) -> Option<usize> {
    text.char_indices().nth(n).map(|(i, _)| i)
}

/// Latest sentence boundary in `window` as `(byte offset to cut at, chars
/// kept before the cut)`. The punctuation (or newline) stays with the part.
fn last_boundary(window: &str) -> Option<(usize, usize)> {
    let mut best = None;
    let mut prev = None;
    for (n, (i, c)) in window.char_indices().enumerate() {
        match c {
            '\n' => best = Some((i + c.len_utf8(), n + 1)),
            ' ' if matches!(prev, Some('.' | '!' | '?')) => best = Some((i, n)),
            _ => {}
        }
        prev = Some(c);
    }
    best
}

/// Short summary of already-clean text, at most `max_chars` characters plus
/// an ellipsis.
pub fn summarize(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    let Some(end) = byte_offset_of_char(text, max_chars) else {
        return text.to_string();
    };

    let truncated = &text[..end];
    match truncated.rfind(' ') {
        Some(last_space) if last_space > 0 => format!("{}...", truncated[..last_space].trim_end()),
        _ => format!("{}...", truncated),
    }
}

/// Readable body of an article page: the text of every `<p>` element, or
/// the whole cleaned page when the paragraphs carry almost nothing.
pub fn extract_article_text(html: &str) -> String {
    let paragraphs: Vec<&str> = RE_PARAGRAPHS
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect();

    let text = clean(&paragraphs.join("\n\n"));
    if text.chars().count() < 100 {
        return clean(html);
    }
    text
}

pub fn extract_html_title(html: &str) -> Option<String> {
    RE_TITLE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| clean(m.as_str()))
        .filter(|title| !title.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squash(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn clean_strips_tags_and_hidden_blocks() {
        let html = "<div><script>var x = 1;</script><style>p { color: red }</style>\
                    <p>Hello<b>world</b></p><noscript>enable js</noscript><!-- note --></div>";
        assert_eq!(clean(html), "Hello world");
    }

    #[test]
    fn clean_decodes_common_entities() {
        assert_eq!(
            clean("Tom&nbsp;&amp;&nbsp;Jerry &quot;say&quot; &#39;hi&#39; 1 &lt; 2"),
            "Tom & Jerry \"say\" 'hi' 1 < 2"
        );
    }

    #[test]
    fn clean_strips_escaped_markup() {
        assert_eq!(clean("&lt;p&gt;Xin chào&lt;/p&gt;"), "Xin chào");
    }

    #[test]
    fn clean_keeps_decoded_angle_brackets() {
        assert_eq!(clean("1 &lt; 2 và 3 &gt; 2"), "1 < 2 và 3 > 2");
        assert_eq!(clean("<p>if a &lt; b &amp;&amp; b &gt; c</p>"), "if a < b && b > c");
        assert_eq!(clean("x < y and y > z"), "x < y and y > z");
    }

    #[test]
    fn clean_decodes_nested_entities_to_a_fixpoint() {
        let once = clean("Viết &amp;amp; trong HTML");
        assert_eq!(once, "Viết & trong HTML");
        assert_eq!(clean(&once), once);
    }

    #[test]
    fn clean_collapses_whitespace_and_handles_empty_input() {
        assert_eq!(clean("  a\n\n\t b  "), "a b");
        assert_eq!(clean(""), "");
        assert_eq!(clean("<br/><hr>"), "");
    }

    #[test]
    fn clean_is_idempotent() {
        let samples = [
            "<p>Ngày xưa có một con cáo.</p>",
            "&amp;lt;b&amp;gt;bold&amp;lt;/b&amp;gt;",
            "a &lt; b &gt; c",
            "x < y and y > z",
            "1 &lt; 2 và 3 &gt; 2",
            "<?xml version=\"1.0\"?><!DOCTYPE html><p>a</p>",
            "<scr<script>ipt>alert(1)</script>",
            "&amp;amp;nbsp;",
            "plain text",
        ];
        for sample in samples {
            let once = clean(sample);
            assert_eq!(clean(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn chunk_rejects_zero_length() {
        assert!(matches!(chunk("abc", 0), Err(AggregatorError::InvalidChunkSize)));
    }

    #[test]
    fn chunk_empty_text_has_no_parts() {
        assert!(chunk("", 10).unwrap().is_empty());
        assert!(chunk("   ", 10).unwrap().is_empty());
    }

    #[test]
    fn chunk_short_text_is_single_part() {
        assert_eq!(chunk("Xin chào.", 20).unwrap(), vec!["Xin chào."]);
    }

    #[test]
    fn chunk_hard_cuts_without_boundaries() {
        let text = "a".repeat(95);
        let parts = chunk(&text, 10).unwrap();
        assert_eq!(parts.len(), 10);
        assert!(parts.iter().all(|p| p.chars().count() <= 10));
        assert_eq!(parts.concat(), text);

        let exact = "b".repeat(40);
        assert_eq!(chunk(&exact, 10).unwrap().len(), 4);
    }

    #[test]
    fn chunk_prefers_late_sentence_boundary() {
        let text = "The fox ran far away. Then it slept.";
        let parts = chunk(text, 25).unwrap();
        assert_eq!(parts, vec!["The fox ran far away.", "Then it slept."]);
    }

    #[test]
    fn chunk_ignores_early_boundary() {
        // boundary at char 3 of a 20 char window is below 40%
        let parts = chunk("Hi. abcdefghijklmnopqrs", 20).unwrap();
        assert_eq!(parts, vec!["Hi. abcdefghijklmnop", "qrs"]);
    }

    #[test]
    fn chunk_honours_custom_ratio() {
        let parts = chunk_with_ratio("Hi. abcdefghijklmnopqrs", 20, 0.1).unwrap();
        assert_eq!(parts, vec!["Hi.", "abcdefghijklmnopqrs"]);
    }

    #[test]
    fn chunk_cuts_after_newline() {
        let parts = chunk("first line here\nsecond line", 20).unwrap();
        assert_eq!(parts, vec!["first line here", "second line"]);
    }

    #[test]
    fn chunk_vietnamese_story_follows_literal_rule() {
        let text = clean("<p>Ngày xưa có một con cáo. Nó rất thông minh.</p>");
        assert_eq!(text, "Ngày xưa có một con cáo. Nó rất thông minh.");

        let parts = chunk(&text, 20).unwrap();
        assert_eq!(parts, vec!["Ngày xưa có một con", "cáo. Nó rất thông mi", "nh."]);
    }

    #[test]
    fn chunk_preserves_content_and_order() {
        let text = "Một hai ba. Bốn năm sáu! Bảy tám chín? Mười một mười hai mười ba mười bốn. \
                    Mười lăm mười sáu mười bảy mười tám mười chín hai mươi hai mươi mốt.";
        for max_len in [1, 3, 7, 16, 31, 64, 500] {
            let parts = chunk(text, max_len).unwrap();
            assert!(parts.iter().all(|p| !p.trim().is_empty()));
            assert!(parts.iter().all(|p| p.chars().count() <= max_len));
            assert_eq!(squash(&parts.concat()), squash(text), "max_len {}", max_len);
        }
    }

    #[test]
    fn summarize_cuts_on_word_boundary() {
        assert_eq!(summarize("short text", 300), "short text");
        assert_eq!(summarize("one two three four", 10), "one two...");
        assert_eq!(summarize("abcdefghijkl", 5), "abcde...");
    }

    #[test]
    fn article_text_uses_paragraphs() {
        let body = "Đây là một đoạn văn khá dài để vượt qua ngưỡng một trăm ký tự của bộ trích xuất nội dung bài báo. Câu chuyện còn tiếp tục ở phần sau.";
        let html = format!(
            "<html><head><title>Tin &amp; Truyện</title></head><body><nav>Menu</nav><p>{}</p><p>Hết.</p></body></html>",
            body
        );
        assert_eq!(extract_article_text(&html), format!("{} Hết.", body));
        assert_eq!(extract_html_title(&html).as_deref(), Some("Tin & Truyện"));
    }

    #[test]
    fn article_text_falls_back_to_whole_page() {
        let html = "<html><body><div>Only a div</div><p>Tiny</p></body></html>";
        assert_eq!(extract_article_text(html), "Only a div Tiny");
        assert_eq!(extract_html_title(html), None);
    }
}
