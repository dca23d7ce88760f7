//! Cursor-relative text context, derived once per extraction.
//!
//! All offsets here are Unicode scalar (character) offsets. The AX API
//! reports selection ranges in UTF-16 code units; those are converted at
//! the boundary and never used for slicing. Word boundaries are defined
//! by character class (whitespace or punctuation), scanned over grapheme
//! clusters so emoji and combining sequences never get split.

use unicode_segmentation::UnicodeSegmentation;

/// A selection range in character offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedRange {
    pub location: usize,
    pub length: usize,
}

/// Snapshot of the text around the cursor in the focused element.
/// Constructed fresh on every extraction and never mutated; consumed by
/// the suggestion provider and the insertion engine, then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct TextContext {
    pub full_text: String,
    pub selected_text: Option<String>,
    pub text_before_cursor: String,
    pub text_after_cursor: String,
    pub word_at_cursor: String,
    /// Character offset of the cursor, clamped to `[0, chars(full_text)]`.
    pub cursor_position: usize,
    pub selected_range: Option<SelectedRange>,
    /// Character span `[start, end)` of `word_at_cursor` within
    /// `full_text`. Empty span (start == end) when no word is adjacent.
    pub word_span: (usize, usize),
}

impl TextContext {
    pub fn new(
        full_text: impl Into<String>,
        cursor_position: usize,
        selected_text: Option<String>,
        selected_range: Option<SelectedRange>,
    ) -> Self {
        let full_text = full_text.into();
        let char_count = full_text.chars().count();
        let cursor = cursor_position.min(char_count);

        let split = byte_offset_of_char(&full_text, cursor);
        let text_before_cursor = full_text[..split].to_string();
        let text_after_cursor = full_text[split..].to_string();

        let (word_at_cursor, back_chars, forward_chars) =
            word_around(&text_before_cursor, &text_after_cursor);

        Self {
            word_span: (cursor - back_chars, cursor + forward_chars),
            full_text,
            selected_text,
            text_before_cursor,
            text_after_cursor,
            word_at_cursor,
            cursor_position: cursor,
            selected_range,
        }
    }

    /// Convenience constructor for plain text with no selection.
    pub fn at_cursor(full_text: impl Into<String>, cursor_position: usize) -> Self {
        Self::new(full_text, cursor_position, None, None)
    }

    /// The empty context: what Terminal-class hosts get instead of any
    /// probing that would spill control sequences into their scrollback.
    pub fn empty() -> Self {
        Self::at_cursor(String::new(), 0)
    }

    pub fn has_word(&self) -> bool {
        !self.word_at_cursor.is_empty()
    }
}

/// Byte offset of the `n`th character of `text` (or `text.len()` when
/// `n` is past the end).
fn byte_offset_of_char(text: &str, n: usize) -> usize {
    text.char_indices()
        .nth(n)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Convert a UTF-16 code-unit offset (as reported by AXSelectedTextRange)
/// into a character offset, rounding down to the nearest scalar boundary
/// when the offset lands inside a surrogate pair.
pub(crate) fn utf16_to_char_floor(text: &str, utf16_offset: usize) -> usize {
    if utf16_offset == 0 {
        return 0;
    }

    let mut units_seen = 0usize;
    for (chars_seen, ch) in text.chars().enumerate() {
        if units_seen == utf16_offset {
            return chars_seen;
        }
        let next = units_seen + ch.len_utf16();
        if next > utf16_offset {
            return chars_seen;
        }
        units_seen = next;
    }

    text.chars().count()
}

/// UTF-16 code-unit offset of the `n`th character, for handing caret
/// positions back to the AX API. Clamps past the end.
pub(crate) fn utf16_offset_of_char(text: &str, char_offset: usize) -> usize {
    text.chars()
        .take(char_offset)
        .map(|c| c.len_utf16())
        .sum()
}

/// A grapheme terminates the word scan when its base character is
/// whitespace or punctuation.
fn is_boundary_grapheme(grapheme: &str) -> bool {
    grapheme
        .chars()
        .next()
        .map(|c| c.is_whitespace() || is_boundary_punctuation(c))
        .unwrap_or(true)
}

/// Punctuation that bounds a word. ASCII punctuation plus the general,
/// CJK, fullwidth, and Arabic punctuation blocks; anything else that is
/// not whitespace (letters, digits, marks, emoji) is a word character.
fn is_boundary_punctuation(c: char) -> bool {
    if c.is_ascii_punctuation() {
        return true;
    }
    if matches!(
        c as u32,
        0x2000..=0x206F // general punctuation
            | 0x3001..=0x303F // CJK symbols and punctuation (U+3000 is whitespace)
            | 0xFE30..=0xFE4F // CJK compatibility forms
            | 0xFE50..=0xFE6F // small form variants
            | 0xFF01..=0xFF0F // fullwidth ! " # $ % & ' ( ) * + , - . /
            | 0xFF1A..=0xFF20 // fullwidth : ; < = > ? @
            | 0xFF3B..=0xFF40 // fullwidth [ \ ] ^ _ `
            | 0xFF5B..=0xFF65 // fullwidth { | } ~ and halfwidth CJK punct
    ) {
        return true;
    }
    matches!(
        c,
        '¡' | '§' | '«' | '¶' | '·' | '»' | '¿' | '،' | '؛' | '؟' | '۔' | '՞' | '׃' | '־'
    )
}

/// Scan outward from the cursor: the longest run of word graphemes
/// ending at the cursor plus the longest run starting at it. Returns the
/// word and how many characters it extends backward and forward.
///
/// A cursor sitting immediately after whitespace has an empty backward
/// run, so it yields the following word (or nothing at all).
fn word_around(before: &str, after: &str) -> (String, usize, usize) {
    let mut backward: Vec<&str> = Vec::new();
    let mut back_chars = 0usize;
    for grapheme in before.graphemes(true).rev() {
        if is_boundary_grapheme(grapheme) {
            break;
        }
        back_chars += grapheme.chars().count();
        backward.push(grapheme);
    }
    backward.reverse();

    let mut word: String = backward.concat();
    let mut forward_chars = 0usize;
    for grapheme in after.graphemes(true) {
        if is_boundary_grapheme(grapheme) {
            break;
        }
        forward_chars += grapheme.chars().count();
        word.push_str(grapheme);
    }

    (word, back_chars, forward_chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn before_and_after_reassemble_for_every_offset() {
        let text = "a🙂 é\u{301}中 word";
        let char_count = text.chars().count();
        for cursor in 0..=char_count + 3 {
            let ctx = TextContext::at_cursor(text, cursor);
            assert_eq!(
                format!("{}{}", ctx.text_before_cursor, ctx.text_after_cursor),
                text,
                "reassembly failed at offset {}",
                cursor
            );
            assert!(ctx.cursor_position <= char_count);
        }
    }

    #[test]
    fn word_mid_word() {
        let ctx = TextContext::at_cursor("Hello world", 3);
        assert_eq!(ctx.word_at_cursor, "Hello");
        assert_eq!(ctx.word_span, (0, 5));
    }

    #[test]
    fn word_at_end_of_word() {
        let ctx = TextContext::at_cursor("Hello world", 5);
        assert_eq!(ctx.word_at_cursor, "Hello");
        assert_eq!(ctx.word_span, (0, 5));
    }

    #[test]
    fn word_after_whitespace_is_the_following_word() {
        // Boundary policy: the backward run is empty, so the forward run
        // wins. Documented in DESIGN.md.
        let ctx = TextContext::at_cursor("Hello world", 6);
        assert_eq!(ctx.word_at_cursor, "world");
        assert_eq!(ctx.word_span, (6, 11));
    }

    #[test]
    fn word_at_end_of_text() {
        let ctx = TextContext::at_cursor("Hello world", 11);
        assert_eq!(ctx.word_at_cursor, "world");
        assert_eq!(ctx.word_span, (6, 11));
    }

    #[test]
    fn word_is_empty_between_whitespace_runs() {
        let ctx = TextContext::at_cursor("a  b", 2);
        assert_eq!(ctx.word_at_cursor, "");
        assert_eq!(ctx.word_span, (2, 2));
    }

    #[test]
    fn word_never_contains_boundary_characters() {
        let texts = ["foo.bar(baz)", "¿qué tal?", "你好，世界。", "tab\there"];
        for text in texts {
            for cursor in 0..=text.chars().count() {
                let ctx = TextContext::at_cursor(text, cursor);
                assert!(
                    !ctx.word_at_cursor
                        .chars()
                        .any(|c| c.is_whitespace() || is_boundary_punctuation(c)),
                    "word {:?} at offset {} in {:?} contains a boundary char",
                    ctx.word_at_cursor,
                    cursor,
                    text
                );
            }
        }
    }

    #[test]
    fn punctuation_bounds_the_word() {
        let ctx = TextContext::at_cursor("foo.bar", 5);
        assert_eq!(ctx.word_at_cursor, "bar");
        let ctx = TextContext::at_cursor("foo.bar", 3);
        assert_eq!(ctx.word_at_cursor, "foo");
    }

    #[test]
    fn accented_word_with_combining_mark() {
        // "café" with a combining acute on the final e.
        let text = "un cafe\u{301} chaud";
        let ctx = TextContext::at_cursor(text, 5);
        assert_eq!(ctx.word_at_cursor, "cafe\u{301}");
        assert_eq!(ctx.word_span, (3, 8));
    }

    #[test]
    fn cjk_run_is_a_word() {
        let ctx = TextContext::at_cursor("今日は晴れ、明日は雨", 2);
        assert_eq!(ctx.word_at_cursor, "今日は晴れ");
        // The ideographic comma is a boundary.
        let ctx = TextContext::at_cursor("今日は晴れ、明日は雨", 7);
        assert_eq!(ctx.word_at_cursor, "明日は雨");
    }

    #[test]
    fn emoji_are_word_characters() {
        let ctx = TextContext::at_cursor("go 🚀🚀 now", 4);
        assert_eq!(ctx.word_at_cursor, "🚀🚀");
    }

    #[test]
    fn cursor_is_clamped_past_the_end() {
        let ctx = TextContext::at_cursor("hi", 99);
        assert_eq!(ctx.cursor_position, 2);
        assert_eq!(ctx.word_at_cursor, "hi");
    }

    #[test]
    fn empty_context_has_no_word() {
        let ctx = TextContext::empty();
        assert!(!ctx.has_word());
        assert_eq!(ctx.cursor_position, 0);
        assert_eq!(ctx.full_text, "");
    }

    #[test]
    fn utf16_floor_maps_ascii_one_to_one() {
        assert_eq!(utf16_to_char_floor("hello", 0), 0);
        assert_eq!(utf16_to_char_floor("hello", 3), 3);
        assert_eq!(utf16_to_char_floor("hello", 5), 5);
    }

    #[test]
    fn utf16_floor_handles_surrogate_pairs() {
        // "a🙂b": a=1 unit, 🙂=2 units, b=1 unit.
        assert_eq!(utf16_to_char_floor("a🙂b", 1), 1);
        // Inside the surrogate pair: floor to the emoji's start.
        assert_eq!(utf16_to_char_floor("a🙂b", 2), 1);
        assert_eq!(utf16_to_char_floor("a🙂b", 3), 2);
        assert_eq!(utf16_to_char_floor("a🙂b", 4), 3);
    }

    #[test]
    fn utf16_floor_clamps_past_the_end() {
        assert_eq!(utf16_to_char_floor("a🙂b", 99), 3);
    }

    #[test]
    fn utf16_offset_round_trips_with_floor() {
        let text = "a🙂b中";
        for char_offset in 0..=text.chars().count() {
            let units = utf16_offset_of_char(text, char_offset);
            assert_eq!(utf16_to_char_floor(text, units), char_offset);
        }
        assert_eq!(utf16_offset_of_char(text, 99), 5);
    }
}
